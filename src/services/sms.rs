use core::fmt::Write;

use heapless::String;

use crate::client::Client;
use crate::command::{Command, END_OF_DATA};
use crate::error::Error;
use crate::response::Response;
use crate::traits::SerialPort;

/// Message format selector for `AT+CMGF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SmsFormat {
    Pdu = 0,
    Text = 1,
}

/// Messaging operations.
///
/// Module error replies surface as [`Error::Sms`]; the engine-level
/// command kind never leaves this boundary.
pub struct Sms<'a, P: SerialPort, const BUF_SIZE: usize> {
    client: &'a mut Client<P, BUF_SIZE>,
}

impl<'a, P: SerialPort, const BUF_SIZE: usize> Sms<'a, P, BUF_SIZE> {
    pub(crate) fn new(client: &'a mut Client<P, BUF_SIZE>) -> Self {
        Self { client }
    }

    /// Select PDU or text mode.
    pub fn set_format(&mut self, format: SmsFormat) -> Result<(), Error> {
        let mut text: String<16> = String::new();
        let _ = write!(text, "AT+CMGF={}", format as u8);
        self.exchange(&Command::new(&text), None).map(|_| ())
    }

    /// Send a text message.
    ///
    /// `AT+CMGS` answers with a `>` prompt instead of a result code, so
    /// the command goes out unchecked; the body follows terminated by the
    /// end-of-data byte, and the outcome window decides success.
    pub fn send(&mut self, number: &str, message: &str) -> Result<Response<BUF_SIZE>, Error> {
        if number.is_empty() {
            return Err(Error::Validation("recipient number must not be empty"));
        }
        if message.is_empty() {
            return Err(Error::Validation("message body must not be empty"));
        }

        let mut text: String<48> = String::new();
        write!(text, "AT+CMGS=\"{}\"", number)
            .map_err(|_| Error::Validation("recipient number too long"))?;
        self.exchange(&Command::new(&text).unchecked(), Some(number))?;

        let window = self.client.config().connect_timeout;
        let outcome = self
            .client
            .transfer_payload(message.as_bytes(), Some(END_OF_DATA), window)?;
        if outcome.contains("ERROR") {
            return Err(Error::sms(Some(number)));
        }
        Ok(outcome)
    }

    /// Read the message stored at `index` (`AT+CMGR`).
    pub fn read(&mut self, index: u32) -> Result<Response<BUF_SIZE>, Error> {
        let mut text: String<20> = String::new();
        let _ = write!(text, "AT+CMGR={}", checked_index(index)?);
        self.exchange(&Command::new(&text), None)
    }

    /// Delete the message stored at `index` (`AT+CMGD`).
    pub fn delete(&mut self, index: u32) -> Result<(), Error> {
        let mut text: String<20> = String::new();
        let _ = write!(text, "AT+CMGD={}", checked_index(index)?);
        self.exchange(&Command::new(&text), None).map(|_| ())
    }

    /// Read every stored message (`AT+CMGL="ALL"`).
    pub fn read_all(&mut self) -> Result<Response<BUF_SIZE>, Error> {
        self.exchange(&Command::new("AT+CMGL=\"ALL\""), None)
    }

    /// Delete every stored message (`AT+CMGDA="DEL ALL"`). The status
    /// literal's casing differs between list and bulk-delete commands;
    /// the module parser may be case-sensitive, so each is kept as the
    /// command reference spells it.
    pub fn delete_all(&mut self) -> Result<(), Error> {
        self.exchange(&Command::new("AT+CMGDA=\"DEL ALL\""), None)
            .map(|_| ())
    }

    fn exchange(
        &mut self,
        cmd: &Command<'_>,
        number: Option<&str>,
    ) -> Result<Response<BUF_SIZE>, Error> {
        self.client.send(cmd).map_err(|err| match err {
            Error::Command { .. } => Error::sms(number),
            other => other,
        })
    }
}

fn checked_index(index: u32) -> Result<u32, Error> {
    if index == 0 {
        return Err(Error::Validation("message index must be positive"));
    }
    Ok(index)
}
