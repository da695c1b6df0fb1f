use core::fmt::Write;

use heapless::String;

use crate::client::Client;
use crate::command::Command;
use crate::error::Error;
use crate::parser;
use crate::response::Response;
use crate::traits::SerialPort;

/// HTTP operations over the module's embedded client.
///
/// The terminal `+HTTPACTION` report is unsolicited and arrives some time
/// after the action's `OK`; since the engine's reader holds its window
/// open to the end, the report lands inside the same window and is parsed
/// out of it. Module error replies surface as [`Error::Http`].
pub struct Http<'a, P: SerialPort, const BUF_SIZE: usize> {
    client: &'a mut Client<P, BUF_SIZE>,
}

impl<'a, P: SerialPort, const BUF_SIZE: usize> Http<'a, P, BUF_SIZE> {
    pub(crate) fn new(client: &'a mut Client<P, BUF_SIZE>) -> Self {
        Self { client }
    }

    /// Initialize the HTTP service (`AT+HTTPINIT`).
    pub fn init(&mut self) -> Result<(), Error> {
        self.exchange(&Command::new("AT+HTTPINIT"), "").map(|_| ())
    }

    /// Release the HTTP service (`AT+HTTPTERM`).
    pub fn terminate(&mut self) -> Result<(), Error> {
        self.exchange(&Command::new("AT+HTTPTERM"), "").map(|_| ())
    }

    /// Set an HTTP parameter (`AT+HTTPPARA`).
    pub fn set_param(&mut self, param: &str, value: &str) -> Result<(), Error> {
        let mut text: String<224> = String::new();
        write!(text, "AT+HTTPPARA=\"{}\",\"{}\"", param, value)
            .map_err(|_| Error::Validation("parameter value too long"))?;
        self.exchange(&Command::new(&text), value).map(|_| ())
    }

    /// Perform a GET and return the response status code. The body is
    /// fetched separately with [`read`](Http::read).
    pub fn get(&mut self, url: &str) -> Result<u16, Error> {
        self.action(url, 0, None)
    }

    /// Perform a POST, staging `body` through `AT+HTTPDATA`, and return
    /// the response status code.
    pub fn post(&mut self, url: &str, body: &[u8]) -> Result<u16, Error> {
        self.action(url, 1, Some(body))
    }

    /// Fetch the response body of the last action (`AT+HTTPREAD`).
    pub fn read(&mut self) -> Result<Response<BUF_SIZE>, Error> {
        let window = self.client.config().connect_timeout;
        let cmd = Command::new("AT+HTTPREAD").timeout(window);
        let result = self.client.send(&cmd);
        self.wrap(result, "")
    }

    fn action(&mut self, url: &str, method: u8, body: Option<&[u8]>) -> Result<u16, Error> {
        if url.is_empty() {
            return Err(Error::Validation("url must not be empty"));
        }
        self.set_param("URL", url)?;

        let window = self.client.config().connect_timeout;
        if let Some(body) = body {
            let mut text: String<48> = String::new();
            let _ = write!(text, "AT+HTTPDATA={},10000", body.len());
            self.exchange(&Command::new(&text), url)?;
            // The module swallows exactly the announced byte count; no
            // terminator follows.
            self.client.transfer_payload(body, None, window)?;
        }

        let mut text: String<20> = String::new();
        let _ = write!(text, "AT+HTTPACTION={}", method);
        let report = self.exchange(&Command::new(&text).timeout(window), url)?;

        match parser::parse_http_action(&report.text()) {
            Some((_, status, _)) if status < 400 => Ok(status),
            Some((_, status, _)) => Err(Error::http(url, Some(status))),
            None => Err(Error::http(url, None)),
        }
    }

    fn exchange(&mut self, cmd: &Command<'_>, url: &str) -> Result<Response<BUF_SIZE>, Error> {
        let result = self.client.send(cmd);
        self.wrap(result, url)
    }

    fn wrap(
        &mut self,
        result: Result<Response<BUF_SIZE>, Error>,
        url: &str,
    ) -> Result<Response<BUF_SIZE>, Error> {
        result.map_err(|err| match err {
            Error::Command { .. } => Error::http(url, None),
            other => other,
        })
    }
}
