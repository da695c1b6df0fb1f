use embassy_time::{block_for, Duration, Instant};
use heapless::Vec;

use crate::command::Command;
use crate::config::Config;
use crate::connection::DataSocket;
use crate::error::{Error, InitError};
use crate::helpers::LossyStr;
use crate::parser::{self, NetworkTime, RegistrationStatus, SignalQuality};
use crate::response::Response;
use crate::services::{Ftp, Gprs, Http, Sms, Voice};
use crate::traits::SerialPort;

/// Longest command line the engine will put on the wire.
const LINE_CAPACITY: usize = 256;

/// Protocol engine for a SIM800 module on a half-duplex serial link.
///
/// The engine owns the serial port and runs one command/response exchange
/// at a time. The link carries no message boundaries and no flow control,
/// so the reader accumulates everything the module says until the
/// command's whole window has elapsed, and the caller must never have two
/// exchanges in flight at once (the engine's methods take `&mut self`;
/// there is no lock beyond that contract).
///
/// Construction runs the one-shot bootstrap sequence; a module that never
/// answers the liveness probe fails construction permanently.
///
/// `BUF_SIZE` is the response accumulator capacity. 512 bytes is plenty
/// for status traffic; size it up when pulling message lists or socket
/// data through [`DataSocket::receive`].
pub struct Client<P: SerialPort, const BUF_SIZE: usize> {
    port: P,
    config: Config,
}

impl<P: SerialPort, const BUF_SIZE: usize> core::fmt::Debug for Client<P, BUF_SIZE> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P: SerialPort, const BUF_SIZE: usize> Client<P, BUF_SIZE> {
    /// Bring up the engine: liveness probe, echo off (`ATE0`), full
    /// functionality (`AT+CFUN=1`). Boot timing is non-deterministic, so
    /// the probe tolerates both a missing and a present local echo.
    pub fn new(port: P, config: Config) -> Result<Self, Error> {
        let mut client = Self { port, config };
        client.initialize()?;
        Ok(client)
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Hand the serial port back.
    pub fn release(self) -> P {
        self.port
    }

    /// Send one command and accumulate its reply window.
    ///
    /// The reader drains the port until the window elapses and never
    /// returns early on a terminal token: command families disagree on
    /// what terminates a reply (`OK`, `CONNECT OK`, family-specific
    /// codes), and a truncated multi-line reply is worse than a slow one.
    pub fn send(&mut self, cmd: &Command<'_>) -> Result<Response<BUF_SIZE>, Error> {
        let timeout = cmd.timeout.unwrap_or(self.config.command_timeout);
        debug!("Sending {:?}", cmd.text);
        self.write_line(cmd.text)?;
        let window = self.read_window(timeout)?;
        let response = Response::new(window);

        if response.is_empty() {
            if cmd.expect_response {
                warn!("{:?} got no reply within {} ms", cmd.text, timeout.as_millis());
                return Err(Error::timeout(cmd.text, timeout));
            }
            return Ok(response);
        }

        trace!("Reply {:?}", LossyStr(response.as_bytes()));
        if cmd.check_error && response.contains("ERROR") {
            return Err(Error::command(cmd.text, response.as_bytes()));
        }
        Ok(response)
    }

    /// Send with bounded retry.
    ///
    /// Only timeouts and module error replies are retried; between
    /// attempts the receive buffer is drained so a stale window from a
    /// timed-out attempt can never bleed into the next one. After the
    /// last attempt the original error is returned unchanged.
    pub fn send_retried(&mut self, cmd: &Command<'_>) -> Result<Response<BUF_SIZE>, Error> {
        let mut attempt = 0u8;
        loop {
            match self.send(cmd) {
                Err(err) if err.is_retryable() => {
                    attempt += 1;
                    if attempt > self.config.retries {
                        return Err(err);
                    }
                    debug!(
                        "Attempt {} of {} failed, retrying",
                        attempt,
                        self.config.retries + 1
                    );
                    block_for(self.config.retry_delay);
                    self.flush_input()?;
                }
                other => return other,
            }
        }
    }

    /// Restart the module (`AT+CFUN=1,1`). It re-registers on the network
    /// afterwards, which takes a while; callers usually follow up with
    /// status polls.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.send(&Command::new("AT+CFUN=1,1").timeout(self.config.connect_timeout))
            .map(|_| ())
    }

    /// Network clock (`AT+CCLK?`). `Ok(None)` when the module has no
    /// network time yet or answers with something unreadable.
    pub fn network_time(&mut self) -> Result<Option<NetworkTime>, Error> {
        let response = self.send(&Command::new("AT+CCLK?").unchecked().allow_empty())?;
        Ok(parser::parse_network_time(&response.text()))
    }

    /// Signal quality report (`AT+CSQ`).
    pub fn signal_quality(&mut self) -> Result<Option<SignalQuality>, Error> {
        let response = self.send(&Command::new("AT+CSQ").unchecked().allow_empty())?;
        Ok(parser::parse_signal_quality(&response.text()))
    }

    /// Network registration status (`AT+CREG?`).
    pub fn registration(&mut self) -> Result<Option<RegistrationStatus>, Error> {
        let response = self.send(&Command::new("AT+CREG?").unchecked().allow_empty())?;
        Ok(parser::parse_registration(&response.text()))
    }

    /// Messaging operations backed by this engine.
    pub fn sms(&mut self) -> Sms<'_, P, BUF_SIZE> {
        Sms::new(self)
    }

    /// Packet-service operations backed by this engine.
    pub fn gprs(&mut self) -> Gprs<'_, P, BUF_SIZE> {
        Gprs::new(self)
    }

    /// HTTP operations backed by this engine.
    pub fn http(&mut self) -> Http<'_, P, BUF_SIZE> {
        Http::new(self)
    }

    /// FTP operations backed by this engine.
    pub fn ftp(&mut self) -> Ftp<'_, P, BUF_SIZE> {
        Ftp::new(self)
    }

    /// Call control backed by this engine.
    pub fn voice(&mut self) -> Voice<'_, P, BUF_SIZE> {
        Voice::new(self)
    }

    /// Controller for the module's single packet-data socket.
    pub fn socket(&mut self) -> DataSocket<'_, P, BUF_SIZE> {
        DataSocket::new(self)
    }

    fn initialize(&mut self) -> Result<(), Error> {
        self.probe()?;
        for text in ["ATE0", "AT+CFUN=1"] {
            if let Err(err) = self.send(&Command::new(text)) {
                return Err(match err {
                    Error::Command { command, .. } | Error::Timeout { command, .. } => {
                        Error::Init(InitError::Rejected(command))
                    }
                    other => other,
                });
            }
        }
        info!("Module initialized");
        Ok(())
    }

    /// Liveness probe. The echo state is unknown at boot, so an attempt
    /// counts as alive when the window carries `OK` or an echo of the
    /// probe itself; plain command checking would reject the echo case.
    fn probe(&mut self) -> Result<(), Error> {
        let cmd = Command::new("AT")
            .unchecked()
            .allow_empty()
            .timeout(self.config.probe_timeout);
        for attempt in 0..=self.config.retries {
            if attempt > 0 {
                block_for(self.config.retry_delay);
                self.flush_input()?;
            }
            let response = self.send(&cmd)?;
            if response.contains("OK") || response.contains("AT") {
                return Ok(());
            }
        }
        error!("Module not responding to liveness probe");
        Err(Error::Init(InitError::NoResponse))
    }

    fn write_line(&mut self, text: &str) -> Result<(), Error> {
        let mut line: Vec<u8, LINE_CAPACITY> = Vec::new();
        if line.extend_from_slice(text.as_bytes()).is_err() || line.push(b'\r').is_err() {
            return Err(Error::Validation("command line too long"));
        }
        self.write_all(&line)
    }

    pub(crate) fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.port.write(bytes).map_err(|_| Error::Write)
    }

    /// Write a raw payload, optionally terminated, and read its outcome
    /// window. Used by the data-entry flows (SMS body, socket payload,
    /// staged HTTP body) where the module consumes bytes instead of a
    /// command line.
    pub(crate) fn transfer_payload(
        &mut self,
        payload: &[u8],
        terminator: Option<u8>,
        timeout: Duration,
    ) -> Result<Response<BUF_SIZE>, Error> {
        self.write_all(payload)?;
        if let Some(byte) = terminator {
            self.write_all(&[byte])?;
        }
        let window = self.read_window(timeout)?;
        Ok(Response::new(window))
    }

    /// Accumulate everything the module says until `timeout` has elapsed.
    /// The deadline is the only mechanism that returns control; useful
    /// data arriving early does not shorten the window.
    fn read_window(&mut self, timeout: Duration) -> Result<Vec<u8, BUF_SIZE>, Error> {
        let deadline = Instant::now() + timeout;
        let mut window = Vec::new();
        let mut chunk = [0u8; 32];
        let mut dropped = 0usize;

        while Instant::now() < deadline {
            while self.port.available().map_err(|_| Error::Read)? > 0 {
                let n = self.port.read(&mut chunk).map_err(|_| Error::Read)?;
                if n == 0 {
                    break;
                }
                for &byte in &chunk[..n] {
                    if window.push(byte).is_err() {
                        dropped += 1;
                    }
                }
            }
            block_for(self.config.poll_interval);
        }

        if dropped > 0 {
            warn!("Reply window overran the buffer, dropped {} bytes", dropped);
        }
        Ok(window)
    }

    /// Discard whatever is pending in the receive buffer.
    pub(crate) fn flush_input(&mut self) -> Result<(), Error> {
        let mut chunk = [0u8; 32];
        let mut flushed = 0usize;
        loop {
            if self.port.available().map_err(|_| Error::Read)? == 0 {
                break;
            }
            let n = self.port.read(&mut chunk).map_err(|_| Error::Read)?;
            if n == 0 {
                break;
            }
            flushed += n;
        }
        if flushed > 0 {
            trace!("Flushed {} stale bytes", flushed);
        }
        Ok(())
    }
}
