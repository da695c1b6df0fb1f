use core::fmt::Write;

use embassy_time::block_for;
use heapless::String;

use crate::client::Client;
use crate::command::{Command, END_OF_DATA};
use crate::error::Error;
use crate::parser::{classify_connect, ConnectOutcome};
use crate::response::Response;
use crate::traits::SerialPort;

/// Lifecycle of the single managed socket. Idle is both the initial
/// state and where the controller comes back to after a close or a
/// failure; transitions only happen through [`DataSocket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    /// The remote end tore the socket down (`CLOSED` marker seen in a
    /// data window).
    Closed,
    Failed,
}

/// Transport protocol of the managed socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketProtocol {
    Tcp,
    Udp,
}

impl SocketProtocol {
    const fn as_str(self) -> &'static str {
        match self {
            SocketProtocol::Tcp => "TCP",
            SocketProtocol::Udp => "UDP",
        }
    }
}

/// Controller for the module's one packet-data socket.
///
/// The socket is multiplexed over the same serial link as every other
/// command, so the controller borrows the engine exclusively for its
/// lifetime. This is not a TCP/IP stack: bytes are relayed through the
/// module's own socket, one connection at a time.
pub struct DataSocket<'a, P: SerialPort, const BUF_SIZE: usize> {
    client: &'a mut Client<P, BUF_SIZE>,
    state: ConnectionState,
}

impl<'a, P: SerialPort, const BUF_SIZE: usize> DataSocket<'a, P, BUF_SIZE> {
    pub(crate) fn new(client: &'a mut Client<P, BUF_SIZE>) -> Self {
        Self {
            client,
            state: ConnectionState::Idle,
        }
    }

    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Open the socket (`AT+CIPSTART`). Context setup is slow, so the
    /// exchange runs with the long connect window.
    ///
    /// A `CONNECT FAIL` classification raises [`Error::Connection`]; with
    /// `retry` the open is re-attempted across Connecting→Failed
    /// transitions only, never after a classified success. A window with
    /// no recognizable terminal token comes back as
    /// [`ConnectOutcome::Unclassified`] with the state reset to Idle, and
    /// the caller decides what to make of it.
    pub fn open(
        &mut self,
        protocol: SocketProtocol,
        host: &str,
        port: u16,
        retry: bool,
    ) -> Result<ConnectOutcome, Error> {
        if host.is_empty() {
            return Err(Error::Validation("host must not be empty"));
        }
        if port == 0 {
            return Err(Error::Validation("port must be in 1..=65535"));
        }

        let config = *self.client.config();
        let mut text: String<160> = String::new();
        write!(
            text,
            "AT+CIPSTART=\"{}\",\"{}\",\"{}\"",
            protocol.as_str(),
            host,
            port
        )
        .map_err(|_| Error::Validation("host too long"))?;
        let cmd = Command::new(&text).timeout(config.connect_timeout);

        let attempts = if retry { config.retries as u32 + 1 } else { 1 };
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.state = ConnectionState::Connecting;
            let outcome = match self.client.send(&cmd) {
                Ok(response) => classify_connect(response.as_bytes()),
                Err(err) if err.is_retryable() => ConnectOutcome::Failed,
                Err(err) => {
                    self.state = ConnectionState::Idle;
                    return Err(err);
                }
            };
            match outcome {
                ConnectOutcome::Connected => {
                    debug!("Socket open to {:?}:{}", host, port);
                    self.state = ConnectionState::Connected;
                    return Ok(ConnectOutcome::Connected);
                }
                ConnectOutcome::Unclassified => {
                    self.state = ConnectionState::Idle;
                    return Ok(ConnectOutcome::Unclassified);
                }
                ConnectOutcome::Failed => {
                    self.state = ConnectionState::Failed;
                    if attempt < attempts {
                        debug!("Connect attempt {} failed, retrying", attempt);
                        block_for(config.retry_delay);
                        self.client.flush_input()?;
                        continue;
                    }
                    self.state = ConnectionState::Idle;
                    return Err(Error::connection(host, Some(port)));
                }
            }
        }
    }

    /// Ship a payload through the open socket.
    ///
    /// The module is told the exact byte count up front (`AT+CIPSEND=n`)
    /// and consumes exactly that payload terminated by the end-of-data
    /// byte; nothing is escaped, so the payload may be arbitrary binary.
    pub fn send(&mut self, data: &[u8]) -> Result<Response<BUF_SIZE>, Error> {
        if self.state != ConnectionState::Connected {
            return Err(Error::Validation("socket is not connected"));
        }
        let config = *self.client.config();
        let mut text: String<32> = String::new();
        let _ = write!(text, "AT+CIPSEND={}", data.len());
        self.client.send(&Command::new(&text))?;
        let outcome = self
            .client
            .transfer_payload(data, Some(END_OF_DATA), config.connect_timeout)?;
        if outcome.contains("CLOSED") {
            self.state = ConnectionState::Closed;
        }
        Ok(outcome)
    }

    /// Fetch up to `max_len` buffered bytes from the module
    /// (`AT+CIPRXGET=2`), default 1460. The reply keeps the module's
    /// framing; the caller strips it.
    pub fn receive(&mut self, max_len: Option<u16>) -> Result<Response<BUF_SIZE>, Error> {
        let limit = max_len.unwrap_or(1460);
        let mut text: String<24> = String::new();
        let _ = write!(text, "AT+CIPRXGET=2,{}", limit);
        let response = self.client.send(&Command::new(&text))?;
        if response.contains("CLOSED") {
            self.state = ConnectionState::Closed;
        }
        Ok(response)
    }

    /// Close the socket. Idempotent: the command goes out regardless of
    /// state (unchecked, silence accepted) and the controller always
    /// comes back to Idle.
    pub fn close(&mut self) -> Result<(), Error> {
        let result = self
            .client
            .send(&Command::new("AT+CIPCLOSE=1").unchecked().allow_empty());
        self.state = ConnectionState::Idle;
        result.map(|_| ())
    }
}
