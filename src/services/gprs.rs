use core::fmt::Write;

use embassy_time::Duration;
use heapless::String;

use crate::client::Client;
use crate::command::Command;
use crate::error::Error;
use crate::parser::{self, GsmLocation};
use crate::response::Response;
use crate::traits::SerialPort;

/// Packet-service operations: attach, context bring-up and the
/// cell-derived extras that ride on the wireless context.
///
/// Module error replies on the context commands surface as
/// [`Error::Connection`].
pub struct Gprs<'a, P: SerialPort, const BUF_SIZE: usize> {
    client: &'a mut Client<P, BUF_SIZE>,
}

impl<'a, P: SerialPort, const BUF_SIZE: usize> Gprs<'a, P, BUF_SIZE> {
    pub(crate) fn new(client: &'a mut Client<P, BUF_SIZE>) -> Self {
        Self { client }
    }

    /// Attach to the packet service (`AT+CGATT=1`). Attaching on a
    /// congested cell takes a while, so the attach window applies;
    /// `retry` re-runs the exchange with buffer recovery in between.
    pub fn attach(&mut self, retry: bool) -> Result<(), Error> {
        let window = self.client.config().attach_timeout;
        self.context_command("AT+CGATT=1", window, retry)
    }

    /// Detach from the packet service (`AT+CGATT=0`).
    pub fn detach(&mut self) -> Result<(), Error> {
        let window = self.client.config().attach_timeout;
        self.context_command("AT+CGATT=0", window, false)
    }

    /// Configure the APN and bring the wireless context up
    /// (`AT+CSTT` followed by `AT+CIICR`). Activation is the slowest
    /// setup step of all; it gets the activation window.
    pub fn set_apn(
        &mut self,
        apn: &str,
        user: &str,
        password: &str,
        retry: bool,
    ) -> Result<(), Error> {
        if apn.is_empty() {
            return Err(Error::Validation("apn must not be empty"));
        }
        let mut text: String<128> = String::new();
        write!(text, "AT+CSTT=\"{}\",\"{}\",\"{}\"", apn, user, password)
            .map_err(|_| Error::Validation("apn credentials too long"))?;
        let result = self.client.send(&Command::new(&text));
        wrap(result, apn).map(|_| ())?;

        let window = self.client.config().activation_timeout;
        self.context_command("AT+CIICR", window, retry)
    }

    /// Local IP address (`AT+CIFSR`). The module answers with the bare
    /// dotted quad and no result code.
    pub fn local_ip(&mut self) -> Result<Response<BUF_SIZE>, Error> {
        wrap(self.client.send(&Command::new("AT+CIFSR")), "")
    }

    /// Deactivate the wireless context (`AT+CIPSHUT`).
    pub fn shutdown(&mut self) -> Result<(), Error> {
        wrap(self.client.send(&Command::new("AT+CIPSHUT")), "").map(|_| ())
    }

    /// Cell-derived geolocation (`AT+CIPGSMLOC=1,1`).
    ///
    /// Error checking is off for this family: failures come back as a
    /// non-zero status code rather than `ERROR`. Anything that cannot be
    /// turned into a fix surfaces as a command failure carrying the reply
    /// for diagnosis.
    pub fn location(&mut self) -> Result<GsmLocation, Error> {
        let response = self.client.send(&Command::new("AT+CIPGSMLOC=1,1").unchecked())?;
        parser::parse_gsm_location(&response.text()).map_err(|locate| {
            debug!("Location fix failed: {:?}", locate);
            Error::command("AT+CIPGSMLOC=1,1", response.as_bytes())
        })
    }

    fn context_command(
        &mut self,
        text: &'static str,
        window: Duration,
        retry: bool,
    ) -> Result<(), Error> {
        let cmd = Command::new(text).timeout(window);
        let result = if retry {
            self.client.send_retried(&cmd)
        } else {
            self.client.send(&cmd)
        };
        wrap(result, "").map(|_| ())
    }
}

/// Packet-service boundary: module error replies become the connection
/// kind (`host` carries the APN where one is involved).
fn wrap<const N: usize>(
    result: Result<Response<N>, Error>,
    host: &str,
) -> Result<Response<N>, Error> {
    result.map_err(|err| match err {
        Error::Command { .. } => Error::connection(host, None),
        other => other,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::{fast_config, MockPort};

    const BUF: usize = 256;

    fn booted() -> MockPort {
        MockPort::new().reply(b"OK\r\n").reply(b"OK\r\n").reply(b"OK\r\n")
    }

    fn client(port: &mut MockPort) -> Client<&mut MockPort, BUF> {
        Client::new(port, fast_config()).unwrap()
    }

    #[test]
    fn attach_renders_and_succeeds() {
        let mut port = booted().reply(b"OK\r\n");
        let handle = port.handle();
        let mut c = client(&mut port);
        c.gprs().attach(false).unwrap();
        assert_eq!(handle.writes()[3], b"AT+CGATT=1\r".to_vec());
    }

    #[test]
    fn attach_failure_maps_to_connection_error() {
        let mut port = booted().reply(b"ERROR\r\n");
        let mut c = Client::<_, BUF>::new(&mut port, fast_config().retries(0)).unwrap();
        let err = c.gprs().attach(true).unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[test]
    fn attach_retries_when_asked() {
        let mut port = booted().reply(b"ERROR\r\n").reply(b"OK\r\n");
        let handle = port.handle();
        let mut c = Client::<_, BUF>::new(&mut port, fast_config().retries(1)).unwrap();
        c.gprs().attach(true).unwrap();
        assert_eq!(handle.writes().len(), 5);
    }

    #[test]
    fn detach_failure_maps_to_connection_error() {
        let mut port = booted().reply(b"ERROR\r\n");
        let mut c = client(&mut port);
        assert!(matches!(
            c.gprs().detach().unwrap_err(),
            Error::Connection { .. }
        ));
    }

    #[test]
    fn set_apn_renders_credentials_and_activates() {
        let mut port = booted().reply(b"OK\r\n").reply(b"OK\r\n");
        let handle = port.handle();
        let mut c = client(&mut port);
        c.gprs().set_apn("internet", "user1", "pass1", false).unwrap();
        let writes = handle.writes();
        assert_eq!(writes[3], b"AT+CSTT=\"internet\",\"user1\",\"pass1\"\r".to_vec());
        assert_eq!(writes[4], b"AT+CIICR\r".to_vec());
    }

    #[test]
    fn set_apn_rejects_empty_apn_before_any_write() {
        let mut port = booted();
        let handle = port.handle();
        let mut c = client(&mut port);
        assert_eq!(
            c.gprs().set_apn("", "", "", false).unwrap_err(),
            Error::Validation("apn must not be empty")
        );
        assert_eq!(handle.writes().len(), 3);
    }

    #[test]
    fn set_apn_failure_names_the_apn() {
        let mut port = booted().reply(b"ERROR\r\n");
        let mut c = client(&mut port);
        match c.gprs().set_apn("internet", "", "", false).unwrap_err() {
            Error::Connection { host, port } => {
                assert_eq!(host.as_str(), "internet");
                assert_eq!(port, None);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn location_parses_a_fix() {
        let mut port =
            booted().reply(b"+CIPGSMLOC: 0,-122.4194,37.7749,2024/12/08,14:30:00\r\nOK\r\n");
        let handle = port.handle();
        let mut c = client(&mut port);
        let fix = c.gprs().location().unwrap();
        assert_eq!(fix.longitude, -122.4194);
        assert_eq!(fix.latitude, 37.7749);
        assert_eq!(fix.date.as_str(), "2024/12/08");
        assert_eq!(fix.time.as_str(), "14:30:00");
        assert_eq!(handle.writes()[3], b"AT+CIPGSMLOC=1,1\r".to_vec());
    }

    #[test]
    fn location_error_code_surfaces_as_command_failure() {
        let mut port = booted().reply(b"+CIPGSMLOC: 601\r\nOK\r\n");
        let mut c = client(&mut port);
        match c.gprs().location().unwrap_err() {
            Error::Command { command, response } => {
                assert_eq!(command.as_str(), "AT+CIPGSMLOC=1,1");
                assert!(response.as_str().contains("601"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn location_survives_an_error_reply() {
        // Unchecked exchange: the ERROR text reaches the parser, which
        // reports the missing marker instead.
        let mut port = booted().reply(b"ERROR\r\n");
        let mut c = client(&mut port);
        assert!(matches!(
            c.gprs().location().unwrap_err(),
            Error::Command { .. }
        ));
    }

    #[test]
    fn local_ip_returns_the_raw_reply() {
        let mut port = booted().reply(b"10.0.0.1\r\n");
        let mut c = client(&mut port);
        let ip = c.gprs().local_ip().unwrap();
        assert!(ip.text().as_str().contains("10.0.0.1"));
    }

    #[test]
    fn shutdown_renders() {
        let mut port = booted().reply(b"SHUT OK\r\n");
        let handle = port.handle();
        let mut c = client(&mut port);
        c.gprs().shutdown().unwrap();
        assert_eq!(handle.writes()[3], b"AT+CIPSHUT\r".to_vec());
    }
}
