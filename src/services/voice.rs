use core::fmt::Write;

use heapless::String;

use crate::client::Client;
use crate::command::Command;
use crate::error::Error;
use crate::traits::SerialPort;

/// Call control.
///
/// The taxonomy has no dedicated voice kind, so module error replies
/// propagate as command failures.
pub struct Voice<'a, P: SerialPort, const BUF_SIZE: usize> {
    client: &'a mut Client<P, BUF_SIZE>,
}

impl<'a, P: SerialPort, const BUF_SIZE: usize> Voice<'a, P, BUF_SIZE> {
    pub(crate) fn new(client: &'a mut Client<P, BUF_SIZE>) -> Self {
        Self { client }
    }

    /// Start a voice call. The trailing semicolon selects voice rather
    /// than data dialing.
    pub fn dial(&mut self, number: &str) -> Result<(), Error> {
        if number.is_empty() {
            return Err(Error::Validation("dial number must not be empty"));
        }
        let mut text: String<32> = String::new();
        write!(text, "ATD{};", number).map_err(|_| Error::Validation("dial number too long"))?;
        self.client.send(&Command::new(&text)).map(|_| ())
    }

    /// Answer an incoming call (`ATA`).
    pub fn answer(&mut self) -> Result<(), Error> {
        self.client.send(&Command::new("ATA")).map(|_| ())
    }

    /// Hang the current call up (`ATH`).
    pub fn hangup(&mut self) -> Result<(), Error> {
        self.client.send(&Command::new("ATH")).map(|_| ())
    }
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
    fn dial_renders_a_voice_call() {
        let mut port = booted().reply(b"OK\r\n");
        let handle = port.handle();
        let mut c = client(&mut port);
        c.voice().dial("+6421555123").unwrap();
        assert_eq!(handle.writes()[3], b"ATD+6421555123;\r".to_vec());
    }

    #[test]
    fn dial_rejects_an_empty_number_before_any_write() {
        let mut port = booted();
        let handle = port.handle();
        let mut c = client(&mut port);
        assert_eq!(
            c.voice().dial("").unwrap_err(),
            Error::Validation("dial number must not be empty")
        );
        assert_eq!(handle.writes().len(), 3);
    }

    #[test]
    fn answer_and_hangup_render() {
        let mut port = booted().reply(b"OK\r\n").reply(b"OK\r\n");
        let handle = port.handle();
        let mut c = client(&mut port);
        c.voice().answer().unwrap();
        c.voice().hangup().unwrap();
        let writes = handle.writes();
        assert_eq!(writes[3], b"ATA\r".to_vec());
        assert_eq!(writes[4], b"ATH\r".to_vec());
    }
}
