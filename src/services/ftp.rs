use core::fmt::Write;

use heapless::String;

use crate::client::Client;
use crate::command::Command;
use crate::error::Error;
use crate::parser;
use crate::response::Response;
use crate::traits::SerialPort;

/// FTP transfers over the module's embedded client.
///
/// The module runs an FTP session on bearer profile 1; a transfer is
/// configured field by field (`AT+FTPSERV`, `AT+FTPGETNAME`, ...) and
/// then started with `AT+FTPGET=1` / `AT+FTPPUT=1`, which answer with a
/// session report rather than `ERROR`. Module error replies surface as
/// [`Error::Ftp`].
pub struct Ftp<'a, P: SerialPort, const BUF_SIZE: usize> {
    client: &'a mut Client<P, BUF_SIZE>,
}

impl<'a, P: SerialPort, const BUF_SIZE: usize> Ftp<'a, P, BUF_SIZE> {
    pub(crate) fn new(client: &'a mut Client<P, BUF_SIZE>) -> Self {
        Self { client }
    }

    /// Configure the FTP profile: bearer, server and credentials.
    pub fn init(&mut self, server: &str, user: &str, password: &str) -> Result<(), Error> {
        if server.is_empty() {
            return Err(Error::Validation("ftp server must not be empty"));
        }
        self.exchange(&Command::new("AT+FTPCID=1"), "", "")?;
        self.quoted_command("AT+FTPSERV", server, "", "")?;
        self.quoted_command("AT+FTPUN", user, "", "")?;
        self.quoted_command("AT+FTPPW", password, "", "")?;
        Ok(())
    }

    /// Download `path`/`filename` and return the first data window.
    pub fn get_file(&mut self, filename: &str, path: &str) -> Result<Response<BUF_SIZE>, Error> {
        check_target(filename, path)?;
        self.quoted_command("AT+FTPGETNAME", filename, filename, path)?;
        self.quoted_command("AT+FTPGETPATH", path, filename, path)?;

        let window = self.client.config().activation_timeout;
        let start = self.exchange(
            &Command::new("AT+FTPGET=1").timeout(window),
            filename,
            path,
        )?;
        match parser::parse_ftp_code(&start.text(), "+FTPGET:") {
            Some(1) => {}
            Some(code) => {
                debug!("FTP download refused with code {}", code);
                return Err(Error::ftp(filename, path));
            }
            None => return Err(Error::ftp(filename, path)),
        }

        self.exchange(&Command::new("AT+FTPGET=2,1460"), filename, path)
    }

    /// Upload `data` as `path`/`filename`.
    pub fn put_file(&mut self, filename: &str, path: &str, data: &[u8]) -> Result<(), Error> {
        check_target(filename, path)?;
        self.quoted_command("AT+FTPPUTNAME", filename, filename, path)?;
        self.quoted_command("AT+FTPPUTPATH", path, filename, path)?;

        let window = self.client.config().activation_timeout;
        let start = self.exchange(
            &Command::new("AT+FTPPUT=1").timeout(window),
            filename,
            path,
        )?;
        match parser::parse_ftp_code(&start.text(), "+FTPPUT:") {
            Some(1) => {}
            Some(code) => {
                debug!("FTP upload refused with code {}", code);
                return Err(Error::ftp(filename, path));
            }
            None => return Err(Error::ftp(filename, path)),
        }

        let mut text: String<40> = String::new();
        let _ = write!(text, "AT+FTPPUT=2,{}", data.len());
        self.exchange(&Command::new(&text), filename, path)?;
        let data_window = self.client.config().connect_timeout;
        let outcome = self.client.transfer_payload(data, None, data_window)?;
        if outcome.contains("ERROR") {
            return Err(Error::ftp(filename, path));
        }
        // Zero-length data block ends the upload session.
        self.exchange(&Command::new("AT+FTPPUT=2,0").allow_empty(), filename, path)?;
        Ok(())
    }

    /// Tear the FTP session down (`AT+FTPQUIT`).
    pub fn quit(&mut self) -> Result<(), Error> {
        self.exchange(&Command::new("AT+FTPQUIT").allow_empty(), "", "")
            .map(|_| ())
    }

    fn quoted_command(
        &mut self,
        prefix: &str,
        value: &str,
        filename: &str,
        path: &str,
    ) -> Result<(), Error> {
        let mut text: String<160> = String::new();
        write!(text, "{}=\"{}\"", prefix, value)
            .map_err(|_| Error::Validation("ftp parameter too long"))?;
        self.exchange(&Command::new(&text), filename, path)
            .map(|_| ())
    }

    fn exchange(
        &mut self,
        cmd: &Command<'_>,
        filename: &str,
        path: &str,
    ) -> Result<Response<BUF_SIZE>, Error> {
        self.client.send(cmd).map_err(|err| match err {
            Error::Command { .. } => Error::ftp(filename, path),
            other => other,
        })
    }
}

fn check_target(filename: &str, path: &str) -> Result<(), Error> {
    if filename.is_empty() {
        return Err(Error::Validation("filename must not be empty"));
    }
    if path.is_empty() {
        return Err(Error::Validation("path must not be empty"));
    }
    Ok(())
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
    fn init_renders_the_profile() {
        let mut port = booted()
            .reply(b"OK\r\n")
            .reply(b"OK\r\n")
            .reply(b"OK\r\n")
            .reply(b"OK\r\n");
        let handle = port.handle();
        let mut c = client(&mut port);
        c.ftp().init("ftp.example.com", "anonymous", "guest").unwrap();
        let writes = handle.writes();
        assert_eq!(writes[3], b"AT+FTPCID=1\r".to_vec());
        assert_eq!(writes[4], b"AT+FTPSERV=\"ftp.example.com\"\r".to_vec());
        assert_eq!(writes[5], b"AT+FTPUN=\"anonymous\"\r".to_vec());
        assert_eq!(writes[6], b"AT+FTPPW=\"guest\"\r".to_vec());
    }

    #[test]
    fn init_rejects_an_empty_server() {
        let mut port = booted();
        let handle = port.handle();
        let mut c = client(&mut port);
        assert_eq!(
            c.ftp().init("", "", "").unwrap_err(),
            Error::Validation("ftp server must not be empty")
        );
        assert_eq!(handle.writes().len(), 3);
    }

    #[test]
    fn get_file_runs_the_session_flow() {
        let mut port = booted()
            .reply(b"OK\r\n")
            .reply(b"OK\r\n")
            .reply(b"OK\r\n+FTPGET: 1,1\r\n")
            .reply(b"+FTPGET: 2,11\r\nhello world\r\nOK\r\n");
        let handle = port.handle();
        let mut c = client(&mut port);
        let data = c.ftp().get_file("report.csv", "/logs/").unwrap();
        assert!(data.text().as_str().contains("hello world"));

        let writes = handle.writes();
        assert_eq!(writes[3], b"AT+FTPGETNAME=\"report.csv\"\r".to_vec());
        assert_eq!(writes[4], b"AT+FTPGETPATH=\"/logs/\"\r".to_vec());
        assert_eq!(writes[5], b"AT+FTPGET=1\r".to_vec());
        assert_eq!(writes[6], b"AT+FTPGET=2,1460\r".to_vec());
    }

    #[test]
    fn get_file_refused_session_carries_the_target() {
        let mut port = booted()
            .reply(b"OK\r\n")
            .reply(b"OK\r\n")
            .reply(b"OK\r\n+FTPGET: 1,66\r\n");
        let mut c = client(&mut port);
        match c.ftp().get_file("report.csv", "/logs/").unwrap_err() {
            Error::Ftp { filename, path } => {
                assert_eq!(filename.as_str(), "report.csv");
                assert_eq!(path.as_str(), "/logs/");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn get_file_rejects_empty_targets_before_any_write() {
        let mut port = booted();
        let handle = port.handle();
        let mut c = client(&mut port);
        assert_eq!(
            c.ftp().get_file("", "/logs/").unwrap_err(),
            Error::Validation("filename must not be empty")
        );
        assert_eq!(
            c.ftp().get_file("report.csv", "").unwrap_err(),
            Error::Validation("path must not be empty")
        );
        assert_eq!(handle.writes().len(), 3);
    }

    #[test]
    fn put_file_stages_and_finishes_the_upload() {
        let mut port = booted()
            .reply(b"OK\r\n")
            .reply(b"OK\r\n")
            .reply(b"OK\r\n+FTPPUT: 1,1,1360\r\n")
            .reply(b"+FTPPUT: 2,4\r\n")
            .reply(b"OK\r\n");
        let handle = port.handle();
        let mut c = client(&mut port);
        c.ftp().put_file("note.txt", "/upload/", b"data").unwrap();

        let writes = handle.writes();
        assert_eq!(writes[3], b"AT+FTPPUTNAME=\"note.txt\"\r".to_vec());
        assert_eq!(writes[4], b"AT+FTPPUTPATH=\"/upload/\"\r".to_vec());
        assert_eq!(writes[5], b"AT+FTPPUT=1\r".to_vec());
        assert_eq!(writes[6], b"AT+FTPPUT=2,4\r".to_vec());
        assert_eq!(writes[7], b"data".to_vec());
        assert_eq!(writes[8], b"AT+FTPPUT=2,0\r".to_vec());
    }

    #[test]
    fn command_failures_become_ftp_errors() {
        let mut port = booted().reply(b"ERROR\r\n");
        let mut c = client(&mut port);
        match c.ftp().get_file("report.csv", "/logs/").unwrap_err() {
            Error::Ftp { filename, .. } => assert_eq!(filename.as_str(), "report.csv"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn quit_renders() {
        let mut port = booted().reply(b"OK\r\n");
        let handle = port.handle();
        let mut c = client(&mut port);
        c.ftp().quit().unwrap();
        assert_eq!(handle.writes()[3], b"AT+FTPQUIT\r".to_vec());
    }
}
