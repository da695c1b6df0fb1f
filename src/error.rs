use embassy_time::Duration;
use heapless::String;

use crate::helpers::{decode_lossy, truncated};

/// Longest command line preserved inside an error value.
pub const CMD_CAPACITY: usize = 96;
/// Longest reply excerpt preserved inside an error value.
pub const EXCERPT_CAPACITY: usize = 64;
/// Longest host name / URL preserved inside an error value.
pub const HOST_CAPACITY: usize = 96;
/// Longest phone number preserved inside an error value.
pub const NUMBER_CAPACITY: usize = 24;

pub type CmdString = String<CMD_CAPACITY>;
pub type ExcerptString = String<EXCERPT_CAPACITY>;

/// Why the one-shot bootstrap sequence failed. Always fatal: the engine
/// never becomes usable after a bootstrap failure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// The liveness probe exhausted every attempt without seeing `OK` or
    /// an echo of itself.
    NoResponse,
    /// A bootstrap configuration command was rejected by the module.
    Rejected(CmdString),
}

/// Errors surfaced by the protocol engine and the capability services.
///
/// Domain services (SMS, FTP, HTTP, packet data) translate a [`Command`]
/// failure into their own kind at their boundary, so callers of a service
/// only ever see that service's kind, a [`Timeout`], or a transport
/// failure.
///
/// [`Command`]: Error::Command
/// [`Timeout`]: Error::Timeout
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Caller argument rejected before any I/O took place. Never retried.
    Validation(&'static str),
    /// No data arrived within the deadline although a reply was required.
    Timeout { command: CmdString, timeout: Duration },
    /// The module answered with a recognized failure token.
    Command {
        command: CmdString,
        response: ExcerptString,
    },
    /// Socket open or context activation was not classified as a success.
    Connection {
        host: String<HOST_CAPACITY>,
        port: Option<u16>,
    },
    /// Messaging operation failed.
    Sms { number: Option<String<NUMBER_CAPACITY>> },
    /// File transfer failed.
    Ftp {
        filename: ExcerptString,
        path: ExcerptString,
    },
    /// HTTP operation failed.
    Http {
        url: String<HOST_CAPACITY>,
        status: Option<u16>,
    },
    /// The bootstrap sequence could not bring the module to a usable
    /// state.
    Init(InitError),
    /// Serial read error.
    Read,
    /// Serial write error.
    Write,
}

impl Error {
    pub(crate) fn timeout(command: &str, timeout: Duration) -> Self {
        Error::Timeout {
            command: truncated(command),
            timeout,
        }
    }

    pub(crate) fn command(command: &str, response: &[u8]) -> Self {
        Error::Command {
            command: truncated(command),
            response: decode_lossy(response),
        }
    }

    pub(crate) fn connection(host: &str, port: Option<u16>) -> Self {
        Error::Connection {
            host: truncated(host),
            port,
        }
    }

    pub(crate) fn sms(number: Option<&str>) -> Self {
        Error::Sms {
            number: number.map(truncated),
        }
    }

    pub(crate) fn ftp(filename: &str, path: &str) -> Self {
        Error::Ftp {
            filename: truncated(filename),
            path: truncated(path),
        }
    }

    pub(crate) fn http(url: &str, status: Option<u16>) -> Self {
        Error::Http {
            url: truncated(url),
            status,
        }
    }

    /// Only timeouts and module error replies may clear up on a retry;
    /// everything else fails the same way every time.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::Command { .. })
    }
}
