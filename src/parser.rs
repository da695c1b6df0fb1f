//! Stateless parsers for the module's structured replies.
//!
//! Replies arrive inside an undelimited window that may also hold command
//! echoes and unsolicited lines, so every parser first locates its marker
//! and works forward from there. Parsers never look at the transport;
//! they are plain text-in, record-out functions.

use heapless::String;
use nom::{
    bytes::complete::{tag, take_until, take_while},
    sequence::{preceded, tuple},
    IResult,
};

use crate::helpers::{find_token, truncated};

/// Network time as reported by `AT+CCLK?`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Zone offset as reported, e.g. `+04`; `+00` when the module omits
    /// it.
    pub timezone: String<4>,
}

/// Geolocation fix from `AT+CIPGSMLOC=1,1`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GsmLocation {
    pub longitude: f32,
    pub latitude: f32,
    pub date: String<12>,
    pub time: String<12>,
}

/// Why a location reply could not be turned into a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LocateError {
    /// The window carries no `+CIPGSMLOC` marker at all.
    NotFound,
    /// The module reported a non-zero location error code.
    Status(u16),
    /// Success status, but fewer fields than a fix requires.
    Incomplete,
    /// A field failed to parse.
    Malformed,
}

/// Classification of a socket-open reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectOutcome {
    /// `CONNECT OK` or `ALREADY CONNECT`.
    Connected,
    /// `CONNECT FAIL`.
    Failed,
    /// None of the known terminal tokens; handed to the caller as-is.
    Unclassified,
}

/// Received signal strength report from `AT+CSQ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalQuality {
    /// 0..=31, or 99 when not detectable.
    pub rssi: u8,
    /// Bit error rate bucket, 99 when not detectable.
    pub ber: u8,
}

/// Network registration state from `AT+CREG?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistrationStatus {
    NotRegistered,
    RegisteredHome,
    Searching,
    Denied,
    Unknown,
    RegisteredRoaming,
}

impl RegistrationStatus {
    /// Registered either on the home network or roaming.
    pub const fn is_registered(self) -> bool {
        matches!(
            self,
            RegistrationStatus::RegisteredHome | RegistrationStatus::RegisteredRoaming
        )
    }
}

/// Slice out the quoted string following `marker`.
fn quoted_after<'a>(raw: &'a str, marker: &'static str) -> Option<&'a str> {
    let result: IResult<&str, &str> = preceded(
        tuple((take_until(marker), tag(marker), take_until("\""), tag("\""))),
        take_until("\""),
    )(raw);
    result.ok().map(|(_, payload)| payload)
}

/// Slice from just after `marker` to the end of its line.
fn marker_line<'a>(raw: &'a str, marker: &'static str) -> Option<&'a str> {
    let result: IResult<&str, &str> = preceded(
        tuple((take_until(marker), tag(marker))),
        take_while(|c: char| c != '\r' && c != '\n'),
    )(raw);
    result.ok().map(|(_, line)| line.trim())
}

/// Decompose a `+CCLK: "yy/MM/dd,HH:mm:ss±zz"` reply.
///
/// Returns `None` on any malformation: an unreadable clock is a "no
/// result", not a protocol failure, and must never surface as an
/// unrelated error.
pub fn parse_network_time(raw: &str) -> Option<NetworkTime> {
    let payload = quoted_after(raw, "+CCLK:")?;
    let (date, time) = payload.split_once(',')?;

    let mut fields = date.split('/');
    let year = 2000 + fields.next()?.parse::<u16>().ok()?;
    let month = fields.next()?.parse::<u8>().ok()?;
    let day = fields.next()?.parse::<u8>().ok()?;

    // A sign at index 0 would be a malformed hour, not a zone offset.
    let zone_at = time
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '+' || c == '-')
        .map(|(i, _)| i);
    let (clock, timezone) = match zone_at {
        Some(i) => (&time[..i], truncated(&time[i..])),
        None => (time, truncated("+00")),
    };

    let mut fields = clock.split(':');
    let hour = fields.next()?.parse::<u8>().ok()?;
    let minute = fields.next()?.parse::<u8>().ok()?;
    let second = fields.next()?.parse::<u8>().ok()?;

    Some(NetworkTime {
        year,
        month,
        day,
        hour,
        minute,
        second,
        timezone,
    })
}

/// Decompose a `+CIPGSMLOC: <status>[,<lon>,<lat>,<date>,<time>]` reply.
pub fn parse_gsm_location(raw: &str) -> Result<GsmLocation, LocateError> {
    let line = marker_line(raw, "+CIPGSMLOC:").ok_or(LocateError::NotFound)?;
    let mut fields = line.split(',').map(str::trim);

    let status = fields
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(LocateError::Incomplete)?
        .parse::<u16>()
        .map_err(|_| LocateError::Malformed)?;
    if status != 0 {
        return Err(LocateError::Status(status));
    }

    let longitude = fields
        .next()
        .ok_or(LocateError::Incomplete)?
        .parse::<f32>()
        .map_err(|_| LocateError::Malformed)?;
    let latitude = fields
        .next()
        .ok_or(LocateError::Incomplete)?
        .parse::<f32>()
        .map_err(|_| LocateError::Malformed)?;
    let date = truncated(fields.next().ok_or(LocateError::Incomplete)?);
    let time = truncated(fields.next().ok_or(LocateError::Incomplete)?);

    Ok(GsmLocation {
        longitude,
        latitude,
        date,
        time,
    })
}

/// Classify a socket-open reply window.
///
/// Families disagree on terminal tokens, and an open can also come back
/// with nothing recognizable (late `CONNECT`, unsolicited noise); that
/// case is reported as [`ConnectOutcome::Unclassified`] instead of being
/// guessed at.
pub fn classify_connect(raw: &[u8]) -> ConnectOutcome {
    if find_token(raw, b"CONNECT OK") || find_token(raw, b"ALREADY CONNECT") {
        ConnectOutcome::Connected
    } else if find_token(raw, b"CONNECT FAIL") {
        ConnectOutcome::Failed
    } else {
        ConnectOutcome::Unclassified
    }
}

/// Decompose a `+CSQ: <rssi>,<ber>` reply.
pub fn parse_signal_quality(raw: &str) -> Option<SignalQuality> {
    let line = marker_line(raw, "+CSQ:")?;
    let (rssi, ber) = line.split_once(',')?;
    Some(SignalQuality {
        rssi: rssi.trim().parse().ok()?,
        ber: ber.trim().parse().ok()?,
    })
}

/// Decompose a `+CREG: <n>,<stat>` reply.
pub fn parse_registration(raw: &str) -> Option<RegistrationStatus> {
    let line = marker_line(raw, "+CREG:")?;
    let stat = line.split(',').nth(1)?.trim().parse::<u8>().ok()?;
    Some(match stat {
        0 => RegistrationStatus::NotRegistered,
        1 => RegistrationStatus::RegisteredHome,
        2 => RegistrationStatus::Searching,
        3 => RegistrationStatus::Denied,
        4 => RegistrationStatus::Unknown,
        5 => RegistrationStatus::RegisteredRoaming,
        _ => return None,
    })
}

/// Decompose a `+HTTPACTION: <method>,<status>,<len>` terminal report.
pub fn parse_http_action(raw: &str) -> Option<(u8, u16, u32)> {
    let line = marker_line(raw, "+HTTPACTION:")?;
    let mut fields = line.split(',').map(str::trim);
    let method = fields.next()?.parse().ok()?;
    let status = fields.next()?.parse().ok()?;
    let length = fields.next()?.parse().ok()?;
    Some((method, status, length))
}

/// Second field of a `+FTPGET: 1,<code>` / `+FTPPUT: 1,<code>[,..]`
/// session report.
pub fn parse_ftp_code(raw: &str, marker: &'static str) -> Option<u8> {
    let line = marker_line(raw, marker)?;
    line.split(',').nth(1)?.trim().parse().ok()
}
