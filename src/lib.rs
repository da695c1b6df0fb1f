//! # SIM800 AT protocol client
//!
//! Driver for SIMCom SIM800 series cellular modules talking the vendor
//! AT command set over a half-duplex serial link.
//!
//! The crate is built around a small blocking protocol engine,
//! [`Client`]: one command in flight at a time, a time-boxed reader that
//! drains the port until the command's whole window has elapsed, bounded
//! retry with receive-buffer recovery in between, and stateless parsers
//! for the module's structured replies. Capability modules ([`Sms`],
//! [`Gprs`], [`Http`], [`Ftp`], [`Voice`] and the single-socket
//! [`DataSocket`] controller) borrow the engine rather than extending
//! it, and translate engine-level failures into their own error kinds at
//! their boundary.
//!
//! The transport is injected through the [`SerialPort`] capability trait
//! (write / available / read); the crate never configures the physical
//! port and never touches platform globals.
//!
//! ```ignore
//! let mut modem: Client<Uart, 512> = Client::new(uart, Config::new())?;
//!
//! modem.sms().send("+64211234567", "hello from the field")?;
//!
//! let mut socket = modem.socket();
//! socket.open(SocketProtocol::Tcp, "example.com", 80, true)?;
//! socket.send(b"GET / HTTP/1.0\r\n\r\n")?;
//! let reply = socket.receive(None)?;
//! socket.close()?;
//! ```
//!
//! # Optional Cargo features
//!
//! - **`log`** — route the crate's diagnostics through the `log` facade.
//! - **`defmt`** — route them through `defmt` instead (mutually
//!   exclusive with `log`).
//! - **`std`** — enable `std` support in the underlying time and I/O
//!   crates, mostly useful for host-side testing.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

mod client;
mod command;
mod config;
mod connection;
mod error;
mod helpers;
mod parser;
mod response;
mod services;
mod traits;

#[cfg(test)]
mod mock;

pub use client::Client;
pub use command::{Command, END_OF_DATA};
pub use config::Config;
pub use connection::{ConnectionState, DataSocket, SocketProtocol};
pub use error::{CmdString, Error, ExcerptString, InitError};
pub use helpers::LossyStr;
pub use parser::{
    classify_connect, parse_gsm_location, parse_http_action, parse_network_time,
    parse_registration, parse_signal_quality, ConnectOutcome, GsmLocation, LocateError,
    NetworkTime, RegistrationStatus, SignalQuality,
};
pub use response::Response;
pub use services::{Ftp, Gprs, Http, Sms, SmsFormat, Voice};
pub use traits::SerialPort;
