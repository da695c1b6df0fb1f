//! Capability modules built on top of the protocol engine.
//!
//! Each service borrows the engine exclusively and stays a thin
//! formatting layer: it renders command lines, delegates the exchange to
//! [`Client`](crate::Client), and translates engine-level command
//! failures into its own error kind at the boundary. Protocol complexity
//! (windows, retry, classification) lives in the engine.

mod ftp;
mod gprs;
mod http;
mod sms;
mod voice;

pub use ftp::Ftp;
pub use gprs::Gprs;
pub use http::Http;
pub use sms::{Sms, SmsFormat};
pub use voice::Voice;
