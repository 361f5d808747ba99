//! Wire-level pieces of the SNI front end: byte decoders, the ClientHello
//! parser, the alert record we answer with, and configuration.
pub mod alert;
pub mod config;
pub mod error;
pub mod extension;
pub mod greeting;
pub mod wire;

pub use error::ParseError;
pub use greeting::{parse_client_hello, ClientHello};
