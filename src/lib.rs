//! RESP front end for the DeepSeek chat API.
//!
//! RESP protocol description
//!
//! RESP is actually a serialization protocol that supports the following data types: Simple Strings, Errors, Integers, Bulk Strings and Arrays.
//!
//! The way RESP is used in Redis as a request-response protocol is the following:
//!
//! - Clients send commands to a Redis server as a RESP Array of Bulk Strings.
//! - The server replies with one of the RESP types according to the command implementation.
//!
//! In RESP, the type of some data depends on the first byte:
//!
//! - For Simple Strings the first byte of the reply is "+"
//! - For Errors the first byte of the reply is "-"
//! - For Integers the first byte of the reply is ":"
//! - For Bulk Strings the first byte of the reply is "$"
//! - For Arrays the first byte of the reply is "*"
//!
//! In RESP different parts of the protocol are always terminated with "\r\n" (CRLF).
//!
//! This crate holds the reply side: [`value`] builds and encodes replies,
//! [`connection`] writes them out, [`config`] and [`logging`] prepare the process.
pub mod config;
pub mod connection;
pub mod logging;
pub mod value;

pub use value::{ValueError, WireValue, CRLF, NIL};
