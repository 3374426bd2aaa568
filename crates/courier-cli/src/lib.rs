//! Command-line tools for Courier
//!
//! A thin shell over [`courier_core::IndirectEncoder`] and the
//! [`courier_proto`] codecs for inspecting how a set of fields would travel.
//! All command logic lives in [`commands`] and writes to any
//! [`std::io::Write`], so the binary only parses arguments and picks the
//! output stream.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;

pub use commands::{CliError, decode_kvf, encode, parse_field, read_input, size};
