//! I/O module
//!
//! Handles replay script parsing and account output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (command conversion, output serialization)
//! - `async_reader` - Asynchronous CSV reader with batch reading interface

pub mod async_reader;
pub mod csv_format;

pub use async_reader::AsyncReader;
pub use csv_format::{convert_command_record, write_accounts_csv, CommandRecord};
