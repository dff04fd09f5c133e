//! Streaming decoder for gzip-compressed binary build logs.
//!
//! A build log records the lifecycle of a build (projects, evaluations,
//! targets and tasks) along with diagnostics and property tracking. This crate
//! turns it into a forward-only sequence of [`BuildEvent`]s, suitable for
//! feeding timeline exporters.
//!
//! # Format
//!
//! After decompression the log is a four-byte little-endian format version
//! followed by tagged records until an end-of-file record:
//!
//! | Field        | Encoding                         |
//! |--------------|----------------------------------|
//! | Version      | i32, little-endian               |
//! | Record tag   | 7-bit encoded int                |
//! | Record body  | common-field bitmask, then kind-specific fields |
//!
//! Versions 0 through 9 are understood. Which optional fields a record carries
//! depends on the version; see [`version::Feature`].
//!
//! Only lifecycle and evaluation records are materialized. Diagnostics,
//! property tracking records and embedded archives are consumed byte-exactly
//! and discarded.
//!
//! # Usage
//!
//! ```no_run
//! use binlogparser::{BinlogReader, EventData};
//!
//! let reader = BinlogReader::open("msbuild.binlog")?;
//! for event in reader {
//!     let event = event?;
//!     if let EventData::TargetStarted(t) = &event.data {
//!         println!("target {:?} at {:?}", t.target_name, event.fields.timestamp);
//!     }
//! }
//! # Ok::<(), binlogparser::ParseError>(())
//! ```

pub mod config;
pub mod types;
pub mod version;
mod fields;
mod parser;
mod reader;
mod stream;

#[cfg(test)]
mod test_util;

pub use config::ReaderConfig;
pub use stream::{BinlogReader, FileBinlogReader, ReadStats};
pub use types::*;
pub use version::{FormatVersion, MAX_SUPPORTED_VERSION};
