//! Core types for the chart catalog: identity hashing, chart-format detection,
//! the folder/chart data model, and the chart-parser capability.
//!
//! This crate has no database dependency; `chart-catalog-db` persists these
//! types and `chart-catalog-lib` drives synchronization with them.

pub mod format;
pub mod hash;
pub mod parser;
pub mod types;
pub mod util;

pub use format::{ChartFormat, UnknownFormatTag};
pub use hash::{HashError, Md5Hash, hash_bytes, hash_file, hash_path, hash_str};
pub use parser::{ChartParser, ParseError};
pub use types::*;
