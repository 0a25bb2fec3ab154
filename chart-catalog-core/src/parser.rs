//! The chart-parser capability consumed by the importer.
//!
//! Parsing chart text is outside this workspace; the game supplies an
//! implementation of [`ChartParser`] when it opens a catalog.

use std::path::Path;

use thiserror::Error;

use crate::format::ChartFormat;
use crate::types::ChartMetadata;

/// Errors a chart parser may report for a single file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file was read but its content is not a valid chart.
    #[error("Malformed chart: {0}")]
    Malformed(String),

    /// The file's format is not handled by this parser.
    #[error("Unsupported chart format: {0}")]
    Unsupported(String),
}

impl ParseError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

/// Trait for turning a chart file into normalized [`ChartMetadata`].
///
/// Implementations are shared across import workers, so they must be
/// `Send + Sync` and must not rely on call ordering.
pub trait ChartParser: Send + Sync {
    /// Parse the chart at `path`.
    fn parse(&self, path: &Path) -> Result<ChartMetadata, ParseError>;

    /// Cheap check used while classifying directories: is this file a chart
    /// this parser would attempt? Defaults to the extension table.
    fn detect(&self, path: &Path) -> Option<ChartFormat> {
        ChartFormat::from_path(path)
    }
}
