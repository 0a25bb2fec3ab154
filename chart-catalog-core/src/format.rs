//! Chart file formats recognised by the catalog.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A chart file format. Stored as a small integer tag in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartFormat {
    Bms,
    Bmson,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown chart format tag {0}")]
pub struct UnknownFormatTag(pub i64);

impl ChartFormat {
    pub const ALL: &'static [ChartFormat] = &[ChartFormat::Bms, ChartFormat::Bmson];

    /// File extensions (lowercase, no dot) handled by this format.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ChartFormat::Bms => &["bms", "bme", "bml", "pms"],
            ChartFormat::Bmson => &["bmson"],
        }
    }

    /// Detect the format from a file extension (case-insensitive).
    ///
    /// This only inspects the name; whether the content actually parses is
    /// decided later by the chart parser.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext.as_str()))
    }

    pub fn tag(self) -> i64 {
        match self {
            ChartFormat::Bms => 1,
            ChartFormat::Bmson => 2,
        }
    }

    pub fn from_tag(tag: i64) -> Result<Self, UnknownFormatTag> {
        match tag {
            1 => Ok(ChartFormat::Bms),
            2 => Ok(ChartFormat::Bmson),
            other => Err(UnknownFormatTag(other)),
        }
    }
}

impl fmt::Display for ChartFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartFormat::Bms => f.write_str("BMS"),
            ChartFormat::Bmson => f.write_str("BMSON"),
        }
    }
}
