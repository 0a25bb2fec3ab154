//! Data model types for the chart catalog.
//!
//! These types represent the persistent catalog schema: folders (the scanned
//! directory tree) and charts (one row per chart file occurrence).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::ChartFormat;
use crate::hash::Md5Hash;

// ── Folder ──────────────────────────────────────────────────────────────────

/// How a cataloged directory was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderCategory {
    /// The reserved sentinel every other folder descends from.
    Root,
    /// Holds only subdirectories (or nothing).
    Container,
    /// Directly holds at least one chart file.
    SongCollection,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown folder category {0}")]
pub struct UnknownCategory(pub i64);

impl FolderCategory {
    pub fn as_i64(self) -> i64 {
        match self {
            FolderCategory::Root => 0,
            FolderCategory::Container => 1,
            FolderCategory::SongCollection => 2,
        }
    }

    pub fn from_i64(value: i64) -> Result<Self, UnknownCategory> {
        match value {
            0 => Ok(FolderCategory::Root),
            1 => Ok(FolderCategory::Container),
            2 => Ok(FolderCategory::SongCollection),
            other => Err(UnknownCategory(other)),
        }
    }
}

/// A cataloged directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    /// Hash of the normalized absolute `path`.
    pub path_hash: Md5Hash,
    /// `None` only for the root sentinel.
    pub parent_hash: Option<Md5Hash>,
    pub name: String,
    pub category: FolderCategory,
    pub path: PathBuf,
    /// Directory mtime (epoch seconds) at the last successful scan.
    pub modified_at: i64,
}

impl Folder {
    /// The sentinel row created with every catalog.
    pub fn root() -> Self {
        Self {
            path_hash: Md5Hash::root(),
            parent_hash: None,
            name: "ROOT".to_string(),
            category: FolderCategory::Root,
            path: PathBuf::new(),
            modified_at: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.category == FolderCategory::Root
    }
}

// ── Chart ───────────────────────────────────────────────────────────────────

/// Feature flags reported by the chart parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartFeatures {
    pub long_notes: bool,
    pub mines: bool,
    pub metric_mod: bool,
    pub stops: bool,
    pub bga: bool,
    pub random: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCounts {
    pub total: i64,
    pub regular: i64,
    pub long: i64,
}

/// Format-specific play parameters, as declared in the chart header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayDetails {
    pub game_mode: i64,
    pub judge_rank: i64,
    /// Gauge total.
    pub total: i64,
    pub play_level: i64,
    /// Difficulty tier (beginner .. insane).
    pub difficulty: i64,
}

/// Normalized metadata produced by a [`ChartParser`](crate::ChartParser).
///
/// Every chart format maps onto this one shape; `format` records which parser
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartMetadata {
    pub format: ChartFormat,
    pub title: String,
    pub title2: String,
    pub artist: String,
    pub artist2: String,
    pub genre: String,
    pub version: String,
    /// Estimated difficulty level.
    pub level: f64,
    pub start_bpm: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub length_seconds: i64,
    pub notes: NoteCounts,
    pub stage_file: Option<String>,
    pub banner: Option<String>,
    pub details: PlayDetails,
    pub features: ChartFeatures,
}

impl ChartMetadata {
    /// Empty metadata for the given format, for parsers to fill in.
    pub fn new(format: ChartFormat) -> Self {
        Self {
            format,
            title: String::new(),
            title2: String::new(),
            artist: String::new(),
            artist2: String::new(),
            genre: String::new(),
            version: String::new(),
            level: 0.0,
            start_bpm: 0.0,
            min_bpm: 0.0,
            max_bpm: 0.0,
            length_seconds: 0,
            notes: NoteCounts::default(),
            stage_file: None,
            banner: None,
            details: PlayDetails::default(),
            features: ChartFeatures::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn has_bpm_change(&self) -> bool {
        self.min_bpm != self.max_bpm
    }

    pub fn has_notes(&self) -> bool {
        self.notes.total > 0
    }
}

/// One cataloged chart file.
///
/// Existence is keyed by `(parent_hash, file_name)`; `content_hash` identifies
/// the bytes and may repeat across folders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub content_hash: Md5Hash,
    pub parent_hash: Md5Hash,
    /// File name relative to the parent folder, or an absolute path.
    pub file_name: String,
    pub metadata: ChartMetadata,
    /// Epoch seconds.
    pub added_at: i64,
}

impl Chart {
    /// Resolve the chart's on-disk location against its folder's path.
    pub fn resolve_path(&self, folder_path: &Path) -> PathBuf {
        let file = Path::new(&self.file_name);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            folder_path.join(file)
        }
    }
}

#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod tests;
