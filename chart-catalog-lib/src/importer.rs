//! Single-file chart import: hash, parse, and write one chart record.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chart_catalog_core::util::now_secs;
use chart_catalog_core::{Chart, ChartParser, Md5Hash, ParseError, hash_file};
use chart_catalog_db::{OperationError, delete_chart, find_chart, upsert_chart};
use thiserror::Error;

use crate::store::CatalogStore;

/// Result of importing one chart file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// No record existed; one was written.
    Added,
    /// A record existed with the same content hash. Nothing was written.
    Unchanged,
    /// A record existed with a different content hash and was rewritten.
    Replaced,
    /// The file could not be hashed, parsed, or stored.
    Failed,
}

impl ImportOutcome {
    /// Whether a chart record was written.
    pub fn is_import(self) -> bool {
        matches!(self, ImportOutcome::Added | ImportOutcome::Replaced)
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Not a file path: {}", .0.display())]
    NoFileName(PathBuf),
    #[error("Could not hash file: {0}")]
    Hash(#[from] std::io::Error),
    #[error("Parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("Could not store chart: {0}")]
    Store(#[from] OperationError),
}

/// Imports chart files into the catalog. Cheap to clone; clones share the
/// store and parser.
#[derive(Clone)]
pub struct ChartImporter {
    store: CatalogStore,
    parser: Arc<dyn ChartParser>,
}

impl ChartImporter {
    pub fn new(store: CatalogStore, parser: Arc<dyn ChartParser>) -> Self {
        Self { store, parser }
    }

    /// Import `path` as a chart of the folder `parent_hash`.
    ///
    /// Never returns an error: failures are logged and reported as
    /// [`ImportOutcome::Failed`].
    pub fn import_file(&self, parent_hash: &Md5Hash, path: &Path) -> ImportOutcome {
        match self.try_import(parent_hash, path) {
            Ok(outcome) => {
                log::debug!("{:?}: {}", outcome, path.display());
                outcome
            }
            Err(e) => {
                log::warn!("Failed to import {}: {}", path.display(), e);
                ImportOutcome::Failed
            }
        }
    }

    fn try_import(&self, parent_hash: &Md5Hash, path: &Path) -> Result<ImportOutcome, ImportError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ImportError::NoFileName(path.to_path_buf()))?;
        let content_hash = hash_file(path)?;

        let existing = self
            .store
            .with(|conn| find_chart(conn, parent_hash, &file_name))?;
        let replaced = match existing {
            Some(chart) if chart.content_hash == content_hash => {
                return Ok(ImportOutcome::Unchanged);
            }
            Some(_) => {
                self.store
                    .with(|conn| delete_chart(conn, parent_hash, &file_name))?;
                true
            }
            None => false,
        };

        let metadata = self.parser.parse(path)?;
        let chart = Chart {
            content_hash,
            parent_hash: parent_hash.clone(),
            file_name,
            metadata,
            added_at: now_secs(),
        };
        self.store.with(|conn| upsert_chart(conn, &chart))?;

        Ok(if replaced {
            ImportOutcome::Replaced
        } else {
            ImportOutcome::Added
        })
    }
}
