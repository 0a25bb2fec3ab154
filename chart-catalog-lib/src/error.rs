use std::path::PathBuf;

use chart_catalog_core::Md5Hash;
use chart_catalog_db::{OperationError, SchemaError};
use thiserror::Error;

use crate::settings::SettingsError;

/// Errors returned by [`Catalog`](crate::Catalog) operations.
///
/// Scan-local problems (one unreadable directory, one bad chart) are logged
/// and counted in the [`SyncReport`](crate::SyncReport) instead of surfacing
/// here.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog database could not be created or opened. Fatal.
    #[error("Catalog schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Database error: {0}")]
    Db(#[from] OperationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Folder not found in catalog: {0}")]
    FolderNotFound(Md5Hash),

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("Folder {0} does not hold charts")]
    NotASongCollection(Md5Hash),
}
