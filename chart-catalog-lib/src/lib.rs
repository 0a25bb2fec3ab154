//! Chart catalog: scans song directories into a SQLite catalog and serves
//! browse and search queries over it.
//!
//! The [`Catalog`] owns the database connection, the chart parser and a
//! bounded import [`WorkerPool`]. [`Catalog::add_folder`] walks a directory,
//! classifies each subdirectory, imports new or changed charts in parallel
//! and removes records whose files are gone.

pub mod browse;
pub mod catalog;
pub mod error;
pub mod importer;
pub mod progress;
pub mod settings;
pub mod store;
pub mod sync;
pub mod worker_pool;

pub use browse::{BrowseEntry, ChartEntry, FolderView, SongGroup};
pub use catalog::Catalog;
pub use error::CatalogError;
pub use importer::{ChartImporter, ImportError, ImportOutcome};
pub use progress::{LogProgress, SilentProgress, SyncProgress};
pub use settings::{CatalogSettings, SettingsError};
pub use store::CatalogStore;
pub use sync::SyncReport;
pub use worker_pool::{TaskHandle, WorkerPool};

pub use chart_catalog_core::{ChartParser, Md5Hash};
pub use chart_catalog_db::CatalogStats;
