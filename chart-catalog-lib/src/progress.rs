//! Synchronization progress reporting.

use std::path::Path;

use chart_catalog_core::FolderCategory;

use crate::importer::ImportOutcome;
use crate::sync::SyncReport;

/// Receives progress updates during [`Catalog::add_folder_with_progress`].
///
/// `on_chart` is called from import workers, so implementations must be
/// thread-safe.
///
/// [`Catalog::add_folder_with_progress`]: crate::Catalog::add_folder_with_progress
pub trait SyncProgress: Send + Sync {
    /// Called when a directory has been classified and recorded or refreshed.
    fn on_folder(&self, path: &Path, category: FolderCategory);

    /// Called after each chart file import finishes.
    fn on_chart(&self, path: &Path, outcome: ImportOutcome);

    /// Called once the pool has drained.
    fn on_complete(&self, report: &SyncReport);
}

/// A no-op progress reporter that discards all updates.
pub struct SilentProgress;

impl SyncProgress for SilentProgress {
    fn on_folder(&self, _path: &Path, _category: FolderCategory) {}
    fn on_chart(&self, _path: &Path, _outcome: ImportOutcome) {}
    fn on_complete(&self, _report: &SyncReport) {}
}

/// A progress reporter that logs to the `log` crate.
pub struct LogProgress;

impl SyncProgress for LogProgress {
    fn on_folder(&self, path: &Path, category: FolderCategory) {
        log::info!("{:?}: {}", category, path.display());
    }

    fn on_chart(&self, path: &Path, outcome: ImportOutcome) {
        match outcome {
            ImportOutcome::Failed => log::warn!("  failed: {}", path.display()),
            ImportOutcome::Unchanged => log::debug!("  unchanged: {}", path.display()),
            _ => log::info!("  {:?}: {}", outcome, path.display()),
        }
    }

    fn on_complete(&self, report: &SyncReport) {
        log::info!(
            "Sync complete: {} imported ({} added, {} replaced), {} unchanged, {} failed, {} removed, {} errors, {} skipped",
            report.imported,
            report.added,
            report.replaced,
            report.unchanged,
            report.failed,
            report.removed,
            report.errors,
            report.skipped
        );
    }
}
