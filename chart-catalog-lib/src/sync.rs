//! Directory synchronizer.
//!
//! Walks a directory tree, classifies each directory as a song collection
//! (holds at least one chart file) or a container, and reconciles the catalog
//! with what is on disk. Chart imports are handed to the [`WorkerPool`]; the
//! walk itself is single-threaded.
//!
//! Per directory:
//! - no record: insert it, then submit its charts or recurse into its subdirectories
//! - category flipped: drop the whole subtree and insert fresh
//! - song collection: incremental refresh (see [`Synchronizer::refresh`])
//! - container: prune vanished child folders, then recurse

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chart_catalog_core::util::{folder_name, modified_secs, normalize_path};
use chart_catalog_core::{ChartParser, Folder, FolderCategory, Md5Hash, hash_file, hash_path};
use chart_catalog_db::{
    delete_chart, delete_folder_tree, find_charts_by_parent, get_folder_by_hash, list_children,
    update_folder_modified, upsert_folder,
};

use crate::error::CatalogError;
use crate::importer::{ChartImporter, ImportOutcome};
use crate::progress::SyncProgress;
use crate::store::CatalogStore;
use crate::worker_pool::{TaskHandle, WorkerPool};

/// Counts gathered by one synchronize call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Charts written (`added + replaced`).
    pub imported: usize,
    pub added: usize,
    pub replaced: usize,
    /// Charts whose content hash still matched, whether found during refresh
    /// or by the importer.
    pub unchanged: usize,
    pub failed: usize,
    /// Chart records removed because their file disappeared.
    pub removed: usize,
    /// Import tasks handed to the worker pool.
    pub submitted: usize,
    pub folders_added: usize,
    pub folders_removed: usize,
    /// Directories or files skipped because of an I/O or store error.
    pub errors: usize,
    /// Directory entries skipped because their names are not valid UTF-8.
    pub skipped: usize,
}

impl SyncReport {
    fn record(&mut self, outcome: ImportOutcome) {
        match outcome {
            ImportOutcome::Added => self.added += 1,
            ImportOutcome::Replaced => self.replaced += 1,
            ImportOutcome::Unchanged => self.unchanged += 1,
            ImportOutcome::Failed => self.failed += 1,
        }
        if outcome.is_import() {
            self.imported += 1;
        }
    }
}

/// One non-recursive directory listing, split into chart files and
/// subdirectories. Both lists are sorted.
#[derive(Debug, Default)]
struct DirListing {
    charts: Vec<PathBuf>,
    subdirs: Vec<PathBuf>,
    /// Entries left out because their names are not valid UTF-8.
    skipped: usize,
}

impl DirListing {
    fn read(dir: &Path, parser: &dyn ChartParser) -> std::io::Result<Self> {
        let mut listing = DirListing::default();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            // Stored names are UTF-8; a lossy name never matches on rescan.
            if path.file_name().and_then(|n| n.to_str()).is_none() {
                log::warn!("Skipping entry with a non UTF-8 name: {}", path.display());
                listing.skipped += 1;
                continue;
            }
            // Follows symlinks; broken links are skipped.
            let Ok(meta) = std::fs::metadata(&path) else {
                continue;
            };
            if meta.is_dir() {
                listing.subdirs.push(path);
            } else if meta.is_file() && parser.detect(&path).is_some() {
                listing.charts.push(path);
            }
        }
        listing.charts.sort();
        listing.subdirs.sort();
        Ok(listing)
    }

    fn category(&self) -> FolderCategory {
        if self.charts.is_empty() {
            FolderCategory::Container
        } else {
            FolderCategory::SongCollection
        }
    }
}

struct PendingImport {
    path: PathBuf,
    handle: TaskHandle<ImportOutcome>,
}

/// State for one top-level synchronize call.
pub(crate) struct Synchronizer<'a> {
    store: &'a CatalogStore,
    parser: &'a dyn ChartParser,
    importer: &'a ChartImporter,
    pool: &'a WorkerPool,
    progress: Arc<dyn SyncProgress>,
    pending: Vec<PendingImport>,
    report: SyncReport,
}

impl<'a> Synchronizer<'a> {
    pub(crate) fn new(
        store: &'a CatalogStore,
        parser: &'a dyn ChartParser,
        importer: &'a ChartImporter,
        pool: &'a WorkerPool,
        progress: Arc<dyn SyncProgress>,
    ) -> Self {
        Self {
            store,
            parser,
            importer,
            pool,
            progress,
            pending: Vec::new(),
            report: SyncReport::default(),
        }
    }

    /// Synchronize `path` as a child of `parent_hash` and wait for every
    /// import it caused.
    ///
    /// Fails only when `path` is not an existing directory or not valid
    /// UTF-8, the parent folder is unknown, or the top directory itself cannot be read or recorded.
    /// Problems below the top directory are logged and counted.
    pub(crate) fn run(mut self, path: &Path, parent_hash: &Md5Hash) -> Result<SyncReport, CatalogError> {
        let path = normalize_path(path)?;
        if path.to_str().is_none() {
            return Err(CatalogError::NonUtf8Path(path));
        }
        if !path.exists() {
            return Err(CatalogError::PathNotFound(path));
        }
        if !path.is_dir() {
            return Err(CatalogError::NotADirectory(path));
        }
        if self
            .store
            .with(|conn| get_folder_by_hash(conn, parent_hash))?
            .is_none()
        {
            return Err(CatalogError::FolderNotFound(parent_hash.clone()));
        }

        log::info!("Synchronizing {}", path.display());
        let walked = self.sync_dir(&path, parent_hash);

        // Imports already submitted run to completion even if the walk failed.
        let (paths, handles): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|p| (p.path, p.handle))
            .unzip();
        for (path, result) in paths.iter().zip(self.pool.wait_all(handles)) {
            let outcome = match result {
                Some(outcome) => outcome,
                None => {
                    log::warn!("Import worker for {} panicked", path.display());
                    ImportOutcome::Failed
                }
            };
            self.report.record(outcome);
        }
        self.pool.drain();

        walked?;
        self.progress.on_complete(&self.report);
        Ok(self.report)
    }

    fn sync_dir(&mut self, path: &Path, parent_hash: &Md5Hash) -> Result<(), CatalogError> {
        let listing = DirListing::read(path, self.parser)?;
        self.report.skipped += listing.skipped;
        let category = listing.category();
        let path_hash = hash_path(path);
        let existing = self
            .store
            .with(|conn| get_folder_by_hash(conn, &path_hash))?;

        match existing {
            None => self.insert_folder(path, path_hash, parent_hash, listing),
            Some(folder) if folder.category != category => {
                log::info!(
                    "{} changed from {:?} to {:?}, re-analysing",
                    path.display(),
                    folder.category,
                    category
                );
                let removed = self
                    .store
                    .with(|conn| delete_folder_tree(conn, &folder.path_hash))?;
                self.report.folders_removed += removed;
                // Keep the recorded parent so re-analysis does not move the folder.
                let parent = folder.parent_hash.unwrap_or_else(|| parent_hash.clone());
                self.insert_folder(path, path_hash, &parent, listing)
            }
            Some(folder) if category == FolderCategory::SongCollection => {
                self.refresh(&folder, listing)
            }
            Some(folder) => self.refresh_container(&folder, listing),
        }
    }

    /// Synchronize a directory below the top level; failures are logged and
    /// counted instead of aborting the walk.
    fn sync_child(&mut self, path: &Path, parent_hash: &Md5Hash) {
        if let Err(e) = self.sync_dir(path, parent_hash) {
            log::warn!("Skipping {}: {}", path.display(), e);
            self.report.errors += 1;
        }
    }

    fn insert_folder(
        &mut self,
        path: &Path,
        path_hash: Md5Hash,
        parent_hash: &Md5Hash,
        listing: DirListing,
    ) -> Result<(), CatalogError> {
        let category = listing.category();
        let folder = Folder {
            path_hash,
            parent_hash: Some(parent_hash.clone()),
            name: folder_name(path),
            category,
            path: path.to_path_buf(),
            modified_at: modified_secs(path)?,
        };
        self.store.with(|conn| upsert_folder(conn, &folder))?;
        self.report.folders_added += 1;
        self.progress.on_folder(path, category);

        match category {
            FolderCategory::SongCollection => {
                for chart in listing.charts {
                    self.submit(&folder.path_hash, chart);
                }
            }
            _ => {
                for dir in &listing.subdirs {
                    self.sync_child(dir, &folder.path_hash);
                }
            }
        }
        Ok(())
    }

    /// Bring a known song collection up to date with its directory.
    ///
    /// Records whose file is gone are deleted. New files are submitted.
    /// Files already cataloged are re-hashed and only submitted if their
    /// content changed, so an untouched folder causes no import at all.
    fn refresh(&mut self, folder: &Folder, listing: DirListing) -> Result<(), CatalogError> {
        let charts = self
            .store
            .with(|conn| find_charts_by_parent(conn, &folder.path_hash))?;
        let on_disk: BTreeSet<&PathBuf> = listing.charts.iter().collect();

        let mut changed = false;
        let mut cataloged: HashMap<PathBuf, Md5Hash> = HashMap::with_capacity(charts.len());
        for chart in charts {
            let resolved = chart.resolve_path(&folder.path);
            if on_disk.contains(&resolved) {
                cataloged.insert(resolved, chart.content_hash);
                continue;
            }
            log::debug!("Removing stale chart {}", resolved.display());
            if self
                .store
                .with(|conn| delete_chart(conn, &folder.path_hash, &chart.file_name))?
            {
                self.report.removed += 1;
                changed = true;
            }
        }

        for file in listing.charts {
            match cataloged.get(&file) {
                None => {
                    self.submit(&folder.path_hash, file);
                    changed = true;
                }
                Some(stored) => match hash_file(&file) {
                    Ok(current) if current == *stored => self.report.unchanged += 1,
                    Ok(_) => {
                        self.submit(&folder.path_hash, file);
                        changed = true;
                    }
                    Err(e) => {
                        log::warn!("Could not hash {}: {}", file.display(), e);
                        self.report.errors += 1;
                    }
                },
            }
        }

        self.touch(folder, changed)?;
        self.progress.on_folder(&folder.path, FolderCategory::SongCollection);
        Ok(())
    }

    fn refresh_container(&mut self, folder: &Folder, listing: DirListing) -> Result<(), CatalogError> {
        let children = self
            .store
            .with(|conn| list_children(conn, &folder.path_hash))?;
        let mut changed = false;
        for child in children.iter().filter(|c| !c.path.is_dir()) {
            log::debug!("Removing vanished folder {}", child.path.display());
            let removed = self
                .store
                .with(|conn| delete_folder_tree(conn, &child.path_hash))?;
            self.report.folders_removed += removed;
            changed = true;
        }

        self.touch(folder, changed)?;
        self.progress.on_folder(&folder.path, FolderCategory::Container);
        for dir in &listing.subdirs {
            self.sync_child(dir, &folder.path_hash);
        }
        Ok(())
    }

    /// Store the directory's current mtime if it advanced or the folder changed.
    fn touch(&self, folder: &Folder, changed: bool) -> Result<(), CatalogError> {
        let mtime = modified_secs(&folder.path)?;
        if changed || mtime > folder.modified_at {
            self.store
                .with(|conn| update_folder_modified(conn, &folder.path_hash, mtime))?;
        }
        Ok(())
    }

    fn submit(&mut self, parent_hash: &Md5Hash, path: PathBuf) {
        let importer = self.importer.clone();
        let progress = Arc::clone(&self.progress);
        let parent = parent_hash.clone();
        let job_path = path.clone();
        let handle = self.pool.submit(move || {
            let outcome = importer.import_file(&parent, &job_path);
            progress.on_chart(&job_path, outcome);
            outcome
        });
        self.report.submitted += 1;
        self.pending.push(PendingImport { path, handle });
    }
}
