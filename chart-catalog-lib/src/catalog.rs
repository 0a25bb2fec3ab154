//! The [`Catalog`]: one database, one parser, one import pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chart_catalog_core::util::normalize_path;
use chart_catalog_core::{Chart, ChartParser, FolderCategory, Md5Hash, hash_path};
use chart_catalog_db::{
    CatalogStats, catalog_stats, delete_chart_by_hash, delete_folder,
    delete_folder_tree, find_charts_by_content_hash, folder_parent, folder_path,
    get_folder_by_hash, open_database, open_memory,
};
use rusqlite::Connection;

use crate::browse::{self, FolderView, SongGroup};
use crate::error::CatalogError;
use crate::importer::{ChartImporter, ImportOutcome};
use crate::progress::{SilentProgress, SyncProgress};
use crate::settings::{CatalogSettings, DEFAULT_SEARCH_LIMIT};
use crate::store::CatalogStore;
use crate::sync::{SyncReport, Synchronizer};
use crate::worker_pool::WorkerPool;

/// A chart catalog backed by SQLite.
///
/// Blocking methods must not be called from inside an async runtime, and a
/// `Catalog` must not be dropped inside one either: dropping it blocks on
/// any import still running, which tokio refuses to do on an async thread.
pub struct Catalog {
    store: CatalogStore,
    parser: Arc<dyn ChartParser>,
    importer: ChartImporter,
    pool: WorkerPool,
    search_limit: u32,
}

impl Catalog {
    /// Open (or create) the catalog database at `path`.
    pub fn open(
        path: &Path,
        parser: Arc<dyn ChartParser>,
        workers: usize,
    ) -> Result<Self, CatalogError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = open_database(path)?;
        log::info!("Opened catalog {}", path.display());
        Self::with_connection(conn, parser, workers)
    }

    /// An in-memory catalog. Nothing is persisted.
    pub fn open_in_memory(parser: Arc<dyn ChartParser>, workers: usize) -> Result<Self, CatalogError> {
        Self::with_connection(open_memory()?, parser, workers)
    }

    /// Open the catalog described by `settings`.
    pub fn from_settings(
        settings: &CatalogSettings,
        parser: Arc<dyn ChartParser>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::open(&settings.database_path(), parser, settings.import_threads())?;
        catalog.search_limit = settings.search_limit;
        Ok(catalog)
    }

    fn with_connection(
        conn: Connection,
        parser: Arc<dyn ChartParser>,
        workers: usize,
    ) -> Result<Self, CatalogError> {
        let store = CatalogStore::new(conn);
        let importer = ChartImporter::new(store.clone(), Arc::clone(&parser));
        Ok(Self {
            store,
            parser,
            importer,
            pool: WorkerPool::new(workers)?,
            search_limit: DEFAULT_SEARCH_LIMIT,
        })
    }

    /// Result limit used by [`search_default`](Self::search_default).
    pub fn search_limit(&self) -> u32 {
        self.search_limit
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    // ── Synchronization ─────────────────────────────────────────────────────

    /// Synchronize the directory at `path` into the catalog under `parent_hash`
    /// (usually [`Md5Hash::root`]). Returns once every import has finished.
    pub fn add_folder(&self, path: &Path, parent_hash: &Md5Hash) -> Result<SyncReport, CatalogError> {
        self.add_folder_with_progress(path, parent_hash, Arc::new(SilentProgress))
    }

    pub fn add_folder_with_progress(
        &self,
        path: &Path,
        parent_hash: &Md5Hash,
        progress: Arc<dyn SyncProgress>,
    ) -> Result<SyncReport, CatalogError> {
        Synchronizer::new(
            &self.store,
            self.parser.as_ref(),
            &self.importer,
            &self.pool,
            progress,
        )
        .run(path, parent_hash)
    }

    /// Remove a folder from the catalog.
    ///
    /// With `cascade`, the folder's charts and its whole subtree go with it.
    /// Without, the folder must be empty. Returns whether anything was removed.
    pub fn remove_folder(&self, hash: &Md5Hash, cascade: bool) -> Result<bool, CatalogError> {
        self.store.with(|conn| -> Result<bool, CatalogError> {
            if cascade {
                Ok(delete_folder_tree(conn, hash)? > 0)
            } else {
                delete_folder(conn, hash, false).map_err(Into::into)
            }
        })
    }

    /// Import a single chart file into an existing song collection.
    pub fn add_chart(&self, folder_hash: &Md5Hash, path: &Path) -> Result<ImportOutcome, CatalogError> {
        let folder = self
            .store
            .with(|conn| get_folder_by_hash(conn, folder_hash))?
            .ok_or_else(|| CatalogError::FolderNotFound(folder_hash.clone()))?;
        if folder.category != FolderCategory::SongCollection {
            return Err(CatalogError::NotASongCollection(folder.path_hash));
        }
        let path = normalize_path(path)?;
        if !path.is_file() {
            return Err(CatalogError::PathNotFound(path));
        }

        let importer = self.importer.clone();
        let handle = self
            .pool
            .submit(move || importer.import_file(&folder.path_hash, &path));
        let outcome = self
            .pool
            .wait_all(vec![handle])
            .into_iter()
            .next()
            .flatten()
            .unwrap_or(ImportOutcome::Failed);
        Ok(outcome)
    }

    /// Remove every occurrence of a chart. Returns how many records went.
    pub fn remove_chart(&self, content_hash: &Md5Hash) -> Result<usize, CatalogError> {
        Ok(self.store.with(|conn| delete_chart_by_hash(conn, content_hash))?)
    }

    /// Block until no import is queued or running.
    pub fn drain(&self) {
        self.pool.drain();
    }

    // ── Browse / Search ─────────────────────────────────────────────────────

    pub fn browse(&self, hash: &Md5Hash, recursive: bool) -> Result<FolderView, CatalogError> {
        self.store.with(|conn| browse::browse(conn, hash, recursive))
    }

    pub fn browse_song(&self, hash: &Md5Hash) -> Result<SongGroup, CatalogError> {
        self.store.with(|conn| browse::browse_song(conn, hash))
    }

    /// Search the charts directly inside `scope`, or everywhere when `scope`
    /// is the root. A `limit` of 0 means no limit.
    pub fn search(&self, scope: &Md5Hash, keyword: &str, limit: u32) -> Result<FolderView, CatalogError> {
        let scope = (!scope.is_root()).then_some(scope);
        self.store
            .with(|conn| browse::search(conn, scope, keyword, limit))
    }

    /// Global search using the configured result limit.
    pub fn search_default(&self, keyword: &str) -> Result<FolderView, CatalogError> {
        self.search(&Md5Hash::root(), keyword, self.search_limit)
    }

    pub fn find_by_content_hash(&self, content_hash: &Md5Hash) -> Result<Vec<Chart>, CatalogError> {
        Ok(self
            .store
            .with(|conn| find_charts_by_content_hash(conn, content_hash))?)
    }

    // ── Folder Lookups ──────────────────────────────────────────────────────

    /// The hash a directory is (or would be) cataloged under.
    pub fn folder_hash(path: &Path) -> Result<Md5Hash, CatalogError> {
        Ok(hash_path(&normalize_path(path)?))
    }

    pub fn folder_path(&self, hash: &Md5Hash) -> Result<PathBuf, CatalogError> {
        self.store
            .with(|conn| folder_path(conn, hash))?
            .ok_or_else(|| CatalogError::FolderNotFound(hash.clone()))
    }

    /// The parent of a folder; `None` for the root.
    pub fn folder_parent(&self, hash: &Md5Hash) -> Result<Option<Md5Hash>, CatalogError> {
        self.store.with(|conn| -> Result<Option<Md5Hash>, CatalogError> {
            if get_folder_by_hash(conn, hash)?.is_none() {
                return Err(CatalogError::FolderNotFound(hash.clone()));
            }
            Ok(folder_parent(conn, hash)?)
        })
    }

    pub fn stats(&self) -> Result<CatalogStats, CatalogError> {
        Ok(self.store.with(|conn| catalog_stats(conn))?)
    }
}
