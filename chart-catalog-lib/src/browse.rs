//! Browse and search views over the catalog.

use std::collections::HashMap;
use std::path::PathBuf;

use chart_catalog_core::{Chart, Folder, FolderCategory, Md5Hash, hash_str};
use chart_catalog_db::{
    find_charts_by_parent, folder_path, get_folder_by_hash, list_children, search_charts,
};
use rusqlite::Connection;

use crate::error::CatalogError;

/// A chart together with its resolved on-disk location.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartEntry {
    pub chart: Chart,
    pub path: PathBuf,
}

/// The charts of one song, usually the difficulties found in one song
/// collection folder.
#[derive(Debug, Clone, PartialEq)]
pub struct SongGroup {
    /// The folder holding the charts.
    pub folder_hash: Md5Hash,
    /// Title of the first chart.
    pub name: String,
    /// Subtitle of the first chart.
    pub name2: String,
    pub charts: Vec<ChartEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrowseEntry {
    /// A container folder. Its entries are empty unless browsed recursively.
    Folder(FolderView),
    Songs(SongGroup),
}

/// A listing: the children of a folder, or a list of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderView {
    pub hash: Md5Hash,
    pub name: String,
    pub path: PathBuf,
    pub entries: Vec<BrowseEntry>,
}

impl FolderView {
    /// All song groups in this view, including those of expanded sub-folders.
    pub fn song_groups(&self) -> Vec<&SongGroup> {
        let mut groups = Vec::new();
        for entry in &self.entries {
            match entry {
                BrowseEntry::Songs(group) => groups.push(group),
                BrowseEntry::Folder(view) => groups.extend(view.song_groups()),
            }
        }
        groups
    }

    /// Total number of charts in this view and its expanded sub-folders.
    pub fn chart_count(&self) -> usize {
        self.song_groups().iter().map(|g| g.charts.len()).sum()
    }
}

fn require_folder(conn: &Connection, hash: &Md5Hash) -> Result<Folder, CatalogError> {
    get_folder_by_hash(conn, hash)?.ok_or_else(|| CatalogError::FolderNotFound(hash.clone()))
}

fn chart_entry(chart: Chart, folder_path: &std::path::Path) -> ChartEntry {
    let path = chart.resolve_path(folder_path);
    ChartEntry { chart, path }
}

/// List the children of `hash`.
///
/// Song collection children become song groups (omitted when empty). Container
/// children are listed as folders and, with `recursive`, expanded in place. If
/// `hash` is itself a song collection, its own charts are listed.
pub fn browse(conn: &Connection, hash: &Md5Hash, recursive: bool) -> Result<FolderView, CatalogError> {
    let folder = require_folder(conn, hash)?;
    folder_view(conn, folder, recursive)
}

fn folder_view(conn: &Connection, folder: Folder, recursive: bool) -> Result<FolderView, CatalogError> {
    let mut entries = Vec::new();
    if folder.category == FolderCategory::SongCollection {
        entries.extend(song_group(conn, &folder)?.map(BrowseEntry::Songs));
    }
    for child in list_children(conn, &folder.path_hash)? {
        match child.category {
            FolderCategory::SongCollection => {
                entries.extend(song_group(conn, &child)?.map(BrowseEntry::Songs));
            }
            _ if recursive => entries.push(BrowseEntry::Folder(folder_view(conn, child, true)?)),
            _ => entries.push(BrowseEntry::Folder(FolderView {
                hash: child.path_hash,
                name: child.name,
                path: child.path,
                entries: Vec::new(),
            })),
        }
    }
    Ok(FolderView {
        hash: folder.path_hash,
        name: folder.name,
        path: folder.path,
        entries,
    })
}

fn song_group(conn: &Connection, folder: &Folder) -> Result<Option<SongGroup>, CatalogError> {
    let charts = find_charts_by_parent(conn, &folder.path_hash)?;
    let Some(first) = charts.first() else {
        return Ok(None);
    };
    let name = first.metadata.title.clone();
    let name2 = first.metadata.title2.clone();
    Ok(Some(SongGroup {
        folder_hash: folder.path_hash.clone(),
        name,
        name2,
        charts: charts
            .into_iter()
            .map(|c| chart_entry(c, &folder.path))
            .collect(),
    }))
}

/// The song group of a single folder. An empty group if the folder holds no
/// charts.
pub fn browse_song(conn: &Connection, hash: &Md5Hash) -> Result<SongGroup, CatalogError> {
    let folder = require_folder(conn, hash)?;
    Ok(song_group(conn, &folder)?.unwrap_or_else(|| SongGroup {
        folder_hash: folder.path_hash,
        name: String::new(),
        name2: String::new(),
        charts: Vec::new(),
    }))
}

/// Keyword search, globally or among the direct charts of `scope`.
///
/// Each hit is its own song group. The returned view is keyed by the hash of
/// the keyword and named after it.
pub fn search(
    conn: &Connection,
    scope: Option<&Md5Hash>,
    keyword: &str,
    limit: u32,
) -> Result<FolderView, CatalogError> {
    if let Some(hash) = scope {
        require_folder(conn, hash)?;
    }
    let charts = search_charts(conn, keyword, scope, limit)?;

    let mut paths: HashMap<Md5Hash, PathBuf> = HashMap::new();
    let mut entries = Vec::with_capacity(charts.len());
    for chart in charts {
        if !paths.contains_key(&chart.parent_hash) {
            let path = folder_path(conn, &chart.parent_hash)?.unwrap_or_default();
            paths.insert(chart.parent_hash.clone(), path);
        }
        let dir = paths.get(&chart.parent_hash).cloned().unwrap_or_default();
        let group = SongGroup {
            folder_hash: chart.parent_hash.clone(),
            name: chart.metadata.title.clone(),
            name2: chart.metadata.title2.clone(),
            charts: vec![chart_entry(chart, &dir)],
        };
        entries.push(BrowseEntry::Songs(group));
    }

    Ok(FolderView {
        hash: hash_str(keyword),
        name: keyword.to_string(),
        path: PathBuf::new(),
        entries,
    })
}
