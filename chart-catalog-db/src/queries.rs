//! Read queries for the catalog database.
//!
//! Provides lookup by hash, path, and parent, keyword search, and counts.

use std::path::{Path, PathBuf};

use chart_catalog_core::*;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::operations::OperationError;

const FOLDER_COLUMNS: &str = "path_hash, parent_hash, name, category, path, modified_at";

const CHART_COLUMNS: &str = "content_hash, parent_hash, file_name, format,
        title, title2, artist, artist2, genre, version,
        level, start_bpm, min_bpm, max_bpm, length_seconds,
        total_notes, regular_notes, long_notes, stage_file, banner,
        game_mode, judge_rank, total, play_level, difficulty,
        has_long_notes, has_mines, has_metric_mod, has_stops, has_bga, has_random,
        added_at";

/// Escape character used by [`search_charts`] patterns.
pub const LIKE_ESCAPE: char = '\\';

// ── Folder Lookups ──────────────────────────────────────────────────────────

/// Find a folder by its path hash.
pub fn get_folder_by_hash(
    conn: &Connection,
    path_hash: &Md5Hash,
) -> Result<Option<Folder>, OperationError> {
    let folder = conn
        .query_row(
            &format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE path_hash = ?1"),
            params![path_hash.as_str()],
            row_to_folder,
        )
        .optional()?;
    Ok(folder)
}

/// Find a folder by its stored (normalized) path.
pub fn get_folder_by_path(conn: &Connection, path: &Path) -> Result<Option<Folder>, OperationError> {
    let folder = conn
        .query_row(
            &format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE path = ?1"),
            params![path.to_string_lossy()],
            row_to_folder,
        )
        .optional()?;
    Ok(folder)
}

/// List the direct children of a folder, ordered by name.
pub fn list_children(
    conn: &Connection,
    parent_hash: &Md5Hash,
) -> Result<Vec<Folder>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FOLDER_COLUMNS} FROM folders WHERE parent_hash = ?1 ORDER BY name, path"
    ))?;
    let rows = stmt.query_map(params![parent_hash.as_str()], row_to_folder)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// The stored path of a folder, if it exists.
pub fn folder_path(conn: &Connection, path_hash: &Md5Hash) -> Result<Option<PathBuf>, OperationError> {
    let path: Option<String> = conn
        .query_row(
            "SELECT path FROM folders WHERE path_hash = ?1",
            params![path_hash.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(path.map(PathBuf::from))
}

/// The parent hash of a folder. `Ok(None)` if the folder is missing or is the root.
pub fn folder_parent(
    conn: &Connection,
    path_hash: &Md5Hash,
) -> Result<Option<Md5Hash>, OperationError> {
    Ok(get_folder_by_hash(conn, path_hash)?.and_then(|f| f.parent_hash))
}

// ── Chart Lookups ───────────────────────────────────────────────────────────

/// Find the chart at `(parent_hash, file_name)`.
pub fn find_chart(
    conn: &Connection,
    parent_hash: &Md5Hash,
    file_name: &str,
) -> Result<Option<Chart>, OperationError> {
    let chart = conn
        .query_row(
            &format!("SELECT {CHART_COLUMNS} FROM charts WHERE parent_hash = ?1 AND file_name = ?2"),
            params![parent_hash.as_str(), file_name],
            row_to_chart,
        )
        .optional()?;
    Ok(chart)
}

/// Find every occurrence of a chart by content hash.
pub fn find_charts_by_content_hash(
    conn: &Connection,
    content_hash: &Md5Hash,
) -> Result<Vec<Chart>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CHART_COLUMNS} FROM charts WHERE content_hash = ?1 ORDER BY parent_hash, file_name"
    ))?;
    let rows = stmt.query_map(params![content_hash.as_str()], row_to_chart)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// List the charts held by a folder, ordered by file name.
pub fn find_charts_by_parent(
    conn: &Connection,
    parent_hash: &Md5Hash,
) -> Result<Vec<Chart>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CHART_COLUMNS} FROM charts WHERE parent_hash = ?1 ORDER BY file_name"
    ))?;
    let rows = stmt.query_map(params![parent_hash.as_str()], row_to_chart)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Escape LIKE metacharacters so `keyword` matches literally.
pub fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Search charts by keyword across title, title2, artist, artist2, genre and
/// version (case-insensitive substring).
///
/// SQLite's `LIKE` only folds ASCII letters, so accented or full-width
/// characters must match case exactly.
///
/// With `scope`, only charts directly inside that folder are considered.
/// A `limit` of 0 means no limit.
pub fn search_charts(
    conn: &Connection,
    keyword: &str,
    scope: Option<&Md5Hash>,
    limit: u32,
) -> Result<Vec<Chart>, OperationError> {
    let pattern = format!("%{}%", escape_like(keyword));
    let limit: i64 = if limit == 0 { -1 } else { i64::from(limit) };
    let mut stmt = conn.prepare(&format!(
        "SELECT {CHART_COLUMNS} FROM charts
         WHERE (?1 IS NULL OR parent_hash = ?1)
           AND (title LIKE ?2 ESCAPE '\\'
             OR title2 LIKE ?2 ESCAPE '\\'
             OR artist LIKE ?2 ESCAPE '\\'
             OR artist2 LIKE ?2 ESCAPE '\\'
             OR genre LIKE ?2 ESCAPE '\\'
             OR version LIKE ?2 ESCAPE '\\')
         ORDER BY title, parent_hash, file_name
         LIMIT ?3"
    ))?;
    let rows = stmt.query_map(
        params![scope.map(Md5Hash::as_str), pattern, limit],
        row_to_chart,
    )?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

// ── Stats ───────────────────────────────────────────────────────────────────

/// Row counts for the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Folders excluding the root sentinel.
    pub folders: i64,
    pub song_collections: i64,
    pub charts: i64,
    pub distinct_contents: i64,
}

pub fn catalog_stats(conn: &Connection) -> Result<CatalogStats, OperationError> {
    let (folders, song_collections): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(category = ?2), 0) FROM folders WHERE category != ?1",
        params![
            FolderCategory::Root.as_i64(),
            FolderCategory::SongCollection.as_i64()
        ],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let (charts, distinct_contents): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT content_hash) FROM charts",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(CatalogStats {
        folders,
        song_collections,
        charts,
        distinct_contents,
    })
}

// ── Row Mapping Helpers ─────────────────────────────────────────────────────

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn hash_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Md5Hash> {
    let hex: String = row.get(idx)?;
    Md5Hash::from_hex(&hex).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn row_to_folder(row: &Row<'_>) -> rusqlite::Result<Folder> {
    let parent_hash = match row.get::<_, Option<String>>(1)? {
        Some(hex) => Some(Md5Hash::from_hex(&hex).map_err(|e| conversion_error(1, Type::Text, e))?),
        None => None,
    };
    let category = FolderCategory::from_i64(row.get(3)?)
        .map_err(|e| conversion_error(3, Type::Integer, e))?;
    Ok(Folder {
        path_hash: hash_column(row, 0)?,
        parent_hash,
        name: row.get(2)?,
        category,
        path: PathBuf::from(row.get::<_, String>(4)?),
        modified_at: row.get(5)?,
    })
}

fn row_to_chart(row: &Row<'_>) -> rusqlite::Result<Chart> {
    let format = ChartFormat::from_tag(row.get(3)?)
        .map_err(|e| conversion_error(3, Type::Integer, e))?;
    let metadata = ChartMetadata {
        format,
        title: row.get(4)?,
        title2: row.get(5)?,
        artist: row.get(6)?,
        artist2: row.get(7)?,
        genre: row.get(8)?,
        version: row.get(9)?,
        level: row.get(10)?,
        start_bpm: row.get(11)?,
        min_bpm: row.get(12)?,
        max_bpm: row.get(13)?,
        length_seconds: row.get(14)?,
        notes: NoteCounts {
            total: row.get(15)?,
            regular: row.get(16)?,
            long: row.get(17)?,
        },
        stage_file: row.get(18)?,
        banner: row.get(19)?,
        details: PlayDetails {
            game_mode: row.get(20)?,
            judge_rank: row.get(21)?,
            total: row.get(22)?,
            play_level: row.get(23)?,
            difficulty: row.get(24)?,
        },
        features: ChartFeatures {
            long_notes: row.get(25)?,
            mines: row.get(26)?,
            metric_mod: row.get(27)?,
            stops: row.get(28)?,
            bga: row.get(29)?,
            random: row.get(30)?,
        },
    };
    Ok(Chart {
        content_hash: hash_column(row, 0)?,
        parent_hash: hash_column(row, 1)?,
        file_name: row.get(2)?,
        metadata,
        added_at: row.get(31)?,
    })
}
