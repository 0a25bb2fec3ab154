//! Write operations for folders and charts.

use chart_catalog_core::{Chart, Folder, Md5Hash};
use rusqlite::{Connection, params};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Entity not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },
    #[error("The root folder cannot be removed")]
    RootFolder,
}

/// Subtree of a folder (inclusive), used by the tree deletes below.
const SUBTREE_CTE: &str = "WITH RECURSIVE subtree(hash) AS (
         SELECT ?1
         UNION ALL
         SELECT f.path_hash FROM folders f JOIN subtree s ON f.parent_hash = s.hash
     )";

// ── Folder Operations ───────────────────────────────────────────────────────

/// Insert or update a folder.
pub fn upsert_folder(conn: &Connection, folder: &Folder) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO folders (path_hash, parent_hash, name, category, path, modified_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(path_hash) DO UPDATE SET
             parent_hash = excluded.parent_hash,
             name = excluded.name,
             category = excluded.category,
             path = excluded.path,
             modified_at = excluded.modified_at",
        params![
            folder.path_hash.as_str(),
            folder.parent_hash.as_ref().map(Md5Hash::as_str),
            folder.name,
            folder.category.as_i64(),
            folder.path.to_string_lossy(),
            folder.modified_at,
        ],
    )?;
    Ok(())
}

/// Record a new modification time for a folder.
pub fn update_folder_modified(
    conn: &Connection,
    path_hash: &Md5Hash,
    modified_at: i64,
) -> Result<(), OperationError> {
    let changed = conn.execute(
        "UPDATE folders SET modified_at = ?2 WHERE path_hash = ?1",
        params![path_hash.as_str(), modified_at],
    )?;
    if changed == 0 {
        return Err(OperationError::NotFound {
            entity_type: "folder".to_string(),
            id: path_hash.to_string(),
        });
    }
    Ok(())
}

/// Delete a single folder row, optionally with the charts it holds.
///
/// Without `cascade_charts` the delete fails on the foreign key if the folder
/// still owns charts or subfolders. Returns whether a row was removed.
pub fn delete_folder(
    conn: &Connection,
    path_hash: &Md5Hash,
    cascade_charts: bool,
) -> Result<bool, OperationError> {
    if path_hash.is_root() {
        return Err(OperationError::RootFolder);
    }
    let tx = conn.unchecked_transaction()?;
    if cascade_charts {
        tx.execute(
            "DELETE FROM charts WHERE parent_hash = ?1",
            params![path_hash.as_str()],
        )?;
    }
    let removed = tx.execute(
        "DELETE FROM folders WHERE path_hash = ?1",
        params![path_hash.as_str()],
    )?;
    tx.commit()?;
    Ok(removed > 0)
}

/// Delete a folder, every folder below it, and all of their charts.
///
/// Returns the number of folder rows removed.
pub fn delete_folder_tree(conn: &Connection, path_hash: &Md5Hash) -> Result<usize, OperationError> {
    if path_hash.is_root() {
        return Err(OperationError::RootFolder);
    }
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        &format!("{SUBTREE_CTE} DELETE FROM charts WHERE parent_hash IN (SELECT hash FROM subtree)"),
        params![path_hash.as_str()],
    )?;
    let removed = tx.execute(
        &format!("{SUBTREE_CTE} DELETE FROM folders WHERE path_hash IN (SELECT hash FROM subtree)"),
        params![path_hash.as_str()],
    )?;
    tx.commit()?;
    Ok(removed)
}

// ── Chart Operations ────────────────────────────────────────────────────────

/// Insert or update a chart, keyed by `(parent_hash, file_name)`.
pub fn upsert_chart(conn: &Connection, chart: &Chart) -> Result<(), OperationError> {
    let m = &chart.metadata;
    conn.execute(
        "INSERT INTO charts (content_hash, parent_hash, file_name, format,
             title, title2, artist, artist2, genre, version,
             level, start_bpm, min_bpm, max_bpm, length_seconds,
             total_notes, regular_notes, long_notes, stage_file, banner,
             game_mode, judge_rank, total, play_level, difficulty,
             has_long_notes, has_mines, has_metric_mod, has_stops, has_bga, has_random,
             added_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32)
         ON CONFLICT(parent_hash, file_name) DO UPDATE SET
             content_hash = excluded.content_hash,
             format = excluded.format,
             title = excluded.title,
             title2 = excluded.title2,
             artist = excluded.artist,
             artist2 = excluded.artist2,
             genre = excluded.genre,
             version = excluded.version,
             level = excluded.level,
             start_bpm = excluded.start_bpm,
             min_bpm = excluded.min_bpm,
             max_bpm = excluded.max_bpm,
             length_seconds = excluded.length_seconds,
             total_notes = excluded.total_notes,
             regular_notes = excluded.regular_notes,
             long_notes = excluded.long_notes,
             stage_file = excluded.stage_file,
             banner = excluded.banner,
             game_mode = excluded.game_mode,
             judge_rank = excluded.judge_rank,
             total = excluded.total,
             play_level = excluded.play_level,
             difficulty = excluded.difficulty,
             has_long_notes = excluded.has_long_notes,
             has_mines = excluded.has_mines,
             has_metric_mod = excluded.has_metric_mod,
             has_stops = excluded.has_stops,
             has_bga = excluded.has_bga,
             has_random = excluded.has_random,
             added_at = excluded.added_at",
        params![
            chart.content_hash.as_str(),
            chart.parent_hash.as_str(),
            chart.file_name,
            m.format.tag(),
            m.title,
            m.title2,
            m.artist,
            m.artist2,
            m.genre,
            m.version,
            m.level,
            m.start_bpm,
            m.min_bpm,
            m.max_bpm,
            m.length_seconds,
            m.notes.total,
            m.notes.regular,
            m.notes.long,
            m.stage_file,
            m.banner,
            m.details.game_mode,
            m.details.judge_rank,
            m.details.total,
            m.details.play_level,
            m.details.difficulty,
            m.features.long_notes,
            m.features.mines,
            m.features.metric_mod,
            m.features.stops,
            m.features.bga,
            m.features.random,
            chart.added_at,
        ],
    )?;
    Ok(())
}

/// Delete the chart at `(parent_hash, file_name)`. Returns whether a row was removed.
pub fn delete_chart(
    conn: &Connection,
    parent_hash: &Md5Hash,
    file_name: &str,
) -> Result<bool, OperationError> {
    let removed = conn.execute(
        "DELETE FROM charts WHERE parent_hash = ?1 AND file_name = ?2",
        params![parent_hash.as_str(), file_name],
    )?;
    Ok(removed > 0)
}

/// Delete every occurrence of a chart by content hash. Returns the number removed.
pub fn delete_chart_by_hash(
    conn: &Connection,
    content_hash: &Md5Hash,
) -> Result<usize, OperationError> {
    let removed = conn.execute(
        "DELETE FROM charts WHERE content_hash = ?1",
        params![content_hash.as_str()],
    )?;
    Ok(removed)
}
