use std::path::PathBuf;

use chart_catalog_core::*;
use chart_catalog_db::*;
use rusqlite::Connection;

fn song_folder(conn: &Connection, path: &str) -> Md5Hash {
    let folder = Folder {
        path_hash: hash_str(path),
        parent_hash: Some(Md5Hash::root()),
        name: path.to_string(),
        category: FolderCategory::SongCollection,
        path: PathBuf::from(path),
        modified_at: 0,
    };
    upsert_folder(conn, &folder).unwrap();
    folder.path_hash
}

fn add_chart(conn: &Connection, parent: &Md5Hash, file_name: &str, title: &str, artist: &str) {
    let mut metadata = ChartMetadata::new(ChartFormat::Bmson)
        .with_title(title)
        .with_artist(artist);
    metadata.genre = "TECHNO".to_string();
    let chart = Chart {
        content_hash: hash_str(&format!("{file_name}:{title}")),
        parent_hash: parent.clone(),
        file_name: file_name.to_string(),
        metadata,
        added_at: 0,
    };
    upsert_chart(conn, &chart).unwrap();
}

fn titles(charts: &[Chart]) -> Vec<&str> {
    charts.iter().map(|c| c.metadata.title.as_str()).collect()
}

#[test]
fn list_children_and_parent_lookup() {
    let conn = open_memory().unwrap();
    let a = song_folder(&conn, "/songs/b-pack");
    let b = song_folder(&conn, "/songs/a-pack");

    let children = list_children(&conn, &Md5Hash::root()).unwrap();
    let names: Vec<&str> = children.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["/songs/a-pack", "/songs/b-pack"]);

    assert_eq!(folder_parent(&conn, &a).unwrap(), Some(Md5Hash::root()));
    assert_eq!(folder_parent(&conn, &Md5Hash::root()).unwrap(), None);
    assert_eq!(
        folder_path(&conn, &b).unwrap(),
        Some(PathBuf::from("/songs/a-pack"))
    );
    assert_eq!(folder_path(&conn, &hash_str("/missing")).unwrap(), None);
}

#[test]
fn find_by_content_hash_returns_all_occurrences() {
    let conn = open_memory().unwrap();
    let a = song_folder(&conn, "/a");
    let b = song_folder(&conn, "/b");
    add_chart(&conn, &a, "x.bmson", "Same", "DJ");
    add_chart(&conn, &b, "x.bmson", "Same", "DJ");

    let found = find_charts_by_content_hash(&conn, &hash_str("x.bmson:Same")).unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|c| c.metadata.format == ChartFormat::Bmson));
}

#[test]
fn search_matches_any_text_field_case_insensitive() {
    let conn = open_memory().unwrap();
    let a = song_folder(&conn, "/a");
    add_chart(&conn, &a, "1.bms", "Freedom Dive", "xi");
    add_chart(&conn, &a, "2.bms", "Other", "Freedom Writers");
    add_chart(&conn, &a, "3.bms", "Unrelated", "nobody");

    let found = search_charts(&conn, "FREEDOM", None, 0).unwrap();
    assert_eq!(titles(&found), vec!["Freedom Dive", "Other"]);

    // genre matches too
    assert_eq!(search_charts(&conn, "techno", None, 0).unwrap().len(), 3);
}

#[test]
fn search_folds_ascii_case_only() {
    let conn = open_memory().unwrap();
    let a = song_folder(&conn, "/a");
    add_chart(&conn, &a, "1.bms", "Étoile", "x");

    assert_eq!(search_charts(&conn, "ÉTOILE", None, 0).unwrap().len(), 1);
    assert_eq!(search_charts(&conn, "éTOILE", None, 0).unwrap().len(), 0);
}

#[test]
fn search_respects_scope_and_limit() {
    let conn = open_memory().unwrap();
    let a = song_folder(&conn, "/a");
    let b = song_folder(&conn, "/b");
    add_chart(&conn, &a, "1.bms", "Alpha", "x");
    add_chart(&conn, &b, "1.bms", "Alpha Two", "x");

    assert_eq!(search_charts(&conn, "alpha", None, 0).unwrap().len(), 2);
    let scoped = search_charts(&conn, "alpha", Some(&b), 0).unwrap();
    assert_eq!(titles(&scoped), vec!["Alpha Two"]);
    assert_eq!(search_charts(&conn, "alpha", None, 1).unwrap().len(), 1);
}

#[test]
fn search_treats_wildcards_literally() {
    let conn = open_memory().unwrap();
    let a = song_folder(&conn, "/a");
    add_chart(&conn, &a, "1.bms", "100% Sync", "x");
    add_chart(&conn, &a, "2.bms", "1000 Sync", "x");
    add_chart(&conn, &a, "3.bms", "snake_case", "x");
    add_chart(&conn, &a, "4.bms", "snakeXcase", "x");
    add_chart(&conn, &a, "5.bms", "back\\slash", "x");

    assert_eq!(titles(&search_charts(&conn, "100%", None, 0).unwrap()), vec!["100% Sync"]);
    assert_eq!(titles(&search_charts(&conn, "e_c", None, 0).unwrap()), vec!["snake_case"]);
    assert_eq!(titles(&search_charts(&conn, "k\\s", None, 0).unwrap()), vec!["back\\slash"]);
    assert!(search_charts(&conn, "%", None, 0).unwrap().iter().all(|c| c.metadata.title.contains('%')));
}

#[test]
fn escape_like_escapes_metacharacters() {
    assert_eq!(escape_like("a%b_c\\d"), "a\\%b\\_c\\\\d");
    assert_eq!(escape_like("plain"), "plain");
}

#[test]
fn unknown_format_tag_is_rejected() {
    let conn = open_memory().unwrap();
    let a = song_folder(&conn, "/a");
    add_chart(&conn, &a, "1.bms", "Alpha", "x");
    conn.execute("UPDATE charts SET format = 99", []).unwrap();
    assert!(find_charts_by_parent(&conn, &a).is_err());
}

#[test]
fn stats_exclude_root() {
    let conn = open_memory().unwrap();
    assert_eq!(catalog_stats(&conn).unwrap(), CatalogStats::default());

    let a = song_folder(&conn, "/a");
    let b = song_folder(&conn, "/b");
    add_chart(&conn, &a, "1.bms", "Same", "x");
    add_chart(&conn, &b, "1.bms", "Same", "x");
    add_chart(&conn, &b, "2.bms", "Diff", "x");

    let stats = catalog_stats(&conn).unwrap();
    assert_eq!(stats.folders, 2);
    assert_eq!(stats.song_collections, 2);
    assert_eq!(stats.charts, 3);
    assert_eq!(stats.distinct_contents, 2);
}
