mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chart_catalog_core::{FolderCategory, hash_file};
use chart_catalog_lib::*;
use common::*;

fn root() -> Md5Hash {
    Md5Hash::root()
}

fn category_of(catalog: &Catalog, dir: &std::path::Path) -> Option<FolderCategory> {
    let hash = Catalog::folder_hash(dir).unwrap();
    let parent = catalog.folder_parent(&hash).ok()??;
    let siblings = catalog.browse(&parent, false).unwrap();
    siblings.entries.iter().find_map(|entry| match entry {
        BrowseEntry::Folder(view) if view.hash == hash => Some(FolderCategory::Container),
        BrowseEntry::Songs(group) if group.folder_hash == hash => {
            Some(FolderCategory::SongCollection)
        }
        _ => None,
    })
}

#[test]
fn scenario_add_then_delete_file() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let r = tmp.path().join("R");
    let a = r.join("A");
    write_chart(&a, "x.bms", "X");
    let y = write_chart(&a, "y.bms", "Y");

    let report = catalog.add_folder(&r, &root()).unwrap();
    assert_eq!(report.imported, 2);
    assert_eq!(report.added, 2);
    assert_eq!(report.folders_added, 2);
    assert_eq!(category_of(&catalog, &a), Some(FolderCategory::SongCollection));
    assert_eq!(category_of(&catalog, &r), Some(FolderCategory::Container));

    std::fs::remove_file(&y).unwrap();
    let report = catalog.add_folder(&r, &root()).unwrap();
    assert_eq!(report.imported, 0);
    assert_eq!(report.removed, 1);

    let group = catalog
        .browse_song(&Catalog::folder_hash(&a).unwrap())
        .unwrap();
    let names: Vec<_> = group.charts.iter().map(|c| c.chart.file_name.as_str()).collect();
    assert_eq!(names, vec!["x.bms"]);
    assert_eq!(group.charts[0].path, a.join("x.bms"));
}

#[test]
fn second_sync_is_a_no_op() {
    let (catalog, parser) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("A");
    write_chart(&a, "x.bms", "X");
    write_chart(&a, "y.bme", "Y");

    catalog.add_folder(tmp.path(), &root()).unwrap();
    let before = catalog.browse(&root(), true).unwrap();
    let calls = parser.calls();

    let report = catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(report.imported, 0);
    assert_eq!(report.submitted, 0);
    assert_eq!(report.unchanged, 2);
    assert_eq!(report.folders_added, 0);
    assert_eq!(parser.calls(), calls);
    assert_eq!(catalog.browse(&root(), true).unwrap(), before);
}

#[test]
fn rewritten_file_replaces_its_record() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("A");
    let x = write_chart(&a, "x.bms", "Old");
    write_chart(&a, "y.bms", "Sibling");

    catalog.add_folder(tmp.path(), &root()).unwrap();
    let a_hash = Catalog::folder_hash(&a).unwrap();
    let old = catalog.browse_song(&a_hash).unwrap().charts[0].chart.clone();

    write_chart(&a, "x.bms", "New");
    let report = catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(report.submitted, 1);
    assert_eq!(report.replaced, 1);
    assert_eq!(report.imported, 1);

    let group = catalog.browse_song(&a_hash).unwrap();
    let records: Vec<_> = group
        .charts
        .iter()
        .filter(|c| c.chart.file_name == "x.bms")
        .collect();
    assert_eq!(records.len(), 1);
    let new = &records[0].chart;
    assert_eq!(new.content_hash, hash_file(&x).unwrap());
    assert_ne!(new.content_hash, old.content_hash);
    assert_eq!(new.metadata.title, "New");
    assert!(new.added_at >= old.added_at);
    assert!(catalog.find_by_content_hash(&old.content_hash).unwrap().is_empty());
}

#[test]
fn deleted_file_is_removed_without_touching_siblings() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("A");
    let gone = write_chart(&a, "gone.bms", "Gone");
    let kept = write_chart(&a, "kept.bms", "Kept");

    catalog.add_folder(tmp.path(), &root()).unwrap();
    let kept_before = catalog
        .find_by_content_hash(&hash_file(&kept).unwrap())
        .unwrap();

    std::fs::remove_file(&gone).unwrap();
    let report = catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(report.submitted, 0);

    let kept_after = catalog
        .find_by_content_hash(&hash_file(&kept).unwrap())
        .unwrap();
    assert_eq!(kept_after, kept_before);
    assert_eq!(catalog.stats().unwrap().charts, 1);
}

#[test]
fn container_gaining_a_chart_is_reanalysed() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("A");
    let b = a.join("B");
    write_chart(&b, "deep.bms", "Deep");

    catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(category_of(&catalog, &a), Some(FolderCategory::Container));
    let b_hash = Catalog::folder_hash(&b).unwrap();
    assert!(catalog.folder_path(&b_hash).is_ok());

    write_chart(&a, "top.bms", "Top");
    let report = catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(report.folders_removed, 2);
    assert_eq!(report.added, 1);

    assert_eq!(category_of(&catalog, &a), Some(FolderCategory::SongCollection));
    assert!(matches!(
        catalog.folder_path(&b_hash),
        Err(CatalogError::FolderNotFound(_))
    ));
    // The old subtree's chart went with it.
    assert_eq!(catalog.stats().unwrap().charts, 1);
    let a_hash = Catalog::folder_hash(&a).unwrap();
    assert_eq!(
        catalog.folder_parent(&a_hash).unwrap(),
        Some(Catalog::folder_hash(tmp.path()).unwrap())
    );
}

#[test]
fn one_new_file_causes_one_import() {
    let (catalog, parser) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("A");
    for i in 0..5 {
        write_chart(&a, &format!("{i}.bms"), &format!("Chart {i}"));
    }
    catalog.add_folder(tmp.path(), &root()).unwrap();
    let calls = parser.calls();

    write_chart(&a, "new.bms", "New");
    let report = catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(report.submitted, 1);
    assert_eq!(report.added, 1);
    assert_eq!(report.unchanged, 5);
    assert_eq!(parser.calls(), calls + 1);
}

#[test]
fn every_folder_chains_up_to_the_root() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let dirs = [
        tmp.path().join("a"),
        tmp.path().join("a/b"),
        tmp.path().join("a/b/c"),
        tmp.path().join("a/d"),
        tmp.path().join("e"),
    ];
    write_chart(&dirs[2], "c.bms", "C");
    write_chart(&dirs[3], "d.bms", "D");
    mkdir(&dirs[4]);

    catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(catalog.stats().unwrap().folders, 6);

    for dir in &dirs {
        let mut hash = Catalog::folder_hash(dir).unwrap();
        let mut steps = 0;
        while let Some(parent) = catalog.folder_parent(&hash).unwrap() {
            hash = parent;
            steps += 1;
            assert!(steps < 10, "cycle above {}", dir.display());
        }
        assert!(hash.is_root());
    }
}

#[test]
fn vanished_subfolder_is_pruned() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("A");
    let b = tmp.path().join("B");
    write_chart(&a, "a.bms", "A");
    write_chart(&b, "b.bms", "B");
    catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(catalog.stats().unwrap().charts, 2);

    std::fs::remove_dir_all(&b).unwrap();
    let report = catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(report.folders_removed, 1);

    let stats = catalog.stats().unwrap();
    assert_eq!(stats.charts, 1);
    assert_eq!(stats.song_collections, 1);
}

#[test]
fn missing_path_is_rejected_without_changes() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();

    let err = catalog
        .add_folder(&tmp.path().join("nope"), &root())
        .unwrap_err();
    assert!(matches!(err, CatalogError::PathNotFound(_)));

    let file = write_chart(tmp.path(), "loose.bms", "Loose");
    let err = catalog.add_folder(&file, &root()).unwrap_err();
    assert!(matches!(err, CatalogError::NotADirectory(_)));

    assert_eq!(catalog.stats().unwrap(), CatalogStats::default());
}

#[test]
fn unknown_parent_is_rejected() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let bogus = chart_catalog_core::hash_str("not a folder");
    let err = catalog.add_folder(tmp.path(), &bogus).unwrap_err();
    assert!(matches!(err, CatalogError::FolderNotFound(_)));
}

#[test]
fn broken_chart_is_skipped() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("A");
    write_chart(&a, "good.bms", "Good");
    std::fs::write(a.join("bad.bms"), format!("{BROKEN}\n")).unwrap();

    let report = catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(report.submitted, 2);
    assert_eq!(report.added, 1);
    assert_eq!(report.failed, 1);

    let group = catalog
        .browse_song(&Catalog::folder_hash(&a).unwrap())
        .unwrap();
    assert_eq!(group.charts.len(), 1);
    assert_eq!(group.charts[0].chart.file_name, "good.bms");
}

#[test]
fn non_chart_files_do_not_make_a_song_collection() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let a = mkdir(&tmp.path().join("A"));
    std::fs::write(a.join("readme.txt"), "hello").unwrap();
    std::fs::write(a.join("cover.png"), [0u8; 4]).unwrap();

    let report = catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(report.submitted, 0);
    assert_eq!(category_of(&catalog, &a), Some(FolderCategory::Container));
}

#[test]
fn trailing_separator_and_dots_name_the_same_folder() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("A");
    write_chart(&a, "x.bms", "X");

    catalog.add_folder(&a, &root()).unwrap();
    let dotted = tmp.path().join("A").join(".").join("..").join("A");
    let report = catalog.add_folder(&dotted, &root()).unwrap();
    assert_eq!(report.folders_added, 0);
    assert_eq!(report.imported, 0);

    let trailing = std::path::PathBuf::from(format!("{}/", a.display()));
    assert_eq!(
        Catalog::folder_hash(&trailing).unwrap(),
        Catalog::folder_hash(&a).unwrap()
    );
    assert_eq!(catalog.stats().unwrap().folders, 1);
}

struct CountingProgress {
    folders: AtomicUsize,
    charts: AtomicUsize,
    completed: AtomicUsize,
}

impl SyncProgress for CountingProgress {
    fn on_folder(&self, _path: &std::path::Path, _category: FolderCategory) {
        self.folders.fetch_add(1, Ordering::SeqCst);
    }

    fn on_chart(&self, _path: &std::path::Path, _outcome: ImportOutcome) {
        self.charts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_complete(&self, _report: &SyncReport) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn progress_sees_every_folder_and_chart() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    write_chart(&tmp.path().join("A"), "1.bms", "One");
    write_chart(&tmp.path().join("A"), "2.bms", "Two");
    write_chart(&tmp.path().join("B"), "3.bmson", "Three");

    let progress = Arc::new(CountingProgress {
        folders: AtomicUsize::new(0),
        charts: AtomicUsize::new(0),
        completed: AtomicUsize::new(0),
    });
    let report = catalog
        .add_folder_with_progress(tmp.path(), &root(), progress.clone())
        .unwrap();
    assert_eq!(progress.folders.load(Ordering::SeqCst), 3);
    assert_eq!(progress.charts.load(Ordering::SeqCst), report.submitted);
    assert_eq!(progress.completed.load(Ordering::SeqCst), 1);

    // The logging reporter must accept the same events.
    catalog
        .add_folder_with_progress(tmp.path(), &root(), Arc::new(LogProgress))
        .unwrap();
}

#[test]
fn catalog_persists_across_reopen() {
    init_logging();
    let tmp = tempfile::tempdir().unwrap();
    let songs = tmp.path().join("songs");
    write_chart(&songs.join("A"), "x.bms", "X");
    let db = tmp.path().join("db").join("catalog.db");

    let parser = Arc::new(StubParser::default());
    {
        let catalog = Catalog::open(&db, parser.clone(), 2).unwrap();
        catalog.add_folder(&songs, &root()).unwrap();
    }
    let catalog = Catalog::open(&db, parser, 1).unwrap();
    let stats = catalog.stats().unwrap();
    assert_eq!(stats.folders, 2);
    assert_eq!(stats.charts, 1);

    let report = catalog.add_folder(&songs, &root()).unwrap();
    assert_eq!(report.imported, 0);
}

#[test]
fn catalog_from_settings_uses_configured_values() {
    init_logging();
    let tmp = tempfile::tempdir().unwrap();
    let settings = CatalogSettings {
        database_path: Some(tmp.path().join("catalog.db")),
        import_threads: Some(3),
        search_limit: 7,
    };
    let catalog = Catalog::from_settings(&settings, Arc::new(StubParser::default())).unwrap();
    assert_eq!(catalog.workers(), 3);
    assert_eq!(catalog.search_limit(), 7);
    assert!(tmp.path().join("catalog.db").exists());
}

#[test]
fn song_collection_losing_its_charts_becomes_a_container() {
    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("A");
    let old = write_chart(&a, "old.bms", "Old");
    catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(category_of(&catalog, &a), Some(FolderCategory::SongCollection));

    std::fs::remove_file(&old).unwrap();
    let b = a.join("B");
    write_chart(&b, "new.bms", "New");
    let report = catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(report.folders_removed, 1);
    assert_eq!(report.folders_added, 2);
    assert_eq!(report.added, 1);

    assert_eq!(category_of(&catalog, &a), Some(FolderCategory::Container));
    assert_eq!(category_of(&catalog, &b), Some(FolderCategory::SongCollection));
    let stats = catalog.stats().unwrap();
    assert_eq!(stats.charts, 1);
    assert_eq!(stats.song_collections, 1);
    let b_hash = Catalog::folder_hash(&b).unwrap();
    assert_eq!(
        catalog.folder_parent(&b_hash).unwrap(),
        Some(Catalog::folder_hash(&a).unwrap())
    );
}

#[cfg(unix)]
#[test]
fn unreadable_directory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let (catalog, _) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let locked = mkdir(&tmp.path().join("Locked"));
    write_chart(&locked, "hidden.bms", "Hidden");
    let open = tmp.path().join("Open");
    write_chart(&open, "visible.bms", "Visible");

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
    if std::fs::read_dir(&locked).is_ok() {
        // Running with permission checks bypassed (e.g. as root).
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let report = catalog.add_folder(tmp.path(), &root());
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    let report = report.unwrap();

    assert_eq!(report.errors, 1);
    assert_eq!(report.added, 1);
    assert_eq!(category_of(&catalog, &open), Some(FolderCategory::SongCollection));
    assert!(matches!(
        catalog.folder_path(&Catalog::folder_hash(&locked).unwrap()),
        Err(CatalogError::FolderNotFound(_))
    ));
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_names_are_skipped_and_rescans_stay_quiet() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let (catalog, parser) = common::catalog();
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("A");
    write_chart(&a, "x.bms", "X");
    std::fs::write(a.join(OsStr::from_bytes(b"\xffbad.bms")), "#TITLE Bad\n").unwrap();
    write_chart(
        &tmp.path().join(OsStr::from_bytes(b"\xfeDir")),
        "y.bms",
        "Y",
    );

    let first = catalog.add_folder(tmp.path(), &root()).unwrap();
    assert_eq!(first.added, 1);
    assert_eq!(first.skipped, 2);
    assert_eq!(first.folders_added, 2);
    let calls = parser.calls();

    for _ in 0..2 {
        let report = catalog.add_folder(tmp.path(), &root()).unwrap();
        assert_eq!(report.imported, 0);
        assert_eq!(report.submitted, 0);
        assert_eq!(report.removed, 0);
        assert_eq!(report.folders_added, 0);
        assert_eq!(report.folders_removed, 0);
        assert_eq!(report.skipped, 2);
    }
    assert_eq!(parser.calls(), calls);
    assert_eq!(catalog.stats().unwrap().charts, 1);

    let err = catalog
        .add_folder(&tmp.path().join(OsStr::from_bytes(b"\xfeDir")), &root())
        .unwrap_err();
    assert!(matches!(err, CatalogError::NonUtf8Path(_)));
}
