use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use photosort_core::config::Config;
use photosort_core::domain::ImportOptions;
use photosort_core::error::{Error, Result};
use photosort_core::hasher::compute_sha256;
use photosort_core::metadata::{MetadataFields, MetadataProvider, ProviderFactory};
use photosort_core::{Library, Progress};

/// Dates every file from its name: `D<yyyymmdd>_...` maps to that day at noon.
/// Anything else gets no date, so the mtime fallback applies.
struct NameDateFactory;

struct NameDate;

impl MetadataProvider for NameDate {
    fn extract(&mut self, path: &Path) -> Result<MetadataFields> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let create_date = name
            .strip_prefix('D')
            .filter(|rest| rest.get(..8).is_some_and(|d| d.bytes().all(|b| b.is_ascii_digit())))
            .map(|rest| format!("{}:{}:{} 12:00:00", &rest[..4], &rest[4..6], &rest[6..8]));
        Ok(MetadataFields {
            file_name: Some(name),
            create_date,
            ..Default::default()
        })
    }
}

impl ProviderFactory for NameDateFactory {
    fn create(&self) -> Result<Box<dyn MetadataProvider>> {
        Ok(Box::new(NameDate))
    }
}

fn write(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

fn create_library(root: &Path) -> Library {
    Library::create(root, Config::default().with_workers(3))
        .unwrap()
        .with_metadata_factory(Box::new(NameDateFactory))
}

fn open_library(root: &Path) -> Library {
    Library::open(root, Config::default().with_workers(3))
        .unwrap()
        .with_metadata_factory(Box::new(NameDateFactory))
}

/// Every regular file under `root` except the catalog files.
fn library_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.file_name().to_string_lossy().starts_with("library.db"))
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

// ── Import ───────────────────────────────────────────────────────

#[test]
fn test_import_builds_dated_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("dump");
    write(&source.join("D20230105_beach.jpg"), b"beach");
    write(&source.join("D20230105_beach.xmp"), b"<edit/>");
    write(&source.join("phone/D20221231_party.MOV"), b"party");
    write(&source.join(".hidden/D20230101_secret.jpg"), b"hidden dir, visible file");
    write(&source.join(".D20230101_dot.jpg"), b"hidden");
    write(&source.join("readme.md"), b"# not media");

    let mut lib = create_library(&tmp.path().join("lib"));
    let stats = lib.import(&source, ImportOptions::COPY, None).unwrap();
    assert_eq!(stats.media_added, 3);
    assert_eq!(stats.sidecars_added, 1);
    assert_eq!(lib.count().unwrap(), 3);

    assert_eq!(
        library_files(lib.root()),
        vec![
            PathBuf::from("2022/12-31/D20221231_party.MOV"),
            PathBuf::from("2023/01-01/D20230101_secret.jpg"),
            PathBuf::from("2023/01-05/D20230105_beach.jpg"),
            PathBuf::from("2023/01-05/D20230105_beach.xmp"),
        ]
    );

    let listing = lib.list().unwrap();
    let names: Vec<_> = listing.iter().map(|m| m.filename.as_str()).collect();
    assert_eq!(
        names,
        vec!["D20221231_party.MOV", "D20230101_secret.jpg", "D20230105_beach.jpg"]
    );
    assert_eq!(listing[0].file_type, "MOV");
    assert_eq!(listing[2].sidecars[0].file_type, "XMP");
}

#[test]
fn test_duplicates_resolve_to_one_record_with_best_name() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("dump");
    write(&source.join("z/D20200101_IMG_0001 copy.JPG"), b"same bytes");
    write(&source.join("y/D20200101_IMG_0001 (1).JPG"), b"same bytes");
    write(&source.join("x/D20200101_IMG_0001.JPG"), b"same bytes");
    write(&source.join("w/D20200101_IMG_0001_2.JPG"), b"same bytes");

    let mut lib = create_library(&tmp.path().join("lib"));
    let stats = lib.import(&source, ImportOptions::COPY, None).unwrap();
    assert_eq!(stats.media_found, 4);
    assert_eq!(stats.unique, 1);

    let listing = lib.list().unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].filename, "D20200101_IMG_0001.JPG");
    assert_eq!(
        library_files(lib.root()),
        vec![PathBuf::from("2020/01-01/D20200101_IMG_0001.JPG")]
    );
}

#[test]
fn test_winner_does_not_depend_on_worker_count() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("dump");
    for i in 0..30 {
        write(&source.join(format!("d{i:02}/D20200101_shot copy.jpg")), b"dup");
    }
    write(&source.join("d99/D20200101_shot.jpg"), b"dup");

    for workers in [1, 2, 8] {
        let root = tmp.path().join(format!("lib{workers}"));
        let mut lib = Library::create(&root, Config::default().with_workers(workers))
            .unwrap()
            .with_metadata_factory(Box::new(NameDateFactory));
        lib.import(&source, ImportOptions::CATALOG_ONLY, None).unwrap();
        let listing = lib.list().unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].filename, "D20200101_shot.jpg");
    }
}

#[test]
fn test_reimport_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("dump");
    write(&source.join("D20210704_a.jpg"), b"a");
    write(&source.join("D20210704_a.xmp"), b"<a/>");
    write(&source.join("D20210705_b.png"), b"b");

    let root = tmp.path().join("lib");
    let mut lib = create_library(&root);
    lib.import(&source, ImportOptions::COPY, None).unwrap();
    let catalog_before = lib.list().unwrap();
    let files_before = library_files(&root);
    drop(lib);

    let mut lib = open_library(&root);
    let stats = lib.import(&source, ImportOptions::COPY, None).unwrap();
    assert_eq!(stats.media_added + stats.media_renamed, 0);
    assert_eq!(stats.copy.copied, 0);
    assert_eq!(lib.list().unwrap(), catalog_before);
    assert_eq!(library_files(&root), files_before);
}

#[test]
fn test_recorded_hashes_match_library_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("dump");
    write(&source.join("D20190909_a.jpg"), &[7u8; 200_000]);
    write(&source.join("D20190909_a.xmp"), b"<x/>");

    let mut lib = create_library(&tmp.path().join("lib"));
    lib.import(&source, ImportOptions::COPY, None).unwrap();
    for media in lib.list().unwrap() {
        assert_eq!(compute_sha256(&media.path_in(lib.root())).unwrap(), media.hash);
        for sidecar in &media.sidecars {
            assert_eq!(
                compute_sha256(&sidecar.path_in(lib.root())).unwrap(),
                sidecar.hash
            );
        }
    }
}

#[test]
fn test_import_reports_progress() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("dump");
    write(&source.join("D20190909_a.jpg"), b"a");
    write(&source.join("D20190909_b.jpg"), b"b");
    write(&source.join("notes.txt"), b"n");

    let mut lib = create_library(&tmp.path().join("lib"));
    let mut scanned = 0;
    let mut copied = 0;
    let mut cb = |p: Progress| match p {
        Progress::FileScanned { .. } => scanned += 1,
        Progress::FileCopied { .. } => copied += 1,
        _ => {}
    };
    lib.import(&source, ImportOptions::COPY, Some(&mut cb)).unwrap();
    assert_eq!(scanned, 3);
    assert_eq!(copied, 2);
}

#[test]
fn test_dry_run_import_leaves_library_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("dump");
    write(&source.join("D20230105_beach.jpg"), b"beach");
    write(&source.join("D20230105_beach.xmp"), b"<edit/>");

    let mut lib = create_library(&tmp.path().join("lib"));
    let stats = lib
        .import(&source, ImportOptions::COPY.dry_run(), None)
        .unwrap();
    assert!(stats.dry_run);
    assert_eq!(stats.media_added, 1);
    assert_eq!(stats.copy.copied, 2);
    assert_eq!(lib.count().unwrap(), 0);
    assert!(library_files(lib.root()).is_empty());
}

#[test]
fn test_same_name_same_day_from_two_cameras() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("dump");
    write(&source.join("cam1/D20240309_IMG_0001.JPG"), b"camera one");
    write(&source.join("cam2/D20240309_IMG_0001.JPG"), b"camera two");

    let mut lib = create_library(&tmp.path().join("lib"));
    let stats = lib.import(&source, ImportOptions::COPY, None).unwrap();
    assert_eq!(stats.conflicts, 1);

    let listing = lib.list().unwrap();
    assert_eq!(listing.len(), 1);
    let stored = listing[0].path_in(lib.root());
    assert_eq!(compute_sha256(&stored).unwrap(), listing[0].hash);
    assert_eq!(
        library_files(lib.root()),
        vec![PathBuf::from("2024/03-09/D20240309_IMG_0001.JPG")]
    );
}

#[test]
fn test_summary_reflects_catalog() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("dump");
    write(&source.join("D20160606_a.jpg"), b"a");
    write(&source.join("D20160606_a.xmp"), b"<a/>");
    write(&source.join("D20181212_b.jpg"), b"b");
    write(&source.join("D20170707_c.mov"), b"c");

    let mut lib = create_library(&tmp.path().join("lib"));
    lib.import(&source, ImportOptions::COPY, None).unwrap();
    let summary = lib.summary().unwrap();
    assert_eq!(summary.media, 3);
    assert_eq!(summary.sidecars, 1);
    assert_eq!(
        summary.by_type,
        vec![("JPG".to_string(), 2), ("MOV".to_string(), 1)]
    );
    assert_eq!(
        summary.oldest.map(|t| t.to_string()),
        Some("2016-06-06 12:00:00".to_string())
    );
    assert_eq!(
        summary.newest.map(|t| t.to_string()),
        Some("2018-12-12 12:00:00".to_string())
    );
}

// ── Update ───────────────────────────────────────────────────────

#[test]
fn test_update_removes_exactly_the_deleted_record() {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("dump");
    write(&source.join("D20200202_a.jpg"), b"a");
    write(&source.join("D20200202_a.xmp"), b"<a/>");
    write(&source.join("D20200202_b.jpg"), b"b");
    write(&source.join("D20200203_c.jpg"), b"c");

    let root = tmp.path().join("lib");
    let mut lib = create_library(&root);
    lib.import(&source, ImportOptions::COPY, None).unwrap();

    fs::remove_file(root.join("2020/02-02/D20200202_a.jpg")).unwrap();
    let stats = lib.update(None).unwrap();
    assert_eq!(stats.media_removed, 1);

    let names: Vec<_> = lib.list().unwrap().into_iter().map(|m| m.filename).collect();
    assert_eq!(names, vec!["D20200202_b.jpg", "D20200203_c.jpg"]);
}

#[test]
fn test_update_picks_up_files_dropped_into_library() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("lib");
    let mut lib = create_library(&root);
    write(&root.join("2018/08-08/D20180808_manual.jpg"), b"manual");

    let stats = lib.update(None).unwrap();
    assert_eq!(stats.import.media_added, 1);
    assert_eq!(lib.list().unwrap()[0].relpath, "2018/08-08");

    let again = lib.update(None).unwrap();
    assert_eq!(again.media_removed, 0);
    assert_eq!(again.import.media_added, 0);
}

// ── Sync ─────────────────────────────────────────────────────────

#[test]
fn test_sync_is_additive_and_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let dump_a = tmp.path().join("dump_a");
    let dump_b = tmp.path().join("dump_b");
    write(&dump_a.join("D20170101_shared.jpg"), b"shared");
    write(&dump_a.join("D20170101_shared.xmp"), b"<from a/>");
    write(&dump_a.join("D20170102_only_a.jpg"), b"only a");
    write(&dump_b.join("D20170101_shared.jpg"), b"shared");
    write(&dump_b.join("D20170103_only_b.jpg"), b"only b");
    write(&dump_b.join("D20170103_only_b.xmp"), b"<from b/>");

    let mut a = create_library(&tmp.path().join("a"));
    let mut b = create_library(&tmp.path().join("b"));
    a.import(&dump_a, ImportOptions::COPY, None).unwrap();
    b.import(&dump_b, ImportOptions::COPY, None).unwrap();
    let b_only_before = b
        .list()
        .unwrap()
        .into_iter()
        .find(|m| m.filename == "D20170103_only_b.jpg")
        .unwrap();

    let stats = b.sync_from(&a, false, None).unwrap();
    assert_eq!(stats.media_added, 1);
    assert_eq!(stats.media_present, 1);
    assert_eq!(stats.sidecars_added, 1);

    let listing = b.list().unwrap();
    let names: Vec<_> = listing.iter().map(|m| m.filename.as_str()).collect();
    assert_eq!(
        names,
        vec!["D20170101_shared.jpg", "D20170102_only_a.jpg", "D20170103_only_b.jpg"]
    );
    assert!(listing.contains(&b_only_before));
    assert!(b.root().join("2017/01-03/D20170103_only_b.xmp").exists());
    assert!(b.root().join("2017/01-01/D20170101_shared.xmp").exists());

    let before = b.list().unwrap();
    let again = b.sync_from(&a, false, None).unwrap();
    assert_eq!(again.media_added + again.sidecars_added + again.sidecars_updated, 0);
    assert_eq!(b.list().unwrap(), before);

    // Nothing flows backwards.
    assert_eq!(a.count().unwrap(), 2);
}

#[test]
fn test_dry_run_sync_reports_without_copying() {
    let tmp = tempfile::tempdir().unwrap();
    let dump = tmp.path().join("dump");
    write(&dump.join("D20170102_only_a.jpg"), b"only a");
    write(&dump.join("D20170102_only_a.xmp"), b"<a/>");

    let mut a = create_library(&tmp.path().join("a"));
    let mut b = create_library(&tmp.path().join("b"));
    a.import(&dump, ImportOptions::COPY, None).unwrap();

    let stats = b.sync_from(&a, true, None).unwrap();
    assert!(stats.dry_run);
    assert_eq!(stats.media_added, 1);
    assert_eq!(stats.sidecars_added, 1);
    assert_eq!(b.count().unwrap(), 0);
    assert!(library_files(b.root()).is_empty());
}

// ── Errors ───────────────────────────────────────────────────────

#[test]
fn test_library_state_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("lib");
    drop(create_library(&root));

    assert!(matches!(
        Library::create(&root, Config::default()),
        Err(Error::LibraryExists(_))
    ));
    assert!(matches!(
        Library::open(tmp.path(), Config::default()),
        Err(Error::LibraryNotFound(_))
    ));
    let mut lib = open_library(&root);
    assert!(matches!(
        lib.import(&tmp.path().join("missing"), ImportOptions::COPY, None),
        Err(Error::PathNotFound(_))
    ));
}
