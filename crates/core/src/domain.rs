use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Text format used for timestamps in the catalog. Sorts chronologically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of the storage-relative directory derived from a creation timestamp.
pub const RELPATH_FORMAT: &str = "%Y/%m-%d";

/// Storage-relative directory for a record created at `created`: `YYYY/MM-DD`.
pub fn relpath_for(created: &NaiveDateTime) -> String {
    created.format(RELPATH_FORMAT).to_string()
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> chrono::ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
}

/// Uppercased extension of a file name, or an empty string when there is none.
pub fn file_type_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

/// A media file found while scanning a source tree. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub path: PathBuf,
    pub filename: String,
    pub file_type: String,
    pub created: NaiveDateTime,
    pub hash: String,
    pub sidecars: Vec<SourceSidecarDescriptor>,
}

/// A companion file sitting next to a scanned media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSidecarDescriptor {
    pub path: PathBuf,
    pub filename: String,
    pub file_type: String,
    /// Creation timestamp of the owning media file.
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: i64,
    pub filename: String,
    pub relpath: String,
    pub file_type: String,
    pub created: NaiveDateTime,
    pub hash: String,
    pub sidecars: Vec<SidecarRecord>,
}

impl MediaRecord {
    /// On-disk location of this record inside the library rooted at `root`.
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.relpath).join(&self.filename)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarRecord {
    pub id: i64,
    pub media_id: i64,
    pub filename: String,
    pub relpath: String,
    pub file_type: String,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
    pub hash: String,
}

impl SidecarRecord {
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.relpath).join(&self.filename)
    }
}

/// Media fields written by an insert or identity update.
#[derive(Debug, Clone, Copy)]
pub struct NewMedia<'a> {
    pub filename: &'a str,
    pub relpath: &'a str,
    pub file_type: &'a str,
    pub created: &'a NaiveDateTime,
    pub hash: &'a str,
}

/// Sidecar fields written by an insert or update.
#[derive(Debug, Clone, Copy)]
pub struct NewSidecar<'a> {
    pub filename: &'a str,
    pub relpath: &'a str,
    pub file_type: &'a str,
    pub created: &'a NaiveDateTime,
    pub modified: &'a NaiveDateTime,
    pub hash: &'a str,
}

impl<'a> NewSidecar<'a> {
    pub fn from_source(sidecar: &'a SourceSidecarDescriptor, relpath: &'a str) -> Self {
        Self {
            filename: &sidecar.filename,
            relpath,
            file_type: &sidecar.file_type,
            created: &sidecar.created,
            modified: &sidecar.modified,
            hash: &sidecar.hash,
        }
    }

    pub fn from_record(sidecar: &'a SidecarRecord, relpath: &'a str) -> Self {
        Self {
            filename: &sidecar.filename,
            relpath,
            file_type: &sidecar.file_type,
            created: &sidecar.created,
            modified: &sidecar.modified,
            hash: &sidecar.hash,
        }
    }
}

/// Existing media row as seen by a hash lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub id: i64,
    pub filename: String,
    pub relpath: String,
}

/// Existing sidecar row as seen by a (media, filename) lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarRef {
    pub id: i64,
    pub hash: String,
}

/// Row holding a given `(relpath, filename)` location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationHolder {
    pub id: i64,
    /// Owning media for sidecars; the row itself for media.
    pub media_id: i64,
    pub hash: String,
}

/// How an import treats the catalog and the library tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Copy winners and their sidecars into the library.
    pub copy: bool,
    /// Roll the catalog back and write no files; stats describe what would happen.
    pub dry_run: bool,
}

impl ImportOptions {
    pub const COPY: Self = Self {
        copy: true,
        dry_run: false,
    };

    pub const CATALOG_ONLY: Self = Self {
        copy: false,
        dry_run: false,
    };

    pub fn dry_run(self) -> Self {
        Self {
            dry_run: true,
            ..self
        }
    }
}

/// Per-file copy outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub files_scanned: usize,
    pub media_found: usize,
    pub unique: usize,
    pub media_added: usize,
    pub media_renamed: usize,
    pub media_unchanged: usize,
    pub sidecars_added: usize,
    pub sidecars_updated: usize,
    /// Winners and sidecars skipped because a different file already holds their location.
    pub conflicts: usize,
    pub copy: CopyStats,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStats {
    pub media_removed: usize,
    pub sidecars_removed: usize,
    pub sidecars_refreshed: usize,
    pub import: ImportStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub media_added: usize,
    pub media_present: usize,
    pub sidecars_added: usize,
    pub sidecars_updated: usize,
    pub copy_failures: usize,
    /// Items skipped because a different target file already holds their location.
    pub conflicts: usize,
    pub dry_run: bool,
}

/// Catalog totals for `info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibrarySummary {
    pub media: usize,
    pub sidecars: usize,
    /// Media count per file type, most common first.
    pub by_type: Vec<(String, usize)>,
    pub oldest: Option<NaiveDateTime>,
    pub newest: Option<NaiveDateTime>,
}
