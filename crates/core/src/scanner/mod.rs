pub mod pool;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime, SubsecRound};
use walkdir::WalkDir;

use crate::domain::{file_type_of, SourceDescriptor, SourceSidecarDescriptor};
use crate::error::Result;
use crate::hasher;
use crate::metadata::MetadataProvider;

pub use pool::scan_files;

/// Media extensions accepted when the metadata provider reports no usable MIME type.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    // Images
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "heic", "heif", "avif",
    // RAW
    "raw", "cr2", "cr3", "nef", "orf", "arw", "dng", "sr2", "raf", "rw2", "pef",
    // Video
    "mp4", "mov", "m4v", "avi", "mkv", "webm", "mts", "m2ts", "3gp",
];

/// Companion files that travel with the media file sharing their base path.
pub const SIDECAR_EXTENSIONS: &[&str] = &["xmp", "photo-edit", "on1", "aae", "pp3", "dop"];

/// Every regular, non-hidden file under `root`. Unreadable entries are logged and skipped.
pub fn walk_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.into_path())
        .collect()
}

pub fn has_media_extension(path: &Path) -> bool {
    has_extension_in(path, MEDIA_EXTENSIONS)
}

pub fn is_sidecar(path: &Path) -> bool {
    has_extension_in(path, SIDECAR_EXTENSIONS)
}

fn has_extension_in(path: &Path, set: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| set.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Candidate sidecar paths for a media file: its path with the extension swapped.
pub fn sidecar_candidates(media_path: &Path) -> Vec<PathBuf> {
    SIDECAR_EXTENSIONS
        .iter()
        .map(|ext| media_path.with_extension(ext))
        .collect()
}

/// Local modification time, truncated to whole seconds.
pub fn modified_timestamp(modified: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(modified).naive_local().trunc_subsecs(0)
}

/// Build the descriptor for one file, or `None` when it is not media.
///
/// Metadata, stat and hash failures are returned as errors; the caller skips
/// the file. A sidecar that cannot be hashed is dropped on its own.
pub fn describe_file(
    path: &Path,
    provider: &mut dyn MetadataProvider,
) -> Result<Option<SourceDescriptor>> {
    if is_sidecar(path) {
        return Ok(None);
    }

    let fields = provider.extract(path)?;
    let meta = fs::metadata(path)?;

    if !fields.has_media_mime() && !has_media_extension(path) {
        return Ok(None);
    }

    let created = match fields.creation_timestamp() {
        Some(ts) => ts,
        None => modified_timestamp(meta.modified()?),
    };
    let hash = hasher::compute_sha256(path)?;

    let sidecars = sidecar_candidates(path)
        .into_iter()
        .filter(|p| fs::symlink_metadata(p).is_ok_and(|m| !m.is_dir()))
        .filter_map(|p| describe_sidecar(&p, created))
        .collect();

    Ok(Some(SourceDescriptor {
        filename: file_name_of(path),
        file_type: file_type_of(path),
        path: path.to_path_buf(),
        created,
        hash,
        sidecars,
    }))
}

fn describe_sidecar(path: &Path, created: NaiveDateTime) -> Option<SourceSidecarDescriptor> {
    let result = fs::metadata(path).and_then(|meta| {
        let modified = modified_timestamp(meta.modified()?);
        let hash = hasher::compute_sha256(path)?;
        Ok((modified, hash))
    });
    match result {
        Ok((modified, hash)) => Some(SourceSidecarDescriptor {
            filename: file_name_of(path),
            file_type: file_type_of(path),
            path: path.to_path_buf(),
            created,
            modified,
            hash,
        }),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping sidecar");
            None
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
