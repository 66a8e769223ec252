//! Bring the catalog back in line with what is actually on disk.
//!
//! The cull runs in its own transaction and commits before the library root
//! is re-imported. A crash in between leaves records culled but not yet
//! re-imported; the next update picks them up again.

use std::fs;
use std::path::Path;

use crate::catalog::Catalog;
use crate::domain::{ImportOptions, UpdateStats};
use crate::error::Result;
use crate::hasher;
use crate::import::Importer;
use crate::scanner::modified_timestamp;
use crate::{Phase, Progress};

/// Cull vanished files, refresh edited sidecars, then absorb files added to
/// the library directly.
pub fn update(
    importer: &Importer<'_>,
    catalog: &mut Catalog,
    library_root: &Path,
    mut progress_cb: Option<&mut dyn FnMut(Progress)>,
) -> Result<UpdateStats> {
    let mut stats = UpdateStats::default();
    cull(importer, catalog, library_root, &mut stats)?;
    if let Some(ref mut cb) = progress_cb {
        cb(Progress::PhaseComplete { phase: Phase::Cull });
    }
    tracing::info!(
        media_removed = stats.media_removed,
        sidecars_removed = stats.sidecars_removed,
        sidecars_refreshed = stats.sidecars_refreshed,
        "cull complete"
    );

    stats.import = importer.run(
        catalog,
        library_root,
        library_root,
        ImportOptions::CATALOG_ONLY,
        progress_cb,
    )?;
    Ok(stats)
}

fn cull(
    importer: &Importer<'_>,
    catalog: &mut Catalog,
    library_root: &Path,
    stats: &mut UpdateStats,
) -> Result<()> {
    let tx = catalog.transaction()?;

    for media in tx.media_locations()? {
        importer.cancel.check()?;
        let path = library_root.join(&media.relpath).join(&media.filename);
        if !path.is_file() {
            tx.delete_media(media.id)?;
            stats.media_removed += 1;
            tracing::debug!(id = media.id, path = %path.display(), "removed missing media");
        }
    }

    // Sidecars of media removed above are already gone through the cascade.
    for sidecar in tx.sidecar_locations()? {
        importer.cancel.check()?;
        let path = sidecar.path_in(library_root);
        if !path.exists() {
            tx.delete_sidecar(sidecar.id)?;
            stats.sidecars_removed += 1;
            tracing::debug!(id = sidecar.id, path = %path.display(), "removed missing sidecar");
            continue;
        }

        // Present but unreadable: keep the row until the file can be hashed.
        let refreshed = fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .and_then(|mtime| Ok((hasher::compute_sha256(&path)?, mtime)));
        match refreshed {
            Ok((hash, _)) if hash == sidecar.hash => {}
            Ok((hash, mtime)) => {
                tx.update_sidecar_hash(sidecar.id, &hash, &modified_timestamp(mtime))?;
                stats.sidecars_refreshed += 1;
                tracing::debug!(id = sidecar.id, path = %path.display(), "refreshed sidecar hash");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not hash sidecar, leaving it unchanged");
            }
        }
    }

    tx.commit()
}
