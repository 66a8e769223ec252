//! Additive one-way merge of one library into another.
//!
//! Nothing at the target is ever deleted, renamed or overwritten by a
//! different photo. Files are copied before their record is written, so a
//! failed copy leaves no record behind. A dry run plans the copies and rolls
//! the target transaction back.

use std::io;
use std::path::Path;

use crate::cancel::CancelToken;
use crate::catalog::{Catalog, CatalogTx};
use crate::domain::*;
use crate::error::Result;
use crate::import::{copy_file, plan_copy, CopyOutcome, FileCopy};
use crate::{Phase, Progress};

pub fn sync(
    source: &Catalog,
    source_root: &Path,
    target: &mut Catalog,
    target_root: &Path,
    dry_run: bool,
    cancel: &CancelToken,
    mut progress_cb: Option<&mut dyn FnMut(Progress)>,
) -> Result<SyncStats> {
    let listing = source.list_all()?;
    tracing::info!(
        source = %source_root.display(),
        target = %target_root.display(),
        media = listing.len(),
        dry_run,
        "syncing"
    );
    if let Some(ref mut cb) = progress_cb {
        cb(Progress::SyncStart {
            media_count: listing.len(),
        });
    }

    let mut run = SyncRun {
        source_root,
        target_root,
        copy: if dry_run { plan_copy } else { copy_file },
        stats: SyncStats {
            dry_run,
            ..Default::default()
        },
    };
    let tx = target.transaction()?;
    for media in &listing {
        cancel.check()?;
        if let Some(record) = run.sync_media(&tx, media)? {
            run.sync_sidecars(&tx, media, &record)?;
        }
        if let Some(ref mut cb) = progress_cb {
            cb(Progress::MediaSynced {
                filename: media.filename.clone(),
            });
        }
    }
    if dry_run {
        tx.rollback()?;
    } else {
        tx.commit()?;
    }

    if let Some(ref mut cb) = progress_cb {
        cb(Progress::PhaseComplete { phase: Phase::Sync });
    }
    let stats = run.stats;
    tracing::info!(
        added = stats.media_added,
        present = stats.media_present,
        sidecars_added = stats.sidecars_added,
        sidecars_updated = stats.sidecars_updated,
        conflicts = stats.conflicts,
        copy_failures = stats.copy_failures,
        dry_run,
        "sync complete"
    );
    Ok(stats)
}

struct SyncRun<'a> {
    source_root: &'a Path,
    target_root: &'a Path,
    copy: fn(&FileCopy) -> io::Result<CopyOutcome>,
    stats: SyncStats,
}

impl SyncRun<'_> {
    /// Resolve the target record for `media`, copying and inserting it when
    /// absent. `None` when the copy failed or the location is taken.
    fn sync_media(&mut self, tx: &CatalogTx<'_>, media: &MediaRecord) -> Result<Option<MediaRef>> {
        if let Some(existing) = tx.find_media_by_hash(&media.hash)? {
            self.stats.media_present += 1;
            return Ok(Some(existing));
        }

        let relpath = relpath_for(&media.created);
        let destination = self.target_root.join(&relpath).join(&media.filename);
        if let Some(holder) = tx.find_media_at(&relpath, &media.filename)? {
            self.conflict(&destination, holder.id);
            return Ok(None);
        }

        let item = FileCopy {
            source: media.path_in(self.source_root),
            destination,
            hash: media.hash.clone(),
            replaces: None,
        };
        if !self.try_copy(&item) {
            return Ok(None);
        }

        let id = tx.insert_media(&NewMedia {
            filename: &media.filename,
            relpath: &relpath,
            file_type: &media.file_type,
            created: &media.created,
            hash: &media.hash,
        })?;
        self.stats.media_added += 1;
        tracing::debug!(id, filename = %media.filename, "synced media");
        Ok(Some(MediaRef {
            id,
            filename: media.filename.clone(),
            relpath,
        }))
    }

    fn sync_sidecars(
        &mut self,
        tx: &CatalogTx<'_>,
        media: &MediaRecord,
        record: &MediaRef,
    ) -> Result<()> {
        for sidecar in &media.sidecars {
            let existing = tx.find_sidecar(record.id, &sidecar.filename)?;
            if matches!(&existing, Some(e) if e.hash == sidecar.hash) {
                continue;
            }

            let destination = self.target_root.join(&record.relpath).join(&sidecar.filename);
            if let Some(holder) = tx.find_sidecar_at(&record.relpath, &sidecar.filename)? {
                if holder.media_id != record.id {
                    self.conflict(&destination, holder.media_id);
                    continue;
                }
            }

            let item = FileCopy {
                source: sidecar.path_in(self.source_root),
                destination,
                hash: sidecar.hash.clone(),
                replaces: existing.as_ref().map(|e| e.hash.clone()),
            };
            if !self.try_copy(&item) {
                continue;
            }

            let new = NewSidecar::from_record(sidecar, &record.relpath);
            match existing {
                None => {
                    tx.insert_sidecar(record.id, &new)?;
                    self.stats.sidecars_added += 1;
                }
                Some(e) => {
                    tx.update_sidecar(e.id, &new)?;
                    self.stats.sidecars_updated += 1;
                }
            }
        }
        Ok(())
    }

    fn conflict(&mut self, destination: &Path, held_by: i64) {
        self.stats.conflicts += 1;
        tracing::warn!(
            destination = %destination.display(),
            held_by,
            "target location holds a different file, skipping"
        );
    }

    fn try_copy(&mut self, item: &FileCopy) -> bool {
        match (self.copy)(item) {
            Ok(_) => true,
            Err(e) => {
                self.stats.copy_failures += 1;
                tracing::warn!(
                    source = %item.source.display(),
                    destination = %item.destination.display(),
                    error = %e,
                    "copy failed, skipping"
                );
                false
            }
        }
    }
}
