//! Three-phase import: scan and resolve, reconcile in one transaction, copy.
//!
//! The reconcile phase commits before any file is copied. A copy that fails
//! afterwards leaves a record without a file; the next drift pass removes it.
//! A dry run reconciles inside a transaction that is rolled back and only
//! plans the copies.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::cancel::CancelToken;
use crate::catalog::{Catalog, CatalogTx, MediaUpsert, SidecarUpsert};
use crate::config::Config;
use crate::domain::*;
use crate::error::Result;
use crate::hasher;
use crate::metadata::ProviderFactory;
use crate::resolve;
use crate::scanner;
use crate::{Phase, Progress};

/// One queued copy into the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCopy {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Expected content hash, used to skip destinations that are already current.
    pub hash: String,
    /// Hash of the stale version the destination may hold and that this copy
    /// supersedes. Any other content at the destination is left alone.
    pub replaces: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    Skipped,
}

/// Shared collaborators for one import run.
pub struct Importer<'a> {
    pub factory: &'a dyn ProviderFactory,
    pub config: &'a Config,
    pub cancel: &'a CancelToken,
}

impl Importer<'_> {
    /// Import `source` into the library at `library_root`.
    pub fn run(
        &self,
        catalog: &mut Catalog,
        library_root: &Path,
        source: &Path,
        options: ImportOptions,
        progress_cb: Option<&mut dyn FnMut(Progress)>,
    ) -> Result<ImportStats> {
        let mut noop = |_: Progress| {};
        let progress: &mut dyn FnMut(Progress) = match progress_cb {
            Some(cb) => cb,
            None => &mut noop,
        };
        let mut stats = ImportStats {
            dry_run: options.dry_run,
            ..Default::default()
        };

        // Phase 1: scan and resolve
        let files = scanner::walk_files(source);
        stats.files_scanned = files.len();
        tracing::info!(source = %source.display(), files = files.len(), "scanning");
        progress(Progress::ScanStart {
            file_count: files.len(),
        });
        let descriptors =
            scanner::scan_files(files, self.factory, self.config, self.cancel, |path| {
                progress(Progress::FileScanned {
                    path: path.to_path_buf(),
                })
            })?;
        stats.media_found = descriptors.len();
        let winners = resolve::resolve_winners(descriptors);
        stats.unique = winners.len();
        progress(Progress::PhaseComplete { phase: Phase::Scan });
        tracing::info!(
            media = stats.media_found,
            unique = stats.unique,
            "scan complete"
        );

        // Phase 2: reconcile
        progress(Progress::ReconcileStart {
            media_count: winners.len(),
        });
        let queue = self.reconcile(catalog, library_root, &winners, options, &mut stats)?;
        progress(Progress::PhaseComplete {
            phase: Phase::Reconcile,
        });
        tracing::info!(
            added = stats.media_added,
            renamed = stats.media_renamed,
            unchanged = stats.media_unchanged,
            sidecars_added = stats.sidecars_added,
            sidecars_updated = stats.sidecars_updated,
            conflicts = stats.conflicts,
            dry_run = options.dry_run,
            "catalog updated"
        );

        // Phase 3: copy
        if options.copy {
            let op: fn(&FileCopy) -> io::Result<CopyOutcome> = if options.dry_run {
                plan_copy
            } else {
                copy_file
            };
            stats.copy = copy_files(queue, self.config.parallel_copy, op, progress);
            progress(Progress::PhaseComplete { phase: Phase::Copy });
            tracing::info!(
                copied = stats.copy.copied,
                skipped = stats.copy.skipped,
                failed = stats.copy.failed,
                dry_run = options.dry_run,
                "copy complete"
            );
        } else {
            tracing::info!("copy skipped");
        }

        Ok(stats)
    }

    /// Apply the winners to the catalog in one transaction and return the copy queue.
    fn reconcile(
        &self,
        catalog: &mut Catalog,
        library_root: &Path,
        winners: &[SourceDescriptor],
        options: ImportOptions,
        stats: &mut ImportStats,
    ) -> Result<Vec<FileCopy>> {
        let tx = catalog.transaction()?;
        let mut queue = Vec::new();

        for winner in winners {
            self.cancel.check()?;

            let relpath = relpath_for(&winner.created);
            if let Some(holder) = media_location_taken(&tx, winner, &relpath)? {
                stats.conflicts += 1;
                tracing::warn!(
                    path = %winner.path.display(),
                    location = %Path::new(&relpath).join(&winner.filename).display(),
                    held_by = holder.id,
                    "location holds a different file, skipping"
                );
                continue;
            }

            let media = NewMedia {
                filename: &winner.filename,
                relpath: &relpath,
                file_type: &winner.file_type,
                created: &winner.created,
                hash: &winner.hash,
            };
            let outcome = tx.upsert_media(&media, |existing| {
                resolve::is_better_filename(&winner.filename, &existing.filename)
            })?;
            match &outcome {
                MediaUpsert::Inserted(r) => {
                    stats.media_added += 1;
                    tracing::debug!(id = r.id, filename = %r.filename, hash = %winner.hash, "added media");
                }
                MediaUpsert::Renamed(r) => {
                    stats.media_renamed += 1;
                    tracing::debug!(id = r.id, filename = %r.filename, "renamed media, sidecars reset");
                }
                MediaUpsert::Unchanged(r) => {
                    stats.media_unchanged += 1;
                    tracing::debug!(id = r.id, filename = %r.filename, "media already current");
                }
            }

            let record = outcome.record();
            let record_dir = library_root.join(&record.relpath);
            if options.copy {
                queue.push(FileCopy {
                    source: winner.path.clone(),
                    destination: record_dir.join(&record.filename),
                    hash: winner.hash.clone(),
                    replaces: None,
                });
            }

            // Sidecars belong to the winner's name; a record that kept a
            // different name does not adopt them.
            if record.filename != winner.filename {
                continue;
            }
            for sidecar in &winner.sidecars {
                if let Some(holder) = tx.find_sidecar_at(&record.relpath, &sidecar.filename)? {
                    if holder.media_id != record.id {
                        stats.conflicts += 1;
                        tracing::warn!(
                            path = %sidecar.path.display(),
                            held_by = holder.media_id,
                            "sidecar location belongs to other media, skipping"
                        );
                        continue;
                    }
                }

                let previous = tx.find_sidecar(record.id, &sidecar.filename)?;
                let new = NewSidecar::from_source(sidecar, &record.relpath);
                match tx.upsert_sidecar(record.id, &new)? {
                    SidecarUpsert::Inserted(_) => stats.sidecars_added += 1,
                    SidecarUpsert::Updated(_) => stats.sidecars_updated += 1,
                    SidecarUpsert::Unchanged(_) => {}
                }
                if options.copy {
                    queue.push(FileCopy {
                        source: sidecar.path.clone(),
                        destination: record_dir.join(&sidecar.filename),
                        hash: sidecar.hash.clone(),
                        replaces: previous.map(|p| p.hash),
                    });
                }
            }
        }

        if options.dry_run {
            tx.rollback()?;
        } else {
            tx.commit()?;
        }
        Ok(queue)
    }
}

/// The record holding the winner's destination, when the winner would move
/// there and that record stores different bytes.
fn media_location_taken(
    tx: &CatalogTx<'_>,
    winner: &SourceDescriptor,
    relpath: &str,
) -> Result<Option<LocationHolder>> {
    let moves_in = match tx.find_media_by_hash(&winner.hash)? {
        None => true,
        Some(existing) => {
            existing.filename != winner.filename
                && resolve::is_better_filename(&winner.filename, &existing.filename)
        }
    };
    if !moves_in {
        return Ok(None);
    }
    Ok(tx
        .find_media_at(relpath, &winner.filename)?
        .filter(|holder| holder.hash != winner.hash))
}

/// Keep the first queued copy for each destination.
fn dedup_by_destination(queue: Vec<FileCopy>) -> Vec<FileCopy> {
    let mut seen = HashSet::new();
    queue
        .into_iter()
        .filter(|c| seen.insert(c.destination.clone()))
        .collect()
}

/// Run the copy queue through `op`. Failures are logged and counted, never
/// propagated.
pub fn copy_files(
    queue: Vec<FileCopy>,
    parallel: bool,
    op: fn(&FileCopy) -> io::Result<CopyOutcome>,
    progress: &mut dyn FnMut(Progress),
) -> CopyStats {
    let queue = dedup_by_destination(queue);
    progress(Progress::CopyStart {
        file_count: queue.len(),
    });

    let results: Vec<io::Result<CopyOutcome>> = if parallel {
        queue.par_iter().map(op).collect()
    } else {
        queue.iter().map(op).collect()
    };

    // Progress is reported on the calling thread; the callback is not Send.
    let mut stats = CopyStats::default();
    for (item, result) in queue.iter().zip(results) {
        match result {
            Ok(CopyOutcome::Copied) => stats.copied += 1,
            Ok(CopyOutcome::Skipped) => stats.skipped += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(
                    source = %item.source.display(),
                    destination = %item.destination.display(),
                    error = %e,
                    "copy failed"
                );
            }
        }
        progress(Progress::FileCopied {
            path: item.destination.clone(),
        });
    }
    stats
}

/// Decide what copying `item` would do without writing anything.
///
/// An existing destination is only ever replaced when it holds the version
/// named by `replaces`.
pub fn plan_copy(item: &FileCopy) -> io::Result<CopyOutcome> {
    if item.source == item.destination || hasher::matches_hash(&item.destination, &item.hash) {
        return Ok(CopyOutcome::Skipped);
    }
    fs::metadata(&item.source)?;
    match fs::symlink_metadata(&item.destination) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CopyOutcome::Copied),
        Err(e) => return Err(e),
        Ok(_) => {}
    }
    if same_file(&item.source, &item.destination)? {
        return Ok(CopyOutcome::Skipped);
    }
    let superseded = item
        .replaces
        .as_deref()
        .is_some_and(|hash| hasher::matches_hash(&item.destination, hash));
    if superseded {
        Ok(CopyOutcome::Copied)
    } else {
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "destination holds different content",
        ))
    }
}

/// Copy one file into place unless the destination already holds the expected bytes.
pub fn copy_file(item: &FileCopy) -> io::Result<CopyOutcome> {
    if plan_copy(item)? == CopyOutcome::Skipped {
        return Ok(CopyOutcome::Skipped);
    }
    if let Some(parent) = item.destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(&item.source, &item.destination)?;
    Ok(CopyOutcome::Copied)
}

fn same_file(a: &Path, b: &Path) -> io::Result<bool> {
    Ok(a.canonicalize()? == b.canonicalize()?)
}
