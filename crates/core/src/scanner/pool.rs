use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use super::describe_file;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::domain::SourceDescriptor;
use crate::error::{Error, Result};
use crate::metadata::{MetadataProvider, NoMetadata, ProviderFactory};

type ScanResult = (PathBuf, Option<SourceDescriptor>);

/// Describe `files` on a bounded pool of worker threads.
///
/// Paths flow through a bounded channel shared by all workers; results come
/// back unordered on a second channel and are drained on the calling thread,
/// which invokes `on_file` once per processed path. Returns after every
/// worker has exited. Files that fail are logged and left out.
pub fn scan_files(
    files: Vec<PathBuf>,
    factory: &dyn ProviderFactory,
    config: &Config,
    cancel: &CancelToken,
    mut on_file: impl FnMut(&Path),
) -> Result<Vec<SourceDescriptor>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }
    let worker_count = config.workers.max(1).min(files.len());
    let (job_tx, job_rx) = crossbeam_channel::bounded::<PathBuf>(config.queue_capacity.max(1));
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<ScanResult>();

    let descriptors = thread::scope(move |s| -> Result<Vec<SourceDescriptor>> {
        for worker_idx in 0..worker_count {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            thread::Builder::new()
                .name(format!("scan-worker-{worker_idx}"))
                .spawn_scoped(s, move || run_worker(worker_idx, factory, jobs, results, cancel))?;
        }

        // Channel disconnection is driven by worker exits from here on.
        drop(job_rx);
        drop(result_tx);

        s.spawn(move || {
            for path in files {
                if cancel.is_cancelled() || job_tx.send(path).is_err() {
                    break;
                }
            }
        });

        let mut descriptors = Vec::new();
        for (path, descriptor) in result_rx.iter() {
            on_file(&path);
            descriptors.extend(descriptor);
        }
        Ok(descriptors)
    })?;

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(descriptors)
}

fn run_worker(
    worker_idx: usize,
    factory: &dyn ProviderFactory,
    jobs: Receiver<PathBuf>,
    results: Sender<ScanResult>,
    cancel: &CancelToken,
) {
    // Owned for the worker's lifetime; dropped (and shut down) on exit or unwind.
    let mut provider: Box<dyn MetadataProvider> = match factory.create() {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(worker = worker_idx, error = %e, "metadata provider unavailable, scanning without metadata");
            Box::new(NoMetadata)
        }
    };

    for path in jobs.iter() {
        if cancel.is_cancelled() {
            break;
        }
        let descriptor = match describe_file(&path, provider.as_mut()) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping file");
                None
            }
        };
        if results.send((path, descriptor)).is_err() {
            break;
        }
    }
}
