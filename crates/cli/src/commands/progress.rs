use std::path::Path;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use photosort_core::{Phase, Progress};

fn active_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "  {bar:30.cyan/blue} {spinner:.green} {pos:>5}/{len:<5} {prefix:.dim} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("━╸─")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.green} {prefix:.dim} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn done_style() -> ProgressStyle {
    ProgressStyle::with_template("  {bar:30.green} {prefix:.green} {msg:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// One bar per phase; a finished bar stays on screen in the done style.
pub struct PhaseBars {
    mp: MultiProgress,
    active: Option<ProgressBar>,
    current_len: u64,
}

impl PhaseBars {
    pub fn new() -> Self {
        Self {
            mp: MultiProgress::new(),
            active: None,
            current_len: 0,
        }
    }

    fn start(&mut self, prefix: &'static str, len: Option<u64>) {
        self.clear();
        let pb = match len {
            Some(len) => {
                let pb = self.mp.add(ProgressBar::new(len));
                pb.set_style(active_style());
                pb
            }
            None => {
                let pb = self.mp.add(ProgressBar::new_spinner());
                pb.set_style(spinner_style());
                pb
            }
        };
        self.current_len = len.unwrap_or(0);
        pb.set_prefix(prefix);
        pb.enable_steady_tick(Duration::from_millis(80));
        self.active = Some(pb);
    }

    fn tick(&self, msg: String) {
        if let Some(ref pb) = self.active {
            pb.set_message(msg);
            pb.inc(1);
        }
    }

    fn finish(&mut self, msg: String) {
        if let Some(pb) = self.active.take() {
            pb.set_style(done_style());
            pb.set_prefix("done");
            pb.finish_with_message(msg);
        }
    }

    fn clear(&mut self) {
        if let Some(pb) = self.active.take() {
            pb.finish_and_clear();
            self.mp.remove(&pb);
        }
    }

    pub fn handle(&mut self, progress: Progress) {
        match progress {
            Progress::ScanStart { file_count } => {
                self.start("Scanning", Some(file_count as u64));
            }
            Progress::FileScanned { path } => self.tick(file_label(&path)),
            Progress::ReconcileStart { media_count } => {
                self.start("Cataloguing", None);
                if let Some(ref pb) = self.active {
                    pb.set_message(format!("{media_count} unique media"));
                }
            }
            Progress::CopyStart { file_count } => {
                self.start("Copying", Some(file_count as u64));
            }
            Progress::FileCopied { path } => self.tick(file_label(&path)),
            Progress::SyncStart { media_count } => {
                self.start("Syncing", Some(media_count as u64));
            }
            Progress::MediaSynced { filename } => self.tick(filename),
            Progress::PhaseComplete { phase } => {
                let n = self.current_len;
                match phase {
                    Phase::Scan => self.finish(format!("Scanned {n} files")),
                    Phase::Reconcile => self.finish("Catalog updated".to_string()),
                    Phase::Copy => self.finish(format!("Processed {n} copies")),
                    Phase::Sync => self.finish(format!("Synced {n} media")),
                    Phase::Cull => {
                        self.clear();
                        self.mp.println("  Culled missing files").ok();
                    }
                }
            }
        }
    }
}

impl Drop for PhaseBars {
    fn drop(&mut self) {
        self.clear();
    }
}
