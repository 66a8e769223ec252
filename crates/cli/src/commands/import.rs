use std::path::Path;

use anyhow::{Context, Result};
use photosort_core::config::Config;
use photosort_core::domain::{ImportOptions, ImportStats};
use photosort_core::Library;

use super::progress::PhaseBars;

pub fn run(source: &Path, library: &Path, options: ImportOptions, config: Config) -> Result<()> {
    let mut library = Library::open(library, config)
        .with_context(|| format!("opening library {}", library.display()))?;

    let stats = {
        let mut bars = PhaseBars::new();
        library.import(source, options, Some(&mut |p| bars.handle(p)))?
    };

    println!();
    print_stats(&stats);
    println!();
    if stats.dry_run {
        println!("  Dry run: nothing was recorded or copied.");
        return Ok(());
    }
    super::print_count(&library)
}

pub(crate) fn print_stats(stats: &ImportStats) {
    let verb = if stats.dry_run { "would be " } else { "" };
    println!(
        "  Scanned {} files: {} media, {} unique",
        stats.files_scanned, stats.media_found, stats.unique
    );
    println!(
        "  Media: {} {verb}added, {} {verb}renamed, {} unchanged",
        stats.media_added, stats.media_renamed, stats.media_unchanged
    );
    println!(
        "  Sidecars: {} {verb}added, {} {verb}updated",
        stats.sidecars_added, stats.sidecars_updated
    );
    if stats.conflicts > 0 {
        println!(
            "  {} skipped: a different file already holds the same name and date (see log)",
            stats.conflicts
        );
    }
    println!(
        "  Copies: {} {verb}copied, {} skipped, {} failed",
        stats.copy.copied, stats.copy.skipped, stats.copy.failed
    );
}
