use std::path::Path;

use anyhow::{Context, Result};
use photosort_core::config::Config;
use photosort_core::Library;

use super::progress::PhaseBars;

pub fn run(source: &Path, target: &Path, dry_run: bool, config: Config) -> Result<()> {
    let source_lib = Library::open(source, config.clone())
        .with_context(|| format!("opening source library {}", source.display()))?;
    let mut target_lib = Library::open(target, config)
        .with_context(|| format!("opening target library {}", target.display()))?;

    let stats = {
        let mut bars = PhaseBars::new();
        target_lib.sync_from(&source_lib, dry_run, Some(&mut |p| bars.handle(p)))?
    };

    let verb = if stats.dry_run { "would be " } else { "" };
    println!();
    println!(
        "  Media: {} {verb}added, {} already present",
        stats.media_added, stats.media_present
    );
    println!(
        "  Sidecars: {} {verb}added, {} {verb}updated",
        stats.sidecars_added, stats.sidecars_updated
    );
    if stats.conflicts > 0 {
        println!(
            "  {} skipped: the target holds a different file at the same place (see log)",
            stats.conflicts
        );
    }
    if stats.copy_failures > 0 {
        println!("  {} copies failed (see log)", stats.copy_failures);
    }
    println!();
    if stats.dry_run {
        println!("  Dry run: the target was not changed.");
        return Ok(());
    }
    super::print_count(&target_lib)
}
