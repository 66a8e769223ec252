use std::path::Path;

use anyhow::{Context, Result};
use photosort_core::config::Config;
use photosort_core::Library;

use super::progress::PhaseBars;

pub fn run(library: &Path, config: Config) -> Result<()> {
    let mut library = Library::open(library, config)
        .with_context(|| format!("opening library {}", library.display()))?;

    let stats = {
        let mut bars = PhaseBars::new();
        library.update(Some(&mut |p| bars.handle(p)))?
    };

    println!();
    println!(
        "  Removed {} missing media, {} missing sidecars",
        stats.media_removed, stats.sidecars_removed
    );
    println!("  Refreshed {} edited sidecars", stats.sidecars_refreshed);
    super::import::print_stats(&stats.import);
    println!();
    super::print_count(&library)
}
