use std::path::Path;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use photosort_core::config::Config;
use photosort_core::domain::format_timestamp;
use photosort_core::Library;

pub fn run(library: &Path, config: Config) -> Result<()> {
    let library = Library::open(library, config)?;
    let summary = library.summary()?;

    println!();
    println!("  Library");
    println!("  -------");
    println!("   Root:     {}", library.root().display());
    println!("   Media:    {:>8}", summary.media);
    println!("   Sidecars: {:>8}", summary.sidecars);
    if let (Some(oldest), Some(newest)) = (summary.oldest, summary.newest) {
        println!(
            "   Range:    {} to {}",
            format_timestamp(&oldest),
            format_timestamp(&newest)
        );
    }

    if !summary.by_type.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![Cell::new("Type"), Cell::new("Media")]);
        for (file_type, count) in &summary.by_type {
            table.add_row(vec![Cell::new(file_type), Cell::new(count)]);
        }
        println!();
        println!("  By type");
        println!("  -------");
        println!("{table}");
    }
    println!();
    Ok(())
}
