use std::path::Path;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use photosort_core::config::Config;
use photosort_core::domain::format_timestamp;
use photosort_core::Library;

const HASH_PREFIX: usize = 12;

pub fn run(library: &Path, config: Config) -> Result<()> {
    let library = Library::open(library, config)?;
    let media = library.list()?;

    if media.is_empty() {
        println!("  Library is empty.");
        return super::print_count(&library);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Created"),
        Cell::new("Directory"),
        Cell::new("File"),
        Cell::new("Type"),
        Cell::new("Sidecars"),
        Cell::new("Hash"),
    ]);

    for m in &media {
        let sidecars = m
            .sidecars
            .iter()
            .map(|s| s.filename.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let hash = m.hash.get(..HASH_PREFIX).unwrap_or(&m.hash);
        table.add_row(vec![
            Cell::new(format_timestamp(&m.created)),
            Cell::new(&m.relpath),
            Cell::new(&m.filename),
            Cell::new(&m.file_type),
            Cell::new(sidecars),
            Cell::new(hash),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    super::print_count(&library)
}
