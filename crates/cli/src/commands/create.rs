use std::path::Path;

use anyhow::Result;
use photosort_core::config::Config;
use photosort_core::Library;

pub fn run(library: &Path, config: Config) -> Result<()> {
    let library = Library::create(library, config)?;
    println!("Created library at {}", library.root().display());
    super::print_count(&library)
}
