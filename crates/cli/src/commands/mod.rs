pub mod create;
pub mod import;
pub mod info;
pub mod ls;
pub mod progress;
pub mod sync;
pub mod update;

use photosort_core::Library;

pub(crate) fn print_count(library: &Library) -> anyhow::Result<()> {
    let count = library.count()?;
    println!("  {count} media in {}", library.root().display());
    Ok(())
}
