use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("metadata output could not be decoded: {0}")]
    MetadataDecode(#[from] serde_json::Error),

    #[error("metadata extraction failed for {}: {message}", .path.display())]
    Metadata { path: PathBuf, message: String },

    #[error("path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("a library already exists at {}", .0.display())]
    LibraryExists(PathBuf),

    #[error("no library found at {} (missing library.db)", .0.display())]
    LibraryNotFound(PathBuf),

    #[error("catalog schema version {db} is newer than supported version {code}")]
    SchemaTooNew { db: i64, code: i64 },

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
