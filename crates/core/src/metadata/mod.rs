//! Metadata providers: per-file field bags used for classification and dating.
//!
//! A provider is owned by exactly one scan worker for the worker's lifetime.
//! Workers obtain theirs from a shared [`ProviderFactory`] and drop it on exit,
//! which is where external processes get shut down.

pub mod exif_reader;
pub mod exiftool;

use std::path::Path;

use chrono::NaiveDateTime;

use crate::config::MetadataBackend;
use crate::error::Result;

/// Date layout used by EXIF `CreateDate` and `DateTimeOriginal`.
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// The fields the scanner understands. Anything else a provider reports is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFields {
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub create_date: Option<String>,
    pub date_time_original: Option<String>,
}

impl MetadataFields {
    /// Whether the MIME type names an image or video. `false` when absent.
    pub fn has_media_mime(&self) -> bool {
        self.mime_type
            .as_deref()
            .map(|m| {
                let m = m.to_ascii_lowercase();
                m.contains("image") || m.contains("video")
            })
            .unwrap_or(false)
    }

    /// `CreateDate`, then `DateTimeOriginal`; the first one that parses wins.
    pub fn creation_timestamp(&self) -> Option<NaiveDateTime> {
        [&self.create_date, &self.date_time_original]
            .into_iter()
            .flatten()
            .find_map(|s| parse_exif_date(s))
    }
}

pub fn parse_exif_date(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), EXIF_DATE_FORMAT).ok()
}

/// Extracts metadata for one file at a time. Not shared between threads.
pub trait MetadataProvider: Send {
    fn extract(&mut self, path: &Path) -> Result<MetadataFields>;
}

/// Hands out one private provider per scan worker.
pub trait ProviderFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn MetadataProvider>>;
}

/// Factory for the configured backend.
pub fn factory_for(backend: MetadataBackend) -> Box<dyn ProviderFactory> {
    match backend {
        MetadataBackend::Exif => Box::new(exif_reader::ExifReaderFactory),
        MetadataBackend::ExifTool => Box::new(exiftool::ExifToolFactory::default()),
    }
}

/// Provider that never reports anything. Stands in when a worker's real
/// provider cannot be started, so classification falls back to extensions.
#[derive(Debug, Default)]
pub struct NoMetadata;

impl MetadataProvider for NoMetadata {
    fn extract(&mut self, _path: &Path) -> Result<MetadataFields> {
        Ok(MetadataFields::default())
    }
}
