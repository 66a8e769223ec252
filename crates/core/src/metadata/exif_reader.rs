use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{Field, In, Tag, Value};

use super::{MetadataFields, MetadataProvider, ProviderFactory};
use crate::error::Result;

/// In-process EXIF reader. Reports no MIME type.
pub struct ExifReader {
    reader: exif::Reader,
}

impl ExifReader {
    pub fn new() -> Self {
        Self {
            reader: exif::Reader::new(),
        }
    }
}

impl Default for ExifReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataProvider for ExifReader {
    fn extract(&mut self, path: &Path) -> Result<MetadataFields> {
        let mut fields = MetadataFields {
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            ..Default::default()
        };

        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let exif = match self.reader.read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(exif::Error::Io(e)) => return Err(e.into()),
            // No container or no EXIF block: an empty bag, not a failure.
            Err(_) => return Ok(fields),
        };

        fields.create_date = exif
            .get_field(Tag::DateTimeDigitized, In::PRIMARY)
            .and_then(ascii_value);
        fields.date_time_original = exif
            .get_field(Tag::DateTimeOriginal, In::PRIMARY)
            .and_then(ascii_value);
        Ok(fields)
    }
}

/// Raw ASCII value (`YYYY:MM:DD HH:MM:SS`), not the hyphenated display form.
fn ascii_value(field: &Field) -> Option<String> {
    match field.value {
        Value::Ascii(ref parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ExifReaderFactory;

impl ProviderFactory for ExifReaderFactory {
    fn create(&self) -> Result<Box<dyn MetadataProvider>> {
        Ok(Box::new(ExifReader::new()))
    }
}
