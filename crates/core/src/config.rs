use serde::{Deserialize, Serialize};

/// Which metadata provider the scan workers use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    /// In-process EXIF parsing.
    #[default]
    Exif,
    /// One `exiftool -stay_open` process per worker.
    ExifTool,
}

impl MetadataBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataBackend::Exif => "exif",
            MetadataBackend::ExifTool => "exiftool",
        }
    }
}

impl std::fmt::Display for MetadataBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine settings shared by import, update and sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan worker count.
    pub workers: usize,
    /// Capacity of the bounded path queue feeding the workers.
    pub queue_capacity: usize,
    pub metadata: MetadataBackend,
    /// Run the copy phase on the rayon pool instead of the calling thread.
    pub parallel_copy: bool,
}

impl Config {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.queue_capacity = self.workers * 4;
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataBackend) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_parallel_copy(mut self, parallel_copy: bool) -> Self {
        self.parallel_copy = parallel_copy;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let workers = default_workers();
        Self {
            workers,
            queue_capacity: workers * 4,
            metadata: MetadataBackend::default(),
            parallel_copy: false,
        }
    }
}

/// Twice the available hardware parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(2)
}
