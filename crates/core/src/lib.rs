pub mod cancel;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod drift;
pub mod error;
pub mod hasher;
pub mod import;
pub mod metadata;
pub mod resolve;
pub mod scanner;
pub mod sync;

use std::fmt;
use std::path::{Path, PathBuf};

use cancel::CancelToken;
use catalog::Catalog;
use config::Config;
use domain::*;
use error::{Error, Result};
use import::Importer;
use metadata::ProviderFactory;

/// Pipeline stage named in [`Progress::PhaseComplete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scan,
    Reconcile,
    Copy,
    Cull,
    Sync,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Scan => "scan",
            Phase::Reconcile => "reconcile",
            Phase::Copy => "copy",
            Phase::Cull => "cull",
            Phase::Sync => "sync",
        };
        f.write_str(name)
    }
}

/// Callback events for long-running library operations.
/// Always delivered on the calling thread.
#[derive(Debug)]
pub enum Progress {
    /// Scanning is about to start over this many files.
    ScanStart { file_count: usize },
    /// A file has been scanned (whether or not it turned out to be media).
    FileScanned { path: PathBuf },
    /// Catalog reconciliation is starting for this many unique media.
    ReconcileStart { media_count: usize },
    /// Copying is about to start over this many queued files.
    CopyStart { file_count: usize },
    /// A queued copy finished (copied, skipped or failed).
    FileCopied { path: PathBuf },
    /// Sync is starting over this many source records.
    SyncStart { media_count: usize },
    MediaSynced { filename: String },
    PhaseComplete { phase: Phase },
}

/// A library root together with its catalog.
pub struct Library {
    root: PathBuf,
    catalog: Catalog,
    config: Config,
    factory: Box<dyn ProviderFactory>,
    cancel: CancelToken,
}

impl Library {
    /// Create a new, empty library at `root`, creating the directory if needed.
    pub fn create(root: &Path, config: Config) -> Result<Self> {
        if root.exists() && !root.is_dir() {
            return Err(Error::NotADirectory(root.to_path_buf()));
        }
        let catalog = Catalog::create(root)?;
        tracing::info!(root = %root.display(), "created library");
        Ok(Self::with_catalog(root, catalog, config))
    }

    /// Open the library at `root`.
    pub fn open(root: &Path, config: Config) -> Result<Self> {
        check_dir(root)?;
        let catalog = Catalog::open(root)?;
        Ok(Self::with_catalog(root, catalog, config))
    }

    fn with_catalog(root: &Path, catalog: Catalog, config: Config) -> Self {
        let factory = metadata::factory_for(config.metadata);
        Self {
            root: root.to_path_buf(),
            catalog,
            config,
            factory,
            cancel: CancelToken::new(),
        }
    }

    /// Replace the metadata provider factory chosen from the config.
    pub fn with_metadata_factory(mut self, factory: Box<dyn ProviderFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Token that cancels this library's running operations when triggered.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Import `source` into this library.
    pub fn import(
        &mut self,
        source: &Path,
        options: ImportOptions,
        progress_cb: Option<&mut dyn FnMut(Progress)>,
    ) -> Result<ImportStats> {
        check_dir(source)?;
        let importer = Importer {
            factory: self.factory.as_ref(),
            config: &self.config,
            cancel: &self.cancel,
        };
        importer.run(&mut self.catalog, &self.root, source, options, progress_cb)
    }

    /// Reconcile the catalog with the library's files on disk.
    pub fn update(&mut self, progress_cb: Option<&mut dyn FnMut(Progress)>) -> Result<UpdateStats> {
        check_dir(&self.root)?;
        let importer = Importer {
            factory: self.factory.as_ref(),
            config: &self.config,
            cancel: &self.cancel,
        };
        drift::update(&importer, &mut self.catalog, &self.root, progress_cb)
    }

    /// Additively merge everything in `source` into this library. A dry run
    /// reports what would be added and leaves this library untouched.
    pub fn sync_from(
        &mut self,
        source: &Library,
        dry_run: bool,
        progress_cb: Option<&mut dyn FnMut(Progress)>,
    ) -> Result<SyncStats> {
        sync::sync(
            &source.catalog,
            &source.root,
            &mut self.catalog,
            &self.root,
            dry_run,
            &self.cancel,
            progress_cb,
        )
    }

    pub fn list(&self) -> Result<Vec<MediaRecord>> {
        self.catalog.list_all()
    }

    pub fn count(&self) -> Result<usize> {
        self.catalog.count()
    }

    pub fn summary(&self) -> Result<LibrarySummary> {
        self.catalog.summary()
    }
}

fn check_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::PathNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(Error::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}
