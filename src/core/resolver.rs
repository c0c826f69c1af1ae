use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::cache::CacheStore;
use super::chain::{ResolverChain, SymbolResolver};
use super::config::AutoloaderConfig;
use super::error::{AutoloadError, AutoloadResult};
use super::freshness::FreshnessTracker;
use super::scanner::PathScanner;
use super::snapshot::{canonicalize_identifier, Fingerprint, Snapshot};
use crate::parsers::{DeclarationExtractor, PhpDeclarationExtractor};

/// Brings a resolved file into the running process.
pub trait Materializer {
    fn materialize(&mut self, path: &Path) -> Result<()>;
}

/// Default materializer: keeps loaded sources in memory, in load order.
#[derive(Debug, Default)]
pub struct SourceMaterializer {
    loaded: Vec<PathBuf>,
    sources: HashMap<PathBuf, String>,
}

impl SourceMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every file materialized so far, oldest first.
    pub fn loaded(&self) -> &[PathBuf] {
        &self.loaded
    }

    pub fn source(&self, path: &Path) -> Option<&str> {
        self.sources.get(path).map(String::as_str)
    }
}

impl Materializer for SourceMaterializer {
    fn materialize(&mut self, path: &Path) -> Result<()> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        self.loaded.push(path.to_path_buf());
        self.sources.insert(path.to_path_buf(), source);
        Ok(())
    }
}

/// Files already materialized by one autoloader. Never persisted.
#[derive(Debug, Default)]
pub struct IncludeGuard {
    included: HashSet<PathBuf>,
}

impl IncludeGuard {
    pub fn contains(&self, path: &Path) -> bool {
        self.included.contains(path)
    }

    /// Returns `false` if the file was already present.
    pub fn insert(&mut self, path: &Path) -> bool {
        self.included.insert(path.to_path_buf())
    }

    pub fn remove(&mut self, path: &Path) {
        self.included.remove(path);
    }

    pub fn len(&self) -> usize {
        self.included.len()
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }
}

/// Lazily maps declared type names to the files declaring them.
///
/// Directories are added first, then the autoloader is registered, which
/// loads the cached index for that exact directory list. A lookup miss
/// triggers at most one rescan per autoloader lifetime.
pub struct Autoloader<M: Materializer = SourceMaterializer> {
    cache: CacheStore,
    scanner: PathScanner,
    extractor: Box<dyn DeclarationExtractor>,
    materializer: M,
    directories: Vec<PathBuf>,
    fingerprint: Option<Fingerprint>,
    snapshot: Snapshot,
    guard: IncludeGuard,
    registered: bool,
    rescan_count: usize,
}

impl Autoloader<SourceMaterializer> {
    pub fn new(config: AutoloaderConfig) -> AutoloadResult<Self> {
        Self::with_materializer(config, SourceMaterializer::new())
    }
}

impl<M: Materializer> Autoloader<M> {
    pub fn with_materializer(config: AutoloaderConfig, materializer: M) -> AutoloadResult<Self> {
        let cache = CacheStore::new(
            &config.cache_dir,
            config.namespace.as_deref(),
            config.cache_format,
        )?;

        Ok(Self {
            cache,
            scanner: PathScanner::new(config.extensions),
            extractor: Box::new(PhpDeclarationExtractor::new()),
            materializer,
            directories: Vec::new(),
            fingerprint: None,
            snapshot: Snapshot::new(),
            guard: IncludeGuard::default(),
            registered: false,
            rescan_count: 0,
        })
    }

    /// Swap the declaration grammar. Only meaningful before the first rescan.
    pub fn with_extractor(mut self, extractor: Box<dyn DeclarationExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn add_directory(&mut self, path: impl AsRef<Path>) -> AutoloadResult<&mut Self> {
        if self.registered {
            return Err(AutoloadError::AlreadyRegistered);
        }

        let path = path.as_ref();
        if !path.is_dir() {
            return Err(AutoloadError::MissingDirectory(path.to_path_buf()));
        }

        let directory = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.directories.push(directory);
        Ok(self)
    }

    /// Lock the directory set and load its cached index.
    pub fn register(&mut self) -> AutoloadResult<()> {
        if self.registered {
            return Err(AutoloadError::AlreadyRegistered);
        }
        if self.directories.is_empty() {
            return Err(AutoloadError::NoDirectories);
        }

        let fingerprint = Fingerprint::of(&self.directories);
        self.snapshot = match self.cache.load::<Snapshot>(fingerprint.as_str()) {
            Ok(Some(snapshot)) => snapshot.into_consistent(),
            Ok(None) => Snapshot::new(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable index cache");
                Snapshot::new()
            }
        };

        tracing::debug!(
            directories = self.directories.len(),
            symbols = self.snapshot.symbols.len(),
            "autoloader registered"
        );

        self.fingerprint = Some(fingerprint);
        self.registered = true;
        Ok(())
    }

    /// Register and install this autoloader as the next member of `chain`.
    pub fn register_with(mut self, chain: &mut ResolverChain) -> AutoloadResult<()>
    where
        M: 'static,
    {
        self.register()?;
        chain.append(self);
        Ok(())
    }

    /// Make the file declaring `identifier` available, rescanning at most once
    /// per autoloader if the cached index doesn't know the name.
    pub fn resolve(&mut self, identifier: &str) -> bool {
        if !self.registered {
            return false;
        }

        let key = canonicalize_identifier(identifier);
        if self.try_include(&key) {
            return true;
        }

        self.refresh() && self.try_include(&key)
    }

    /// Run the one rescan this autoloader is allowed, if it hasn't happened
    /// yet. Returns whether a rescan ran.
    pub fn refresh(&mut self) -> bool {
        if !self.registered || self.has_rescanned() {
            return false;
        }
        self.rescan();
        true
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn has_rescanned(&self) -> bool {
        self.rescan_count > 0
    }

    pub fn rescan_count(&self) -> usize {
        self.rescan_count
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn included_files(&self) -> &IncludeGuard {
        &self.guard
    }

    pub fn materializer(&self) -> &M {
        &self.materializer
    }

    fn try_include(&mut self, key: &str) -> bool {
        let Some(path) = self.snapshot.symbols.get(key).cloned() else {
            return false;
        };

        if self.guard.contains(&path) {
            return true;
        }

        // Guard first so a file that references its own declarations while
        // loading is not loaded twice.
        self.guard.insert(&path);
        match self.materializer.materialize(&path) {
            Ok(()) => true,
            Err(err) => {
                self.guard.remove(&path);
                tracing::warn!(path = %path.display(), error = %err, "failed to materialize");
                false
            }
        }
    }

    fn rescan(&mut self) {
        let files = self.scanner.scan_roots(&self.directories);
        let (snapshot, stats) =
            FreshnessTracker::new(&self.snapshot).rebuild(&files, self.extractor.as_ref());

        tracing::info!(
            language = self.extractor.language_name(),
            files = files.len(),
            reused = stats.reused,
            extracted = stats.extracted,
            skipped = stats.skipped,
            symbols = snapshot.symbols.len(),
            "rescanned directories"
        );

        self.snapshot = snapshot;
        self.rescan_count += 1;

        if let Some(fingerprint) = &self.fingerprint {
            if let Err(err) = self.cache.save(fingerprint.as_str(), &self.snapshot) {
                tracing::warn!(error = %err, "failed to persist index cache");
            }
        }
    }
}

impl<M: Materializer> SymbolResolver for Autoloader<M> {
    fn resolve(&mut self, name: &str) -> bool {
        Autoloader::resolve(self, name)
    }
}
