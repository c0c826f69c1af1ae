use std::path::{Path, PathBuf};

/// Suffixes scanned when no explicit extension list is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".php", ".inc"];

/// Namespace used to prefix cache file names unless overridden.
pub const DEFAULT_CACHE_NAMESPACE: &str = "autoscan";

/// On-disk encoding of cached snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheFormat {
    #[default]
    Json,
    Bincode,
}

/// Externally tunable parameters of an [`Autoloader`](crate::core::Autoloader).
#[derive(Debug, Clone)]
pub struct AutoloaderConfig {
    pub cache_dir: PathBuf,
    pub namespace: Option<String>,
    pub extensions: Vec<String>,
    pub cache_format: CacheFormat,
}

impl AutoloaderConfig {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            namespace: Some(DEFAULT_CACHE_NAMESPACE.to_string()),
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            cache_format: CacheFormat::default(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn without_namespace(mut self) -> Self {
        self.namespace = None;
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cache_format(mut self, format: CacheFormat) -> Self {
        self.cache_format = format;
        self
    }
}
