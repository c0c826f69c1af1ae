pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod freshness;
pub mod resolver;
pub mod scanner;
pub mod snapshot;

pub use cache::CacheStore;
pub use chain::{ResolverChain, SymbolResolver};
pub use config::{AutoloaderConfig, CacheFormat};
pub use error::{AutoloadError, AutoloadResult, ErrorCategory};
pub use freshness::{FileState, FreshnessTracker, RebuildStats};
pub use resolver::{Autoloader, IncludeGuard, Materializer, SourceMaterializer};
pub use scanner::PathScanner;
pub use snapshot::{canonicalize_identifier, Fingerprint, Snapshot};
