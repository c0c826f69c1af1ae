use std::path::PathBuf;

/// Broad class of an [`AutoloadError`], used by callers that only care whether
/// they misconfigured the autoloader or the cache location is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    CacheIo,
}

/// Fatal errors surfaced by the registration surface and cache construction.
///
/// File access problems during a rescan and resolution misses are not errors:
/// the former are logged and skipped, the latter are a plain `false`.
#[derive(Debug, thiserror::Error)]
pub enum AutoloadError {
    #[error("directory '{}' does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("cannot change an autoloader that is already registered")]
    AlreadyRegistered,

    #[error("there are no directories to scan")]
    NoDirectories,

    #[error("cache path '{}' is not a directory", .0.display())]
    CacheDirMissing(PathBuf),

    #[error("cache directory '{}' is not writable: {source}", .path.display())]
    CacheDirNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AutoloadError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AutoloadError::MissingDirectory(_)
            | AutoloadError::AlreadyRegistered
            | AutoloadError::NoDirectories => ErrorCategory::Configuration,
            AutoloadError::CacheDirMissing(_) | AutoloadError::CacheDirNotWritable { .. } => {
                ErrorCategory::CacheIo
            }
        }
    }
}

pub type AutoloadResult<T> = Result<T, AutoloadError>;
