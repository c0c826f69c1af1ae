use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Enumerates candidate source files below a set of root directories.
#[derive(Debug, Clone)]
pub struct PathScanner {
    extensions: Vec<String>,
}

impl PathScanner {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Scan every root in order. Files of a later root come after files of an
    /// earlier one, which is what gives later directories precedence on
    /// identifier collisions.
    pub fn scan_roots(&self, roots: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in roots {
            files.extend(self.scan_directory(root));
        }
        files
    }

    /// Recursively collect canonical paths of matching regular files under `root`.
    ///
    /// Symlinks are followed; walkdir refuses to descend into an ancestor of the
    /// current entry, so link cycles end in an error entry instead of recursion.
    pub fn scan_directory(&self, root: &Path) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if err.loop_ancestor().is_some() {
                        tracing::debug!(error = %err, "skipping symlink cycle");
                    } else {
                        tracing::debug!(error = %err, "skipping unreadable entry");
                    }
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.has_valid_extension(entry.path()) {
                continue;
            }

            let path = match fs::canonicalize(entry.path()) {
                Ok(path) => path,
                Err(err) => {
                    tracing::debug!(path = %entry.path().display(), error = %err, "failed to canonicalize");
                    continue;
                }
            };

            if seen.insert(path.clone()) {
                files.push(path);
            }
        }

        files
    }

    fn has_valid_extension(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}
