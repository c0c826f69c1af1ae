use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

/// Canonical identifier -> absolute path of the declaring file.
pub type SymbolRecord = BTreeMap<String, PathBuf>;

/// File path -> modification time in milliseconds since the Unix epoch.
pub type FreshnessRecord = BTreeMap<PathBuf, u64>;

/// Result of one scan of a directory set; the unit of cache persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub symbols: SymbolRecord,
    #[serde(default)]
    pub freshness: FreshnessRecord,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, identifier: &str) -> Option<&PathBuf> {
        self.symbols.get(&canonicalize_identifier(identifier))
    }

    /// Record a declaration. Any earlier record for the same identifier is
    /// replaced.
    pub fn insert_symbol(&mut self, identifier: &str, path: PathBuf) {
        self.symbols.insert(canonicalize_identifier(identifier), path);
    }

    /// Group identifiers by the file that declares them.
    pub fn symbols_by_file(&self) -> HashMap<&Path, Vec<&str>> {
        let mut by_file: HashMap<&Path, Vec<&str>> = HashMap::new();
        for (identifier, path) in &self.symbols {
            by_file
                .entry(path.as_path())
                .or_default()
                .push(identifier.as_str());
        }
        by_file
    }

    /// Normalize a snapshot read from disk: re-canonicalize keys and drop
    /// symbols whose file has no freshness record.
    pub fn into_consistent(self) -> Self {
        let Snapshot { symbols, freshness } = self;
        let before = symbols.len();
        let symbols: SymbolRecord = symbols
            .into_iter()
            .filter(|(_, path)| freshness.contains_key(path))
            .map(|(identifier, path)| (canonicalize_identifier(&identifier), path))
            .collect();

        if symbols.len() != before {
            tracing::debug!(
                dropped = before - symbols.len(),
                "dropped cached symbols without freshness records"
            );
        }

        Snapshot { symbols, freshness }
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.freshness.is_empty()
    }
}

/// Case-fold an identifier and strip a leading namespace separator.
///
/// Applied both when the index is built and when it is probed.
pub fn canonicalize_identifier(identifier: &str) -> String {
    identifier.trim_start_matches('\\').to_ascii_lowercase()
}

/// Cache key derived from the ordered list of scanned directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// JSON array of the directories in order. Paths that aren't valid UTF-8
    /// can't be written as JSON strings; those sets fall back to the `Debug`
    /// form, which escapes the raw bytes so distinct paths stay distinct.
    pub fn of(directories: &[PathBuf]) -> Self {
        let encoded =
            serde_json::to_string(directories).unwrap_or_else(|_| format!("{:?}", directories));
        Fingerprint(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
