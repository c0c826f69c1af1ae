use anyhow::Result;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use super::snapshot::Snapshot;
use crate::parsers::DeclarationExtractor;

/// How a scanned file relates to the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// No previous record: always extracted.
    New,
    /// Recorded mtime equals the current one: previous mappings are reused.
    Unchanged,
    /// Recorded mtime differs (newer or older): re-extracted.
    Modified,
}

impl FileState {
    pub fn needs_extraction(self) -> bool {
        !matches!(self, FileState::Unchanged)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RebuildStats {
    pub reused: usize,
    pub extracted: usize,
    pub skipped: usize,
}

/// Decides, per file, whether declarations must be re-extracted or can be
/// carried over from the previous snapshot.
pub struct FreshnessTracker<'a> {
    previous: &'a Snapshot,
}

impl<'a> FreshnessTracker<'a> {
    pub fn new(previous: &'a Snapshot) -> Self {
        Self { previous }
    }

    /// Reuse happens only on an exact timestamp match. A timestamp that moved
    /// backwards (restored backup, checkout) is treated as a change too.
    pub fn classify(&self, path: &Path, current_mtime: u64) -> FileState {
        match self.previous.freshness.get(path) {
            None => FileState::New,
            Some(&recorded) if recorded == current_mtime => FileState::Unchanged,
            Some(_) => FileState::Modified,
        }
    }

    /// Build a fresh snapshot for `files`, given in scan order.
    ///
    /// Later files overwrite earlier ones on identifier collisions. Files whose
    /// metadata or contents can't be read are dropped from the result.
    ///
    /// A reused file only carries the identifiers it was credited with. When a
    /// credited file vanished or changed and its identifiers did not stay with
    /// it, an unchanged file may hold a declaration it lost in a collision, so
    /// every file is extracted again.
    pub fn rebuild(
        &self,
        files: &[PathBuf],
        extractor: &dyn DeclarationExtractor,
    ) -> (Snapshot, RebuildStats) {
        let (snapshot, stats) = self.build(files, extractor, false);
        let displaced = self.displaced_identifiers(&snapshot);
        if displaced == 0 {
            return (snapshot, stats);
        }

        tracing::debug!(displaced, "re-extracting reused files to recover shadowed declarations");
        self.build(files, extractor, true)
    }

    /// Identifiers whose previous file is gone or changed and which no longer
    /// point at that file.
    fn displaced_identifiers(&self, rebuilt: &Snapshot) -> usize {
        self.previous
            .symbols
            .iter()
            .filter(|(identifier, path)| {
                let fresh = rebuilt.freshness.get(*path) == self.previous.freshness.get(*path);
                !fresh && rebuilt.symbols.get(*identifier) != Some(*path)
            })
            .count()
    }

    fn build(
        &self,
        files: &[PathBuf],
        extractor: &dyn DeclarationExtractor,
        extract_all: bool,
    ) -> (Snapshot, RebuildStats) {
        let mut stats = RebuildStats::default();

        let planned: Vec<(&PathBuf, u64, bool)> = files
            .iter()
            .filter_map(|path| match modification_time(path) {
                Ok(mtime) => {
                    let extract = extract_all || self.classify(path, mtime).needs_extraction();
                    Some((path, mtime, extract))
                }
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "skipping file without metadata");
                    stats.skipped += 1;
                    None
                }
            })
            .collect();

        // Extraction is the expensive part; the merge below stays sequential so
        // collision order is the scan order.
        let extracted: Vec<Option<Vec<String>>> = planned
            .par_iter()
            .map(|&(path, _, extract)| {
                if !extract {
                    return None;
                }
                match fs::read_to_string(path) {
                    Ok(source) => Some(extractor.extract(&source)),
                    Err(err) => {
                        tracing::debug!(path = %path.display(), error = %err, "skipping unreadable file");
                        None
                    }
                }
            })
            .collect();

        let previous_by_file = self.previous.symbols_by_file();
        let mut snapshot = Snapshot::new();

        for ((path, mtime, extract), declarations) in planned.into_iter().zip(extracted) {
            if extract {
                let Some(declarations) = declarations else {
                    stats.skipped += 1;
                    continue;
                };
                for identifier in &declarations {
                    snapshot.insert_symbol(identifier, path.clone());
                }
                stats.extracted += 1;
            } else {
                if let Some(identifiers) = previous_by_file.get(path.as_path()) {
                    for identifier in identifiers {
                        snapshot.insert_symbol(identifier, path.clone());
                    }
                }
                stats.reused += 1;
            }
            snapshot.freshness.insert(path.clone(), mtime);
        }

        (snapshot, stats)
    }
}

/// Modification time of `path` in milliseconds since the Unix epoch.
pub fn modification_time(path: &Path) -> Result<u64> {
    let modified = fs::metadata(path)?.modified()?;
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    Ok(u64::try_from(millis).unwrap_or(u64::MAX))
}
