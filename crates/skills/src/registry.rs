//! Read-optimized index of discovered skill documents.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use crate::{
    discover::{FsSkillDiscoverer, SkillDiscoverer},
    error::{Error, Result},
    parse,
    types::{ScanError, SkillInfo},
};

/// Immutable view of one completed scan.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    skills: BTreeMap<String, SkillInfo>,
    errors: Vec<ScanError>,
}

/// Registry of skill documents under the configured roots.
///
/// The cached state is a snapshot replaced wholesale on every update, so
/// concurrent readers observe either the previous or the next state, never a
/// partially applied one. Reads (`list`, `get`, `scan_errors`) are pure and
/// do no I/O.
pub struct SkillRegistry {
    discoverer: Box<dyn SkillDiscoverer>,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl SkillRegistry {
    pub fn new(discoverer: Box<dyn SkillDiscoverer>) -> Self {
        Self {
            discoverer,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    /// Registry over the default filesystem discoverer.
    pub fn for_roots(roots: Vec<PathBuf>) -> Self {
        Self::new(Box::new(FsSkillDiscoverer::new(roots)))
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn swap_in(&self, next: Snapshot) {
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(next);
    }

    /// Rebuild the cached set from the discoverer's candidates.
    ///
    /// Idempotent; replaces the entire snapshot. A document that fails to
    /// read, parse, or validate is recorded as a [`ScanError`] and never
    /// aborts the scan. When two documents validate to the same name, the
    /// first in path order wins and the second is recorded as a collision.
    pub async fn scan(&self) -> Result<()> {
        let candidates = self.discoverer.discover().await?;
        let mut next = Snapshot::default();

        for path in candidates {
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(path = %path.display(), %e, "failed to read skill file");
                    next.errors.push(ScanError {
                        reason: Error::io(&path, e).to_string(),
                        path,
                    });
                    continue;
                },
            };
            match parse::parse_metadata(&content, &path) {
                Ok(meta) => {
                    if let Some(existing) = next.skills.get(&meta.name) {
                        tracing::warn!(
                            name = %meta.name,
                            first = %existing.path.display(),
                            second = %path.display(),
                            "duplicate skill name",
                        );
                        next.errors.push(ScanError {
                            reason: format!(
                                "duplicate skill name '{}', first defined at {}",
                                meta.name,
                                existing.path.display()
                            ),
                            path,
                        });
                        continue;
                    }
                    next.skills
                        .insert(meta.name.clone(), SkillInfo::from_metadata(&meta, &path));
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), %e, "skipping non-conforming skill");
                    next.errors.push(ScanError {
                        reason: e.to_string(),
                        path,
                    });
                },
            }
        }

        self.swap_in(next);
        Ok(())
    }

    /// All entries, sorted by name. Pure read.
    pub fn list(&self) -> Vec<SkillInfo> {
        self.current().skills.values().cloned().collect()
    }

    /// One entry by name. Pure read.
    pub fn get(&self, name: &str) -> Option<SkillInfo> {
        self.current().skills.get(name).cloned()
    }

    /// Per-file errors recorded by the last scan and later invalidations.
    pub fn scan_errors(&self) -> Vec<ScanError> {
        self.current().errors.clone()
    }

    /// Re-parse a single entry's file after it changed on disk.
    ///
    /// The entry is updated in place, re-keyed when the file now validates
    /// under a different name, or removed when the file is gone or no longer
    /// parses (the failure, if any, is recorded like a scan error).
    pub async fn invalidate(&self, name: &str) {
        let Some(info) = self.get(name) else {
            return;
        };
        if let Err(e) = self.refresh_path(&info.path).await {
            let missing = matches!(
                &e,
                Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
            );
            if !missing {
                tracing::warn!(path = %info.path.display(), %e, "invalidated skill no longer parses");
            }
            let mut next = (*self.current()).clone();
            next.skills.retain(|_, i| i.path != info.path);
            next.errors.retain(|err| err.path != info.path);
            if !missing {
                next.errors.push(ScanError {
                    path: info.path.clone(),
                    reason: e.to_string(),
                });
            }
            self.swap_in(next);
        }
    }

    /// Parse one file and splice the result into the snapshot, dropping any
    /// entry previously keyed under a different name for the same path.
    ///
    /// Fails with [`Error::NameConflict`] when the parsed name is already
    /// claimed by a different path; the snapshot is left untouched then.
    pub async fn refresh_path(&self, path: &Path) -> Result<SkillInfo> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io(path, e))?;
        let meta = parse::parse_metadata(&content, path)?;

        let mut next = (*self.current()).clone();
        if let Some(existing) = next.skills.get(&meta.name)
            && existing.path != path
        {
            return Err(Error::NameConflict {
                name: meta.name,
                existing: existing.path.clone(),
            });
        }
        next.skills.retain(|_, info| info.path != path);
        next.errors.retain(|err| err.path != path);

        let info = SkillInfo::from_metadata(&meta, path);
        next.skills.insert(info.name.clone(), info.clone());
        self.swap_in(next);
        Ok(info)
    }
}
