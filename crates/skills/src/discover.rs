//! Enumeration of candidate skill documents on the filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

/// File name that marks a directory as holding a skill document.
pub const SKILL_FILE: &str = "SKILL.md";

/// Produces the candidate files a registry scan should consider.
///
/// Implementations own the directory-listing convention; the registry only
/// needs a path-sorted list of candidates, which is also the fixed order
/// that makes name-collision detection deterministic.
#[async_trait]
pub trait SkillDiscoverer: Send + Sync {
    async fn discover(&self) -> Result<Vec<PathBuf>>;
}

/// Default filesystem discoverer: each immediate subdirectory of a root that
/// holds a `SKILL.md` is one candidate.
pub struct FsSkillDiscoverer {
    roots: Vec<PathBuf>,
}

impl FsSkillDiscoverer {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Project-local skills root under `cwd`.
    pub fn project_root(cwd: &Path) -> PathBuf {
        cwd.join(".satchel/skills")
    }

    /// Personal skills root in the platform data directory.
    pub fn personal_root() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "satchel").map(|d| d.data_dir().join("skills"))
    }

    /// Default search roots: project-local first, then personal.
    pub fn default_roots(cwd: &Path) -> Vec<PathBuf> {
        let mut roots = vec![Self::project_root(cwd)];
        if let Some(personal) = Self::personal_root() {
            roots.push(personal);
        }
        roots
    }
}

#[async_trait]
impl SkillDiscoverer for FsSkillDiscoverer {
    async fn discover(&self) -> Result<Vec<PathBuf>> {
        let mut candidates = Vec::new();
        for root in &self.roots {
            if !root.is_dir() {
                continue;
            }
            let entries = match std::fs::read_dir(root) {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(root = %root.display(), %e, "skipping unreadable skills root");
                    continue;
                },
            };
            for entry in entries.flatten() {
                let dir = entry.path();
                if !dir.is_dir() {
                    continue;
                }
                let skill_file = dir.join(SKILL_FILE);
                if skill_file.is_file() {
                    candidates.push(skill_file);
                }
            }
        }
        candidates.sort();
        Ok(candidates)
    }
}
