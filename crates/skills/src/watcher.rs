//! Filesystem watcher for skill roots.
//!
//! Detection only: emits debounced events naming the skill files that were
//! created, modified, or deleted so the embedding application can run
//! `scan` or `invalidate`. The watcher never mutates the registry itself.

use std::{path::PathBuf, time::Duration};

use {
    notify_debouncer_full::{
        DebounceEventResult, Debouncer, RecommendedCache, new_debouncer,
        notify::{EventKind, RecursiveMode},
    },
    tokio::sync::mpsc,
    tracing::{info, warn},
};

use crate::{
    discover::SKILL_FILE,
    error::{Error, Result},
};

/// A debounced batch of skill files that changed on disk.
#[derive(Debug, Clone)]
pub struct SkillWatchEvent {
    pub paths: Vec<PathBuf>,
}

/// Watches skill roots for skill-file changes.
pub struct SkillWatcher {
    _debouncer: Debouncer<notify_debouncer_full::notify::RecommendedWatcher, RecommendedCache>,
}

impl SkillWatcher {
    /// Watch `roots` and return the event receiver. Roots that do not exist
    /// yet are skipped. The watcher must be kept alive (not dropped) for
    /// events to keep flowing.
    pub fn start(roots: &[PathBuf]) -> Result<(Self, mpsc::UnboundedReceiver<SkillWatchEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(
            Duration::from_millis(500),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let mut changed: Vec<PathBuf> = Vec::new();
                    for event in events {
                        if !matches!(
                            event.kind,
                            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                        ) {
                            continue;
                        }
                        for path in &event.paths {
                            let is_skill_file =
                                path.file_name().and_then(|n| n.to_str()) == Some(SKILL_FILE);
                            if is_skill_file && !changed.contains(path) {
                                changed.push(path.clone());
                            }
                        }
                    }
                    if !changed.is_empty() {
                        let _ = tx.send(SkillWatchEvent { paths: changed });
                    }
                },
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "skill watcher error");
                    }
                },
            },
        )
        .map_err(|e| Error::Watcher(e.to_string()))?;

        for root in roots {
            if root.exists() {
                debouncer
                    .watch(root, RecursiveMode::Recursive)
                    .map_err(|e| Error::Watcher(e.to_string()))?;
                info!(root = %root.display(), "watching skills root");
            }
        }

        Ok((
            Self {
                _debouncer: debouncer,
            },
            rx,
        ))
    }
}
