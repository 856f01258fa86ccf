//! Skill-document management core: lossless header codec, validated
//! metadata, discovery, a snapshot-swapped registry, and atomic edit
//! sessions.
//!
//! Skills are directories containing a `SKILL.md` file: YAML frontmatter
//! (name, description, and friends) above free-form markdown instructions.
//! The registry discovers and indexes them; an edit session changes known
//! header fields without disturbing the body, unknown fields, or field
//! order anywhere else in the file.

pub mod discover;
pub mod edit;
pub mod error;
pub mod parse;
pub mod registry;
pub mod types;
#[cfg(feature = "file-watcher")]
pub mod watcher;

pub use {
    discover::{FsSkillDiscoverer, SKILL_FILE, SkillDiscoverer},
    edit::{EditSession, EditableField},
    error::{Error, Result},
    registry::SkillRegistry,
    types::{FieldValue, HeaderField, RawDocument, ScanError, SkillInfo, SkillMetadata},
};
