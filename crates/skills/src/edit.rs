//! Single-document edit transactions.
//!
//! An [`EditSession`] loads one skill document fresh from disk, stages
//! changes to the known header fields, and persists them atomically. The
//! merge happens inside the originally parsed document, so the body, every
//! unknown field, and the relative order of untouched fields come out of a
//! save byte-for-byte unchanged.

use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    parse,
    registry::SkillRegistry,
    types::{
        FIELD_COMPATIBILITY, FIELD_DESCRIPTION, FIELD_LICENSE, FIELD_NAME, FIELD_USER_INVOCABLE,
        FieldValue, RawDocument, SkillInfo, SkillMetadata, USER_INVOCABLE_KEYS,
        coerce_bool_literal,
    },
};

/// The five header fields an edit session may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableField {
    Name,
    Description,
    License,
    Compatibility,
    UserInvocable,
}

impl EditableField {
    /// Canonical on-disk key.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Name => FIELD_NAME,
            Self::Description => FIELD_DESCRIPTION,
            Self::License => FIELD_LICENSE,
            Self::Compatibility => FIELD_COMPATIBILITY,
            Self::UserInvocable => FIELD_USER_INVOCABLE,
        }
    }

    /// Accepted on-disk spellings, canonical first.
    fn keys(self) -> &'static [&'static str] {
        match self {
            Self::UserInvocable => &USER_INVOCABLE_KEYS,
            Self::Name => &[FIELD_NAME],
            Self::Description => &[FIELD_DESCRIPTION],
            Self::License => &[FIELD_LICENSE],
            Self::Compatibility => &[FIELD_COMPATIBILITY],
        }
    }
}

/// A transient editing transaction over one skill document, bounded by
/// open → save/drop.
///
/// A session that is dropped without a completed [`save`](Self::save) has no
/// observable effect.
#[derive(Debug)]
pub struct EditSession {
    path: PathBuf,
    original: RawDocument,
    staged: Vec<(EditableField, String)>,
}

impl EditSession {
    /// Load a document for editing.
    ///
    /// Always reads fresh from disk, bypassing any registry cache, so a
    /// concurrent external edit is picked up rather than clobbered. The
    /// header is not validated here: a document with, say, an empty
    /// description must still be openable so it can be repaired.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::io(&path, e))?;
        let original = parse::parse(&content, &path)?;
        Ok(Self {
            path,
            original,
            staged: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Effective textual value of a field: the staged change when present,
    /// otherwise what the document holds. Unvalidated, so interim state can
    /// be displayed freely.
    pub fn field(&self, field: EditableField) -> Option<String> {
        if let Some((_, staged)) = self.staged.iter().find(|(f, _)| *f == field) {
            return Some(staged.clone());
        }
        field
            .keys()
            .iter()
            .find_map(|k| self.original.get(k))
            .map(FieldValue::as_text)
    }

    /// Stage a change to one known field. Validation is deferred to
    /// [`save`](Self::save).
    pub fn set_field(&mut self, field: EditableField, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.staged.iter_mut().find(|(f, _)| *f == field) {
            entry.1 = value;
        } else {
            self.staged.push((field, value));
        }
    }

    /// Validate the staged changes, merge them into the originally parsed
    /// document, and persist atomically.
    ///
    /// On validation failure the file on disk is untouched. A validated name
    /// change is a rename: it fails with [`Error::NameConflict`] before
    /// anything is written when the new name belongs to a different
    /// document. The write goes to a temporary file in the same directory
    /// which then replaces the original, so no partial document is ever
    /// observable. Finishes by refreshing the registry (re-keying on rename)
    /// and returning the fresh entry.
    pub async fn save(&mut self, registry: &SkillRegistry) -> Result<SkillInfo> {
        let merged = self.merged_document()?;
        let meta = SkillMetadata::validate(&merged.fields)?;

        if let Some(existing) = registry.get(&meta.name)
            && existing.path != self.path
        {
            return Err(Error::NameConflict {
                name: meta.name,
                existing: existing.path,
            });
        }

        let encoded = parse::encode(&merged);
        let tmp = self.path.with_extension("md.tmp");
        tokio::fs::write(&tmp, &encoded)
            .await
            .map_err(|e| Error::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::io(&self.path, e))?;

        let info = registry.refresh_path(&self.path).await?;
        self.original = merged;
        self.staged.clear();
        Ok(info)
    }

    /// The original document with staged changes applied.
    fn merged_document(&self) -> Result<RawDocument> {
        let mut doc = self.original.clone();
        for (field, staged) in &self.staged {
            // Update whichever spelling the document already uses; append
            // under the canonical key otherwise.
            let key = field
                .keys()
                .iter()
                .copied()
                .find(|k| doc.get(k).is_some())
                .unwrap_or_else(|| field.key());
            let trimmed = staged.trim();

            match field {
                EditableField::License | EditableField::Compatibility if trimmed.is_empty() => {
                    // Empty optional normalizes to absent.
                    doc.remove(key);
                },
                EditableField::UserInvocable => {
                    let value = match coerce_bool_literal(trimmed) {
                        Some(b) => FieldValue::Bool(b),
                        // Left as text for validation to reject by name.
                        None => FieldValue::String(trimmed.to_string()),
                    };
                    doc.set(key, value)?;
                },
                _ => {
                    doc.set(key, FieldValue::String(trimmed.to_string()))?;
                },
            }
        }
        Ok(doc)
    }
}
