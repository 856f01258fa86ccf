use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ── Header fields ────────────────────────────────────────────────────────────

/// A header field value.
///
/// The set is deliberately closed so encoding stays deterministic:
/// non-boolean scalars (numbers, nulls) are carried as strings, lists hold
/// string items. Nested structures are outside the supported header subset
/// and rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    String(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Textual form for display and edit staging.
    pub fn as_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::String(s) => s.clone(),
            Self::List(items) => items.join(", "),
        }
    }
}

/// Coerce the literal boolean forms accepted in headers.
pub(crate) fn coerce_bool_literal(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// One parsed header entry.
///
/// `raw` holds the exact source text of the entry (key line plus any
/// continuation lines, no trailing newline). It is regenerated only when the
/// value changes, which is what makes untouched fields re-encode
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderField {
    pub name: String,
    pub value: FieldValue,
    pub raw: String,
}

// ── Raw document ─────────────────────────────────────────────────────────────

/// A losslessly parsed skill document: ordered header entries plus the body,
/// carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawDocument {
    /// Comment and blank lines preceding the first header entry, verbatim.
    pub leading: Vec<String>,
    /// Header entries in document order.
    pub fields: Vec<HeaderField>,
    /// Everything after the closing marker and its separating blank line.
    pub body: String,
}

impl RawDocument {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Update a field in place, or append it when not present yet.
    /// A no-op when the field already holds `value`, preserving its source
    /// bytes.
    pub fn set(&mut self, name: &str, value: FieldValue) -> Result<()> {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            if field.value == value {
                return Ok(());
            }
            field.raw = crate::parse::render_entry(name, &value)?;
            field.value = value;
            return Ok(());
        }
        let raw = crate::parse::render_entry(name, &value)?;
        self.fields.push(HeaderField {
            name: name.to_string(),
            value,
            raw,
        });
        Ok(())
    }

    /// Remove a field. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f.name != name);
        self.fields.len() != before
    }
}

// ── Validated metadata ───────────────────────────────────────────────────────

pub const FIELD_NAME: &str = "name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_LICENSE: &str = "license";
pub const FIELD_COMPATIBILITY: &str = "compatibility";
/// Canonical spelling of the invocability flag; the underscore form is
/// accepted as an alias.
pub const FIELD_USER_INVOCABLE: &str = "user-invocable";
pub(crate) const USER_INVOCABLE_KEYS: [&str; 2] = ["user-invocable", "user_invocable"];

/// Validated view over a document's header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMetadata {
    /// Skill name; doubles as the registry key.
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub compatibility: Option<String>,
    /// Whether the skill may be invoked directly by the user.
    #[serde(default)]
    pub user_invocable: bool,
    /// Header fields outside the known schema, carried verbatim.
    #[serde(default)]
    pub extra_fields: Vec<HeaderField>,
}

impl SkillMetadata {
    /// Validate header fields against the known schema.
    ///
    /// Checks run in schema order and the first violation wins, naming the
    /// failing field. Everything outside the known set passes through to
    /// `extra_fields` unvalidated.
    pub fn validate(fields: &[HeaderField]) -> Result<Self> {
        let name = require_text(fields, FIELD_NAME)?;
        let description = require_text(fields, FIELD_DESCRIPTION)?;

        let user_invocable = match lookup_any(fields, &USER_INVOCABLE_KEYS) {
            None => false,
            Some(FieldValue::Bool(b)) => *b,
            Some(FieldValue::String(s)) => coerce_bool_literal(s).ok_or_else(|| {
                Error::validation(
                    FIELD_USER_INVOCABLE,
                    format!("expected one of yes/no/true/false/1/0, got '{s}'"),
                )
            })?,
            Some(FieldValue::List(_)) => {
                return Err(Error::validation(
                    FIELD_USER_INVOCABLE,
                    "expected one of yes/no/true/false/1/0, got a list",
                ));
            },
        };

        let license = optional_text(fields, FIELD_LICENSE)?;
        let compatibility = optional_text(fields, FIELD_COMPATIBILITY)?;

        let extra_fields = fields
            .iter()
            .filter(|f| !is_known_field(&f.name))
            .cloned()
            .collect();

        Ok(Self {
            name,
            description,
            license,
            compatibility,
            user_invocable,
            extra_fields,
        })
    }
}

fn is_known_field(name: &str) -> bool {
    name == FIELD_NAME
        || name == FIELD_DESCRIPTION
        || name == FIELD_LICENSE
        || name == FIELD_COMPATIBILITY
        || USER_INVOCABLE_KEYS.contains(&name)
}

fn lookup<'a>(fields: &'a [HeaderField], name: &str) -> Option<&'a FieldValue> {
    fields.iter().find(|f| f.name == name).map(|f| &f.value)
}

fn lookup_any<'a>(fields: &'a [HeaderField], names: &[&str]) -> Option<&'a FieldValue> {
    names.iter().find_map(|n| lookup(fields, n))
}

/// A required text field: present, a string scalar, non-empty after trim.
fn require_text(fields: &[HeaderField], key: &'static str) -> Result<String> {
    match lookup(fields, key) {
        None => Err(Error::validation(key, "missing")),
        Some(FieldValue::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(Error::validation(key, "must not be empty"))
            } else {
                Ok(trimmed.to_string())
            }
        },
        Some(other) => Err(Error::validation(
            key,
            format!("must be text, got {other:?}"),
        )),
    }
}

/// An optional text field; empty after trim normalizes to absent.
fn optional_text(fields: &[HeaderField], key: &'static str) -> Result<Option<String>> {
    match lookup(fields, key) {
        None => Ok(None),
        Some(FieldValue::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        },
        Some(other) => Err(Error::validation(
            key,
            format!("must be text, got {other:?}"),
        )),
    }
}

// ── Registry entries ─────────────────────────────────────────────────────────

/// Read-only registry entry handed out to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInfo {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub compatibility: Option<String>,
    #[serde(default)]
    pub user_invocable: bool,
    /// The backing skill file.
    pub path: PathBuf,
    pub parsed_at_ms: u64,
}

impl SkillInfo {
    pub(crate) fn from_metadata(meta: &SkillMetadata, path: &Path) -> Self {
        Self {
            name: meta.name.clone(),
            description: meta.description.clone(),
            license: meta.license.clone(),
            compatibility: meta.compatibility.clone(),
            user_invocable: meta.user_invocable,
            path: path.to_path_buf(),
            parsed_at_ms: now_ms(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Per-file failure recorded during a scan, surfaced alongside the
/// successful set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanError {
    pub path: PathBuf,
    pub reason: String,
}
