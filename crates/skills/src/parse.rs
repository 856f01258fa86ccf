//! Lossless codec for the skill-document header format.
//!
//! A skill document is `---`-delimited YAML frontmatter followed by a
//! free-form body:
//!
//! ```text
//! ---
//! name: review
//! description: Review the current diff
//! ---
//!
//! Instructions here.
//! ```
//!
//! The supported header subset is a top-level mapping with plain string keys
//! starting at column zero, whose values are scalars or block sequences of
//! scalars. Each entry keeps its exact source text, so fields that are never
//! edited re-encode byte-for-byte — including fields no schema knows about.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::{
    error::{Error, Result},
    types::{FieldValue, HeaderField, RawDocument, SkillMetadata},
};

/// Frontmatter delimiter line.
pub const MARKER: &str = "---";

/// Parse document text into a [`RawDocument`].
///
/// Pure; `path` is error context only. Fails with [`Error::Malformed`] when
/// either marker is missing, the header is not a key-value block, or a value
/// falls outside the supported subset.
pub fn parse(content: &str, path: &Path) -> Result<RawDocument> {
    let lines: Vec<&str> = content.split('\n').collect();
    if lines.first().map(|l| l.trim_end()) != Some(MARKER) {
        return Err(Error::malformed(path, "missing opening --- marker"));
    }

    let close = lines[1..]
        .iter()
        .position(|l| l.trim_end() == MARKER)
        .map(|i| i + 1)
        .ok_or_else(|| Error::malformed(path, "missing closing --- marker"))?;

    let (leading, fields) = parse_header(&lines[1..close], path)?;

    // One blank line after the closing marker separates header from body.
    let mut body_start = close + 1;
    if lines.get(body_start).is_some_and(|l| l.is_empty()) {
        body_start += 1;
    }
    let body = if body_start < lines.len() {
        lines[body_start..].join("\n")
    } else {
        String::new()
    };

    Ok(RawDocument {
        leading,
        fields,
        body,
    })
}

/// Re-emit a document: opening marker, header entries in order (verbatim for
/// untouched entries), closing marker, one blank line, body verbatim.
///
/// Deterministic: encoding the same document twice produces identical bytes.
#[must_use]
pub fn encode(doc: &RawDocument) -> String {
    let mut out = String::with_capacity(doc.body.len() + 128);
    out.push_str(MARKER);
    out.push('\n');
    for line in &doc.leading {
        out.push_str(line);
        out.push('\n');
    }
    for field in &doc.fields {
        out.push_str(&field.raw);
        out.push('\n');
    }
    out.push_str(MARKER);
    out.push('\n');
    out.push('\n');
    out.push_str(&doc.body);
    out
}

/// Parse and validate in one step; what a registry scan runs per file.
pub fn parse_metadata(content: &str, path: &Path) -> Result<SkillMetadata> {
    let doc = parse(content, path)?;
    SkillMetadata::validate(&doc.fields)
}

/// Canonical serialization of one header entry, used when a field's value
/// changes or a new field is appended. No trailing newline.
pub(crate) fn render_entry(name: &str, value: &FieldValue) -> Result<String> {
    let mut mapping = Mapping::new();
    mapping.insert(Value::String(name.to_string()), yaml_value(value));
    let rendered = serde_yaml::to_string(&mapping)?;
    Ok(rendered.trim_end_matches('\n').to_string())
}

fn yaml_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::List(items) => {
            Value::Sequence(items.iter().cloned().map(Value::String).collect())
        },
    }
}

// ── Header block parsing ─────────────────────────────────────────────────────

fn parse_header(lines: &[&str], path: &Path) -> Result<(Vec<String>, Vec<HeaderField>)> {
    let text = lines.join("\n");
    let parsed: Value = serde_yaml::from_str(&text)
        .map_err(|e| Error::malformed(path, format!("header is not a key-value block: {e}")))?;
    let mapping = match parsed {
        Value::Null => Mapping::new(),
        Value::Mapping(m) => m,
        _ => return Err(Error::malformed(path, "header is not a key-value block")),
    };

    // Group source lines by top-level entry so each field keeps its exact
    // bytes. Continuation lines, list items, and interior comments attach to
    // the entry they follow; anything before the first entry is `leading`.
    let mut leading = Vec::new();
    let mut groups: Vec<Vec<&str>> = Vec::new();
    for line in lines {
        if starts_entry(line) {
            groups.push(vec![line]);
        } else if let Some(current) = groups.last_mut() {
            current.push(line);
        } else {
            leading.push((*line).to_string());
        }
    }
    if groups.len() != mapping.len() {
        return Err(Error::malformed(
            path,
            "unsupported header layout: expected one top-level `key: value` entry per line",
        ));
    }

    let mut fields = Vec::with_capacity(groups.len());
    for ((key, value), group) in mapping.into_iter().zip(groups) {
        let Value::String(name) = key else {
            return Err(Error::malformed(path, "header keys must be plain strings"));
        };
        let value = field_value(value)
            .map_err(|reason| Error::malformed(path, format!("field '{name}': {reason}")))?;
        fields.push(HeaderField {
            name,
            value,
            raw: group.join("\n"),
        });
    }
    Ok((leading, fields))
}

/// Whether a header line opens a new top-level mapping entry.
fn starts_entry(line: &str) -> bool {
    let Some(first) = line.chars().next() else {
        return false;
    };
    !first.is_whitespace() && first != '#' && first != '-' && line.contains(':')
}

fn field_value(value: Value) -> std::result::Result<FieldValue, String> {
    match value {
        Value::Null => Ok(FieldValue::String(String::new())),
        Value::Bool(b) => Ok(FieldValue::Bool(b)),
        Value::Number(n) => Ok(FieldValue::String(n.to_string())),
        Value::String(s) => Ok(FieldValue::String(s)),
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => out.push(s),
                    Value::Bool(b) => out.push(b.to_string()),
                    Value::Number(n) => out.push(n.to_string()),
                    _ => return Err("lists may only contain scalars".into()),
                }
            }
            Ok(FieldValue::List(out))
        },
        Value::Mapping(_) => Err("nested mappings are not supported".into()),
        Value::Tagged(_) => Err("tagged values are not supported".into()),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "---\nname: review\ndescription: Review the current diff\nlicense: MIT\nallowed-tools:\n- Bash\n- Read\nhomepage:    https://example.com/review\n---\n\n# Review\n\nLook at the diff and comment.\n";

    fn p(content: &str) -> RawDocument {
        parse(content, Path::new("/skills/review/SKILL.md")).unwrap()
    }

    #[test]
    fn parses_fields_in_document_order() {
        let doc = p(DOC);
        let names: Vec<&str> = doc.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["name", "description", "license", "allowed-tools", "homepage"]
        );
        assert_eq!(
            doc.get("allowed-tools"),
            Some(&FieldValue::List(vec!["Bash".into(), "Read".into()]))
        );
        assert_eq!(doc.body, "# Review\n\nLook at the diff and comment.\n");
    }

    #[test]
    fn encode_of_well_formed_input_is_byte_identical() {
        assert_eq!(encode(&p(DOC)), DOC);
    }

    #[test]
    fn round_trip_law() {
        let once = p(DOC);
        let twice = p(&encode(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn encode_is_deterministic() {
        let doc = p(DOC);
        assert_eq!(encode(&doc), encode(&doc));
    }

    #[test]
    fn quirky_spacing_in_unknown_fields_survives() {
        let doc = p(DOC);
        let homepage = doc.fields.iter().find(|f| f.name == "homepage").unwrap();
        assert_eq!(homepage.raw, "homepage:    https://example.com/review");
    }

    #[test]
    fn comments_are_preserved() {
        let content =
            "---\n# managed by hand\nname: x\ndescription: y\n# trailing note\n---\n\nbody\n";
        let doc = p(content);
        assert_eq!(doc.leading, vec!["# managed by hand"]);
        // The trailing comment belongs to the entry it follows.
        assert_eq!(
            doc.fields[1].raw,
            "description: y\n# trailing note"
        );
        assert_eq!(encode(&doc), content);
    }

    #[test]
    fn missing_opening_marker() {
        let err = parse("name: x\n", Path::new("/p")).unwrap_err();
        assert!(matches!(err, Error::Malformed { .. }));
        assert!(err.to_string().contains("opening"));
    }

    #[test]
    fn missing_closing_marker() {
        let err = parse("---\nname: x\n", Path::new("/p")).unwrap_err();
        assert!(err.to_string().contains("closing"));
    }

    #[test]
    fn non_mapping_header_rejected() {
        assert!(parse("---\n- just\n- a list\n---\n\nbody\n", Path::new("/p")).is_err());
    }

    #[test]
    fn nested_mapping_rejected_naming_the_key() {
        let err = parse(
            "---\nname: x\nmetadata:\n  nested: true\n---\n\nbody\n",
            Path::new("/p"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("metadata"));
    }

    #[test]
    fn scalar_typing() {
        let doc = p("---\nname: x\nversion: 2\nenabled: true\nempty:\n---\n\nb\n");
        assert_eq!(doc.get("version"), Some(&FieldValue::String("2".into())));
        assert_eq!(doc.get("enabled"), Some(&FieldValue::Bool(true)));
        assert_eq!(doc.get("empty"), Some(&FieldValue::String(String::new())));
    }

    #[test]
    fn empty_header_parses() {
        let doc = p("---\n---\n\nonly a body\n");
        assert!(doc.fields.is_empty());
        assert_eq!(doc.body, "only a body\n");
    }

    #[test]
    fn body_without_separating_blank_line_is_tolerated() {
        let doc = p("---\nname: x\n---\nimmediate body\n");
        assert_eq!(doc.body, "immediate body\n");
        // Re-encoding normalizes to the one-blank-line convention.
        let again = p(&encode(&doc));
        assert_eq!(again.body, doc.body);
    }

    #[test]
    fn extra_blank_lines_belong_to_the_body() {
        let content = "---\nname: x\n---\n\n\nbody after two blanks\n";
        let doc = p(content);
        assert_eq!(doc.body, "\nbody after two blanks\n");
        assert_eq!(encode(&doc), content);
    }

    #[test]
    fn render_entry_forms() {
        assert_eq!(
            render_entry("license", &FieldValue::String("MIT".into())).unwrap(),
            "license: MIT"
        );
        assert_eq!(
            render_entry("user-invocable", &FieldValue::Bool(true)).unwrap(),
            "user-invocable: true"
        );
        let list = render_entry(
            "allowed-tools",
            &FieldValue::List(vec!["Bash".into(), "Read".into()]),
        )
        .unwrap();
        // Whatever the exact layout, it must parse back to the same value.
        let reparsed = p(&format!("---\n{list}\n---\n\nb\n"));
        assert_eq!(
            reparsed.get("allowed-tools"),
            Some(&FieldValue::List(vec!["Bash".into(), "Read".into()]))
        );
    }

    #[test]
    fn rendered_ambiguous_strings_stay_strings() {
        let raw = render_entry("compatibility", &FieldValue::String("true".into())).unwrap();
        let doc = p(&format!("---\n{raw}\n---\n\nb\n"));
        assert_eq!(
            doc.get("compatibility"),
            Some(&FieldValue::String("true".into()))
        );
    }

    #[test]
    fn parse_metadata_composes_validation() {
        let meta = parse_metadata(DOC, Path::new("/p")).unwrap();
        assert_eq!(meta.name, "review");
        assert_eq!(meta.license.as_deref(), Some("MIT"));
        assert_eq!(meta.extra_fields.len(), 2); // allowed-tools, homepage
    }

    #[test]
    fn duplicate_keys_rejected() {
        assert!(parse("---\nname: a\nname: b\n---\n\nb\n", Path::new("/p")).is_err());
    }
}
