//! Label-delimited field extraction over free text.
//!
//! A field's value runs from the end of its label to the start of the next
//! recognized label (or end of text). The `regex` crate has no lookahead, so
//! instead of a delimiting pattern we locate every label first and slice
//! between consecutive hits.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Specs
// ---------------------------------------------------------------------------

/// A `(key, label)` pair: where the label matches, its value is stored under `key`.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: Regex,
}

impl FieldSpec {
    /// Build a spec whose label is any of the `|`-separated alternatives,
    /// followed by a colon.
    ///
    /// Leading list/heading markers and `**` emphasis around the label are
    /// consumed with it, so they never leak into the previous value.
    ///
    /// # Panics
    ///
    /// If `alternatives` is not a valid regex fragment.
    pub fn labeled(key: &'static str, alternatives: &str) -> Self {
        let pattern = format!(
            r"(?im)(?:^[ \t]*(?:[-*][ \t]+|#{{1,6}}[ \t]+|\d+[.)][ \t]+)?)?\*{{0,2}}\b(?:{alternatives})\b\*{{0,2}}[ \t]*:[ \t]*\*{{0,2}}"
        );
        Self {
            key,
            label: Regex::new(&pattern).expect("valid label regex"),
        }
    }
}

/// Where repeated records start, plus the fields to pull out of each record body.
///
/// `start` must have a `name` capture group; an optional `detail` group
/// captures inline text on the start line (e.g. a parenthesized period).
#[derive(Debug, Clone)]
pub struct RecordSpec {
    pub start: Regex,
    pub fields: Vec<FieldSpec>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Extracted `key -> value` pairs, in spec order. Absent keys were not found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedSection {
    fields: Vec<(String, String)>,
}

impl ExtractedSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn insert(&mut self, key: &str, value: String) {
        if !value.is_empty() && self.get(key).is_none() {
            self.fields.push((key.to_string(), value));
        }
    }
}

/// One repeated record found in free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub detail: Option<String>,
    pub fields: ExtractedSection,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract every labeled field from `text`. Never fails; unmatched labels are omitted.
pub fn extract_fields(text: &str, specs: &[FieldSpec]) -> ExtractedSection {
    // (spec index, label start, label end)
    let mut hits: Vec<(usize, usize, usize)> = specs
        .iter()
        .enumerate()
        .filter_map(|(i, spec)| spec.label.find(text).map(|m| (i, m.start(), m.end())))
        .collect();
    hits.sort_by_key(|&(_, start, _)| start);

    // Drop labels nested inside an earlier label's match.
    let mut kept: Vec<(usize, usize, usize)> = Vec::with_capacity(hits.len());
    for hit in hits {
        match kept.last() {
            Some(&(_, _, prev_end)) if hit.1 < prev_end => continue,
            _ => kept.push(hit),
        }
    }

    let mut values: Vec<(usize, String)> = kept
        .iter()
        .enumerate()
        .map(|(n, &(spec_idx, _, end))| {
            let value_end = kept.get(n + 1).map_or(text.len(), |&(_, next, _)| next);
            (spec_idx, clean_value(&text[end..value_end]))
        })
        .collect();
    values.sort_by_key(|&(spec_idx, _)| spec_idx);

    let mut section = ExtractedSection::default();
    for (spec_idx, value) in values {
        section.insert(specs[spec_idx].key, value);
    }
    section
}

/// Apply `spec.start` repeatedly, slicing the text into one body per record.
///
/// Records with no recognized field are dropped: a bare heading is not a record.
pub fn extract_records(text: &str, spec: &RecordSpec) -> Vec<Record> {
    let starts: Vec<regex::Captures<'_>> = spec.start.captures_iter(text).collect();

    starts
        .iter()
        .enumerate()
        .filter_map(|(n, caps)| {
            let whole = caps.get(0)?;
            let name = clean_value(caps.name("name")?.as_str());
            if name.is_empty() {
                return None;
            }
            let body_end = starts
                .get(n + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let fields = extract_fields(&text[whole.end()..body_end], &spec.fields);
            if fields.is_empty() {
                return None;
            }
            let detail = caps
                .name("detail")
                .map(|m| clean_value(m.as_str()))
                .filter(|d| !d.is_empty());
            Some(Record {
                name,
                detail,
                fields,
            })
        })
        .collect()
}

/// Trim whitespace and stray emphasis/list markers from a sliced value.
fn clean_value(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '-' || c == '#')
        .to_string()
}

/// Find the first key matching any alias, ignoring case and separators
/// (`phAdjustment`, `ph_adjustment` and `PH Adjustment` all match `phadjustment`).
pub(crate) fn lookup<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    obj.iter()
        .find(|(key, _)| {
            let folded: String = key
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_lowercase())
                .collect();
            aliases.contains(&folded.as_str())
        })
        .map(|(_, value)| value)
}

/// Flatten a JSON value into display text. Arrays join with `", "`.
pub(crate) fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(json_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => Some(value.to_string()),
    }
}
