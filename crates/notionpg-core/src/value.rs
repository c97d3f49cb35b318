//! Value normalization: one raw page property into a canonical in-memory
//! value.
//!
//! Pure — no I/O, no side effects. The per-kind rules mirror what the
//! upstream API actually emits, including two quirk fixes: signed storage
//! URLs lose their (short-lived) query string, and computed date payloads
//! that land exactly on midnight UTC are truncated to bare calendar dates.

use serde::Deserialize;

use crate::error::{ImportError, Result};
use crate::notion::wire::{DateSpec, Formula, Property, Rollup};

/// Notion-hosted uploads carry signed URLs whose auth token expires within
/// hours; not worth storing.
const SIGNED_STORAGE_HOST: &str = "/secure.notion-static.com/";

/// Suffix the API appends when it renders a pure date as a datetime.
const MIDNIGHT_UTC_SUFFIX: &str = "T00:00:00.000+00:00";

/// A numeric value, preserving whether the upstream sent an integer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_json(n: &serde_json::Number) -> Self {
        match n.as_i64() {
            Some(i) => Self::Int(i),
            // u64-only or fractional; either way it is not an i64.
            None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
        }
    }
}

/// Canonical in-memory value of one property for one page.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text-like kinds: title, rich_text, select, url, email, phone_number.
    Text(Option<String>),
    Number(Option<Num>),
    /// Multi-select labels; always a list, even if empty.
    TextList(Vec<String>),
    /// Start/end bounds, both ISO-8601. `end: None` means a single point.
    Date {
        start: Option<String>,
        end: Option<String>,
    },
    /// people / relation: UUIDs of referenced objects.
    IdList(Vec<String>),
    /// files: attachment URLs.
    UrlList(Vec<String>),
    Bool(bool),
    /// created_time / last_edited_time page metadata.
    Timestamp(String),
    /// created_by / last_edited_by page metadata.
    Id(String),
    /// formula / rollup output, tagged by declared subtype.
    Computed(Computed),
}

/// Output of a computed (formula or rollup) property.
#[derive(Debug, Clone, PartialEq)]
pub enum Computed {
    Text(Option<String>),
    Number(Option<Num>),
    Date {
        start: Option<String>,
        end: Option<String>,
    },
    Bool(Option<bool>),
    /// Array-shaped rollup output: recognized, never imported. The whole
    /// property is later dropped from the schema.
    SkippedArray,
}

impl Computed {
    /// Subtype name as declared by the API; used for the single-subtype
    /// invariant and its error message.
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Number(_) => "number",
            Self::Date { .. } => "date",
            Self::Bool(_) => "boolean",
            Self::SkippedArray => "array",
        }
    }
}

/// Truncate datetimes that are exactly midnight UTC to a bare date.
///
/// The API sometimes renders pure dates in formula/rollup payloads as full
/// timestamps; this undoes that.
fn maybe_date(value: String) -> String {
    match value.strip_suffix(MIDNIGHT_UTC_SUFFIX) {
        Some(date) => date.to_string(),
        None => value,
    }
}

/// Drop the query string from signed-storage URLs. Idempotent.
fn strip_signed_url(url: String) -> String {
    if url.contains(SIGNED_STORAGE_HOST) {
        match url.split_once('?') {
            Some((base, _)) => base.to_string(),
            None => url,
        }
    } else {
        url
    }
}

/// Concatenate rich text runs; an empty result is absence, not "".
fn join_runs(runs: Vec<crate::notion::wire::RichTextRun>) -> Option<String> {
    let text: String = runs.into_iter().map(|r| r.plain_text).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Split a date spec into bounds, rejecting named time zones.
///
/// The API contract: zones are always expressed as UTC offsets inside the
/// bounds themselves and `time_zone` is always null. A named zone here
/// means the contract changed under us; fail loudly.
fn date_bounds(spec: DateSpec) -> Result<(String, Option<String>)> {
    if let Some(zone) = spec.time_zone {
        return Err(ImportError::UnexpectedTimeZone { zone });
    }
    Ok((spec.start, spec.end))
}

/// Convert one raw page property into a [`Value`].
///
/// Raw payloads reach this point untyped; an unrecognized property or
/// subtype tag fails deserialization here and aborts the run.
pub fn normalize(raw: &serde_json::Value) -> Result<Value> {
    let property = Property::deserialize(raw).map_err(|e| ImportError::Unsupported {
        detail: e.to_string(),
    })?;

    Ok(match property {
        Property::Title { title } => Value::Text(join_runs(title)),
        Property::RichText { rich_text } => Value::Text(join_runs(rich_text)),
        Property::Number { number } => Value::Number(number.as_ref().map(Num::from_json)),
        Property::Select { select } => Value::Text(select.map(|s| s.name)),
        Property::MultiSelect { multi_select } => {
            Value::TextList(multi_select.into_iter().map(|s| s.name).collect())
        }
        Property::Date { date } => match date {
            None => Value::Date {
                start: None,
                end: None,
            },
            Some(spec) => {
                let (start, end) = date_bounds(spec)?;
                Value::Date {
                    start: Some(start),
                    end,
                }
            }
        },
        Property::People { people } => {
            Value::IdList(people.into_iter().map(|p| p.id).collect())
        }
        Property::Files { files } => Value::UrlList(
            files
                .into_iter()
                .map(|f| strip_signed_url(f.url().to_string()))
                .collect(),
        ),
        Property::Checkbox { checkbox } => Value::Bool(checkbox),
        Property::Url { url } => Value::Text(url),
        Property::Email { email } => Value::Text(email),
        Property::PhoneNumber { phone_number } => Value::Text(phone_number),
        Property::Formula { formula } => Value::Computed(normalize_formula(formula)?),
        Property::Relation { relation } => {
            Value::IdList(relation.into_iter().map(|r| r.id).collect())
        }
        Property::Rollup { rollup } => Value::Computed(normalize_rollup(rollup)?),
        Property::CreatedTime { created_time } => Value::Timestamp(created_time),
        Property::CreatedBy { created_by } => Value::Id(created_by.id),
        Property::LastEditedTime { last_edited_time } => Value::Timestamp(last_edited_time),
        Property::LastEditedBy { last_edited_by } => Value::Id(last_edited_by.id),
    })
}

fn normalize_formula(formula: Formula) -> Result<Computed> {
    Ok(match formula {
        Formula::String { string } => Computed::Text(string),
        Formula::Number { number } => Computed::Number(number.as_ref().map(Num::from_json)),
        Formula::Date { date } => match date {
            None => Computed::Date {
                start: None,
                end: None,
            },
            Some(spec) => {
                let (start, end) = date_bounds(spec)?;
                // Formulas never produce ranges, unlike date properties.
                if end.is_some() {
                    return Err(ImportError::Invariant(
                        "formula date carries an end bound".into(),
                    ));
                }
                Computed::Date {
                    start: Some(maybe_date(start)),
                    end: None,
                }
            }
        },
        Formula::Boolean { boolean } => Computed::Bool(boolean),
    })
}

fn normalize_rollup(rollup: Rollup) -> Result<Computed> {
    Ok(match rollup {
        // Array rollups are not importable; mark for the sanctioned skip.
        Rollup::Array { .. } => Computed::SkippedArray,
        Rollup::Number { number } => Computed::Number(number.as_ref().map(Num::from_json)),
        Rollup::Date { date } => match date {
            None => Computed::Date {
                start: None,
                end: None,
            },
            Some(spec) => {
                let (start, end) = date_bounds(spec)?;
                Computed::Date {
                    start: Some(maybe_date(start)),
                    end: end.map(maybe_date),
                }
            }
        },
    })
}
