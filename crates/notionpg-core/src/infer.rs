//! Column type inference: one decision per property, made after every
//! page's value for that property has been normalized.
//!
//! All decisions are global over the whole column: a single fractional
//! value anywhere forces double precision, a single end bound anywhere
//! forces a range type, a single multi-element list anywhere forces an
//! array type. The only non-fatal outcome besides a column is the skip
//! sentinel for array-shaped rollups.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ImportError, Result};
use crate::notion::wire::PropertyKind;
use crate::value::{Computed, Num, Value};

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date regex"));

/// Destination column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgType {
    Text,
    Integer,
    DoublePrecision,
    TextArray,
    Date,
    TimestampTz,
    DateRange,
    TstzRange,
    Uuid,
    UuidArray,
    Boolean,
}

impl PgType {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::DoublePrecision => "double precision",
            Self::TextArray => "text[]",
            Self::Date => "date",
            Self::TimestampTz => "timestamp with time zone",
            Self::DateRange => "daterange",
            Self::TstzRange => "tstzrange",
            Self::Uuid => "uuid",
            Self::UuidArray => "uuid[]",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for PgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// One coerced value, aligned with its column's inferred type.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    /// Also carries date, timestamp, and uuid values; they are all text on
    /// the COPY wire.
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// text[] / uuid[] element list.
    Array(Vec<String>),
    /// Inclusive range bounds; an absent bound is unbounded.
    Range {
        start: Option<String>,
        end: Option<String>,
    },
}

/// Outcome of inference for one property.
#[derive(Debug, PartialEq)]
pub enum Inferred {
    Column { pg_type: PgType, cells: Vec<Cell> },
    /// Sanctioned skip: drop this property from the output schema.
    Skip,
}

fn column(pg_type: PgType, cells: Vec<Cell>) -> Inferred {
    Inferred::Column { pg_type, cells }
}

/// Decide the column type for `kind` from all normalized values, and coerce
/// the values to match.
pub fn infer(kind: PropertyKind, values: Vec<Value>) -> Result<Inferred> {
    match kind {
        PropertyKind::Title
        | PropertyKind::RichText
        | PropertyKind::Select
        | PropertyKind::Url
        | PropertyKind::Email
        | PropertyKind::PhoneNumber => {
            Ok(column(PgType::Text, text_cells(expect_texts(values)?)))
        }
        PropertyKind::Number => {
            let (ty, cells) = infer_number(expect_numbers(values)?);
            Ok(column(ty, cells))
        }
        PropertyKind::MultiSelect => {
            let cells = expect_text_lists(values)?
                .into_iter()
                .map(Cell::Array)
                .collect();
            Ok(column(PgType::TextArray, cells))
        }
        PropertyKind::Date => {
            let (ty, cells) = infer_date(expect_dates(values)?);
            Ok(column(ty, cells))
        }
        PropertyKind::People | PropertyKind::Relation => {
            let lists = expect_lists(values, |v| match v {
                Value::IdList(ids) => Some(ids),
                _ => None,
            })?;
            let (ty, cells) = collapse_lists(lists, PgType::Uuid, PgType::UuidArray);
            Ok(column(ty, cells))
        }
        PropertyKind::Files => {
            let lists = expect_lists(values, |v| match v {
                Value::UrlList(urls) => Some(urls),
                _ => None,
            })?;
            let (ty, cells) = collapse_lists(lists, PgType::Text, PgType::TextArray);
            Ok(column(ty, cells))
        }
        PropertyKind::Checkbox => {
            let cells = values
                .into_iter()
                .map(|v| match v {
                    Value::Bool(b) => Ok(Cell::Bool(b)),
                    other => Err(shape_mismatch("checkbox", &other)),
                })
                .collect::<Result<_>>()?;
            Ok(column(PgType::Boolean, cells))
        }
        PropertyKind::CreatedTime | PropertyKind::LastEditedTime => {
            let cells = values
                .into_iter()
                .map(|v| match v {
                    Value::Timestamp(ts) => Ok(Cell::Text(ts)),
                    other => Err(shape_mismatch("timestamp", &other)),
                })
                .collect::<Result<_>>()?;
            Ok(column(PgType::TimestampTz, cells))
        }
        PropertyKind::CreatedBy | PropertyKind::LastEditedBy => {
            let cells = values
                .into_iter()
                .map(|v| match v {
                    Value::Id(id) => Ok(Cell::Text(id)),
                    other => Err(shape_mismatch("id", &other)),
                })
                .collect::<Result<_>>()?;
            Ok(column(PgType::Uuid, cells))
        }
        PropertyKind::Formula => infer_computed(expect_computed(values)?, false),
        PropertyKind::Rollup => infer_computed(expect_computed(values)?, true),
    }
}

// ---------------------------------------------------------------------------
// Per-kind decision rules
// ---------------------------------------------------------------------------

/// Integer iff every present value is an exact integer; one fractional
/// value anywhere flips the whole column to double precision.
fn infer_number(nums: Vec<Option<Num>>) -> (PgType, Vec<Cell>) {
    let all_int = nums
        .iter()
        .flatten()
        .all(|n| matches!(n, Num::Int(_)));

    if all_int {
        let cells = nums
            .into_iter()
            .map(|n| match n {
                Some(Num::Int(i)) => Cell::Int(i),
                Some(Num::Float(_)) => unreachable!("checked above"),
                None => Cell::Null,
            })
            .collect();
        (PgType::Integer, cells)
    } else {
        let cells = nums
            .into_iter()
            .map(|n| match n {
                Some(Num::Int(i)) => Cell::Float(i as f64),
                Some(Num::Float(f)) => Cell::Float(f),
                None => Cell::Null,
            })
            .collect();
        (PgType::DoublePrecision, cells)
    }
}

/// Range type iff any row has an end bound; within each branch, date-only
/// iff every present bound is a strict `YYYY-MM-DD`.
fn infer_date(pairs: Vec<(Option<String>, Option<String>)>) -> (PgType, Vec<Cell>) {
    let is_date = |s: &String| DATE_RE.is_match(s);
    let any_end = pairs.iter().any(|(_, end)| end.is_some());

    if any_end {
        let all_date = pairs
            .iter()
            .all(|(start, end)| start.iter().all(is_date) && end.iter().all(is_date));
        let ty = if all_date {
            PgType::DateRange
        } else {
            PgType::TstzRange
        };
        let cells = pairs
            .into_iter()
            .map(|(start, end)| match (start, end) {
                (None, None) => Cell::Null,
                (start, end) => Cell::Range { start, end },
            })
            .collect();
        (ty, cells)
    } else {
        // Scalar branch: the (always absent) end bound is discarded.
        let all_date = pairs.iter().all(|(start, _)| start.iter().all(is_date));
        let ty = if all_date {
            PgType::Date
        } else {
            PgType::TimestampTz
        };
        let cells = pairs
            .into_iter()
            .map(|(start, _)| match start {
                Some(s) => Cell::Text(s),
                None => Cell::Null,
            })
            .collect();
        (ty, cells)
    }
}

/// Cardinality collapse: scalar iff no row ever holds more than one
/// element, substituting NULL for empty lists. A whole-column decision.
fn collapse_lists(lists: Vec<Vec<String>>, scalar: PgType, array: PgType) -> (PgType, Vec<Cell>) {
    if lists.iter().all(|l| l.len() <= 1) {
        let cells = lists
            .into_iter()
            .map(|l| match l.into_iter().next() {
                Some(item) => Cell::Text(item),
                None => Cell::Null,
            })
            .collect();
        (scalar, cells)
    } else {
        (array, lists.into_iter().map(Cell::Array).collect())
    }
}

/// Shared formula/rollup rule: enforce the single-subtype invariant, then
/// recurse into the matching plain rule.
fn infer_computed(values: Vec<Computed>, is_rollup: bool) -> Result<Inferred> {
    let mut subtypes: Vec<&'static str> = Vec::new();
    for v in &values {
        let s = v.subtype();
        if !subtypes.contains(&s) {
            subtypes.push(s);
        }
    }
    if subtypes.len() > 1 {
        return Err(ImportError::MixedComputedSubtypes { kinds: subtypes });
    }
    let Some(&subtype) = subtypes.first() else {
        return Err(ImportError::Invariant(
            "cannot infer the subtype of a computed property with no rows".into(),
        ));
    };

    match subtype {
        "array" if is_rollup => Ok(Inferred::Skip),
        "string" if !is_rollup => {
            let texts = values
                .into_iter()
                .map(|v| match v {
                    Computed::Text(t) => t,
                    _ => unreachable!("single subtype enforced above"),
                })
                .collect();
            Ok(column(PgType::Text, text_cells(texts)))
        }
        "number" => {
            let nums = values
                .into_iter()
                .map(|v| match v {
                    Computed::Number(n) => n,
                    _ => unreachable!("single subtype enforced above"),
                })
                .collect();
            let (ty, cells) = infer_number(nums);
            Ok(column(ty, cells))
        }
        "date" => {
            let pairs = values
                .into_iter()
                .map(|v| match v {
                    Computed::Date { start, end } => (start, end),
                    _ => unreachable!("single subtype enforced above"),
                })
                .collect();
            let (ty, cells) = infer_date(pairs);
            Ok(column(ty, cells))
        }
        "boolean" if !is_rollup => {
            let cells = values
                .into_iter()
                .map(|v| match v {
                    Computed::Bool(Some(b)) => Cell::Bool(b),
                    Computed::Bool(None) => Cell::Null,
                    _ => unreachable!("single subtype enforced above"),
                })
                .collect();
            Ok(column(PgType::Boolean, cells))
        }
        other => Err(ImportError::Unsupported {
            detail: format!(
                "{} output subtype {:?}",
                if is_rollup { "rollup" } else { "formula" },
                other
            ),
        }),
    }
}

// ---------------------------------------------------------------------------
// Shape extraction
// ---------------------------------------------------------------------------

fn shape_mismatch(expected: &str, got: &Value) -> ImportError {
    ImportError::Invariant(format!(
        "expected a {expected} value, got {got:?}"
    ))
}

fn expect_texts(values: Vec<Value>) -> Result<Vec<Option<String>>> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Text(t) => Ok(t),
            other => Err(shape_mismatch("text", &other)),
        })
        .collect()
}

fn expect_numbers(values: Vec<Value>) -> Result<Vec<Option<Num>>> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Number(n) => Ok(n),
            other => Err(shape_mismatch("number", &other)),
        })
        .collect()
}

fn expect_text_lists(values: Vec<Value>) -> Result<Vec<Vec<String>>> {
    values
        .into_iter()
        .map(|v| match v {
            Value::TextList(l) => Ok(l),
            other => Err(shape_mismatch("text list", &other)),
        })
        .collect()
}

fn expect_dates(values: Vec<Value>) -> Result<Vec<(Option<String>, Option<String>)>> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Date { start, end } => Ok((start, end)),
            other => Err(shape_mismatch("date", &other)),
        })
        .collect()
}

fn expect_lists(
    values: Vec<Value>,
    extract: impl Fn(Value) -> Option<Vec<String>>,
) -> Result<Vec<Vec<String>>> {
    values
        .into_iter()
        .map(|v| {
            let repr = format!("{v:?}");
            extract(v).ok_or_else(|| {
                ImportError::Invariant(format!("expected a list value, got {repr}"))
            })
        })
        .collect()
}

fn expect_computed(values: Vec<Value>) -> Result<Vec<Computed>> {
    values
        .into_iter()
        .map(|v| match v {
            Value::Computed(c) => Ok(c),
            other => Err(shape_mismatch("computed", &other)),
        })
        .collect()
}

fn text_cells(texts: Vec<Option<String>>) -> Vec<Cell> {
    texts
        .into_iter()
        .map(|t| match t {
            Some(s) => Cell::Text(s),
            None => Cell::Null,
        })
        .collect()
}
