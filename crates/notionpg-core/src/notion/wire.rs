//! Typed model of the consumed slice of the Notion API.
//!
//! Response envelopes and property values are closed, internally tagged
//! enums: a tag this model does not know is a deserialization error, never
//! a silent skip. Page property payloads are kept as raw JSON inside
//! [`Page`] so that an unsupported construct fails in the normalizer (a
//! fatal invariant error) rather than inside the fetch retry loop (where
//! decode failures are treated as transient).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of a `POST /v1/databases/{id}/query` request.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub sorts: [Sort; 1],
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
}

impl QueryRequest {
    /// Newest-created first; a stable ordering convenience, not a
    /// correctness requirement.
    pub fn new(page_size: u32) -> Self {
        Self {
            sorts: [Sort {
                timestamp: "created_time",
                direction: "descending",
            }],
            page_size,
            start_cursor: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Sort {
    pub timestamp: &'static str,
    pub direction: &'static str,
}

/// Response to a database query, tagged by `object`.
#[derive(Debug, Deserialize)]
#[serde(tag = "object", rename_all = "snake_case")]
pub enum QueryResponse {
    List {
        results: Vec<Page>,
        has_more: bool,
        next_cursor: Option<String>,
    },
    Error {
        status: u16,
        message: String,
    },
}

/// Response to a database metadata fetch, tagged by `object`.
#[derive(Debug, Deserialize)]
#[serde(tag = "object", rename_all = "snake_case")]
pub enum DatabaseResponse {
    Database(Database),
    Error { status: u16, message: String },
}

/// Database metadata: the property descriptors that drive inference.
///
/// `BTreeMap` keys give the lexicographic-by-label column order for free;
/// the API's own ordering (by opaque property id) is discarded.
#[derive(Debug, Deserialize)]
pub struct Database {
    pub id: String,
    pub properties: BTreeMap<String, PropertyDescriptor>,
}

/// One declared property of the database schema.
#[derive(Debug, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
}

/// Declared category of a database property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Date,
    People,
    Files,
    Checkbox,
    Url,
    Email,
    PhoneNumber,
    Formula,
    Relation,
    Rollup,
    CreatedTime,
    CreatedBy,
    LastEditedTime,
    LastEditedBy,
}

/// One record of the database. Property payloads stay raw until the
/// normalizer runs.
#[derive(Debug, Deserialize)]
pub struct Page {
    pub id: String,
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// A page-level property value, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Property {
    Title { title: Vec<RichTextRun> },
    RichText { rich_text: Vec<RichTextRun> },
    Number { number: Option<serde_json::Number> },
    Select { select: Option<SelectOption> },
    MultiSelect { multi_select: Vec<SelectOption> },
    Date { date: Option<DateSpec> },
    People { people: Vec<ObjectRef> },
    Files { files: Vec<FileRef> },
    Checkbox { checkbox: bool },
    Url { url: Option<String> },
    Email { email: Option<String> },
    PhoneNumber { phone_number: Option<String> },
    Formula { formula: Formula },
    Relation { relation: Vec<ObjectRef> },
    Rollup { rollup: Rollup },
    CreatedTime { created_time: String },
    CreatedBy { created_by: ObjectRef },
    LastEditedTime { last_edited_time: String },
    LastEditedBy { last_edited_by: ObjectRef },
}

/// One run of rich text; only the rendered text matters here.
#[derive(Debug, Deserialize)]
pub struct RichTextRun {
    pub plain_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectOption {
    pub name: String,
}

/// Opaque reference to another API object (person, page, ...).
#[derive(Debug, Deserialize)]
pub struct ObjectRef {
    pub id: String,
}

/// A date or datetime, optionally with an end bound (a range).
///
/// The API renders zones as UTC offsets inside `start`/`end` and always
/// sets `time_zone` to null; a named zone is an invariant violation caught
/// by the normalizer.
#[derive(Debug, Deserialize)]
pub struct DateSpec {
    pub start: String,
    pub end: Option<String>,
    pub time_zone: Option<String>,
}

/// A file attachment: hosted by Notion or externally linked.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileRef {
    File { file: FileUrl },
    External { external: FileUrl },
}

impl FileRef {
    pub fn url(&self) -> &str {
        match self {
            Self::File { file } => &file.url,
            Self::External { external } => &external.url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FileUrl {
    pub url: String,
}

/// Output of a formula property, tagged by its declared subtype.
///
/// Formulas never produce date ranges; `end` must be null.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Formula {
    String { string: Option<String> },
    Number { number: Option<serde_json::Number> },
    Date { date: Option<DateSpec> },
    Boolean { boolean: Option<bool> },
}

/// Output of a rollup property, tagged by its declared subtype.
///
/// `array` outputs are recognized but never imported; the whole property is
/// dropped from the destination schema.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rollup {
    Array { array: Vec<serde_json::Value> },
    Number { number: Option<serde_json::Number> },
    Date { date: Option<DateSpec> },
}
