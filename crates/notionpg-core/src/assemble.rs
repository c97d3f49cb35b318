//! Schema/row assembly: normalize and infer every property, then zip the
//! surviving columns into row tuples.
//!
//! Column order is stable across runs: the `id` identity column first, then
//! properties in lexicographic order of their original label (the API's
//! own ordering is by opaque property id and is discarded).

use crate::error::{ImportError, Result};
use crate::infer::{infer, Cell, Inferred, PgType};
use crate::notion::wire::{Database, Page};
use crate::sanitize::sanitize_name;
use crate::value::normalize;

/// One destination column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub pg_type: PgType,
}

/// Assembled schema and row matrix, ready for the loader.
#[derive(Debug)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

/// Build the destination table from the database schema and its pages.
///
/// Properties whose inference yields the skip sentinel are dropped with an
/// info log; every other failure aborts. The returned row count always
/// equals the page count.
pub fn assemble(database: &Database, pages: &[Page]) -> Result<Table> {
    let mut columns = vec![Column {
        name: "id".into(),
        pg_type: PgType::Uuid,
    }];
    let mut column_cells: Vec<Vec<Cell>> =
        vec![pages.iter().map(|p| Cell::Text(p.id.clone())).collect()];

    for (label, descriptor) in &database.properties {
        // The API duplicates the label inside the descriptor.
        if descriptor.name != *label {
            return Err(ImportError::Invariant(format!(
                "property descriptor name {:?} does not match its label {:?}",
                descriptor.name, label
            )));
        }

        let mut values = Vec::with_capacity(pages.len());
        for page in pages {
            let raw = page.properties.get(label).ok_or_else(|| {
                ImportError::Invariant(format!(
                    "page {} is missing property {:?}",
                    page.id, label
                ))
            })?;
            values.push(normalize(raw).map_err(|e| e.in_property(label))?);
        }

        match infer(descriptor.kind, values).map_err(|e| e.in_property(label))? {
            Inferred::Skip => {
                tracing::info!(property = %label, "skipping unsupported property");
            }
            Inferred::Column { pg_type, cells } => {
                tracing::info!(property = %label, %pg_type, "converted property");
                columns.push(Column {
                    name: sanitize_name(label),
                    pg_type,
                });
                column_cells.push(cells);
            }
        }
    }

    for (column, cells) in columns.iter().zip(&column_cells) {
        if cells.len() != pages.len() {
            return Err(ImportError::Invariant(format!(
                "column {:?} has {} values for {} pages",
                column.name,
                cells.len(),
                pages.len()
            )));
        }
    }

    let rows = (0..pages.len())
        .map(|i| column_cells.iter().map(|cells| cells[i].clone()).collect())
        .collect();

    Ok(Table { columns, rows })
}
