//! Transactional table loader.
//!
//! One transaction covers the optional drop, table creation, COPY bulk
//! insert, and optional view redirection: the destination sees either the
//! complete new table or nothing.

use bytes::Bytes;
use futures_util::SinkExt;
use pg_escape::quote_identifier;
use tokio_postgres::Client;

use crate::assemble::Table;
use crate::error::Result;
use crate::pg::format::write_copy_row;

/// Flush the COPY buffer at this size.
const COPY_FLUSH_BYTES: usize = 4 * 1024 * 1024;

/// Destination naming and replacement options for one load.
#[derive(Debug, Clone)]
pub struct LoadSpec<'a> {
    /// Public (base) table name.
    pub table_name: &'a str,
    /// Drop an existing physical table first.
    pub drop_existing: bool,
    /// When set, load into `table_name + suffix` and repoint a view named
    /// `table_name` at it. The only schema-evolution mechanism: storage
    /// grows, the public name stays stable.
    pub version_suffix: Option<&'a str>,
}

impl LoadSpec<'_> {
    fn physical_table(&self) -> String {
        match self.version_suffix {
            Some(suffix) => format!("{}{}", self.table_name, suffix),
            None => self.table_name.to_string(),
        }
    }
}

fn create_table_sql(physical: &str, table: &Table) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_identifier(&c.name), c.pg_type.sql()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_identifier(physical), columns)
}

fn copy_sql(physical: &str, table: &Table) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| quote_identifier(&c.name).into_owned())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "COPY {} ({}) FROM STDIN",
        quote_identifier(physical),
        columns
    )
}

fn view_sql(base: &str, physical: &str) -> String {
    format!(
        "CREATE OR REPLACE VIEW {} AS SELECT * FROM {}",
        quote_identifier(base),
        quote_identifier(physical)
    )
}

/// Create the destination table and bulk-insert all rows, atomically.
///
/// Returns the number of rows written.
pub async fn create_table(client: &mut Client, table: &Table, spec: &LoadSpec<'_>) -> Result<u64> {
    let physical = spec.physical_table();
    let tx = client.transaction().await?;

    if spec.drop_existing {
        tx.execute(
            &format!("DROP TABLE IF EXISTS {}", quote_identifier(&physical)),
            &[],
        )
        .await?;
        tracing::info!(table = %physical, "dropped PostgreSQL table");
    }

    tx.execute(&create_table_sql(&physical, table), &[]).await?;
    tracing::info!(table = %physical, columns = table.columns.len(), "created PostgreSQL table");

    let sink = tx.copy_in(&copy_sql(&physical, table)).await?;
    let mut sink = Box::pin(sink);
    let mut buf = Vec::with_capacity(COPY_FLUSH_BYTES);
    for row in &table.rows {
        write_copy_row(&mut buf, row);
        if buf.len() >= COPY_FLUSH_BYTES {
            sink.send(Bytes::from(std::mem::take(&mut buf))).await?;
            buf = Vec::with_capacity(COPY_FLUSH_BYTES);
        }
    }
    if !buf.is_empty() {
        sink.send(Bytes::from(buf)).await?;
    }
    let rows_written = sink.as_mut().finish().await?;
    tracing::info!(rows = rows_written, "wrote rows to PostgreSQL");

    if spec.version_suffix.is_some() {
        tx.execute(&view_sql(spec.table_name, &physical), &[])
            .await?;
        tracing::info!(view = spec.table_name, table = %physical, "created PostgreSQL view");
    }

    tx.commit().await?;
    Ok(rows_written)
}
