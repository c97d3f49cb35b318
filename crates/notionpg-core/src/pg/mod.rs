//! Destination-side plumbing: connection, COPY text rendering, and the
//! transactional table loader.

pub mod format;
pub mod loader;

pub use loader::{create_table, LoadSpec};

use crate::error::Result;

/// Connect to PostgreSQL and drive the connection on a background task.
pub async fn connect(dsn: &str) -> Result<tokio_postgres::Client> {
    let (client, connection) = tokio_postgres::connect(dsn, tokio_postgres::NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "PostgreSQL connection error");
        }
    });
    Ok(client)
}
