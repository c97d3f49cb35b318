use std::time::Instant;

use anyhow::{Context, Result};

use notionpg_core::notion::{HttpTransport, NotionClient};
use notionpg_core::{assemble, ident, pg, RunContext};

/// Execute an import: validate, fetch, assemble, load.
pub async fn execute(
    database_id: &str,
    table_name: &str,
    drop_existing: bool,
    versioned: bool,
) -> Result<()> {
    // 1. Credentials and identifiers, before any network access.
    //    The integration needs access to the database being imported and to
    //    every database referenced by a relation or a rollup.
    let token =
        std::env::var("NOTION_TOKEN").context("missing environment variable NOTION_TOKEN")?;
    let dsn = std::env::var("POSTGRESQL_DSN")
        .context("missing environment variable POSTGRESQL_DSN")?;

    ident::validate_database_id(database_id)?;
    ident::validate_table_name(table_name, versioned)?;
    let version_suffix = versioned.then(ident::version_suffix);

    let ctx = RunContext::new(token);
    let t0 = Instant::now();

    // 2. Read the Notion database structure and content into memory.
    let client = NotionClient::new(HttpTransport::new(ctx.timeout)?);
    let database = client.get_database(&ctx, database_id).await?;
    let pages = client.fetch_all_pages(&ctx, database_id).await?;

    tracing::info!(
        database_id,
        properties = database.properties.len(),
        pages = pages.len(),
        "Database fetched"
    );

    // 3. Infer column types and coerce values.
    let table = assemble(&database, &pages)?;

    // 4. Write the PostgreSQL table.
    let mut pg_client = pg::connect(&dsn).await?;
    let spec = pg::LoadSpec {
        table_name,
        drop_existing,
        version_suffix: version_suffix.as_deref(),
    };
    let rows_written = pg::create_table(&mut pg_client, &table, &spec).await?;

    println!("Imported Notion database {} into '{}'.", database_id, table_name);
    println!("  Pages fetched: {}", pages.len());
    println!("  Columns:       {}", table.columns.len());
    println!("  Rows written:  {}", rows_written);
    println!("  Duration:      {:.1}s", t0.elapsed().as_secs_f64());

    Ok(())
}
