mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "notionpg",
    version,
    about = "Import a Notion database into a PostgreSQL table"
)]
struct Cli {
    /// Notion database ID (32 hex digits)
    database_id: String,
    /// PostgreSQL table name
    table_name: String,
    /// Drop the table if it exists
    #[arg(long)]
    drop_existing: bool,
    /// Import into a timestamped table behind a stable view
    #[arg(long)]
    versioned: bool,
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `RUST_LOG` wins over --log-level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    commands::sync::execute(
        &cli.database_id,
        &cli.table_name,
        cli.drop_existing,
        cli.versioned,
    )
    .await
}
