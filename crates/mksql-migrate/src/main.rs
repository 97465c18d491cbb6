//! mksql CLI
//!
//! Command-line tool that reconciles a database with a JSON schema file.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mksql_migrate::prelude::*;

/// Declarative schema reconciliation for MySQL and SQLite.
#[derive(Parser)]
#[command(name = "mksql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (sqlite:... or mysql://...).
    #[arg(short, long, env = "DATABASE_URL")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the database in line with the schema file.
    Reconcile {
        /// JSON schema file.
        #[arg(short, long)]
        schema: PathBuf,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the statements a reconciliation would run.
    Plan {
        /// JSON schema file.
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Print the live description of one declared table.
    Describe {
        /// JSON schema file.
        #[arg(short, long)]
        schema: PathBuf,

        /// Table name.
        #[arg(short, long)]
        table: String,
    },
}

fn load_registry(path: &Path) -> anyhow::Result<SchemaRegistry> {
    let file = SchemaFile::load(path)?;
    Ok(file.to_registry()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut conn = DbConnection::connect(&cli.database).await?;

    match cli.command {
        Commands::Reconcile {
            schema,
            dry_run,
            json,
        } => {
            let registry = load_registry(&schema)?;
            let mut reconciler =
                Reconciler::new(registry).with_options(ReconcileOptions { dry_run });
            let report = reconciler.reconcile(&mut conn).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_noop() {
                info!("Database already matches the schema.");
            } else if dry_run {
                println!("{}", report.to_sql_script());
            } else {
                info!(
                    "Applied {} statement(s) in {:?}",
                    report.executed_count(),
                    report.elapsed
                );
            }
        }

        Commands::Plan { schema } => {
            let registry = load_registry(&schema)?;
            let mut reconciler = Reconciler::new(registry);
            let report = reconciler.plan(&mut conn).await?;

            if report.is_noop() {
                info!("Database already matches the schema.");
            } else {
                println!("{}", report.to_sql_script());
            }
        }

        Commands::Describe { schema, table } => {
            let registry = load_registry(&schema)?;
            let reconciler = Reconciler::new(registry);
            let description = reconciler.describe(&mut conn, &table).await?;
            println!("{}", serde_json::to_string_pretty(&description)?);
        }
    }

    conn.close().await?;
    Ok(())
}
