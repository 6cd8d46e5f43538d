mod collect;
mod keys;
mod research;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use kwdb_db::PgKeywordStore;
use kwdb_research::{AutoCollector, CollectorSettings};
use kwdb_searchad::ApiClients;
use tracing_subscriber::EnvFilter;

use crate::collect::CollectCommands;

#[derive(Debug, Parser)]
#[command(name = "kwdb-cli")]
#[command(about = "Keyword research database command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Inspect the configured API credentials
    Keys {
        #[command(subcommand)]
        command: KeysCommands,
    },
    /// Print the related terms discovered from one seed
    Expand {
        seed: String,
        /// Override the configured number of expansion rounds
        #[arg(long)]
        rounds: Option<u32>,
    },
    /// Expand, enrich and store keywords for one seed
    Research {
        seed: String,
        /// Report what would be stored without writing to the database
        #[arg(long)]
        dry_run: bool,
        /// Number of top keywords to print
        #[arg(long, default_value = "20")]
        show: usize,
    },
    /// Long-running collection jobs
    Collect {
        #[command(subcommand)]
        command: CollectCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[derive(Debug, Subcommand)]
enum KeysCommands {
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("kwdb-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = kwdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    kwdb_db::health_check(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = kwdb_db::run_migrations(&pool).await?;
                    println!("migrations up to date ({applied} applied)");
                }
            }
        }
        Commands::Keys {
            command: KeysCommands::Status,
        } => keys::run_keys_status(&config)?,
        Commands::Expand { seed, rounds } => research::run_expand(&config, &seed, rounds).await?,
        Commands::Research {
            seed,
            dry_run,
            show,
        } => {
            let pool = connect(&config).await?;
            let collector = build_collector(&config, &pool)?;
            research::run_research(&pool, &collector, &seed, dry_run, show).await?;
        }
        Commands::Collect {
            command: CollectCommands::Auto { target, seeds },
        } => {
            let pool = connect(&config).await?;
            let collector = build_collector(&config, &pool)?;
            let target = target.unwrap_or(config.auto_collect_target);
            collect::run_collect_auto(&pool, collector, target, seeds).await?;
        }
    }

    Ok(())
}

async fn connect(config: &kwdb_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = kwdb_db::PoolConfig::from_app_config(config);
    Ok(kwdb_db::connect_pool(&config.database_url, pool_config).await?)
}

fn build_clients(config: &kwdb_core::AppConfig) -> anyhow::Result<ApiClients> {
    let credentials = kwdb_core::load_credentials(&config.credentials_path)?;
    Ok(ApiClients::from_config(config, &credentials)?)
}

fn build_collector(
    config: &kwdb_core::AppConfig,
    pool: &sqlx::PgPool,
) -> anyhow::Result<Arc<AutoCollector>> {
    let clients = build_clients(config)?;
    Ok(Arc::new(AutoCollector::new(
        Arc::new(clients.search_ad),
        Arc::new(clients.doc_count),
        Arc::new(PgKeywordStore::new(pool.clone())),
        CollectorSettings::from_config(config),
    )))
}

/// Marks a run as failed, logging rather than propagating a second failure.
async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, context: &str, message: &str) {
    if let Err(mark_err) = kwdb_db::fail_collection_run(pool, run_id, message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}

#[cfg(test)]
mod tests;
