//! `collect auto` command handler.
//!
//! Runs one automatic collection in the foreground. Ctrl-C asks the run to
//! stop after the seed in flight; the partial result is still recorded.

use std::sync::Arc;

use clap::Subcommand;
use kwdb_core::RunState;
use kwdb_db::{RunType, TriggerSource};
use kwdb_research::{AutoCollector, RunRequest};

use crate::fail_run_best_effort;

/// Sub-commands available under `collect`.
#[derive(Debug, Subcommand)]
pub enum CollectCommands {
    /// Collect keywords until the target count is reached or seeds run out
    Auto {
        /// Number of new keywords to store (defaults to KWDB_AUTO_COLLECT_TARGET)
        #[arg(long)]
        target: Option<u32>,
        /// Initial seed; may be repeated. Stored keywords are used after these.
        #[arg(long = "seed")]
        seeds: Vec<String>,
    },
}

pub(crate) async fn run_collect_auto(
    pool: &sqlx::PgPool,
    collector: Arc<AutoCollector>,
    target_count: u32,
    seeds: Vec<String>,
) -> anyhow::Result<()> {
    if target_count == 0 {
        anyhow::bail!("target must be at least 1");
    }
    let initial_seeds = seeds
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let claim = collector.claim(RunRequest {
        target_count,
        initial_seeds,
    })?;

    let run = kwdb_db::create_collection_run(
        pool,
        RunType::AutoCollect,
        TriggerSource::Cli,
        Some(target_count),
    )
    .await?;
    if let Err(e) = kwdb_db::start_collection_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, "auto-collect", &format!("{e:#}")).await;
        return Err(e.into());
    }

    let mut handle = Arc::clone(&collector).spawn(claim);
    let mut progress = collector.status().subscribe();
    let mut last_count = 0;

    let summary = loop {
        tokio::select! {
            joined = &mut handle => break joined,
            changed = progress.changed() => {
                if changed.is_err() {
                    continue;
                }
                let status = progress.borrow_and_update().clone();
                if status.current_count != last_count {
                    last_count = status.current_count;
                    println!(
                        "progress: {}/{} keywords, {} seeds",
                        status.current_count, status.target_count, status.seeds_used
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if collector.status().request_stop() {
                    eprintln!("stop requested; finishing the current seed");
                }
            }
        }
    };

    let summary = match summary {
        Ok(summary) => summary,
        Err(e) => {
            let message = format!("run task aborted: {e}");
            fail_run_best_effort(pool, run.id, "auto-collect", &message).await;
            anyhow::bail!(message);
        }
    };

    kwdb_db::finish_collection_run(pool, run.id, &summary).await?;

    println!(
        "{}: {} of {} keywords from {} seeds",
        summary.message, summary.collected, summary.target_count, summary.seeds_used
    );
    if summary.persistence_failures > 0 {
        eprintln!(
            "warning: {} seeds failed to persist",
            summary.persistence_failures
        );
    }

    match summary.state {
        RunState::Failed => anyhow::bail!(summary
            .error
            .unwrap_or_else(|| "auto-collect failed".to_string())),
        _ => Ok(()),
    }
}
