//! Starts automatic runs in the background and records them in
//! `collection_runs`.

use std::sync::Arc;

use chrono::Utc;
use kwdb_core::{AutoCollectStatus, RunState};
use kwdb_db::{RunType, TriggerSource};
use kwdb_research::{CollectError, RunRequest};
use sqlx::PgPool;

use crate::api::AppState;

/// Claims the collector and spawns the run.
///
/// Returns the status snapshot taken right after the claim. Run history is
/// best-effort: a database failure is logged and never stops the run.
pub fn start_auto_run(
    state: &AppState,
    request: RunRequest,
    trigger: TriggerSource,
) -> Result<AutoCollectStatus, CollectError> {
    let target_count = request.target_count;
    let claim = state.collector.claim(request)?;
    let snapshot = state.collector.status().snapshot();

    tracing::info!(
        target_count,
        trigger = trigger.as_str(),
        "auto-collect run accepted"
    );

    let handle = Arc::clone(&state.collector).spawn(claim);
    let collector = Arc::clone(&state.collector);
    let pool = state.pool.clone();

    tokio::spawn(async move {
        let run_id = record_start(&pool, trigger, target_count).await;
        match handle.await {
            Ok(summary) => {
                if let Some(id) = run_id {
                    if let Err(e) = kwdb_db::finish_collection_run(&pool, id, &summary).await {
                        tracing::warn!(run_id = id, error = %e, "failed to record run outcome");
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "auto-collect task aborted");
                let message = format!("run task aborted: {e}");
                collector.status().finish(
                    RunState::Failed,
                    "run aborted",
                    Some(message.clone()),
                    Utc::now(),
                );
                if let Some(id) = run_id {
                    if let Err(e) = kwdb_db::fail_collection_run(&pool, id, &message).await {
                        tracing::warn!(run_id = id, error = %e, "failed to record run outcome");
                    }
                }
            }
        }
    });

    Ok(snapshot)
}

async fn record_start(pool: &PgPool, trigger: TriggerSource, target_count: u32) -> Option<i64> {
    let run = match kwdb_db::create_collection_run(
        pool,
        RunType::AutoCollect,
        trigger,
        Some(target_count),
    )
    .await
    {
        Ok(run) => run,
        Err(e) => {
            tracing::warn!(error = %e, "failed to record run start");
            return None;
        }
    };

    match kwdb_db::start_collection_run(pool, run.id).await {
        Ok(()) => Some(run.id),
        Err(e) => {
            tracing::warn!(run_id = run.id, error = %e, "failed to mark run as running");
            None
        }
    }
}
