//! Database operations for `collection_runs`.

use chrono::{DateTime, Utc};
use kwdb_core::RunState;
use kwdb_research::RunSummary;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, run_type, trigger_source, status, target_count, \
     seeds_used, started_at, completed_at, records_processed, error_message, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    AutoCollect,
    Research,
}

impl RunType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AutoCollect => "auto_collect",
            Self::Research => "research",
        }
    }
}

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Api,
    Cli,
    Scheduler,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Cli => "cli",
            Self::Scheduler => "scheduler",
        }
    }
}

/// A row from the `collection_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub run_type: String,
    pub trigger_source: String,
    pub status: String,
    pub target_count: Option<i32>,
    pub seeds_used: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Creates a new collection run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_collection_run(
    pool: &PgPool,
    run_type: RunType,
    trigger_source: TriggerSource,
    target_count: Option<u32>,
) -> Result<CollectionRunRow, DbError> {
    let sql = format!(
        "INSERT INTO collection_runs (public_id, run_type, trigger_source, status, target_count) \
         VALUES ($1, $2, $3, 'queued', $4) \
         RETURNING {RUN_COLUMNS}"
    );
    let row = sqlx::query_as::<_, CollectionRunRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(run_type.as_str())
        .bind(trigger_source.as_str())
        .bind(target_count.map(to_i32))
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Marks a `queued` run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] if the run is not
/// queued, or [`DbError::Sqlx`] if the update fails.
pub async fn start_collection_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCollectionRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

async fn close_running(
    pool: &PgPool,
    id: i64,
    status: &'static str,
    records_processed: u32,
    seeds_used: u32,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs \
         SET status = $1, completed_at = NOW(), records_processed = $2, seeds_used = $3, \
             error_message = $4 \
         WHERE id = $5 AND status = 'running'",
    )
    .bind(status)
    .bind(to_i32(records_processed))
    .bind(to_i32(seeds_used))
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCollectionRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a `running` run as `succeeded`.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] if the run is not
/// running, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_collection_run(
    pool: &PgPool,
    id: i64,
    records_processed: u32,
    seeds_used: u32,
) -> Result<(), DbError> {
    close_running(pool, id, "succeeded", records_processed, seeds_used, None).await
}

/// Marks a `running` run as `stopped` after a user stop request.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] if the run is not
/// running, or [`DbError::Sqlx`] if the update fails.
pub async fn stop_collection_run(
    pool: &PgPool,
    id: i64,
    records_processed: u32,
    seeds_used: u32,
) -> Result<(), DbError> {
    close_running(pool, id, "stopped", records_processed, seeds_used, None).await
}

/// Marks a `running` run as `failed` with `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] if the run is not
/// running, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_collection_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    close_running(pool, id, "failed", 0, 0, Some(error_message)).await
}

/// Closes a `running` run from the summary an auto run produced.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] if the run is not
/// running, or [`DbError::Sqlx`] if the update fails.
pub async fn finish_collection_run(
    pool: &PgPool,
    id: i64,
    summary: &RunSummary,
) -> Result<(), DbError> {
    let status = match summary.state {
        RunState::Completed => "succeeded",
        RunState::Stopped => "stopped",
        RunState::Failed | RunState::Idle | RunState::Running => "failed",
    };
    let error = match summary.state {
        RunState::Completed | RunState::Stopped => None,
        _ => Some(summary.error.as_deref().unwrap_or(summary.message.as_str())),
    };
    close_running(
        pool,
        id,
        status,
        summary.collected,
        summary.seeds_used,
        error,
    )
    .await
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_collection_run(pool: &PgPool, id: i64) -> Result<CollectionRunRow, DbError> {
    let sql = format!("SELECT {RUN_COLUMNS} FROM collection_runs WHERE id = $1");
    sqlx::query_as::<_, CollectionRunRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_collection_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<CollectionRunRow>, DbError> {
    let sql = format!(
        "SELECT {RUN_COLUMNS} FROM collection_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    );
    let rows = sqlx::query_as::<_, CollectionRunRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_schema_check_constraints() {
        assert_eq!(RunType::AutoCollect.as_str(), "auto_collect");
        assert_eq!(RunType::Research.as_str(), "research");
        assert_eq!(TriggerSource::Scheduler.as_str(), "scheduler");
    }

    #[test]
    fn counters_saturate_at_column_range() {
        assert_eq!(to_i32(u32::MAX), i32::MAX);
        assert_eq!(to_i32(12), 12);
    }
}
