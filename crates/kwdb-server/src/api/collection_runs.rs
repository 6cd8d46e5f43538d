use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CollectionRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CollectionRunItem {
    collection_run_id: Uuid,
    run_type: String,
    trigger_source: String,
    status: String,
    target_count: Option<i32>,
    seeds_used: i32,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    records_processed: i32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<kwdb_db::CollectionRunRow> for CollectionRunItem {
    fn from(row: kwdb_db::CollectionRunRow) -> Self {
        Self {
            collection_run_id: row.public_id,
            run_type: row.run_type,
            trigger_source: row.trigger_source,
            status: row.status,
            target_count: row.target_count,
            seeds_used: row.seeds_used,
            started_at: row.started_at,
            completed_at: row.completed_at,
            records_processed: row.records_processed,
            error_message: row.error_message,
            created_at: row.created_at,
        }
    }
}

pub(super) async fn list_collection_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CollectionRunsQuery>,
) -> Result<Json<ApiResponse<Vec<CollectionRunItem>>>, ApiError> {
    let rows = kwdb_db::list_collection_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(CollectionRunItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

#[cfg(test)]
mod tests {
    use super::CollectionRunItem;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn collection_run_item_hides_internal_id() {
        let row = kwdb_db::CollectionRunRow {
            id: 77,
            public_id: Uuid::new_v4(),
            run_type: "auto_collect".to_string(),
            trigger_source: "scheduler".to_string(),
            status: "stopped".to_string(),
            target_count: Some(500),
            seeds_used: 3,
            started_at: Some(Utc::now()),
            completed_at: Some(Utc::now()),
            records_processed: 120,
            error_message: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(CollectionRunItem::from(row)).expect("serialize");
        assert!(json.get("id").is_none());
        assert_eq!(json["status"], "stopped");
        assert_eq!(json["records_processed"], 120);
        assert_eq!(json["seeds_used"], 3);
    }
}
