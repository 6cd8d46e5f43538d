use axum::{
    extract::{Query, State},
    Extension, Json,
};
use kwdb_core::{CompetitionLevel, DocumentCounts, EnrichedKeyword};
use kwdb_db::{RunType, TriggerSource};
use kwdb_research::{KeywordSort, ResearchOutcome, StoredKeyword};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::middleware::RequestId;

use super::{
    map_collect_error, map_db_error, normalize_limit, ApiError, ApiResponse, AppState,
    MAX_SEED_CHARS,
};

#[derive(Debug, Deserialize)]
pub(super) struct KeywordsQuery {
    pub limit: Option<i64>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResearchRequest {
    pub seed: String,
    #[serde(default)]
    pub dry_run: bool,
}

/// One researched keyword as returned to API clients.
#[derive(Debug, Serialize)]
pub(super) struct ResearchItem {
    term: String,
    pc_search_volume: u64,
    mobile_search_volume: u64,
    total_search_volume: u64,
    competition: CompetitionLevel,
    documents: DocumentCounts,
    total_docs: u64,
    potential_score: f64,
}

impl From<&EnrichedKeyword> for ResearchItem {
    fn from(record: &EnrichedKeyword) -> Self {
        let candidate = &record.candidate;
        Self {
            term: candidate.term.clone(),
            pc_search_volume: candidate.pc_search_volume,
            mobile_search_volume: candidate.mobile_search_volume,
            total_search_volume: candidate.total_search_volume(),
            competition: candidate.competition,
            documents: record.documents,
            total_docs: record.total_docs(),
            potential_score: record.potential_score(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ResearchData {
    seed: String,
    dry_run: bool,
    discovered: usize,
    dropped: usize,
    skipped: usize,
    duplicates: usize,
    inserted: usize,
    persistence_error: Option<String>,
    keywords: Vec<ResearchItem>,
}

impl ResearchData {
    fn new(outcome: &ResearchOutcome, dry_run: bool) -> Self {
        Self {
            seed: outcome.seed.clone(),
            dry_run,
            discovered: outcome.discovered,
            dropped: outcome.dropped,
            skipped: outcome.skipped,
            duplicates: outcome.duplicates,
            inserted: outcome.inserted,
            persistence_error: outcome.persistence_error.clone(),
            keywords: outcome.records.iter().map(ResearchItem::from).collect(),
        }
    }
}

pub(super) async fn list_keywords(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<KeywordsQuery>,
) -> Result<Json<ApiResponse<Vec<StoredKeyword>>>, ApiError> {
    let sort = match query.sort.as_deref() {
        None => KeywordSort::default(),
        Some(raw) => raw
            .parse::<KeywordSort>()
            .map_err(|message| ApiError::new(req_id.0.clone(), "validation_error", message))?,
    };

    let rows = kwdb_db::list_keywords(&state.pool, normalize_limit(query.limit), sort)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(StoredKeyword::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// Runs expand, enrich and dedup for one seed, persisting fresh results
/// unless `dry_run` is set.
pub(super) async fn research(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ResearchRequest>,
) -> Result<Json<ApiResponse<ResearchData>>, ApiError> {
    let seed = body.seed.trim();
    if seed.is_empty() || seed.chars().count() > MAX_SEED_CHARS {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("seed must be 1 to {MAX_SEED_CHARS} characters"),
        ));
    }

    let persist = !body.dry_run;
    let run_id = if persist {
        record_start(&state.pool).await
    } else {
        None
    };

    let result = state.collector.research(seed, persist).await;
    if let Some(id) = run_id {
        record_finish(&state.pool, id, &result).await;
    }

    let outcome = result.map_err(|e| map_collect_error(req_id.0.clone(), &e))?;
    tracing::info!(
        seed,
        dry_run = body.dry_run,
        discovered = outcome.discovered,
        inserted = outcome.inserted,
        duplicates = outcome.duplicates,
        "research finished"
    );

    Ok(Json(ApiResponse::new(
        ResearchData::new(&outcome, body.dry_run),
        req_id.0,
    )))
}

async fn record_start(pool: &PgPool) -> Option<i64> {
    let run =
        match kwdb_db::create_collection_run(pool, RunType::Research, TriggerSource::Api, None)
            .await
        {
            Ok(run) => run,
            Err(e) => {
                tracing::warn!(error = %e, "failed to record research run");
                return None;
            }
        };
    match kwdb_db::start_collection_run(pool, run.id).await {
        Ok(()) => Some(run.id),
        Err(e) => {
            tracing::warn!(run_id = run.id, error = %e, "failed to mark research run as running");
            None
        }
    }
}

async fn record_finish(
    pool: &PgPool,
    id: i64,
    result: &Result<ResearchOutcome, kwdb_research::CollectError>,
) {
    let recorded = match result {
        Ok(outcome) => match &outcome.persistence_error {
            None => {
                let inserted = u32::try_from(outcome.inserted).unwrap_or(u32::MAX);
                kwdb_db::complete_collection_run(pool, id, inserted, 1).await
            }
            Some(error) => kwdb_db::fail_collection_run(pool, id, error).await,
        },
        Err(e) => kwdb_db::fail_collection_run(pool, id, &e.to_string()).await,
    };
    if let Err(e) = recorded {
        tracing::warn!(run_id = id, error = %e, "failed to record research outcome");
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use super::super::test_support::{get, json_body, keyword_row, post_json, TestApp};

    #[tokio::test]
    async fn dry_run_returns_keywords_by_potential_score() {
        let app = TestApp::new().await;
        app.mount_keywords(
            &[
                keyword_row("seo tools", 50, 50),
                keyword_row("seo audit", 500, 500),
            ],
            None,
        )
        .await;

        let response = app
            .router()
            .oneshot(post_json(
                "/api/v1/keywords/research",
                &json!({ "seed": "seo", "dry_run": true }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        let data = &json["data"];
        assert_eq!(data["dry_run"], true);
        assert_eq!(data["discovered"], 2);
        assert_eq!(data["inserted"], 0);
        let keywords = data["keywords"].as_array().expect("keywords array");
        assert_eq!(keywords[0]["term"], "seo audit");
        assert_eq!(keywords[0]["total_search_volume"], 1_000);
        assert_eq!(keywords[0]["competition"], "medium");
        assert_eq!(keywords[1]["term"], "seo tools");
    }

    #[tokio::test]
    async fn blank_seed_is_rejected() {
        let app = TestApp::new().await;

        let response = app
            .router()
            .oneshot(post_json(
                "/api/v1/keywords/research",
                &json!({ "seed": "   " }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_sort_is_rejected_before_querying() {
        let app = TestApp::new().await;

        let response = app
            .router()
            .oneshot(get("/api/v1/keywords?sort=alphabetical"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn upstream_failure_on_seed_round_is_an_error() {
        let app = TestApp::new().await;

        // No mock mounted: the upstream answers 404 for every call.
        let response = app
            .router()
            .oneshot(post_json(
                "/api/v1/keywords/research",
                &json!({ "seed": "seo", "dry_run": true }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert!(json["error"]["message"]
            .as_str()
            .expect("message")
            .contains("expansion failed"));
    }
}
