use axum::{extract::State, Extension, Json};
use kwdb_searchad::CredentialStatus;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct PoolStatus {
    name: &'static str,
    daily_limit: u32,
    available: usize,
    credentials: Vec<CredentialStatus>,
}

#[derive(Debug, Serialize)]
pub(super) struct KeyStatusData {
    search_ad: PoolStatus,
    document_search: PoolStatus,
}

fn snapshot(state: &AppState) -> KeyStatusData {
    let search_ad = &state.search_ad_keys;
    let doc_count = &state.doc_count_keys;
    KeyStatusData {
        search_ad: PoolStatus {
            name: search_ad.name(),
            daily_limit: search_ad.daily_limit(),
            available: search_ad.available_count(),
            credentials: search_ad.status(),
        },
        document_search: PoolStatus {
            name: doc_count.name(),
            daily_limit: doc_count.daily_limit(),
            available: doc_count.available_count(),
            credentials: doc_count.status(),
        },
    }
}

pub(super) async fn get_key_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<KeyStatusData>> {
    Json(ApiResponse::new(snapshot(&state), req_id.0))
}

/// Reactivates every credential in both pools and zeroes their counters.
pub(super) async fn reset_keys(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<KeyStatusData>> {
    state.search_ad_keys.reset();
    state.doc_count_keys.reset();
    Json(ApiResponse::new(snapshot(&state), req_id.0))
}
