//! Shared send/classify step used by both API clients.

use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;

use crate::error::ApiError;
use crate::key_pool::{CredentialHandle, KeyPool};

/// Longest error body echoed back inside [`ApiError::ClientError`].
const MAX_ERROR_BODY: usize = 512;

/// Sends one request on behalf of `credential` and classifies the outcome.
///
/// Usage is reported for every attempt that reached the network: any
/// response at all, or a timeout after the request went out. A 429 also
/// deactivates the credential. A handle the pool has already deactivated is
/// refused without a request, so retries stop at the daily limit.
pub(crate) async fn send_classified<S: Clone>(
    request: RequestBuilder,
    endpoint: &str,
    pool: &KeyPool<S>,
    credential: &CredentialHandle<S>,
) -> Result<Value, ApiError> {
    if !pool.is_available(credential.id) {
        return Err(ApiError::QuotaExceeded {
            label: credential.label.clone(),
        });
    }

    let response = match request.send().await {
        Ok(response) => {
            pool.report_usage(credential.id);
            response
        }
        Err(err) => {
            if err.is_timeout() {
                pool.report_usage(credential.id);
            }
            return Err(ApiError::Http(err));
        }
    };

    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        pool.report_rate_limited(credential.id);
        return Err(ApiError::QuotaExceeded {
            label: credential.label.clone(),
        });
    }

    if status.is_server_error() {
        return Err(ApiError::ServerError {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
        });
    }

    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(ApiError::ClientError {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            body,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Deserialize {
        context: endpoint.to_string(),
        source: e,
    })
}
