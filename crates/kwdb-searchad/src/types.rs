//! Parsing boundary for keyword-ads and document-search responses.
//!
//! Upstream rows are loosely typed (counts arrive as numbers or as strings
//! such as `"< 10"`), so each row goes through [`parse_candidate`] and comes
//! out as a [`Parsed`] value instead of being trusted field by field.

use chrono::{DateTime, Utc};
use kwdb_core::{normalize_volume, CompetitionLevel, KeywordCandidate};
use serde_json::Value;

use crate::error::ApiError;

/// Outcome of mapping one upstream record.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Record(T),
    Malformed { reason: String },
}

impl<T> Parsed<T> {
    pub fn into_record(self) -> Option<T> {
        match self {
            Parsed::Record(record) => Some(record),
            Parsed::Malformed { .. } => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Parsed::Malformed { .. })
    }
}

/// Upstream comparison key for a term: whitespace removed, lowercased.
#[must_use]
pub fn term_key(term: &str) -> String {
    term.split_whitespace().collect::<String>().to_lowercase()
}

/// Extracts the `keywordList` array from a keyword-ads response body.
pub(crate) fn keyword_list<'a>(body: &'a Value, context: &str) -> Result<&'a [Value], ApiError> {
    body.get("keywordList")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| ApiError::Malformed {
            context: context.to_string(),
            reason: "missing keywordList array".to_string(),
        })
}

/// The `relKeyword` of a row, if it is a non-empty string.
pub(crate) fn related_term(row: &Value) -> Option<&str> {
    row.get("relKeyword")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Maps one `keywordList` row onto a [`KeywordCandidate`].
///
/// `relKeyword` and both monthly query counts are required; click, CTR and
/// depth metrics default to zero when absent or unparseable.
#[must_use]
pub fn parse_candidate(row: &Value, fetched_at: DateTime<Utc>) -> Parsed<KeywordCandidate> {
    let Some(term) = related_term(row) else {
        return Parsed::Malformed {
            reason: "relKeyword missing or empty".to_string(),
        };
    };

    let volume = |field: &str| row.get(field).and_then(normalize_volume);
    let Some(pc_search_volume) = volume("monthlyPcQcCnt") else {
        return Parsed::Malformed {
            reason: format!("monthlyPcQcCnt missing or invalid for '{term}'"),
        };
    };
    let Some(mobile_search_volume) = volume("monthlyMobileQcCnt") else {
        return Parsed::Malformed {
            reason: format!("monthlyMobileQcCnt missing or invalid for '{term}'"),
        };
    };

    let metric = |field: &str| row.get(field).map_or(0.0, metric_value);

    Parsed::Record(KeywordCandidate {
        term: term.to_string(),
        pc_search_volume,
        mobile_search_volume,
        pc_click_count: metric("monthlyAvePcClkCnt"),
        mobile_click_count: metric("monthlyAveMobileClkCnt"),
        pc_ctr: metric("monthlyAvePcCtr"),
        mobile_ctr: metric("monthlyAveMobileCtr"),
        ad_depth: metric("plAvgDepth"),
        competition: row
            .get("compIdx")
            .and_then(Value::as_str)
            .map_or(CompetitionLevel::Unknown, CompetitionLevel::from_label),
        raw_response: row.clone(),
        fetched_at,
    })
}

fn metric_value(raw: &Value) -> f64 {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches('<')
            .trim()
            .replace(',', "")
            .parse::<f64>()
            .ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0)
}

/// Reads `total` from a document-search response body.
pub(crate) fn document_total(body: &Value, context: &str) -> Result<u64, ApiError> {
    body.get("total")
        .and_then(normalize_volume)
        .ok_or_else(|| ApiError::Malformed {
            context: context.to_string(),
            reason: "missing or invalid total".to_string(),
        })
}
