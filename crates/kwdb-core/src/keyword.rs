//! Keyword records and the metrics derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Volume substituted for upstream values reported only as "below the floor"
/// (e.g. `"< 10"`).
pub const VOLUME_FLOOR: u64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionLevel {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl CompetitionLevel {
    /// Maps an upstream competition label onto a level.
    ///
    /// Accepts both the Korean labels the ads API emits and their English
    /// equivalents. Anything unrecognised is [`CompetitionLevel::Unknown`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "낮음" | "low" => Self::Low,
            "중간" | "medium" | "mid" => Self::Medium,
            "높음" | "high" => Self::High,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CompetitionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics for one term as returned by the keyword-ads detail call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCandidate {
    pub term: String,
    pub pc_search_volume: u64,
    pub mobile_search_volume: u64,
    pub pc_click_count: f64,
    pub mobile_click_count: f64,
    pub pc_ctr: f64,
    pub mobile_ctr: f64,
    /// Average number of ads shown for the term.
    pub ad_depth: f64,
    pub competition: CompetitionLevel,
    pub raw_response: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

impl KeywordCandidate {
    #[must_use]
    pub fn total_search_volume(&self) -> u64 {
        self.pc_search_volume
            .saturating_add(self.mobile_search_volume)
    }
}

/// Per-type document counts from the document search API.
///
/// Missing or failed counts are represented as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCounts {
    pub blog: u64,
    pub news: u64,
    pub web: u64,
    pub cafe: u64,
}

impl DocumentCounts {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.blog
            .saturating_add(self.news)
            .saturating_add(self.web)
            .saturating_add(self.cafe)
    }
}

/// A candidate joined with its document counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedKeyword {
    pub candidate: KeywordCandidate,
    pub documents: DocumentCounts,
}

impl EnrichedKeyword {
    #[must_use]
    pub fn new(candidate: KeywordCandidate, documents: DocumentCounts) -> Self {
        Self {
            candidate,
            documents,
        }
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.candidate.term
    }

    #[must_use]
    pub fn total_docs(&self) -> u64 {
        self.documents.total()
    }

    #[must_use]
    pub fn potential_score(&self) -> f64 {
        potential_score(self.candidate.total_search_volume(), self.total_docs())
    }
}

/// `(total_search_volume / max(total_docs, 1)) * 100`.
///
/// Never negative; zero whenever `total_search_volume` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn potential_score(total_search_volume: u64, total_docs: u64) -> f64 {
    let docs = total_docs.max(1) as f64;
    (total_search_volume as f64 / docs) * 100.0
}

/// Normalises one upstream search-volume value.
///
/// Numbers are truncated to non-negative integers. Strings of the form
/// `"< N"` map to [`VOLUME_FLOOR`]; other strings are parsed after stripping
/// thousands separators. Returns `None` for anything unparseable.
#[must_use]
pub fn normalize_volume(raw: &serde_json::Value) -> Option<u64> {
    match raw {
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Some(v)
            } else if n.as_i64().is_some() {
                Some(0)
            } else {
                n.as_f64().map(float_to_volume)
            }
        }
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('<') {
                return Some(VOLUME_FLOOR);
            }
            let digits: String = trimmed.chars().filter(|c| *c != ',').collect();
            digits
                .parse::<u64>()
                .ok()
                .or_else(|| digits.parse::<f64>().ok().map(float_to_volume))
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_to_volume(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 {
        v.trunc() as u64
    } else {
        0
    }
}
