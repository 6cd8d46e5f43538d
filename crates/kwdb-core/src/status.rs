//! The live status record of an automatic collection run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Stopped,
    Failed,
}

/// Single mutable record describing the current (or most recent) run.
///
/// Terminal once `is_running` flips back to `false`; `state` then tells a
/// normal completion, a user stop and an error apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoCollectStatus {
    pub is_running: bool,
    pub state: RunState,
    pub stop_requested: bool,
    pub target_count: u32,
    pub current_count: u32,
    pub seeds_used: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status_message: String,
    pub error_message: Option<String>,
}

impl AutoCollectStatus {
    /// Fresh running record for a run targeting `target_count` keywords.
    #[must_use]
    pub fn started(target_count: u32, now: DateTime<Utc>) -> Self {
        Self {
            is_running: true,
            state: RunState::Running,
            stop_requested: false,
            target_count,
            current_count: 0,
            seeds_used: 0,
            start_time: Some(now),
            end_time: None,
            status_message: "starting".to_string(),
            error_message: None,
        }
    }

    /// Marks the record terminal with the given outcome.
    pub fn finish(
        &mut self,
        state: RunState,
        message: impl Into<String>,
        error: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.is_running = false;
        self.stop_requested = false;
        self.state = state;
        self.end_time = Some(now);
        self.status_message = message.into();
        self.error_message = error;
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.target_count.saturating_sub(self.current_count)
    }
}
