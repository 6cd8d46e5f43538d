//! Process-local pool of API credentials with per-credential quota tracking.
//!
//! Selection is least-loaded-first: the credential with the fewest calls so
//! far wins, ties going to the one used longest ago. Counters live only in
//! memory and reset when the process restarts; running several processes
//! against the same credentials will double-count quota.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a caller receives when a credential is selected.
#[derive(Debug, Clone)]
pub struct CredentialHandle<S> {
    pub id: usize,
    pub label: String,
    pub secret: S,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DeactivationReason {
    DailyLimit,
    RateLimited { at: DateTime<Utc> },
}

/// Read-only snapshot of one credential for observability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
    pub id: usize,
    pub label: String,
    pub usage: u32,
    pub daily_limit: u32,
    pub remaining: u32,
    pub active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub deactivated: Option<DeactivationReason>,
}

#[derive(Debug)]
struct CredentialState<S> {
    handle: CredentialHandle<S>,
    usage: u32,
    last_used_at: Option<DateTime<Utc>>,
    active: bool,
    deactivated: Option<DeactivationReason>,
}

#[derive(Debug)]
pub struct KeyPool<S> {
    name: &'static str,
    daily_limit: u32,
    credentials: Mutex<Vec<CredentialState<S>>>,
}

impl<S: Clone> KeyPool<S> {
    /// Builds a pool from `(label, secret)` pairs. Ids are assigned in order.
    pub fn new(
        name: &'static str,
        daily_limit: u32,
        credentials: impl IntoIterator<Item = (String, S)>,
    ) -> Self {
        let credentials = credentials
            .into_iter()
            .enumerate()
            .map(|(id, (label, secret))| CredentialState {
                handle: CredentialHandle { id, label, secret },
                usage: 0,
                last_used_at: None,
                active: true,
                deactivated: None,
            })
            .collect();

        Self {
            name,
            daily_limit,
            credentials: Mutex::new(credentials),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The least-used available credential, or `None` if every credential is
    /// inactive or at its daily limit.
    #[must_use]
    pub fn select_one(&self) -> Option<CredentialHandle<S>> {
        self.select_many(1).into_iter().next()
    }

    /// Up to `n` available credentials ordered by (usage, last used).
    #[must_use]
    pub fn select_many(&self, n: usize) -> Vec<CredentialHandle<S>> {
        let guard = self.lock();
        let mut available: Vec<&CredentialState<S>> = guard
            .iter()
            .filter(|c| c.active && c.usage < self.daily_limit)
            .collect();
        // Stable sort keeps configuration order as the final tiebreaker;
        // `None` (never used) orders before any timestamp.
        available.sort_by_key(|c| (c.usage, c.last_used_at));
        available
            .into_iter()
            .take(n)
            .map(|c| c.handle.clone())
            .collect()
    }

    #[must_use]
    pub fn available_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|c| c.active && c.usage < self.daily_limit)
            .count()
    }

    /// Whether credential `id` is still active and under its daily limit.
    /// Holders of a handle check this before each call; an unknown id is
    /// never available.
    #[must_use]
    pub fn is_available(&self, id: usize) -> bool {
        self.lock()
            .iter()
            .any(|c| c.handle.id == id && c.active && c.usage < self.daily_limit)
    }

    /// Records one network call against credential `id`.
    pub fn report_usage(&self, id: usize) {
        let mut guard = self.lock();
        let Some(cred) = guard.iter_mut().find(|c| c.handle.id == id) else {
            tracing::warn!(pool = self.name, credential = id, "usage reported for unknown credential");
            return;
        };
        cred.usage = cred.usage.saturating_add(1);
        cred.last_used_at = Some(Utc::now());
        if cred.active && cred.usage >= self.daily_limit {
            cred.active = false;
            cred.deactivated = Some(DeactivationReason::DailyLimit);
            tracing::warn!(
                pool = self.name,
                credential = %cred.handle.label,
                usage = cred.usage,
                "credential reached its daily limit; deactivated"
            );
        }
    }

    /// Deactivates credential `id` after an upstream rate-limit response.
    pub fn report_rate_limited(&self, id: usize) {
        let mut guard = self.lock();
        let Some(cred) = guard.iter_mut().find(|c| c.handle.id == id) else {
            tracing::warn!(pool = self.name, credential = id, "rate limit reported for unknown credential");
            return;
        };
        cred.active = false;
        cred.deactivated = Some(DeactivationReason::RateLimited { at: Utc::now() });
        tracing::warn!(
            pool = self.name,
            credential = %cred.handle.label,
            usage = cred.usage,
            "credential rate limited; deactivated"
        );
    }

    /// Reactivates credentials that were rate limited more than `cooldown`
    /// ago and are still under their daily limit. Returns how many came back.
    pub fn reactivate_cooled(&self, cooldown: Duration) -> usize {
        let cooldown = chrono::Duration::from_std(cooldown).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();
        let mut revived = 0;
        for cred in self.lock().iter_mut() {
            if let Some(DeactivationReason::RateLimited { at }) = cred.deactivated {
                let cooled = now.signed_duration_since(at) >= cooldown;
                if cooled && cred.usage < self.daily_limit {
                    cred.active = true;
                    cred.deactivated = None;
                    revived += 1;
                }
            }
        }
        if revived > 0 {
            tracing::info!(pool = self.name, revived, "reactivated cooled-down credentials");
        }
        revived
    }

    /// Zeroes every counter and reactivates every credential.
    pub fn reset(&self) {
        for cred in self.lock().iter_mut() {
            cred.usage = 0;
            cred.last_used_at = None;
            cred.active = true;
            cred.deactivated = None;
        }
        tracing::info!(pool = self.name, "credential pool reset");
    }

    #[must_use]
    pub fn status(&self) -> Vec<CredentialStatus> {
        self.lock()
            .iter()
            .map(|c| CredentialStatus {
                id: c.handle.id,
                label: c.handle.label.clone(),
                usage: c.usage,
                daily_limit: self.daily_limit,
                remaining: self.daily_limit.saturating_sub(c.usage),
                active: c.active,
                last_used_at: c.last_used_at,
                deactivated: c.deactivated,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CredentialState<S>>> {
        self.credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
