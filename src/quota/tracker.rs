use std::sync::Arc;

use serde::Serialize;
use time::Date;
use tracing::{debug, info, warn};

use super::{
    store::{AccountStore, StoreError},
    tier::{limit_for, DEFAULT_DAILY_LIMIT},
};

/// Result of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaOutcome {
    pub allowed: bool,
    pub used: u32,
    pub limit: u32,
}

impl QuotaOutcome {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    fn denied(used: u32, limit: u32) -> Self {
        Self {
            allowed: false,
            used,
            limit,
        }
    }
}

/// Failures are fail-closed: each variant carries the outcome the caller
/// should act on, which never allows the request.
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error("no account for {email}")]
    AccountNotFound { email: String },
    #[error("usage could not be confirmed: {source}")]
    StoreUnavailable {
        #[source]
        source: StoreError,
        used: u32,
        limit: u32,
    },
}

impl QuotaError {
    pub fn fallback(&self) -> QuotaOutcome {
        match self {
            QuotaError::AccountNotFound { .. } => QuotaOutcome::denied(0, DEFAULT_DAILY_LIMIT),
            QuotaError::StoreUnavailable { used, limit, .. } => QuotaOutcome::denied(*used, *limit),
        }
    }
}

/// Owns the daily counter rules on top of an [`AccountStore`].
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn AccountStore>,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Reports whether `email` may make another request on `today` and,
    /// when `increment` is set, consumes one request if so.
    ///
    /// A counter stamped with another date counts as zero. A pure query on
    /// a new day persists that reset; a same-day query never writes.
    pub async fn check_and_maybe_increment(
        &self,
        email: &str,
        today: Date,
        increment: bool,
    ) -> Result<QuotaOutcome, QuotaError> {
        let record = self
            .store
            .get_usage(email)
            .await
            .map_err(|source| QuotaError::StoreUnavailable {
                source,
                used: 0,
                limit: DEFAULT_DAILY_LIMIT,
            })?
            .ok_or_else(|| QuotaError::AccountNotFound {
                email: email.to_string(),
            })?;

        let limit = limit_for(record.tier.as_deref());
        let same_day = record.last_use_date == Some(today);
        let used = if same_day { record.questions_used } else { 0 };

        let write = match (increment, used < limit) {
            (true, true) => Some(used + 1),
            (true, false) => None,
            (false, _) if !same_day => Some(0),
            (false, _) => None,
        };

        let Some(new_used) = write else {
            if increment {
                debug!(%email, used, limit, "daily limit reached");
                return Ok(QuotaOutcome::denied(used, limit));
            }
            return Ok(QuotaOutcome {
                allowed: used < limit,
                used,
                limit,
            });
        };

        if let Err(source) = self.store.update_usage(email, new_used, today).await {
            warn!(%email, error = %source, "usage write failed");
            return Err(QuotaError::StoreUnavailable {
                source,
                used,
                limit,
            });
        }

        if increment {
            info!(%email, used = new_used, limit, "request counted");
        } else {
            debug!(%email, %today, "daily counter reset");
        }
        Ok(QuotaOutcome {
            allowed: increment || new_used < limit,
            used: new_used,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::quota::store::{MemoryAccountStore, UsageRecord};

    const EMAIL: &str = "student@example.com";
    const TODAY: Date = date!(2025 - 03 - 14);
    const YESTERDAY: Date = date!(2025 - 03 - 13);

    fn tracker_with(
        tier: &str,
        used: u32,
        last: Option<Date>,
    ) -> (QuotaTracker, Arc<MemoryAccountStore>) {
        let store = Arc::new(MemoryAccountStore::default());
        store.insert(
            EMAIL,
            UsageRecord {
                tier: Some(tier.into()),
                questions_used: used,
                last_use_date: last,
            },
        );
        (QuotaTracker::new(store.clone()), store)
    }

    fn outcome(allowed: bool, used: u32, limit: u32) -> QuotaOutcome {
        QuotaOutcome { allowed, used, limit }
    }

    #[tokio::test]
    async fn free_tier_runs_out_at_five() {
        let (tracker, store) = tracker_with("Free", 4, Some(TODAY));

        let first = tracker.check_and_maybe_increment(EMAIL, TODAY, true).await.unwrap();
        assert_eq!(first, outcome(true, 5, 5));

        let second = tracker.check_and_maybe_increment(EMAIL, TODAY, true).await.unwrap();
        assert_eq!(second, outcome(false, 5, 5));
        assert_eq!(store.get(EMAIL).unwrap().questions_used, 5);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn stale_counter_resets_before_increment() {
        let (tracker, store) = tracker_with("Standard", 20, Some(YESTERDAY));

        let res = tracker.check_and_maybe_increment(EMAIL, TODAY, true).await.unwrap();
        assert_eq!(res, outcome(true, 1, 20));

        let row = store.get(EMAIL).unwrap();
        assert_eq!(row.questions_used, 1);
        assert_eq!(row.last_use_date, Some(TODAY));
    }

    #[tokio::test]
    async fn unknown_tier_gets_default_limit() {
        let (tracker, _) = tracker_with("Gold", 0, Some(TODAY));
        let res = tracker.check_and_maybe_increment(EMAIL, TODAY, false).await.unwrap();
        assert_eq!(res.limit, DEFAULT_DAILY_LIMIT);
    }

    #[tokio::test]
    async fn counts_every_increment_below_limit() {
        let (tracker, store) = tracker_with("Standard", 0, None);
        for n in 1..=19 {
            let res = tracker.check_and_maybe_increment(EMAIL, TODAY, true).await.unwrap();
            assert!(res.allowed, "call {n} should be allowed");
            assert_eq!(res.used, n);
        }
        assert_eq!(store.get(EMAIL).unwrap().questions_used, 19);
    }

    #[tokio::test]
    async fn query_after_rollover_persists_reset() {
        let (tracker, store) = tracker_with("Free", 5, Some(YESTERDAY));

        let res = tracker.check_and_maybe_increment(EMAIL, TODAY, false).await.unwrap();
        assert_eq!(res, outcome(true, 0, 5));

        let row = store.get(EMAIL).unwrap();
        assert_eq!(row.questions_used, 0);
        assert_eq!(row.last_use_date, Some(TODAY));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn repeated_queries_write_once() {
        let (tracker, store) = tracker_with("Free", 3, Some(YESTERDAY));

        let a = tracker.check_and_maybe_increment(EMAIL, TODAY, false).await.unwrap();
        let b = tracker.check_and_maybe_increment(EMAIL, TODAY, false).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn same_day_query_never_writes() {
        let (tracker, store) = tracker_with("Free", 5, Some(TODAY));

        let res = tracker.check_and_maybe_increment(EMAIL, TODAY, false).await.unwrap();
        assert_eq!(res, outcome(false, 5, 5));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn missing_account_is_denied() {
        let tracker = QuotaTracker::new(Arc::new(MemoryAccountStore::default()));

        let err = tracker
            .check_and_maybe_increment("ghost@example.com", TODAY, true)
            .await
            .unwrap_err();
        assert!(matches!(err, QuotaError::AccountNotFound { .. }));
        assert_eq!(err.fallback(), outcome(false, 0, DEFAULT_DAILY_LIMIT));
    }

    #[tokio::test]
    async fn read_failure_fails_closed() {
        let (tracker, store) = tracker_with("Standard", 1, Some(TODAY));
        store.fail_reads(true);

        let err = tracker.check_and_maybe_increment(EMAIL, TODAY, true).await.unwrap_err();
        assert!(matches!(err, QuotaError::StoreUnavailable { .. }));
        assert_eq!(err.fallback(), outcome(false, 0, DEFAULT_DAILY_LIMIT));
    }

    #[tokio::test]
    async fn write_failure_keeps_last_read_counter() {
        let (tracker, store) = tracker_with("Standard", 7, Some(TODAY));
        store.fail_writes(true);

        let err = tracker.check_and_maybe_increment(EMAIL, TODAY, true).await.unwrap_err();
        assert_eq!(err.fallback(), outcome(false, 7, 20));
        assert_eq!(store.get(EMAIL).unwrap().questions_used, 7);
    }

    #[tokio::test]
    async fn failed_rollover_reset_is_denied() {
        let (tracker, store) = tracker_with("Standard", 20, Some(YESTERDAY));
        store.fail_writes(true);

        let err = tracker.check_and_maybe_increment(EMAIL, TODAY, false).await.unwrap_err();
        assert!(matches!(err, QuotaError::StoreUnavailable { .. }));
        assert_eq!(err.fallback(), outcome(false, 0, 20));
        let row = store.get(EMAIL).unwrap();
        assert_eq!((row.questions_used, row.last_use_date), (20, Some(YESTERDAY)));
    }
}
