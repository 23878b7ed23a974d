//! Daily usage quota: the tier table, the account store seam and the
//! tracker that decides whether a request may proceed.

pub mod handlers;
pub mod repo;
pub mod store;
pub mod tier;
pub mod tracker;

use axum::Router;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::state::AppState;

pub use tier::Tier;
pub use tracker::{QuotaError, QuotaOutcome, QuotaTracker};

pub fn router() -> Router<AppState> {
    handlers::usage_routes()
}

/// The calendar date quotas are counted against, `offset_hours` from UTC.
pub fn today(offset_hours: i8) -> Date {
    let offset = UtcOffset::from_hms(offset_hours, 0, 0).unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset).date()
}
