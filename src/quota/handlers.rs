use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::{auth::AuthUser, error::AppResult, state::AppState};

use super::QuotaOutcome;

pub fn usage_routes() -> Router<AppState> {
    Router::new().route("/usage", get(get_usage))
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UsageResponse {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub allowed: bool,
}

impl From<QuotaOutcome> for UsageResponse {
    fn from(o: QuotaOutcome) -> Self {
        Self {
            used: o.used,
            limit: o.limit,
            remaining: o.remaining(),
            allowed: o.allowed,
        }
    }
}

/// Daily usage for the caller. Applies a pending day-rollover reset.
#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_usage(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<UsageResponse>> {
    let today = super::today(state.config.quota_utc_offset_hours);
    let outcome = state
        .quota
        .check_and_maybe_increment(&user.email, today, false)
        .await?;
    Ok(Json(outcome.into()))
}
