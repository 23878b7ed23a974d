use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::{info, instrument};

use super::repo::{self, AccountSummary};
use crate::{
    auth::AdminUser,
    error::{AppError, AppResult},
    quota::{self, tier::limit_for, Tier},
    solutions::Pagination,
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/accounts", get(list_accounts))
        .route("/admin/accounts/:email/tier", put(update_tier))
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub email: String,
    pub school_grade: Option<String>,
    pub tier: String,
    /// Questions counted today; a counter from an earlier day reads 0.
    pub questions_used: u32,
    pub limit: u32,
}

impl AccountView {
    fn from_summary(s: AccountSummary, today: Date) -> Self {
        let questions_used = if s.last_use_date == Some(today) {
            u32::try_from(s.questions_used).unwrap_or(0)
        } else {
            0
        };
        Self {
            limit: limit_for(Some(&s.tier)),
            email: s.email,
            school_grade: s.school_grade,
            tier: s.tier,
            questions_used,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTierRequest {
    pub tier: String,
}

#[derive(Debug, Serialize)]
pub struct TierUpdated {
    pub email: String,
    pub tier: Tier,
    pub limit: u32,
}

#[instrument(skip(state, _admin))]
pub async fn list_accounts(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(p): Query<Pagination>,
) -> AppResult<Json<Vec<AccountView>>> {
    let (limit, offset) = p.clamped();
    let today = quota::today(state.config.quota_utc_offset_hours);
    let rows = repo::list_accounts(&state.db, limit, offset).await?;
    Ok(Json(
        rows.into_iter()
            .map(|s| AccountView::from_summary(s, today))
            .collect(),
    ))
}

#[instrument(skip(state, admin, body), fields(admin = %admin.0.email))]
pub async fn update_tier(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(email): Path<String>,
    Json(body): Json<UpdateTierRequest>,
) -> AppResult<Json<TierUpdated>> {
    let tier: Tier = body
        .tier
        .parse()
        .map_err(|e: quota::tier::UnknownTier| AppError::BadRequest(e.to_string()))?;
    let email = email.trim().to_lowercase();

    if !repo::set_tier(&state.db, &email, tier).await? {
        return Err(AppError::NotFound("Account not found".into()));
    }
    info!(%email, %tier, "tier updated");

    Ok(Json(TierUpdated {
        email,
        tier,
        limit: tier.daily_limit(),
    }))
}
