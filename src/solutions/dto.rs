use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::quota::QuotaOutcome;

#[derive(Debug, Deserialize)]
pub struct ChatSolveRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SolveResponse {
    /// Archived solution; absent when archiving failed.
    pub id: Option<Uuid>,
    pub answer: String,
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
}

impl SolveResponse {
    pub fn new(id: Option<Uuid>, answer: String, outcome: QuotaOutcome) -> Self {
        Self {
            id,
            answer,
            used: outcome.used,
            limit: outcome.limit,
            remaining: outcome.remaining(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SolutionListItem {
    pub id: Uuid,
    pub question: Option<String>,
    pub has_image: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct SolutionDetails {
    pub id: Uuid,
    pub question: Option<String>,
    pub answer: String,
    pub model: String,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }

impl Pagination {
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}
