use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Account record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub user_id: Uuid,               // generated at registration
    pub email: String,               // primary key, lowercased
    #[serde(skip_serializing)]
    pub password_hash: String,       // Argon2 hash, not exposed in JSON
    pub school_grade: Option<String>,
    pub tier: String,                // Free | Standard | Unlimited
    pub questions_used: i32,
    pub last_use_date: Option<Date>,
    pub created_at: OffsetDateTime,
}
