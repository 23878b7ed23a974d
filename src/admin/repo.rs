use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::Date;

use crate::quota::Tier;

#[derive(Debug, Clone, FromRow)]
pub struct AccountSummary {
    pub email: String,
    pub school_grade: Option<String>,
    pub tier: String,
    pub questions_used: i32,
    pub last_use_date: Option<Date>,
}

pub async fn list_accounts(
    db: &PgPool,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<AccountSummary>> {
    let rows = sqlx::query_as::<_, AccountSummary>(
        r#"
        SELECT email, school_grade, tier, questions_used, last_use_date
          FROM accounts
         ORDER BY created_at ASC
         LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list accounts")?;
    Ok(rows)
}

/// Returns `false` when no account has this email.
pub async fn set_tier(db: &PgPool, email: &str, tier: Tier) -> anyhow::Result<bool> {
    let res = sqlx::query("UPDATE accounts SET tier = $1 WHERE email = $2")
        .bind(tier.as_str())
        .bind(email)
        .execute(db)
        .await
        .context("update tier")?;
    Ok(res.rows_affected() > 0)
}
