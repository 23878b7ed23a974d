use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::Date;

use super::store::{AccountStore, StoreError, UsageRecord};

#[derive(Debug, FromRow)]
struct UsageRow {
    tier: Option<String>,
    questions_used: Option<i32>,
    last_use_date: Option<Date>,
}

impl From<UsageRow> for UsageRecord {
    fn from(r: UsageRow) -> Self {
        Self {
            tier: r.tier,
            questions_used: r
                .questions_used
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            last_use_date: r.last_use_date,
        }
    }
}

/// Postgres-backed [`AccountStore`] over the `accounts` table.
#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn get_usage(&self, email: &str) -> Result<Option<UsageRecord>, StoreError> {
        let row = sqlx::query_as::<_, UsageRow>(
            r#"
            SELECT tier, questions_used, last_use_date
              FROM accounts
             WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("select usage")?;
        Ok(row.map(UsageRecord::from))
    }

    async fn update_usage(
        &self,
        email: &str,
        questions_used: u32,
        last_use_date: Date,
    ) -> Result<(), StoreError> {
        let used = i32::try_from(questions_used).context("questions_used out of range")?;
        let res = sqlx::query(
            r#"
            UPDATE accounts
               SET questions_used = $1, last_use_date = $2
             WHERE email = $3
            "#,
        )
        .bind(used)
        .bind(last_use_date)
        .bind(email)
        .execute(&self.db)
        .await
        .context("update usage")?;

        if res.rows_affected() == 0 {
            return Err(anyhow::anyhow!("account {email} vanished during update").into());
        }
        Ok(())
    }
}
