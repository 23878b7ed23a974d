use crate::auth::repo_types::Account;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "user_id, email, password_hash, school_grade, tier, \
                               questions_used, last_use_date, created_at";

impl Account {
    /// Find an account by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    /// Find an account by its generated ID.
    pub async fn find_by_id(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    /// Create a Free-tier account. Returns `None` if the email is taken.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        school_grade: &str,
        today: Date,
    ) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (email, user_id, password_hash, school_grade, last_use_date, tier)
            VALUES ($1, $2, $3, $4, $5, 'Free')
            ON CONFLICT (email) DO NOTHING
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(Uuid::new_v4())
        .bind(password_hash)
        .bind(school_grade)
        .bind(today)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }
}
