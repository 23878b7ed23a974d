use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Solution {
    pub id: Uuid,
    pub question: Option<String>,
    pub image_key: Option<String>,
    pub answer: String,
    pub model: String,
    pub created_at: OffsetDateTime,
}

pub struct NewSolution<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question: Option<&'a str>,
    pub image_key: Option<&'a str>,
    pub answer: &'a str,
    pub model: &'a str,
}

pub async fn insert_solution(db: &PgPool, s: NewSolution<'_>) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO solutions (id, user_id, question, image_key, answer, model)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(s.id)
    .bind(s.user_id)
    .bind(s.question)
    .bind(s.image_key) // Option<&str> → NULL allowed
    .bind(s.answer)
    .bind(s.model)
    .execute(db)
    .await
    .context("insert solution")?;
    Ok(())
}

pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Solution>> {
    let rows = sqlx::query_as::<_, Solution>(
        r#"
        SELECT id, question, image_key, answer, model, created_at
          FROM solutions
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list solutions by user")?;
    Ok(rows)
}

pub async fn get_for_user(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> anyhow::Result<Option<Solution>> {
    let row = sqlx::query_as::<_, Solution>(
        r#"
        SELECT id, question, image_key, answer, model, created_at
          FROM solutions
         WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("get solution")?;
    Ok(row)
}
