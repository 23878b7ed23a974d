use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{ChatSolveRequest, Pagination, SolutionDetails, SolutionListItem, SolveResponse},
    repo,
    services::{self, canonical_mime, MAX_QUESTION_CHARS},
};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    quota,
    solver::SolveInput,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/solutions", get(list_solutions))
        .route("/solutions/:id", get(get_solution))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/solve/image", post(solve_image))
        .route("/solve/chat", post(solve_chat))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

async fn run(
    state: &AppState,
    user: &AuthUser,
    input: SolveInput,
) -> AppResult<Json<SolveResponse>> {
    services::ensure_mode(state, &input)?;
    let today = quota::today(state.config.quota_utc_offset_hours);
    services::admit(state, &user.email, today).await?;

    let grade = services::school_grade(state, &user.email).await;
    let (answer, outcome) =
        services::solve_and_count(state, &user.email, grade.as_deref(), input.clone(), today)
            .await?;
    let id = services::archive(state, user, &input, &answer).await;

    info!(user_id = %user.user_id, used = outcome.used, limit = outcome.limit, "problem solved");
    Ok(Json(SolveResponse::new(id, answer, outcome)))
}

/// POST /solve/image (multipart, one `image` field)
#[instrument(skip(state, user, mp), fields(user_id = %user.user_id))]
pub async fn solve_image(
    State(state): State<AppState>,
    user: AuthUser,
    mut mp: Multipart,
) -> AppResult<Json<SolveResponse>> {
    let mut image = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        let Some(content_type) = canonical_mime(&content_type) else {
            return Err(AppError::BadRequest(
                "image must be a PNG, JPEG or WebP file".into(),
            ));
        };
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if body.is_empty() {
            return Err(AppError::BadRequest("image is empty".into()));
        }
        image = Some(SolveInput::Image {
            body,
            content_type: content_type.to_string(),
        });
        break;
    }

    let input = image.ok_or_else(|| AppError::BadRequest("image is required".into()))?;
    run(&state, &user, input).await
}

/// POST /solve/chat { question }
#[instrument(skip(state, user, body), fields(user_id = %user.user_id))]
pub async fn solve_chat(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ChatSolveRequest>,
) -> AppResult<Json<SolveResponse>> {
    let question = body.question.trim();
    if question.is_empty() {
        return Err(AppError::BadRequest("question is required".into()));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(AppError::BadRequest(format!(
            "question is longer than {MAX_QUESTION_CHARS} characters"
        )));
    }
    run(&state, &user, SolveInput::Question(question.to_string())).await
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn list_solutions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(p): Query<Pagination>,
) -> AppResult<Json<Vec<SolutionListItem>>> {
    let (limit, offset) = p.clamped();
    let rows = repo::list_by_user(&state.db, user.user_id, limit, offset).await?;
    let items = rows
        .into_iter()
        .map(|s| SolutionListItem {
            id: s.id,
            question: s.question,
            has_image: s.image_key.is_some(),
            created_at: s.created_at,
        })
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_solution(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SolutionDetails>> {
    let s = repo::get_for_user(&state.db, user.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Solution not found".into()))?;

    let image_url = match &s.image_key {
        Some(key) => Some(services::presign_image(&state, key).await?),
        None => None,
    };

    Ok(Json(SolutionDetails {
        id: s.id,
        question: s.question,
        answer: s.answer,
        model: s.model,
        image_url,
        created_at: s.created_at,
    }))
}
