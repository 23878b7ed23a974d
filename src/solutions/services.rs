use anyhow::Context;
use time::Date;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::repo::{self, NewSolution};
use crate::{
    auth::{repo_types::Account, AuthUser},
    error::{AppError, AppResult},
    quota::{QuotaError, QuotaOutcome},
    solver::{build_prompt, SolveInput, SolveRequest, SolverMode},
    state::AppState,
};

pub const MAX_QUESTION_CHARS: usize = 4000;

/// Registered MIME type for an accepted upload; `image/jpg` becomes `image/jpeg`.
pub(crate) fn canonical_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("image/jpeg"),
        "image/png" => Some("image/png"),
        "image/webp" => Some("image/webp"),
        _ => None,
    }
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Rejects input the configured solver cannot take.
pub fn ensure_mode(st: &AppState, input: &SolveInput) -> AppResult<()> {
    let mode = st.solver.mode();
    if input.mode() == mode {
        return Ok(());
    }
    Err(AppError::BadRequest(match mode {
        SolverMode::Image => "This service solves photographed problems; upload an image".into(),
        SolverMode::Chat => "This service answers typed questions; send a question".into(),
    }))
}

/// Refuses the request before any model call once today's quota is spent.
pub async fn admit(st: &AppState, email: &str, today: Date) -> AppResult<QuotaOutcome> {
    let outcome = st.quota.check_and_maybe_increment(email, today, false).await?;
    if !outcome.allowed {
        info!(%email, used = outcome.used, limit = outcome.limit, "solve refused, quota spent");
        return Err(AppError::LimitExceeded {
            used: outcome.used,
            limit: outcome.limit,
        });
    }
    Ok(outcome)
}

/// The grade the answer is tailored to. Lookup failures degrade to an
/// unspecified level rather than blocking an admitted request.
pub async fn school_grade(st: &AppState, email: &str) -> Option<String> {
    match Account::find_by_email(&st.db, email).await {
        Ok(account) => account.and_then(|a| a.school_grade),
        Err(e) => {
            warn!(error = %e, %email, "school grade lookup failed");
            None
        }
    }
}

/// Calls the solver and, only if it produced an answer, counts the request.
pub async fn solve_and_count(
    st: &AppState,
    email: &str,
    grade: Option<&str>,
    input: SolveInput,
    today: Date,
) -> AppResult<(String, QuotaOutcome)> {
    let request = SolveRequest {
        prompt: build_prompt(&st.system_prompt, grade),
        input,
    };
    let answer = st.solver.solve(request).await.map_err(|e| {
        error!(error = %e, %email, "solver failed");
        AppError::BadGateway("the model could not solve this problem, try again".into())
    })?;

    let outcome = match st.quota.check_and_maybe_increment(email, today, true).await {
        Ok(o) => {
            if !o.allowed {
                // a concurrent request took the last slot after admission
                warn!(%email, used = o.used, limit = o.limit, "answered past the daily limit");
            }
            o
        }
        Err(e @ QuotaError::StoreUnavailable { .. }) => {
            error!(error = %e, %email, "answered but usage was not recorded");
            e.fallback()
        }
        Err(e) => return Err(e.into()),
    };
    Ok((answer, outcome))
}

/// Stores the photo (if any) and the answer. Returns the solution id, or
/// `None` when archiving failed; the answer has already been paid for.
pub async fn archive(
    st: &AppState,
    user: &AuthUser,
    input: &SolveInput,
    answer: &str,
) -> Option<Uuid> {
    match try_archive(st, user, input, answer).await {
        Ok(id) => Some(id),
        Err(e) => {
            error!(error = ?e, user_id = %user.user_id, "archiving solution failed");
            None
        }
    }
}

async fn try_archive(
    st: &AppState,
    user: &AuthUser,
    input: &SolveInput,
    answer: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let (question, image_key) = match input {
        SolveInput::Question(q) => (Some(q.as_str()), None),
        SolveInput::Image { body, content_type } => {
            let ext = ext_from_mime(content_type).unwrap_or("bin");
            let key = format!("problems/{}/{}.{}", user.user_id, id, ext);
            st.storage
                .put_object(&key, body.clone(), content_type)
                .await?;
            (None, Some(key))
        }
    };

    let inserted = repo::insert_solution(
        &st.db,
        NewSolution {
            id,
            user_id: user.user_id,
            question,
            image_key: image_key.as_deref(),
            answer,
            model: st.solver.model_name(),
        },
    )
    .await;

    if let Err(e) = inserted {
        if let Some(key) = &image_key {
            if let Err(del) = st.storage.delete_object(key).await {
                warn!(error = %del, %key, "orphaned problem image");
            }
        }
        return Err(e);
    }
    Ok(id)
}

pub async fn presign_image(st: &AppState, key: &str) -> anyhow::Result<String> {
    const TTL_SECS: u64 = 30 * 60;
    st.storage
        .presign_get(key, TTL_SECS)
        .await
        .with_context(|| format!("presign url for {key}"))
}
