use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MeResponse, PublicUser, RefreshRequest, RegisterRequest},
        repo_types::Account,
        services::{
            hash_password, is_valid_email, normalize_email, verify_password, AuthUser, JwtKeys,
            MIN_PASSWORD_LEN,
        },
    },
    error::{AppError, AppResult},
    quota,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(state: &AppState, account: Account) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(account.user_id, &account.email)?;
    let refresh_token = keys.sign_refresh(account.user_id, &account.email)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: account.user_id,
            email: account.email,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let grade = payload.school_grade.trim();
    if grade.is_empty() {
        return Err(AppError::BadRequest("School grade is required".into()));
    }

    let hash = hash_password(&payload.password)?;
    let today = quota::today(state.config.quota_utc_offset_hours);

    let Some(account) = Account::create(&state.db, &payload.email, &hash, grade, today).await?
    else {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    };

    info!(user_id = %account.user_id, email = %account.email, "account registered");
    issue_tokens(&state, account)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (axum::http::StatusCode, String)> {
    payload.email = normalize_email(&payload.email);
    let invalid = || {
        (
            axum::http::StatusCode::UNAUTHORIZED,
            "Invalid credentials".to_string(),
        )
    };

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "login malformed email");
        return Err(invalid());
    }

    let account = match Account::find_by_email(&state.db, &payload.email).await {
        Ok(Some(a)) => a,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err(invalid());
        }
        Err(e) => {
            tracing::error!(error = %e, "find_by_email failed");
            return Err((
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                "Login unavailable, retry later".into(),
            ));
        }
    };

    match verify_password(&payload.password, &account.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = %account.user_id, "login invalid password");
            return Err(invalid());
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = %account.user_id, "stored hash unreadable");
            return Err(invalid());
        }
    }

    info!(user_id = %account.user_id, "account logged in");
    issue_tokens(&state, account).map_err(|e| {
        tracing::error!(error = %e, "jwt signing failed");
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    })
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (axum::http::StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (axum::http::StatusCode::UNAUTHORIZED, e.to_string()))?;

    let account = match Account::find_by_id(&state.db, claims.sub).await {
        Ok(Some(a)) => a,
        Ok(None) => {
            warn!(user_id = %claims.sub, "refresh for missing account");
            return Err((
                axum::http::StatusCode::UNAUTHORIZED,
                "User not found".to_string(),
            ));
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = %claims.sub, "find_by_id failed");
            return Err((
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                "Refresh unavailable, retry later".into(),
            ));
        }
    };

    issue_tokens(&state, account).map_err(|e| {
        tracing::error!(error = %e, "jwt signing failed");
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    })
}

#[instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<MeResponse>> {
    let account = Account::find_by_id(&state.db, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(MeResponse {
        is_admin: state.config.is_admin(&account.email),
        id: account.user_id,
        email: account.email,
        school_grade: account.school_grade,
        tier: account.tier,
        created_at: account.created_at,
    }))
}

#[cfg(test)]
mod me_tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn test_me_response_serialization() {
        let response = MeResponse {
            id: uuid::Uuid::new_v4(),
            email: "test@example.com".to_string(),
            school_grade: Some("Common core science".into()),
            tier: "Free".into(),
            is_admin: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["tier"], "Free");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
    }
}

#[cfg(test)]
mod token_tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::quota::store::MemoryAccountStore;
    use crate::solver::{CannedSolver, SolverMode};
    use crate::state::testing;

    fn state() -> AppState {
        testing::fake(
            Arc::new(MemoryAccountStore::default()),
            Arc::new(CannedSolver::answering(SolverMode::Chat, "ok")),
        )
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(res: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn refresh_during_database_outage_is_unavailable() {
        let state = state();
        let token = JwtKeys::from_config(&state.config.jwt)
            .sign_refresh(Uuid::new_v4(), "kid@example.com")
            .unwrap();

        let res = auth_routes()
            .with_state(state)
            .oneshot(post_json(
                "/auth/refresh",
                serde_json::json!({ "refresh_token": token }),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_text(res).await.contains("retry later"));
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() {
        let state = state();
        let token = JwtKeys::from_config(&state.config.jwt)
            .sign_access(Uuid::new_v4(), "kid@example.com")
            .unwrap();

        let res = auth_routes()
            .with_state(state)
            .oneshot(post_json(
                "/auth/refresh",
                serde_json::json!({ "refresh_token": token }),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_login_email_is_invalid_credentials() {
        let res = auth_routes()
            .with_state(state())
            .oneshot(post_json(
                "/auth/login",
                serde_json::json!({ "email": "not-an-email", "password": "secret1" }),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(res).await, "Invalid credentials");
    }
}
