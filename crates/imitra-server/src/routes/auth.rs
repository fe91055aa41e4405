use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;
use imitra_core::{NewUser, User, UserView, user::normalize_email};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::auth::{AuthUser, hash_password, issue_token, session_cookie, verify_password};
use crate::error::ApiError;
use crate::extract::{ValidJson, ok, ok_with};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/password", put(change_password))
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 10, max = 16))]
    phone: String,
    #[validate(length(min = 6, max = 128))]
    password: String,
    address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    current_password: String,
    #[validate(length(min = 6, max = 128))]
    new_password: String,
}

#[derive(Debug, Serialize)]
struct Session {
    token: String,
    user: UserView,
}

fn session_response(
    state: &AppState,
    user: &User,
    status: StatusCode,
    message: &str,
) -> Result<impl IntoResponse + use<>, ApiError> {
    let ttl = state.config.jwt_ttl_hours;
    let token = issue_token(user, &state.config.jwt_secret, ttl, Utc::now())?;
    let cookie = session_cookie(&token, ttl);
    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        ok_with(
            message,
            Session {
                token,
                user: user.view(),
            },
        ),
    ))
}

async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = NewUser {
        name: req.name,
        email: req.email,
        phone: req.phone,
        address: req.address,
        ..NewUser::default()
    };
    let hash = hash_password(&req.password, state.config.password_rounds).await?;
    let user = User::new(input, hash, Utc::now())?;
    state.store.insert_user(&user).await?;

    info!(user = %user.id, "citizen registered");
    session_response(&state, &user, StatusCode::CREATED, "registration successful")
}

async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::unauthorized("invalid email or password");
    let mut user = state
        .store
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password_hash).await? {
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::unauthorized("account is deactivated"));
    }

    user.last_login_at = Some(Utc::now());
    state.store.update_user(&user).await?;
    info!(user = %user.id, role = %user.role, "login");
    session_response(&state, &user, StatusCode::OK, "login successful")
}

async fn me(auth: AuthUser) -> impl IntoResponse {
    ok(auth.0.view())
}

async fn change_password(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !verify_password(&req.current_password, &user.password_hash).await? {
        return Err(ApiError::bad_request("current password is incorrect"));
    }
    user.password_hash = hash_password(&req.new_password, state.config.password_rounds).await?;
    state.store.update_user(&user).await?;
    info!(user = %user.id, "password changed");
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "password updated",
    })))
}
