use axum::{
    Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use imitra_core::{Complaint, Role, analytics};
use imitra_store::ComplaintFilter;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ok;
use crate::state::AppState;

const DEFAULT_TREND_DAYS: u32 = 30;
const MAX_TREND_DAYS: u32 = 90;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/departments", get(departments))
        .route("/trends", get(trends))
}

#[derive(Debug, Default, Deserialize)]
struct TrendQuery {
    days: Option<u32>,
}

/// Officers see their department; admins see everything.
async fn scoped(state: &AppState, auth: &AuthUser) -> Result<Vec<Complaint>, ApiError> {
    auth.require(&[Role::Officer, Role::Admin])?;
    let filter = ComplaintFilter::visible_to(&auth.actor());
    Ok(state.store.list_complaints(&filter).await?)
}

async fn overview(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let complaints = scoped(&state, &auth).await?;
    Ok(ok(analytics::overview(&complaints, Utc::now())))
}

async fn departments(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    auth.require(&[Role::Admin])?;
    let complaints = state.store.list_complaints(&ComplaintFilter::default()).await?;
    Ok(ok(analytics::department_stats(&complaints, Utc::now())))
}

async fn trends(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<TrendQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let days = q.days.unwrap_or(DEFAULT_TREND_DAYS);
    if !(1..=MAX_TREND_DAYS).contains(&days) {
        return Err(ApiError::bad_request(format!(
            "days must be between 1 and {MAX_TREND_DAYS}"
        )));
    }
    let complaints = scoped(&state, &auth).await?;
    Ok(ok(analytics::trends(&complaints, days, Utc::now())))
}
