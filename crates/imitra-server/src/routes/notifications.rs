use axum::{
    Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, patch},
};
use imitra_core::Notification;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ok, ok_with, parse_id};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/read-all", patch(read_all))
        .route("/:id/read", patch(read_one))
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    unread: bool,
}

#[derive(Debug, Serialize)]
struct Inbox {
    items: Vec<Notification>,
    unread: usize,
}

async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.store.list_notifications(auth.0.id, q.unread).await?;
    let unread = if q.unread {
        items.len()
    } else {
        items.iter().filter(|n| !n.read).count()
    };
    Ok(ok(Inbox { items, unread }))
}

async fn read_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state.store.mark_notification_read(auth.0.id, id).await?;
    Ok(ok_with("notification marked as read", json!({ "id": id })))
}

async fn read_all(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.store.mark_all_notifications_read(auth.0.id).await?;
    Ok(ok_with(
        "all notifications marked as read",
        json!({ "updated": updated }),
    ))
}
