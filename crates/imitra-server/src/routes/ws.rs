//! Live push over WebSocket. A connection joins its role, department and
//! user rooms and receives every event addressed to any of them.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use imitra_core::{Room, User};
use imitra_notify::Subscription;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::{authenticate, token_from_headers};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

pub async fn upgrade(
    State(state): State<AppState>,
    Query(q): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = q
        .token
        .or_else(|| token_from_headers(&headers))
        .ok_or_else(|| ApiError::unauthorized("authentication required"))?;
    let user = authenticate(&state, &token).await?;
    let sub = state
        .hub
        .subscribe(Room::memberships(user.id, user.role, user.department));
    Ok(ws.on_upgrade(move |socket| session(socket, user, sub)))
}

async fn session(socket: WebSocket, user: User, mut sub: Subscription) {
    info!(user = %user.id, rooms = sub.memberships().len(), "push client connected");
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = sub.next() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(error = %e, event = event.name(), "encoding push event failed");
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(msg)) => debug!(user = %user.id, ?msg, "ignoring client message"),
                Some(Err(e)) => {
                    debug!(user = %user.id, error = %e, "push socket error");
                    break;
                }
            },
        }
    }

    info!(user = %user.id, "push client disconnected");
}
