mod analytics;
mod auth;
mod complaints;
mod health;
mod notifications;
mod users;
mod ws;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::middleware::rate_limit;
use crate::state::AppState;

/// Pagination defaults for list endpoints.
pub(crate) const DEFAULT_PAGE_SIZE: usize = 10;
pub(crate) const MAX_PAGE_SIZE: usize = 100;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::routes())
        .nest("/complaints", complaints::routes(&state.config))
        .nest("/analytics", analytics::routes())
        .nest("/users", users::routes())
        .nest("/notifications", notifications::routes())
        .layer(from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(health::health))
        .route("/ws", get(ws::upgrade))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors(state.config.cors_origin.as_deref()))
        .with_state(state)
}

fn cors(origin: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => base
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true),
        Some(Err(_)) => {
            warn!("invalid CORS origin configured, allowing any origin");
            base.allow_origin(Any)
        }
        None => base.allow_origin(Any),
    }
}

/// 1-based page slice plus the metadata clients page with.
pub(crate) fn paginate<T>(items: Vec<T>, page: Option<usize>, limit: Option<usize>) -> Page<T> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = page.unwrap_or(1).max(1);
    let total = items.len();
    let items = items
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .collect();
    Page {
        items,
        total,
        page,
        limit,
        pages: total.div_ceil(limit),
    }
}

#[derive(Debug, serde::Serialize)]
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub pages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_one_based_and_clamped() {
        let p = paginate((1..=25).collect::<Vec<_>>(), Some(3), Some(10));
        assert_eq!(p.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(p.pages, 3);

        let p = paginate((1..=5).collect::<Vec<_>>(), Some(0), Some(1000));
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, MAX_PAGE_SIZE);
        assert_eq!(p.items.len(), 5);
    }
}
