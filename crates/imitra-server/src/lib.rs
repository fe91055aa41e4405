//! i-Mitra HTTP and WebSocket service.
//!
//! [`build_router`] gives the full axum application for a prepared
//! [`AppState`]; [`serve`] wires state from configuration, bootstraps the
//! admin account, starts the SLA monitor and listens until Ctrl+C/SIGTERM.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
mod routes;
pub mod sla_monitor;
pub mod state;
pub mod upload;
pub mod workflow;

use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use chrono::Utc;
use imitra_core::{NewUser, Role, User, user::normalize_email};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

pub use config::{AdminBootstrap, ServerConfig};
pub use error::ApiError;
pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    routes::router(state)
}

/// Create the configured admin unless an account with that email exists.
/// Returns whether an account was created.
pub async fn ensure_admin(state: &AppState) -> anyhow::Result<bool> {
    let Some(admin) = &state.config.admin else {
        return Ok(false);
    };
    if state
        .store
        .find_user_by_email(&normalize_email(&admin.email))
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let input = NewUser {
        name: admin.name.clone(),
        email: admin.email.clone(),
        phone: admin.phone.clone(),
        role: Some(Role::Admin),
        ..NewUser::default()
    };
    let hash = auth::hash_password(&admin.password, state.config.password_rounds).await?;
    let user = User::new(input, hash, Utc::now()).context("invalid admin bootstrap account")?;
    state.store.insert_user(&user).await?;
    info!(email = %user.email, "admin account created");
    Ok(true)
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    config.check()?;
    let bind = config.bind.clone();
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("creating {}", config.upload_dir.display()))?;

    let state = AppState::from_config(config)?;
    ensure_admin(&state).await?;
    let monitor = sla_monitor::spawn(state.clone());

    let app = build_router(state);
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(address = %bind, "i-Mitra listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    monitor.abort();
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
