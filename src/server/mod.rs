// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Development Server
//!
//! Serves templates live with axum:
//!
//! ```text
//! request ──► render_templates middleware ──► Index / Page / Template: rendered HTML
//!                     │
//!                     └─ pass through ──► live reload routes
//!                                         /assets   (asset tree)
//!                                         fallback  (template root files, else 404)
//! ```
//!
//! With live reload enabled a `notify` watcher on the template root drives
//! the [`reactor::ChangeReactor`], which pushes reload events to browsers
//! over a WebSocket.

/// Request classification and page rendering.
pub mod handler;
/// Live reload client, socket and file watcher.
pub mod live_reload;
/// Reaction to file changes.
pub mod reactor;
/// Shared server state.
pub mod state;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use log::{error, info};
use tower_http::services::ServeDir;

use crate::core::config::Config;
use crate::process::{LIVE_RELOAD_SCRIPT_PATH, LIVE_RELOAD_SOCKET_PATH};
use crate::urls::ASSETS_MOUNT;
use crate::{Result, TwinpressError};

use self::live_reload::FileWatcher;
use self::reactor::ChangeReactor;
use self::state::DevSite;

/// Builds the router for `site`.
pub fn create_router(site: Arc<DevSite>) -> Router {
    let config = site.config();
    let mut router = Router::new();
    if config.server.live_reload {
        router = router
            .route(LIVE_RELOAD_SCRIPT_PATH, get(live_reload::script_handler))
            .route(LIVE_RELOAD_SOCKET_PATH, get(live_reload::ws_handler));
    }

    router
        .nest_service(ASSETS_MOUNT, ServeDir::new(&config.assets_dir))
        .fallback_service(ServeDir::new(&config.template_dir))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&site),
            handler::render_templates,
        ))
        .with_state(site)
}

/// Runs the development server until Ctrl-C.
///
/// # Errors
///
/// Fails when the address cannot be bound, the watcher cannot be started or
/// the server stops with an I/O error.
pub async fn run_server(config: Config) -> Result<()> {
    let site = Arc::new(DevSite::new(config));
    let server = site.config().server.clone();

    let _watcher = if server.live_reload {
        Some(FileWatcher::start(
            &site.config().template_dir,
            ChangeReactor::new(Arc::clone(&site)),
        )?)
    } else {
        None
    };

    let router = create_router(site);
    let listener = tokio::net::TcpListener::bind((server.host.as_str(), server.port))
        .await
        .map_err(|e| {
            TwinpressError::server_error(format!(
                "Cannot bind {}:{}: {}",
                server.host, server.port, e
            ))
        })?;
    info!("Serving on http://{}:{}", server.host, server.port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TwinpressError::server_error(e.to_string()))
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, stopping server..."),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
