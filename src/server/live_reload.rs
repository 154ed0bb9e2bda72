// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Live reload: the browser client, its WebSocket and the file watcher that
//! feeds the change reactor.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use log::{debug, info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::process::LIVE_RELOAD_SOCKET_PATH;
use crate::server::reactor::ChangeReactor;
use crate::server::state::DevSite;
use crate::Result;

/// Time to wait for more events after the first one of a batch.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Capacity of the watcher-to-reactor channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Message pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadEvent {
    #[serde(rename = "type")]
    kind: String,
}

impl ReloadEvent {
    /// Asks clients to reload the whole page.
    pub fn full_reload() -> Self {
        Self {
            kind: "full-reload".to_string(),
        }
    }

    /// Event type as sent on the wire.
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

/// Browser side of live reload. Reconnects when the server restarts.
pub const CLIENT_SCRIPT: &str = r#"const socketPath = "__SOCKET_PATH__";

function connect() {
  const protocol = location.protocol === "https:" ? "wss:" : "ws:";
  const socket = new WebSocket(`${protocol}//${location.host}${socketPath}`);
  socket.addEventListener("message", (event) => {
    try {
      if (JSON.parse(event.data).type === "full-reload") {
        location.reload();
      }
    } catch (error) {
      console.warn("[twinpress] ignoring live reload message", error);
    }
  });
  socket.addEventListener("close", () => setTimeout(connect, 1000));
}

connect();
"#;

/// Serves the live reload client script.
pub async fn script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        CLIENT_SCRIPT.replace("__SOCKET_PATH__", LIVE_RELOAD_SOCKET_PATH),
    )
}

/// Upgrades a live reload connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(site): State<Arc<DevSite>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, site))
}

async fn handle_socket(mut socket: WebSocket, site: Arc<DevSite>) {
    let mut receiver = site.subscribe();
    debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = receiver.recv() => {
                match result {
                    Ok(event) => {
                        let text = match serde_json::to_string(&event) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!("Cannot encode reload event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
    debug!("Live reload client disconnected");
}

/// A running recursive watch on the template root.
///
/// Dropping it stops the watch and, once the channel drains, the reactor task.
pub struct FileWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileWatcher").field("root", &self.root).finish()
    }
}

impl FileWatcher {
    /// Watches `root` and feeds batches of changed paths to `reactor`.
    ///
    /// Events are handled by a single task, one batch at a time.
    ///
    /// # Errors
    ///
    /// Returns `TwinpressError::WatchError` when the watch cannot be set up.
    pub fn start(root: &Path, reactor: ChangeReactor) -> Result<Self> {
        let (tx, mut rx) = mpsc::channel::<Vec<PathBuf>>(EVENT_CHANNEL_CAPACITY);

        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(paths) = relevant_paths(event) {
                        _ = tx.blocking_send(paths);
                    }
                }
                Err(e) => warn!("File watch error: {}", e),
            })?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!("Watching {} for changes", root.display());

        _ = tokio::spawn(async move {
            while let Some(mut batch) = rx.recv().await {
                tokio::time::sleep(DEBOUNCE).await;
                while let Ok(more) = rx.try_recv() {
                    batch.extend(more);
                }
                batch.sort();
                batch.dedup();
                let outcome = reactor.handle_batch(&batch);
                debug!("Handled {} changed path(s): {:?}", batch.len(), outcome);
            }
        });

        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
        })
    }
}

/// Paths of a content-changing event; access and metadata-only events are
/// dropped.
fn relevant_paths(event: Event) -> Option<Vec<PathBuf>> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            if !event.paths.is_empty() =>
        {
            Some(event.paths)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind};

    #[test]
    fn test_reload_event_wire_format() {
        let event = ReloadEvent::full_reload();
        let text = serde_json::to_string(&event).unwrap();
        assert_eq!(text, format!(r#"{{"type":"{}"}}"#, event.kind()));
        assert_eq!(text, r#"{"type":"full-reload"}"#);
    }

    #[test]
    fn test_relevant_paths() {
        let create = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("views/@pages/new.html"));
        assert_eq!(
            relevant_paths(create),
            Some(vec![PathBuf::from("views/@pages/new.html")])
        );

        let access = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("views/index.html"));
        assert_eq!(relevant_paths(access), None);
    }

    #[tokio::test]
    async fn test_script_points_at_socket() {
        let response = script_handler().await.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let script = String::from_utf8(body.to_vec()).unwrap();
        assert!(script.contains(LIVE_RELOAD_SOCKET_PATH));
        assert!(!script.contains("__SOCKET_PATH__"));
    }
}
