// src/serve/server.rs

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::middleware::map_response_with_state;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

use crate::config::ServerSection;

use super::inject::{CLIENT_JS, CLIENT_PATH, CLIENT_SCRIPT_TAG, EVENTS_PATH, inject_before_body_end};
use super::{ReloadServer, StartFuture};

/// Pages larger than this are served without the reload client.
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

/// axum-based [`ReloadServer`].
#[derive(Debug)]
pub struct DevServer {
    host: String,
    port: u16,
    inject_client: bool,
    reload_tx: broadcast::Sender<u64>,
    reloads: AtomicU64,
    running: Mutex<Option<Running>>,
}

#[derive(Debug)]
struct Running {
    addr: SocketAddr,
    root: PathBuf,
    shutdown: oneshot::Sender<()>,
}

#[derive(Clone)]
struct AppState {
    reload_tx: broadcast::Sender<u64>,
    inject_client: bool,
}

impl DevServer {
    pub fn new(settings: &ServerSection) -> Self {
        let (reload_tx, _) = broadcast::channel(16);
        Self {
            host: settings.host.clone(),
            port: settings.port,
            inject_client: settings.inject_client,
            reload_tx,
            reloads: AtomicU64::new(0),
            running: Mutex::new(None),
        }
    }

    /// Bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock().as_ref().map(|r| r.addr)
    }

    /// Number of reloads broadcast so far.
    pub fn reload_count(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn start_inner(&self, root: &Path) -> anyhow::Result<SocketAddr> {
        if let Some(addr) = self.local_addr() {
            debug!(%addr, "dev server already running");
            return Ok(addr);
        }

        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("binding dev server to {}:{}", self.host, self.port))?;
        let addr = listener.local_addr()?;

        let mut running = self.lock();
        if let Some(existing) = running.as_ref() {
            // Lost a race with a concurrent start; our listener is dropped.
            return Ok(existing.addr);
        }

        let app = router(
            root,
            AppState {
                reload_tx: self.reload_tx.clone(),
                inject_client: self.inject_client,
            },
        );
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(err) = served {
                error!(error = %err, "dev server stopped with an error");
            }
        });

        info!(%addr, root = ?root, "dev server listening");
        *running = Some(Running {
            addr,
            root: root.to_path_buf(),
            shutdown: shutdown_tx,
        });
        Ok(addr)
    }
}

impl ReloadServer for DevServer {
    fn start<'a>(&'a self, root: &'a Path) -> StartFuture<'a> {
        Box::pin(self.start_inner(root))
    }

    fn reload(&self) {
        let Some(addr) = self.local_addr() else {
            warn!("reload requested before the dev server started; ignoring");
            return;
        };
        let n = self.reloads.fetch_add(1, Ordering::Relaxed) + 1;
        // Sending fails only when no browser is connected.
        let clients = self.reload_tx.send(n).unwrap_or(0);
        info!(%addr, clients, "reload broadcast");
    }

    fn stop(&self) {
        if let Some(running) = self.lock().take() {
            info!(addr = %running.addr, root = ?running.root, "stopping dev server");
            let _ = running.shutdown.send(());
        }
    }
}

fn router(root: &Path, state: AppState) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(reload_events))
        .route(CLIENT_PATH, get(client_script))
        .fallback_service(ServeDir::new(root).append_index_html_on_directories(true))
        .layer(map_response_with_state(state.clone(), inject_client_script))
        .with_state(state)
}

async fn reload_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.reload_tx.subscribe()).map(|msg| {
        // A lagged receiver still only needs one reload.
        let id = msg.unwrap_or(0);
        Ok(Event::default().event("reload").data(id.to_string()))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_JS,
    )
}

async fn inject_client_script(State(state): State<AppState>, response: Response) -> Response {
    if !state.inject_client || response.status() != StatusCode::OK || !is_html(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "could not buffer HTML response for injection");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = String::from_utf8_lossy(&bytes);
    let injected = inject_before_body_end(&html, CLIENT_SCRIPT_TAG);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(injected))
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"))
}
