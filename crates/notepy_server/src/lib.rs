//! HTTP adapter for Notepy.
//!
//! # Responsibility
//! - Expose the note store as a JSON API plus a minimal landing page.
//! - Enforce input limits from `[notes]` config before touching the store.
//!
//! # Invariants
//! - All store access goes through [`AppState::with_store`]: one mutex,
//!   entered on the blocking pool, so file I/O never stalls async workers
//!   and each read-modify-persist runs without interleaving.
//! - Error bodies are always `{"error": "..."}`.

pub mod error;
pub mod routes;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use log::{info, warn};
use notepy_core::{AppConfig, NoteStore, NotesConfig, ResourcePaths, ServerConfig};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tower_http::cors::CorsLayer;

pub use error::ApiError;

/// Shared state handed to every handler.
pub struct AppState {
    store: Arc<Mutex<NoteStore>>,
    pub notes: NotesConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: NoteStore, notes: NotesConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            notes,
            started_at: Instant::now(),
        }
    }

    /// Runs `op` with exclusive store access on the blocking thread pool.
    pub async fn with_store<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut NoteStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let mut guard = store.lock().unwrap_or_else(PoisonError::into_inner);
            op(&mut guard)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("store task failed: {err}")))
    }

    pub(crate) fn check_title(&self, title: &str) -> Result<(), ApiError> {
        if title.chars().count() > self.notes.max_title_length {
            return Err(ApiError::bad_request(format!(
                "Title exceeds {} characters",
                self.notes.max_title_length
            )));
        }
        Ok(())
    }

    pub(crate) fn check_content(&self, content: &str) -> Result<(), ApiError> {
        if content.chars().count() > self.notes.max_content_length {
            return Err(ApiError::bad_request(format!(
                "Content exceeds {} characters",
                self.notes.max_content_length
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ServerError {
    Bind {
        addr: String,
        source: std::io::Error,
    },
    Serve(std::io::Error),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bind { addr, source } => write!(f, "failed to bind `{addr}`: {source}"),
            Self::Serve(err) => write!(f, "server error: {err}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Bind { source, .. } => Some(source),
            Self::Serve(err) => Some(err),
        }
    }
}

/// Builds the application router over `state`.
pub fn build_router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/api/status", get(routes::status))
        .route(
            "/api/notes",
            get(routes::list_notes).post(routes::create_note),
        )
        .route(
            "/api/notes/:note_id",
            get(routes::get_note)
                .put(routes::update_note)
                .delete(routes::delete_note),
        )
        .route("/api/notes/:note_id/tags", post(routes::add_tag))
        .route("/api/notes/:note_id/tags/:tag", delete(routes::remove_tag))
        .route("/api/notes/:note_id/export", get(routes::export_note))
        .route("/api/tags", get(routes::list_tags))
        .route("/api/export", get(routes::export_notes))
        .route("/api/import", post(routes::import_notes))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API until Ctrl-C.
pub async fn serve(state: Arc<AppState>, config: &ServerConfig) -> Result<(), ServerError> {
    let app = build_router(state, config.body_limit_bytes);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("event=server_start module=server status=ok addr=http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;
    info!("event=server_stop module=server status=ok");
    Ok(())
}

/// Opens the store under `paths` and serves it with `config`.
pub async fn run(paths: &ResourcePaths, config: &AppConfig) -> Result<(), ServerError> {
    let store = NoteStore::open_in(paths, config.notes.content_layout);
    info!(
        "event=store_open module=server status=ok notes={} dir={}",
        store.count(),
        paths.notes_dir.display()
    );
    let state = Arc::new(AppState::new(store, config.notes.clone()));
    serve(state, &config.server).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=shutdown_signal module=server status=error error={err}");
    }
}
