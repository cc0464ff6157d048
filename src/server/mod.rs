//! HTTP surface
//!
//! Thin axum adapters over [`App`]: JSON in, JSON (or image bytes) out, with
//! the session gate in front of every generation and gallery route.

pub mod error;
pub mod handlers;

use crate::app::App;
use crate::auth::SessionGate;
use crate::{Error, Result};
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use error::ApiError;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Up to three base64 reference images plus JSON overhead.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
    pub gate: Arc<SessionGate>,
}

impl AppState {
    pub fn new(app: App, gate: SessionGate) -> Self {
        Self {
            app: Arc::new(app),
            gate: Arc::new(gate),
        }
    }
}

async fn require_session(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.gate.is_authenticated(request.headers()) {
        next.run(request).await
    } else {
        tracing::debug!("Unauthenticated {} {}", request.method(), request.uri().path());
        ApiError(Error::Unauthorized).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/generate", post(handlers::generate))
        .route("/api/pro", post(handlers::pro))
        .route("/api/thermal", post(handlers::thermal))
        .route(
            "/api/gallery",
            get(handlers::gallery_list).post(handlers::gallery_append),
        )
        .route("/api/gallery/:id/image", get(handlers::gallery_image))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/status", get(handlers::status))
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
