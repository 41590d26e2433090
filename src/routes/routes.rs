//! Defines routes for the video ingest API.
//!
//! ## Structure
//! - **Health**
//!   - `GET  /healthz`, `GET /readyz`
//!
//! - **Videos**
//!   - `POST /api/videos`: create an empty video record
//!   - `GET  /api/videos/{video_id}`: fetch a record
//!   - `POST /api/video_upload/{video_id}`: upload, remux, classify and store the video
//!
//! - **Assets**
//!   - `GET  /assets/{*key}`: stored videos, e.g. `landscape/<uuid>.mp4`

use crate::{
    handlers::{
        asset_handlers::get_asset,
        health_handlers::{healthz, readyz},
        video_handlers::{create_video, get_video, upload_video},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build and return the router for all API routes.
///
/// Request bodies are capped at `max_upload_bytes`; uploads over the cap are
/// answered with 413.
pub fn routes(max_upload_bytes: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_upload_bytes).unwrap_or(usize::MAX);

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/videos", post(create_video))
        .route("/api/videos/{video_id}", get(get_video))
        .route("/api/video_upload/{video_id}", post(upload_video))
        .route("/assets/{*key}", get(get_asset))
        .layer(DefaultBodyLimit::max(body_limit))
}
