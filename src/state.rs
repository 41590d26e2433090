//! Shared state handed to every handler.

use crate::services::{
    auth::JwtAuthenticator, ingest_service::IngestPipeline, object_store::LocalObjectStore,
    video_repository::VideoRepository,
};
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

#[derive(Clone)]
pub struct AppState {
    /// Shared SQLite pool, also probed by `/readyz`.
    pub db: Arc<SqlitePool>,
    pub auth: JwtAuthenticator,
    pub videos: Arc<dyn VideoRepository>,
    /// Same store the pipeline uploads to; read back by `/assets`.
    pub assets: LocalObjectStore,
    pub pipeline: IngestPipeline,
    pub staging_dir: PathBuf,
}
