use anyhow::Result;
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io::ErrorKind, str::FromStr, sync::Arc};
use tokio::{fs, net::TcpListener};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{
    auth::JwtAuthenticator,
    ingest_service::IngestPipeline,
    media_tool::FfmpegTool,
    object_store::LocalObjectStore,
    video_repository::{self, SqliteVideoRepository, VideoRepository},
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting video-ingest with config: {:?}", cfg);

    // --- Ensure storage directories exist ---
    for dir in [&cfg.storage_dir, &cfg.staging_dir] {
        if !fs::try_exists(dir).await? {
            fs::create_dir_all(dir).await?;
            tracing::info!("Created directory at {}", dir.display());
        }
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    tracing::debug!("Connecting using raw URL => {}", db_url);
    let connect_options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    if let Some(parent) = connect_options.get_filename().parent() {
        if !parent.as_os_str().is_empty() && !fs::try_exists(parent).await? {
            fs::create_dir_all(parent).await?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let db: Arc<sqlx::Pool<sqlx::Sqlite>> = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?,
    );

    // --- Handle migration mode ---
    if migrate {
        let applied = video_repository::migrate(&db).await?;
        tracing::info!("Database migration complete ({} statements).", applied);
        return Ok(()); // exit after migration
    }

    // --- Initialize services ---
    let videos: Arc<dyn VideoRepository> = Arc::new(SqliteVideoRepository::new(db.clone()));
    let assets = LocalObjectStore::new(&cfg.storage_dir, &cfg.assets_base_url);
    let media = Arc::new(FfmpegTool::new(&cfg.ffmpeg_path, &cfg.ffprobe_path));
    let pipeline = IngestPipeline::new(&cfg, media, Arc::new(assets.clone()), videos.clone());

    let state = state::AppState {
        db,
        auth: JwtAuthenticator::new(&cfg.jwt_secret, &cfg.jwt_issuer),
        videos,
        assets,
        pipeline,
        staging_dir: cfg.staging_dir.clone(),
    };

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes).with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
