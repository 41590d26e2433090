use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt, path::PathBuf, str::FromStr};

/// 1 GiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1 << 30;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Root directory of the local object store.
    pub storage_dir: PathBuf,
    /// Where uploads are staged and remuxed before storage.
    pub staging_dir: PathBuf,
    /// Public URL prefix stored objects are served under.
    pub assets_base_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub max_upload_bytes: u64,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Video ingest API")]
pub struct Args {
    /// Host to bind to (overrides VIDEO_INGEST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEO_INGEST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides VIDEO_INGEST_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory where stored videos live (overrides VIDEO_INGEST_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Directory for temporary upload files (overrides VIDEO_INGEST_STAGING_DIR)
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Public base URL for stored videos (overrides VIDEO_INGEST_ASSETS_BASE_URL)
    #[arg(long)]
    pub assets_base_url: Option<String>,

    /// Maximum upload size in bytes (overrides VIDEO_INGEST_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("VIDEO_INGEST_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_or("VIDEO_INGEST_PORT", 8091u16)?;
        let env_db = env::var("VIDEO_INGEST_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/videos.db".into());
        let env_storage = env::var("VIDEO_INGEST_STORAGE_DIR")
            .unwrap_or_else(|_| "./data/assets".into());
        let env_staging = env::var("VIDEO_INGEST_STAGING_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("video-ingest"));
        let env_max_upload = env_or("VIDEO_INGEST_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let jwt_secret = match env::var("VIDEO_INGEST_JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            Ok(_) | Err(env::VarError::NotPresent) => {
                bail!("VIDEO_INGEST_JWT_SECRET must be set")
            }
            Err(err) => return Err(err).context("reading VIDEO_INGEST_JWT_SECRET"),
        };
        let jwt_issuer =
            env::var("VIDEO_INGEST_JWT_ISSUER").unwrap_or_else(|_| "video-ingest".into());
        let ffmpeg_path = env::var("VIDEO_INGEST_FFMPEG").unwrap_or_else(|_| "ffmpeg".into());
        let ffprobe_path = env::var("VIDEO_INGEST_FFPROBE").unwrap_or_else(|_| "ffprobe".into());

        // --- Merge ---
        let port = args.port.unwrap_or(env_port);
        let assets_base_url = args
            .assets_base_url
            .or_else(|| env::var("VIDEO_INGEST_ASSETS_BASE_URL").ok())
            .unwrap_or_else(|| format!("http://localhost:{}/assets", port));

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port,
            database_url: args.database_url.unwrap_or(env_db),
            storage_dir: args.storage_dir.unwrap_or_else(|| env_storage.into()),
            staging_dir: args.staging_dir.unwrap_or(env_staging),
            assets_base_url,
            jwt_secret,
            jwt_issuer,
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        };

        if cfg.max_upload_bytes == 0 {
            bail!("max upload size must be greater than zero");
        }

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Hand-written so the JWT secret never reaches the logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("storage_dir", &self.storage_dir)
            .field("staging_dir", &self.staging_dir)
            .field("assets_base_url", &self.assets_base_url)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("ffprobe_path", &self.ffprobe_path)
            .finish()
    }
}

/// Read and parse `name`, falling back to `default` when it is unset.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ingest_service::tests::test_config;

    #[test]
    fn debug_redacts_secret() {
        let cfg = test_config(std::path::Path::new("/tmp"));
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("test-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn addr_joins_host_and_port() {
        let mut cfg = test_config(std::path::Path::new("/tmp"));
        cfg.port = 9000;
        assert_eq!(cfg.addr(), "127.0.0.1:9000");
    }

    #[test]
    fn env_or_uses_default_when_unset() {
        let value: u16 = env_or("VIDEO_INGEST_TEST_SURELY_UNSET", 42).unwrap();
        assert_eq!(value, 42);
    }
}
