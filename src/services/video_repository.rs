//! Video metadata records backed by SQLite.

use crate::models::video::VideoRecord;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Schema for the `videos` table, embedded at compile time.
pub const INIT_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Insert a new record with no playback URL yet.
    async fn create_video(
        &self,
        user_id: Uuid,
        title: String,
        description: Option<String>,
    ) -> RepositoryResult<VideoRecord>;

    async fn get_video(&self, id: Uuid) -> RepositoryResult<Option<VideoRecord>>;

    /// Overwrite the mutable fields of an existing record and bump
    /// `updated_at`. Last write wins.
    async fn update_video(&self, video: &VideoRecord) -> RepositoryResult<VideoRecord>;
}

#[derive(Clone)]
pub struct SqliteVideoRepository {
    /// Shared SQLite connection pool.
    db: Arc<SqlitePool>,
}

impl SqliteVideoRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoRepository for SqliteVideoRepository {
    async fn create_video(
        &self,
        user_id: Uuid,
        title: String,
        description: Option<String>,
    ) -> RepositoryResult<VideoRecord> {
        let now = Utc::now();
        let video = sqlx::query_as::<_, VideoRecord>(
            r#"
            INSERT INTO videos (id, user_id, title, description, video_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, NULL, ?, ?)
            RETURNING id, user_id, title, description, video_url, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?;

        Ok(video)
    }

    async fn get_video(&self, id: Uuid) -> RepositoryResult<Option<VideoRecord>> {
        let video = sqlx::query_as::<_, VideoRecord>(
            "SELECT id, user_id, title, description, video_url, created_at, updated_at
             FROM videos WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;

        Ok(video)
    }

    async fn update_video(&self, video: &VideoRecord) -> RepositoryResult<VideoRecord> {
        sqlx::query_as::<_, VideoRecord>(
            r#"
            UPDATE videos
            SET title = ?, description = ?, video_url = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, user_id, title, description, video_url, created_at, updated_at
            "#,
        )
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.video_url)
        .bind(Utc::now())
        .bind(video.id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(RepositoryError::NotFound(video.id))
    }
}

/// Run the embedded schema statements against `db`.
pub async fn migrate(db: &SqlitePool) -> Result<usize, sqlx::Error> {
    let statements = INIT_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    for stmt in &statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(statements.len())
}
