//! Represents the metadata record of an uploaded video.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A video metadata record.
///
/// The ingest pipeline never creates or deletes these; it only fills in
/// `video_url` once the remuxed file has been stored.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct VideoRecord {
    /// Unique identifier for this video.
    pub id: Uuid,

    /// ID of the user who owns the video.
    pub user_id: Uuid,

    pub title: String,

    pub description: Option<String>,

    /// Public playback URL, set after a successful upload.
    pub video_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}
