//! An incoming upload, as handed to the ingest pipeline by the HTTP layer.

use uuid::Uuid;

/// One upload for one video record.
///
/// `body` is drained at most once, and only after the request passed
/// validation.
#[derive(Debug)]
pub struct UploadRequest<S> {
    /// Target video record.
    pub video_id: Uuid,

    /// Authenticated caller; must own the record.
    pub user_id: Uuid,

    /// Declared MIME type of the upload (e.g. `video/mp4`).
    pub content_type: String,

    /// Length announced by the client, if any.
    pub declared_len: Option<u64>,

    pub body: S,
}
