use crate::services::{object_store::ObjectStoreError, video_repository::RepositoryError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{fmt, io};
use thiserror::Error;
use uuid::Uuid;

/// Why a request was rejected as caller error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("video id `{0}` is not a valid UUID")]
    VideoId(String),
    #[error("content type `{0}` is not supported")]
    ContentType(String),
    #[error("caller does not own this video")]
    NotOwner,
    #[error("multipart body has no `video` file field")]
    MissingFile,
    #[error("malformed form data: {0}")]
    Form(String),
}

/// Every failure the ingest pipeline can report.
///
/// Stages return these unchanged; the orchestrator only tags them with the
/// stage they came from (see [`StageError`]).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error("media processing failed: {0}")]
    Processing(String),
    #[error("could not parse probe output: {0}")]
    Parse(String),
    #[error("no video stream found")]
    NoStream,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("object store write failed: {0}")]
    Storage(#[from] ObjectStoreError),
    #[error("metadata lookup failed: {0}")]
    Metadata(#[from] RepositoryError),
    #[error("object `{key}` was stored but the video record was not updated: {source}")]
    Persistence {
        key: String,
        #[source]
        source: RepositoryError,
    },
}

pub type IngestResult<T> = Result<T, IngestError>;

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::InvalidInput(InvalidInput::NotOwner) => StatusCode::FORBIDDEN,
            IngestError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            IngestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            IngestError::Auth(_) => StatusCode::UNAUTHORIZED,
            IngestError::NotFound(_) => StatusCode::NOT_FOUND,
            IngestError::NoStream => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::Storage(_) => StatusCode::BAD_GATEWAY,
            IngestError::Processing(_)
            | IngestError::Parse(_)
            | IngestError::Io(_)
            | IngestError::Metadata(_)
            | IngestError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable message shown to clients. Never includes subprocess output.
    pub fn public_message(&self) -> &'static str {
        match self {
            IngestError::InvalidInput(InvalidInput::VideoId(_)) => "Invalid video ID",
            IngestError::InvalidInput(InvalidInput::ContentType(_)) => {
                "Unsupported content type, expected video/mp4"
            }
            IngestError::InvalidInput(InvalidInput::NotOwner) => {
                "User not authorized to update this video"
            }
            IngestError::InvalidInput(InvalidInput::MissingFile) => "Missing video file",
            IngestError::InvalidInput(InvalidInput::Form(_)) => "Unable to parse form file",
            IngestError::PayloadTooLarge { .. } => "Upload too large",
            IngestError::Auth(_) => "Couldn't validate credentials",
            IngestError::NotFound(_) => "Video not found",
            IngestError::Processing(_) => "Error processing video",
            IngestError::Parse(_) => "Error reading video streams",
            IngestError::NoStream => "No video stream found",
            IngestError::Io(_) => "Error saving file",
            IngestError::Storage(_) => "Unable to store video",
            IngestError::Metadata(_) => "Unable to get video",
            IngestError::Persistence { .. } => "Video stored but record update failed",
        }
    }
}

/// Pipeline step at which an ingest failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Stage,
    Remux,
    Classify,
    Upload,
    PersistMetadata,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Stage => "stage",
            Stage::Remux => "remux",
            Stage::Classify => "classify",
            Stage::Upload => "upload",
            Stage::PersistMetadata => "persist_metadata",
        };
        f.write_str(name)
    }
}

/// An [`IngestError`] tagged with the stage that produced it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: IngestError,
}

/// Tag a stage result with the stage it belongs to.
pub trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T, E: Into<IngestError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|err| StageError {
            stage,
            source: err.into(),
        })
    }
}

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::new(err.status(), err.public_message())
    }
}

impl From<InvalidInput> for AppError {
    fn from(err: InvalidInput) -> Self {
        IngestError::from(err).into()
    }
}

impl From<StageError> for AppError {
    fn from(err: StageError) -> Self {
        err.source.into()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        IngestError::Metadata(err).into()
    }
}

impl From<ObjectStoreError> for AppError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::NotFound(key) => AppError::not_found(format!("asset `{key}` not found")),
            ObjectStoreError::InvalidKey(_) => {
                AppError::new(StatusCode::BAD_REQUEST, "Invalid asset key")
            }
            ObjectStoreError::Io(_) => AppError::internal("Unable to read asset"),
        }
    }
}
