//! HTTP handlers for video records and video uploads.
//! The upload handler only unwraps the request; all ingest work is done by
//! `IngestPipeline`.

use crate::{
    errors::{AppError, IngestError, InvalidInput},
    models::{upload::UploadRequest, video::VideoRecord},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode, header},
};
use futures::TryStreamExt;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Body of `POST /api/videos`.
#[derive(Debug, Deserialize)]
pub struct CreateVideoReq {
    pub title: String,
    pub description: Option<String>,
}

fn parse_video_id(raw: &str) -> Result<Uuid, InvalidInput> {
    Uuid::parse_str(raw).map_err(|_| InvalidInput::VideoId(raw.to_string()))
}

/// Body limit hits surface as 413; anything else is a malformed form.
fn multipart_error(err: MultipartError, limit: u64) -> IngestError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        IngestError::PayloadTooLarge { limit }
    } else {
        InvalidInput::Form(err.body_text()).into()
    }
}

/// POST `/api/videos`: create an empty video record owned by the caller.
pub async fn create_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateVideoReq>,
) -> Result<(StatusCode, Json<VideoRecord>), AppError> {
    let user_id = state.auth.authenticate(&headers)?;
    let video = state
        .videos
        .create_video(user_id, req.title, req.description)
        .await?;
    info!(video_id = %video.id, user_id = %user_id, "created video record");
    Ok((StatusCode::CREATED, Json(video)))
}

/// GET `/api/videos/{video_id}`: fetch a record the caller owns.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<VideoRecord>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = state.auth.authenticate(&headers)?;
    let video = state
        .videos
        .get_video(video_id)
        .await?
        .ok_or(IngestError::NotFound(video_id))?;
    if video.user_id != user_id {
        return Err(InvalidInput::NotOwner.into());
    }
    Ok(Json(video))
}

/// POST `/api/video_upload/{video_id}`: multipart upload with a `video`
/// file field.
pub async fn upload_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<VideoRecord>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = state.auth.authenticate(&headers).inspect_err(|err| {
        warn!(video_id = %video_id, error = %err, "rejected upload credentials");
    })?;

    let limit = state.pipeline.max_upload_bytes();
    let field = loop {
        match multipart
            .next_field()
            .await
            .map_err(|err| multipart_error(err, limit))?
        {
            Some(field) if field.name() == Some("video") => break field,
            Some(_) => continue,
            None => return Err(InvalidInput::MissingFile.into()),
        }
    };

    let content_type = field.content_type().unwrap_or_default().to_string();
    let declared_len = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let request = UploadRequest {
        video_id,
        user_id,
        content_type,
        declared_len,
        body: field.map_err(move |err| multipart_error(err, limit)),
    };

    match state.pipeline.ingest(request).await {
        Ok(video) => Ok(Json(video)),
        Err(err) => {
            warn!(
                video_id = %video_id,
                stage = %err.stage,
                error = %err.source,
                "video upload failed"
            );
            Err(err.into())
        }
    }
}
