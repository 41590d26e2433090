//! IngestPipeline: upload → staged file → fast-start remux → aspect-ratio
//! classification → object store → video record.
//!
//! Stages run strictly in order and the first failure ends the run. Every
//! temporary file is owned by a drop guard, so leaving this function by any
//! path removes what was staged or remuxed so far.

use crate::{
    config::AppConfig,
    errors::{AtStage, IngestError, IngestResult, InvalidInput, Stage, StageError},
    models::{upload::UploadRequest, video::VideoRecord},
    services::{
        classifier,
        media_tool::MediaTool,
        object_store::ObjectStore,
        staging::TempStorage,
        storage_key::{SUPPORTED_CONTENT_TYPE, StorageKey, parse_media_type},
        video_repository::VideoRepository,
    },
};
use bytes::Bytes;
use futures::Stream;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct IngestPipeline {
    staging: TempStorage,
    media: Arc<dyn MediaTool>,
    objects: Arc<dyn ObjectStore>,
    videos: Arc<dyn VideoRepository>,
}

impl IngestPipeline {
    pub fn new(
        cfg: &AppConfig,
        media: Arc<dyn MediaTool>,
        objects: Arc<dyn ObjectStore>,
        videos: Arc<dyn VideoRepository>,
    ) -> Self {
        Self {
            staging: TempStorage::new(&cfg.staging_dir, cfg.max_upload_bytes),
            media,
            objects,
            videos,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.staging.max_bytes()
    }

    /// Run one upload through every stage and return the updated record.
    #[instrument(skip_all, fields(video_id = %request.video_id, user_id = %request.user_id))]
    pub async fn ingest<S>(&self, request: UploadRequest<S>) -> Result<VideoRecord, StageError>
    where
        S: Stream<Item = IngestResult<Bytes>> + Send,
    {
        let UploadRequest {
            video_id,
            user_id,
            content_type,
            declared_len,
            body,
        } = request;

        let (mut video, content_type) = self
            .validate(video_id, user_id, &content_type, declared_len)
            .await
            .at(Stage::Validate)?;

        let staged = self.staging.stage(body).await.at(Stage::Stage)?;
        debug!(
            "staged {} bytes at {}",
            staged.size(),
            staged.path().display()
        );

        let remuxed = self.media.remux(staged.path()).await.at(Stage::Remux)?;
        debug!(
            "remuxed to {} ({} bytes)",
            remuxed.path().display(),
            remuxed.size()
        );

        // Remuxing copies streams verbatim, so the original has the same geometry.
        let class = classifier::classify(self.media.as_ref(), staged.path())
            .await
            .at(Stage::Classify)?;
        drop(staged);

        let key = StorageKey::derive(class, &content_type);

        let body = remuxed.open().await.at(Stage::Upload)?;
        let stored = self
            .objects
            .put(&key, &content_type, body)
            .await
            .at(Stage::Upload)?;
        drop(remuxed);

        video.video_url = Some(self.objects.public_url(&key));
        let updated = self.videos.update_video(&video).await.map_err(|source| {
            error!(
                key = %key,
                error = %source,
                "object stored but video record not updated; needs reconciliation"
            );
            StageError {
                stage: Stage::PersistMetadata,
                source: IngestError::Persistence {
                    key: key.to_string(),
                    source,
                },
            }
        })?;

        info!(key = %key, class = %class, size_bytes = stored, "video ingested");
        Ok(updated)
    }

    /// Everything that can be checked before a single body byte is read.
    async fn validate(
        &self,
        video_id: Uuid,
        user_id: Uuid,
        content_type: &str,
        declared_len: Option<u64>,
    ) -> IngestResult<(VideoRecord, String)> {
        let media_type = parse_media_type(content_type)
            .filter(|media_type| media_type == SUPPORTED_CONTENT_TYPE)
            .ok_or_else(|| InvalidInput::ContentType(content_type.to_string()))?;

        let limit = self.staging.max_bytes();
        if declared_len.is_some_and(|len| len > limit) {
            return Err(IngestError::PayloadTooLarge { limit });
        }

        let video = self
            .videos
            .get_video(video_id)
            .await?
            .ok_or(IngestError::NotFound(video_id))?;
        if video.user_id != user_id {
            return Err(InvalidInput::NotOwner.into());
        }

        Ok((video, media_type))
    }
}
