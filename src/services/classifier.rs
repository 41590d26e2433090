//! Aspect-ratio classification of a container's first video stream.

use crate::{
    errors::{IngestError, IngestResult},
    models::media::{AspectClass, ProbeStream, StreamDescriptor},
    services::media_tool::MediaTool,
};
use std::path::Path;
use tracing::debug;

/// Pick the first video stream out of a probe report.
pub fn first_video_stream(streams: &[ProbeStream]) -> IngestResult<StreamDescriptor> {
    let stream = streams
        .iter()
        .find(|stream| stream.is_video())
        .ok_or(IngestError::NoStream)?;

    match (stream.width, stream.height) {
        (Some(width), Some(height)) => Ok(StreamDescriptor { width, height }),
        _ => Err(IngestError::Parse(format!(
            "video stream {} has no dimensions",
            stream.index
        ))),
    }
}

/// Probe `path` and classify its first video stream.
pub async fn classify(media: &dyn MediaTool, path: &Path) -> IngestResult<AspectClass> {
    let streams = media.probe(path).await?;
    let descriptor = first_video_stream(&streams)?;
    let class = AspectClass::from(descriptor);
    debug!(
        "classified {} ({}x{}) as {}",
        path.display(),
        descriptor.width,
        descriptor.height,
        class
    );
    Ok(class)
}
