//! Destination keys for stored videos: `<aspect-class>/<uuid><ext>`.

use crate::models::media::AspectClass;
use std::fmt;
use uuid::Uuid;

/// The only container type the pipeline accepts.
pub const SUPPORTED_CONTENT_TYPE: &str = "video/mp4";

/// Normalize a `Content-Type` value to its bare media type.
///
/// Parameters are dropped and the result is lowercased; values without a
/// `type/subtype` shape yield `None`.
pub fn parse_media_type(raw: &str) -> Option<String> {
    let essence = raw.split(';').next()?.trim().to_ascii_lowercase();
    let (kind, subtype) = essence.split_once('/')?;
    if kind.is_empty() || subtype.is_empty() || subtype.contains('/') {
        return None;
    }
    Some(essence)
}

/// File extension implied by a media type, e.g. `video/mp4` -> `.mp4`.
pub fn extension_for(content_type: &str) -> String {
    match content_type.split_once('/') {
        Some((_, subtype)) if !subtype.is_empty() => format!(".{subtype}"),
        _ => ".bin".to_string(),
    }
}

/// Key under which one stored video lives.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Random key: a v4 UUID (122 random bits) qualified by the content
    /// type's extension and prefixed by the aspect-class directory.
    pub fn derive(class: AspectClass, content_type: &str) -> Self {
        Self(format!(
            "{}/{}{}",
            class.as_str(),
            Uuid::new_v4(),
            extension_for(content_type)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn key_has_class_prefix_and_extension() {
        let key = StorageKey::derive(AspectClass::Portrait, "video/mp4");
        let name = key.as_str().strip_prefix("portrait/").unwrap();
        let stem = name.strip_suffix(".mp4").unwrap();
        assert!(Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn keys_do_not_collide() {
        let keys: HashSet<StorageKey> = (0..10_000)
            .map(|_| StorageKey::derive(AspectClass::Landscape, SUPPORTED_CONTENT_TYPE))
            .collect();
        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn extensions() {
        assert_eq!(extension_for("video/mp4"), ".mp4");
        assert_eq!(extension_for("video/webm"), ".webm");
        assert_eq!(extension_for("garbage"), ".bin");
    }

    #[test]
    fn media_type_parsing() {
        assert_eq!(parse_media_type("video/mp4").as_deref(), Some("video/mp4"));
        assert_eq!(
            parse_media_type("Video/MP4; codecs=\"avc1.42E01E\"").as_deref(),
            Some("video/mp4")
        );
        assert_eq!(parse_media_type(""), None);
        assert_eq!(parse_media_type("video"), None);
        assert_eq!(parse_media_type("video/"), None);
    }
}
