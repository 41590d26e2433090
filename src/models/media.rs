//! Stream descriptions reported by the probe tool and the aspect-ratio
//! classes derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the probe tool's `streams` array.
///
/// Only the fields the pipeline looks at are kept; audio and data streams
/// carry no dimensions.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeStream {
    #[serde(default)]
    pub index: u32,

    #[serde(default)]
    pub codec_type: Option<String>,

    #[serde(default)]
    pub width: Option<u32>,

    #[serde(default)]
    pub height: Option<u32>,
}

impl ProbeStream {
    /// A stream counts as video when the probe says so, or when it omits the
    /// type but reports dimensions.
    pub fn is_video(&self) -> bool {
        match self.codec_type.as_deref() {
            Some(kind) => kind == "video",
            None => self.width.is_some() && self.height.is_some(),
        }
    }
}

/// Geometry of the first video stream in a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub width: u32,
    pub height: u32,
}

/// Aspect-ratio bucket a video is filed under.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AspectClass {
    Landscape,
    Portrait,
    Other,
}

impl AspectClass {
    /// Exact 16:9 / 9:16 test using integer division.
    ///
    /// Near-ratios such as 1918x1080 land in `Other`.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        let (w, h) = (u64::from(width), u64::from(height));
        if w == 16 * h / 9 {
            AspectClass::Landscape
        } else if h == 16 * w / 9 {
            AspectClass::Portrait
        } else {
            AspectClass::Other
        }
    }

    /// Directory name used as the storage key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectClass::Landscape => "landscape",
            AspectClass::Portrait => "portrait",
            AspectClass::Other => "other",
        }
    }
}

impl From<StreamDescriptor> for AspectClass {
    fn from(stream: StreamDescriptor) -> Self {
        AspectClass::from_dimensions(stream.width, stream.height)
    }
}

impl fmt::Display for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
