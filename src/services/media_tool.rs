//! The media tool capability: fast-start remux and stream probing.
//!
//! The pipeline only depends on [`MediaTool`]; [`FfmpegTool`] implements it
//! by shelling out to `ffmpeg` / `ffprobe` and waiting for them to exit.

use crate::{
    errors::{IngestError, IngestResult},
    models::media::ProbeStream,
    services::staging::ScopedFile,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::{fs::File, process::Command};
use tracing::debug;

/// A remuxed output file, removed when dropped.
#[derive(Debug)]
pub struct RemuxedFile {
    guard: ScopedFile,
    size: u64,
}

impl RemuxedFile {
    /// Take ownership of a remux output, checking that it exists and is
    /// non-empty. The file is removed if the check fails.
    pub fn from_output(guard: ScopedFile) -> IngestResult<Self> {
        let size = match std::fs::metadata(guard.path()) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(IngestError::Processing(
                    "remux produced no output file".into(),
                ));
            }
            Err(err) => return Err(IngestError::Io(err)),
        };
        if size == 0 {
            return Err(IngestError::Processing("remuxed file is empty".into()));
        }
        Ok(Self { guard, size })
    }

    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Open the remuxed bytes for reading from the start.
    pub async fn open(&self) -> IngestResult<File> {
        Ok(File::open(self.path()).await?)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Copy all streams of `input` into a new fast-start container next to
    /// it. `input` is left untouched.
    async fn remux(&self, input: &Path) -> IngestResult<RemuxedFile>;

    /// Describe every stream in the container at `input`.
    async fn probe(&self, input: &Path) -> IngestResult<Vec<ProbeStream>>;
}

/// Path the remuxer writes to for a given input.
pub fn remux_output_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(".processing");
    PathBuf::from(name)
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

/// Parse `ffprobe -print_format json -show_streams` output.
pub fn parse_probe_output(stdout: &[u8]) -> IngestResult<Vec<ProbeStream>> {
    let output: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|err| IngestError::Parse(err.to_string()))?;
    Ok(output.streams)
}

/// `ffmpeg` / `ffprobe` subprocess implementation.
#[derive(Clone, Debug)]
pub struct FfmpegTool {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegTool {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn remux(&self, input: &Path) -> IngestResult<RemuxedFile> {
        // Guard before launch: a crashed ffmpeg may leave a partial file.
        let guard = ScopedFile::new(remux_output_path(input));
        debug!("remuxing {} -> {}", input.display(), guard.path().display());

        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
            .arg(guard.path())
            .stdin(Stdio::null());

        // The child and the output guard share a task: if the caller is
        // dropped, the guard is released only after ffmpeg has exited.
        let (guard, output) = tokio::spawn(async move {
            let output = command.output().await;
            (guard, output)
        })
        .await
        .map_err(|err| IngestError::Processing(format!("remux task failed: {}", err)))?;

        let output = output.map_err(|err| {
            IngestError::Processing(format!(
                "could not run {}: {}",
                self.ffmpeg.display(),
                err
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::Processing(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        RemuxedFile::from_output(guard)
    }

    async fn probe(&self, input: &Path) -> IngestResult<Vec<ProbeStream>> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(input)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| {
                IngestError::Processing(format!(
                    "could not run {}: {}",
                    self.ffprobe.display(),
                    err
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::Processing(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_probe_output(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    const FFPROBE_JSON: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "width": 1280,
                "height": 720,
                "pix_fmt": "yuv420p"
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
                "sample_rate": "48000"
            }
        ]
    }"#;

    /// Write an executable shell script standing in for ffmpeg or ffprobe.
    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn write_input(dir: &Path) -> PathBuf {
        let input = dir.join("upload");
        std::fs::write(&input, b"not a video").unwrap();
        input
    }

    #[test]
    fn parses_ffprobe_streams() {
        let streams = parse_probe_output(FFPROBE_JSON.as_bytes()).unwrap();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].width, Some(1280));
        assert_eq!(streams[0].height, Some(720));
        assert_eq!(streams[1].codec_type.as_deref(), Some("audio"));
        assert_eq!(streams[1].width, None);
    }

    #[test]
    fn missing_streams_array_is_empty() {
        let streams = parse_probe_output(b"{}").unwrap();
        assert!(streams.is_empty());
    }

    #[test]
    fn malformed_output_is_parse_error() {
        let result = parse_probe_output(b"Invalid data found when processing input");
        assert!(matches!(result, Err(IngestError::Parse(_))));
    }

    #[test]
    fn output_path_is_derived_from_input() {
        let path = remux_output_path(Path::new("/tmp/staging/upload-1234"));
        assert_eq!(path, PathBuf::from("/tmp/staging/upload-1234.processing"));
    }

    #[test]
    fn empty_output_is_rejected_and_removed() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("out.processing");
        std::fs::write(&path, b"").unwrap();

        let result = RemuxedFile::from_output(ScopedFile::new(&path));

        match result {
            Err(IngestError::Processing(msg)) => assert_eq!(msg, "remuxed file is empty"),
            other => panic!("expected processing error, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn missing_output_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let result = RemuxedFile::from_output(ScopedFile::new(temp_dir.path().join("absent")));
        match result {
            Err(IngestError::Processing(msg)) => assert_eq!(msg, "remux produced no output file"),
            other => panic!("expected processing error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_processing_error() {
        let temp_dir = tempdir().unwrap();
        let input = write_input(temp_dir.path());

        let tool = FfmpegTool::new("/nonexistent/ffmpeg", "/nonexistent/ffprobe");
        assert!(matches!(
            tool.remux(&input).await,
            Err(IngestError::Processing(_))
        ));
        assert!(matches!(
            tool.probe(&input).await,
            Err(IngestError::Processing(_))
        ));
        assert!(!remux_output_path(&input).exists());
        assert!(input.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_remux_reports_stderr_and_removes_partial_output() {
        let temp_dir = tempdir().unwrap();
        let input = write_input(temp_dir.path());
        let ffmpeg = fake_tool(
            temp_dir.path(),
            "ffmpeg",
            r#"for out; do :; done
printf partial > "$out"
echo "moov atom not found" >&2
exit 1"#,
        );

        let tool = FfmpegTool::new(ffmpeg, "/nonexistent/ffprobe");
        match tool.remux(&input).await {
            Err(IngestError::Processing(msg)) => assert!(msg.contains("moov atom not found")),
            other => panic!("expected processing error, got {other:?}"),
        }
        assert!(!remux_output_path(&input).exists());
        assert!(input.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_probe_reports_stderr() {
        let temp_dir = tempdir().unwrap();
        let input = write_input(temp_dir.path());
        let ffprobe = fake_tool(
            temp_dir.path(),
            "ffprobe",
            r#"echo "Invalid data found when processing input" >&2
exit 1"#,
        );

        let tool = FfmpegTool::new("/nonexistent/ffmpeg", ffprobe);
        match tool.probe(&input).await {
            Err(IngestError::Processing(msg)) => {
                assert!(msg.contains("Invalid data found when processing input"))
            }
            other => panic!("expected processing error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dropped_remux_removes_output_after_exit() {
        let temp_dir = tempdir().unwrap();
        let input = write_input(temp_dir.path());
        let ffmpeg = fake_tool(
            temp_dir.path(),
            "ffmpeg",
            r#"for out; do :; done
sleep 1
printf remuxed > "$out""#,
        );

        let tool = FfmpegTool::new(ffmpeg, "/nonexistent/ffprobe");
        let result = tokio::time::timeout(Duration::from_millis(200), tool.remux(&input)).await;
        assert!(result.is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!remux_output_path(&input).exists());
    }

    // Needs ffmpeg and ffprobe on PATH.
    #[tokio::test]
    #[ignore]
    async fn functional_remux_preserves_streams() {
        let temp_dir = tempdir().unwrap();
        let input = temp_dir.path().join("source.mp4");
        let status = std::process::Command::new("ffmpeg")
            .args([
                "-v", "error", "-f", "lavfi", "-i", "testsrc=size=1280x720:duration=1",
                "-f", "lavfi", "-i", "sine=duration=1", "-shortest", "-c:v", "libx264",
                "-c:a", "aac",
            ])
            .arg(&input)
            .status()
            .expect("ffmpeg not available");
        assert!(status.success());

        let tool = FfmpegTool::new("ffmpeg", "ffprobe");
        let remuxed = tool.remux(&input).await.unwrap();
        assert!(remuxed.size() > 0);

        let before = tool.probe(&input).await.unwrap();
        let after = tool.probe(remuxed.path()).await.unwrap();
        assert_eq!(before.len(), after.len());

        let path = remuxed.path().to_path_buf();
        drop(remuxed);
        assert!(!path.exists());
    }
}
