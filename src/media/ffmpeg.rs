use crate::error::Error;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Finds an ffmpeg binary yt-dlp can use for merging and conversion.
pub struct FfmpegLocator {
    program: String,
}

impl Default for FfmpegLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegLocator {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_FFMPEG)
    }

    /// Probe `program` instead of `ffmpeg` when no explicit path is given.
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    /// Best effort: `None` means downloads go ahead without ffmpeg and
    /// merging may fail later.
    pub async fn locate(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => {
                if tokio::fs::try_exists(path).await.unwrap_or(false) {
                    debug!("Using ffmpeg at {}", path.display());
                    Some(path.to_path_buf())
                } else {
                    warn!("ffmpeg not found at {}", path.display());
                    None
                }
            }
            None => self.probe().await,
        }
    }

    /// Like [`locate`](Self::locate) but a missing tool is an error.
    pub async fn require(&self, explicit: Option<&Path>) -> Result<PathBuf, Error> {
        self.locate(explicit).await.ok_or(Error::FfmpegNotInstalled)
    }

    async fn probe(&self) -> Option<PathBuf> {
        match Command::new(&self.program).arg("-version").output().await {
            Ok(output) => {
                if output.status.success() {
                    let version_line = String::from_utf8_lossy(&output.stdout)
                        .lines()
                        .next()
                        .unwrap_or("unknown")
                        .to_string();
                    info!("ffmpeg is available: {}", version_line);
                    Some(PathBuf::from(&self.program))
                } else {
                    warn!(
                        "{} -version failed. Audio-video merging may fail.",
                        self.program
                    );
                    None
                }
            }
            Err(e) => {
                warn!(
                    "FFmpeg not found in system PATH ({}). Audio-video merging may fail.",
                    e
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_locate_explicit_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ffmpeg");
        std::fs::write(&path, b"").unwrap();

        let located = FfmpegLocator::new().locate(Some(&path)).await;
        assert_eq!(located, Some(path));
    }

    #[tokio::test]
    async fn test_locate_explicit_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist");

        assert!(FfmpegLocator::new().locate(Some(&path)).await.is_none());
    }

    #[tokio::test]
    async fn test_locate_missing_program() {
        let locator = FfmpegLocator::with_program("vidqueue-test-no-such-ffmpeg");
        assert!(locator.locate(None).await.is_none());
    }

    #[tokio::test]
    async fn test_require_missing_program_is_error() {
        let locator = FfmpegLocator::with_program("vidqueue-test-no-such-ffmpeg");
        let err = locator.require(None).await.unwrap_err();
        assert!(matches!(err, Error::FfmpegNotInstalled));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_locate_probes_program() {
        let dir = tempfile::tempdir().unwrap();
        let ok = crate::media::testing::fake_tool(
            dir.path(),
            "ffmpeg-ok",
            "echo 'ffmpeg version 6.1'",
        );
        let broken = crate::media::testing::fake_tool(dir.path(), "ffmpeg-broken", "exit 1");

        let located = FfmpegLocator::with_program(ok.to_str().unwrap())
            .locate(None)
            .await;
        assert_eq!(located, Some(ok));

        let located = FfmpegLocator::with_program(broken.to_str().unwrap())
            .locate(None)
            .await;
        assert!(located.is_none());
    }

    #[tokio::test]
    #[ignore = "Requires ffmpeg installed"]
    async fn test_locate_system_ffmpeg() {
        assert_eq!(
            FfmpegLocator::new().locate(None).await,
            Some(PathBuf::from("ffmpeg"))
        );
    }
}
