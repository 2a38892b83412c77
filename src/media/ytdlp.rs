use super::{
    extractor::{Extractor, ProgressSender},
    options::DownloadOptions,
    types::MediaInfo,
};
use crate::error::Error;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};
use tracing::{debug, info, warn};

pub const DEFAULT_YTDLP: &str = "yt-dlp";

/// Prefix of the lines produced by our `--progress-template`.
const PROGRESS_MARKER: &str = "vidqueue-progress";

pub struct YtDlpExtractor {
    program: String,
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpExtractor {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_YTDLP)
    }

    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn command(&self, target: &str, options: &DownloadOptions) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(options.to_args())
            .arg("--dump-single-json")
            .arg("--no-simulate")
            .arg("--progress")
            .arg("--newline")
            .arg("--progress-template")
            .arg(format!(
                "download:{} %(progress._percent_str)s",
                PROGRESS_MARKER
            ))
            .arg("--")
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    pub async fn test_availability(&self) -> bool {
        match Command::new(&self.program).arg("--version").output().await {
            Ok(output) => {
                if output.status.success() {
                    let version = String::from_utf8_lossy(&output.stdout);
                    info!("yt-dlp is available, version: {}", version.trim());
                    true
                } else {
                    warn!("yt-dlp command failed");
                    false
                }
            }
            Err(e) => {
                warn!("yt-dlp not found: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract(
        &self,
        target: &str,
        options: &DownloadOptions,
        progress: Option<ProgressSender>,
    ) -> Result<Option<MediaInfo>> {
        info!("Downloading with yt-dlp: {}", target);

        let mut child = self
            .command(target, options)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program))?;

        let stdout = child.stdout.take().context("Failed to get yt-dlp stdout")?;
        let stderr = child.stderr.take().context("Failed to get yt-dlp stderr")?;

        let stdout_progress = progress.clone();
        let stdout_task = tokio::spawn(async move {
            let mut segments = BufReader::new(stdout).split(b'\n');
            let mut document = None;
            loop {
                let bytes = match segments.next_segment().await {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read yt-dlp stdout: {}", e);
                        break;
                    }
                };
                let line = String::from_utf8_lossy(&bytes);
                if let Some(pct) = parse_progress_line(&line) {
                    if let Some(tx) = &stdout_progress {
                        let _ = tx.send(pct);
                    }
                } else if is_info_document(&line) {
                    document = Some(bytes);
                } else {
                    debug!("yt-dlp: {}", line);
                }
            }
            document
        });

        let stderr_task = tokio::spawn(async move {
            let mut segments = BufReader::new(stderr).split(b'\n');
            let mut buf = String::new();
            loop {
                let bytes = match segments.next_segment().await {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read yt-dlp stderr: {}", e);
                        break;
                    }
                };
                let line = String::from_utf8_lossy(&bytes);
                if let Some(pct) = parse_progress_line(&line) {
                    if let Some(tx) = &progress {
                        let _ = tx.send(pct);
                    }
                    continue;
                }
                buf.push_str(line.trim_end_matches('\r'));
                buf.push('\n');
            }
            buf
        });

        let status = child.wait().await.context("Failed to wait for yt-dlp")?;
        let document = stdout_task.await.context("Failed to read yt-dlp stdout")?;
        let error = stderr_task.await.context("Failed to read yt-dlp stderr")?;

        match document {
            Some(document) => {
                let document = std::str::from_utf8(&document)
                    .map_err(Error::from)
                    .context("yt-dlp reported metadata that is not valid UTF-8")?;
                let json: Value =
                    serde_json::from_str(document).context("Failed to parse media metadata")?;
                if !status.success() {
                    warn!("yt-dlp exited with {} but reported metadata", status);
                }
                Ok(MediaInfo::from_json(&json))
            }
            None if status.success() => Ok(None),
            None => Err(anyhow::anyhow!(
                "yt-dlp exited with {}: {}",
                status,
                error.trim()
            )),
        }
    }
}

fn is_info_document(line: &str) -> bool {
    let line = line.trim();
    line.starts_with('{') || line == "null"
}

fn parse_progress_line(line: &str) -> Option<f64> {
    line.trim()
        .strip_prefix(PROGRESS_MARKER)?
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
}
