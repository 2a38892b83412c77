use super::{options::DownloadOptions, types::MediaInfo};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

/// Percent-complete updates (0.0 to 100.0) for the item being downloaded.
pub type ProgressSender = UnboundedSender<f64>;

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Human-readable name of the extractor
    fn name(&self) -> &'static str;

    /// Download `target` (a URL or a search expression) and report what was
    /// fetched. `Ok(None)` means the extractor gave up without raising.
    async fn extract(
        &self,
        target: &str,
        options: &DownloadOptions,
        progress: Option<ProgressSender>,
    ) -> Result<Option<MediaInfo>>;
}
