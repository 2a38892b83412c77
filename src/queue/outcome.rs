use crate::{
    media::{MediaInfo, TARGET_EXT},
    utils::{restrict_filename, safe_path_string},
};
use std::path::{Path, PathBuf};
use tracing::info;

/// What happened to one queued item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed(PathBuf),
    Skipped { reason: String },
    Failed { reason: String },
}

impl DownloadOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            DownloadOutcome::Completed(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DownloadOutcome::Failed { .. })
    }
}

/// Where the extractor wrote a file titled `title`.
pub fn media_path(output_dir: &Path, title: &str) -> PathBuf {
    let name = restrict_filename(&safe_path_string(title));
    output_dir.join(format!("{name}.{TARGET_EXT}"))
}

/// Maps extractor metadata to a result path. For playlists every entry was
/// written to disk but only the first path is returned.
pub fn derive_result(output_dir: &Path, metadata: Option<&MediaInfo>) -> Option<PathBuf> {
    let metadata = metadata?;

    match &metadata.entries {
        Some(entries) => {
            let paths: Vec<PathBuf> = entries
                .iter()
                .flatten()
                .map(|entry| {
                    info!("Downloaded playlist item: {}", entry.title);
                    media_path(output_dir, &entry.title)
                })
                .collect();
            paths.into_iter().next()
        }
        None => {
            info!("Downloaded: {}", metadata.title);
            Some(media_path(output_dir, &metadata.title))
        }
    }
}
