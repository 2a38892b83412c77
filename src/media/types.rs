use serde_json::Value;

/// Metadata reported by the extractor after a download attempt.
///
/// `entries` is set for collections (playlists); `None` slots are entries
/// the extractor skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub title: String,
    pub ext: Option<String>,
    pub entries: Option<Vec<Option<MediaInfo>>>,
}

#[cfg(test)]
impl MediaInfo {
    pub fn single(title: &str, ext: &str) -> Self {
        Self {
            title: title.to_string(),
            ext: Some(ext.to_string()),
            entries: None,
        }
    }

    pub fn playlist(title: &str, entries: Vec<Option<MediaInfo>>) -> Self {
        Self {
            title: title.to_string(),
            ext: None,
            entries: Some(entries),
        }
    }
}

impl MediaInfo {
    /// Builds metadata from a yt-dlp info dict. `null` yields `None`.
    pub fn from_json(json: &Value) -> Option<Self> {
        if !json.is_object() {
            return None;
        }

        let entries = json["entries"].as_array().map(|entries| {
            entries
                .iter()
                .map(MediaInfo::from_json)
                .collect::<Vec<_>>()
        });

        Some(Self {
            title: json["title"]
                .as_str()
                .unwrap_or("Unknown Title")
                .to_string(),
            ext: json["ext"].as_str().map(|s| s.to_string()),
            entries,
        })
    }
}
