use std::fmt;
use thiserror::Error;
use url::Url;

/// Prefix yt-dlp understands as "first search hit for".
const SEARCH_PREFIX: &str = "ytsearch1:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadRequest {
    Url(Url),
    Search(String),
}

impl DownloadRequest {
    /// What gets handed to the extractor.
    pub fn target(&self) -> String {
        match self {
            DownloadRequest::Url(url) => url.to_string(),
            DownloadRequest::Search(term) => format!("{SEARCH_PREFIX}{term}"),
        }
    }
}

impl fmt::Display for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("not a valid URL: {0}")]
    Malformed(String),
    #[error("unsupported scheme {0}")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
    #[error("{0} is not a supported platform")]
    ForeignHost(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedUrl {
    pub input: String,
    pub reason: RejectReason,
}

/// Checks that `input` is an absolute http(s) URL and, when `hosts` is
/// given, that its host contains one of them.
pub fn validate_url(input: &str, hosts: Option<&[String]>) -> Result<Url, RejectReason> {
    let url = Url::parse(input.trim()).map_err(|e| RejectReason::Malformed(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RejectReason::UnsupportedScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(RejectReason::MissingHost)?;
    if let Some(hosts) = hosts {
        if !host_matches(host, hosts) {
            return Err(RejectReason::ForeignHost(host.to_string()));
        }
    }

    Ok(url)
}

pub fn host_matches(host: &str, hosts: &[String]) -> bool {
    let host = host.to_ascii_lowercase();
    hosts
        .iter()
        .any(|candidate| host.contains(&candidate.to_ascii_lowercase()))
}
