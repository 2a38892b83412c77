use std::path::PathBuf;
use tokio::process::Command;
use tracing::{info, warn};

pub const DEFAULT_COOKIE_TOOL: &str = "yt-dlp";

/// Asks yt-dlp to export a browser's cookies and reports where they went.
pub struct CookieExtractor {
    program: String,
}

impl Default for CookieExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieExtractor {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_COOKIE_TOOL)
    }

    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    /// Path to the exported cookie file for `browser`, or `None` when the
    /// export failed. Downloads then proceed unauthenticated.
    pub async fn extract(&self, browser: &str) -> Option<PathBuf> {
        let output = match Command::new(&self.program)
            .arg("--cookies-from-browser")
            .arg(browser)
            .arg("--print")
            .arg("%(cookies_file)s")
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} not found. Please install yt-dlp first.", self.program);
                return None;
            }
            Err(e) => {
                warn!("Failed to run {}: {}", self.program, e);
                return None;
            }
        };

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("Failed to extract cookies: {}", error.trim());
            return None;
        }

        let cookies_path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if cookies_path.is_empty() {
            warn!("No cookie file reported for {}", browser);
            return None;
        }

        let cookies_path = PathBuf::from(cookies_path);
        if tokio::fs::try_exists(&cookies_path).await.unwrap_or(false) {
            info!("Using {} cookies from {}", browser, cookies_path.display());
            Some(cookies_path)
        } else {
            warn!(
                "Cookie file {} does not exist, ignoring it",
                cookies_path.display()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extract_missing_tool() {
        let extractor = CookieExtractor::with_program("vidqueue-test-no-such-yt-dlp");
        assert!(extractor.extract("chrome").await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_existing_cookie_file() {
        let dir = tempfile::tempdir().unwrap();
        let cookies = dir.path().join("cookies.txt");
        std::fs::write(&cookies, "# Netscape HTTP Cookie File\n").unwrap();
        let tool = crate::media::testing::fake_tool(
            dir.path(),
            "yt-dlp",
            &format!("echo '{}'", cookies.display()),
        );

        let extractor = CookieExtractor::with_program(tool.to_str().unwrap());
        assert_eq!(extractor.extract("chrome").await, Some(cookies));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_reported_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let tool = crate::media::testing::fake_tool(
            dir.path(),
            "yt-dlp",
            "echo '/nonexistent/vidqueue/cookies.txt'",
        );

        let extractor = CookieExtractor::with_program(tool.to_str().unwrap());
        assert!(extractor.extract("firefox").await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tool = crate::media::testing::fake_tool(
            dir.path(),
            "yt-dlp",
            "echo 'ERROR: could not find chrome cookies database' >&2; exit 1",
        );

        let extractor = CookieExtractor::with_program(tool.to_str().unwrap());
        assert!(extractor.extract("chrome").await.is_none());
    }
}
