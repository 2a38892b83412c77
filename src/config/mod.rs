use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `"json"` or `"text"`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub max_workers: usize,
    /// Browser to borrow session cookies from, e.g. `"chrome"`.
    pub browser: Option<String>,
    pub ffmpeg_path: Option<PathBuf>,
    /// Refuse to start when ffmpeg cannot be found.
    pub require_ffmpeg: bool,
    /// Host substrings a URL must match when `restrict_platform` is set.
    pub platform_hosts: Vec<String>,
    pub restrict_platform: bool,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            max_workers: 4,
            browser: None,
            ffmpeg_path: None,
            require_ffmpeg: false,
            platform_hosts: vec!["youtube.com".to_string(), "youtu.be".to_string()],
            restrict_platform: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn get_logging_format(&self) -> &str {
        &self.logging.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("downloads"));
        assert_eq!(config.max_workers, 4);
        assert!(config.browser.is_none());
        assert!(config.ffmpeg_path.is_none());
        assert!(!config.require_ffmpeg);
        assert!(config.restrict_platform);
        assert_eq!(config.get_logging_format(), "text");
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
output_dir = "/tmp/videos"
browser = "firefox"
require_ffmpeg = true

[logging]
format = "json"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/videos"));
        assert_eq!(config.browser.as_deref(), Some("firefox"));
        assert!(config.require_ffmpeg);
        assert_eq!(config.get_logging_format(), "json");
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.platform_hosts, Config::default().platform_hosts);
    }

    #[test]
    fn test_from_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_workers = \"many\"").unwrap();

        assert!(Config::from_file(&path).is_err());
        assert!(Config::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
