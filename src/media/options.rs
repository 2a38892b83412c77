use std::path::{Path, PathBuf};

/// Best mp4 video with m4a audio, then any best pair, then best single file.
pub const DEFAULT_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/bestvideo+bestaudio/best";
/// Container every download is merged and converted into.
pub const TARGET_EXT: &str = "mp4";
pub const RETRIES: u32 = 10;
pub const FRAGMENT_RETRIES: u32 = 10;
pub const SOCKET_TIMEOUT_SECS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    VideoConvertor { preferred_format: String },
}

/// Everything the extractor needs to know for one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub format: String,
    pub output_template: String,
    pub restrict_filenames: bool,
    pub ignore_errors: bool,
    pub continue_partial: bool,
    pub allow_playlists: bool,
    pub retries: u32,
    pub fragment_retries: u32,
    pub socket_timeout_secs: u32,
    pub merge_output_format: String,
    pub postprocessors: Vec<PostProcessor>,
    pub cookie_file: Option<PathBuf>,
    pub ffmpeg_location: Option<PathBuf>,
}

impl DownloadOptions {
    pub fn build(
        output_dir: &Path,
        cookie_file: Option<&Path>,
        ffmpeg_location: Option<&Path>,
    ) -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            output_template: output_dir
                .join("%(title)s.%(ext)s")
                .to_string_lossy()
                .to_string(),
            restrict_filenames: true,
            ignore_errors: true,
            continue_partial: true,
            allow_playlists: true,
            retries: RETRIES,
            fragment_retries: FRAGMENT_RETRIES,
            socket_timeout_secs: SOCKET_TIMEOUT_SECS,
            merge_output_format: TARGET_EXT.to_string(),
            postprocessors: vec![PostProcessor::VideoConvertor {
                preferred_format: TARGET_EXT.to_string(),
            }],
            cookie_file: cookie_file.map(Path::to_path_buf),
            ffmpeg_location: ffmpeg_location.map(Path::to_path_buf),
        }
    }

    /// yt-dlp command line flags for these options, without the target.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            self.format.clone(),
            "--output".to_string(),
            self.output_template.clone(),
        ];

        if self.restrict_filenames {
            args.push("--restrict-filenames".to_string());
        }
        if self.ignore_errors {
            args.push("--ignore-errors".to_string());
        }
        args.push(if self.continue_partial {
            "--continue".to_string()
        } else {
            "--no-continue".to_string()
        });
        args.push(if self.allow_playlists {
            "--yes-playlist".to_string()
        } else {
            "--no-playlist".to_string()
        });

        args.extend([
            "--retries".to_string(),
            self.retries.to_string(),
            "--fragment-retries".to_string(),
            self.fragment_retries.to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout_secs.to_string(),
            "--merge-output-format".to_string(),
            self.merge_output_format.clone(),
        ]);

        for postprocessor in &self.postprocessors {
            match postprocessor {
                PostProcessor::VideoConvertor { preferred_format } => {
                    args.push("--recode-video".to_string());
                    args.push(preferred_format.clone());
                }
            }
        }

        if let Some(cookie_file) = &self.cookie_file {
            args.push("--cookies".to_string());
            args.push(cookie_file.to_string_lossy().to_string());
        }
        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().to_string());
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_build_defaults() {
        let options = DownloadOptions::build(Path::new("downloads"), None, None);
        assert_eq!(options.format, DEFAULT_FORMAT);
        assert_eq!(
            Path::new(&options.output_template),
            Path::new("downloads").join("%(title)s.%(ext)s")
        );
        assert!(options.restrict_filenames);
        assert!(options.continue_partial);
        assert!(options.allow_playlists);
        assert_eq!(options.retries, 10);
        assert_eq!(options.fragment_retries, 10);
        assert_eq!(options.socket_timeout_secs, 30);
        assert_eq!(options.merge_output_format, "mp4");
        assert_eq!(
            options.postprocessors,
            vec![PostProcessor::VideoConvertor {
                preferred_format: "mp4".to_string()
            }]
        );
        assert!(options.cookie_file.is_none());
        assert!(options.ffmpeg_location.is_none());
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = DownloadOptions::build(Path::new("out"), Some(Path::new("c.txt")), None);
        let b = DownloadOptions::build(Path::new("out"), Some(Path::new("c.txt")), None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_to_args_without_optional_paths() {
        let args = DownloadOptions::build(Path::new("out"), None, None).to_args();
        assert_eq!(flag_value(&args, "--format"), Some(DEFAULT_FORMAT));
        assert_eq!(flag_value(&args, "--retries"), Some("10"));
        assert_eq!(flag_value(&args, "--fragment-retries"), Some("10"));
        assert_eq!(flag_value(&args, "--socket-timeout"), Some("30"));
        assert_eq!(flag_value(&args, "--merge-output-format"), Some("mp4"));
        assert_eq!(flag_value(&args, "--recode-video"), Some("mp4"));
        assert!(args.contains(&"--restrict-filenames".to_string()));
        assert!(args.contains(&"--continue".to_string()));
        assert!(args.contains(&"--yes-playlist".to_string()));
        assert!(!args.contains(&"--cookies".to_string()));
        assert!(!args.contains(&"--ffmpeg-location".to_string()));
    }

    #[test]
    fn test_to_args_with_cookies_and_ffmpeg() {
        let args = DownloadOptions::build(
            Path::new("out"),
            Some(Path::new("/path/to/cookies.txt")),
            Some(Path::new("/path/to/ffmpeg")),
        )
        .to_args();
        assert_eq!(flag_value(&args, "--cookies"), Some("/path/to/cookies.txt"));
        assert_eq!(flag_value(&args, "--ffmpeg-location"), Some("/path/to/ffmpeg"));
    }
}
