mod cookies;
mod extractor;
mod ffmpeg;
mod options;
pub mod search;
mod types;
mod ytdlp;

pub use cookies::CookieExtractor;
pub use extractor::{Extractor, ProgressSender};
pub use ffmpeg::FfmpegLocator;
pub use options::{DownloadOptions, TARGET_EXT};
pub use types::MediaInfo;
pub use ytdlp::YtDlpExtractor;
