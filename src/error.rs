use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("FFmpeg must be installed [https://ffmpeg.org/download.html]")]
    FfmpegNotInstalled,

    #[error("text is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}
