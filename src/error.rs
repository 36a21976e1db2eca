use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Video source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Output sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("Malformed bbox: ({x1}, {y1}, {x2}, {y2})")]
    MalformedBox { x1: f32, y1: f32, x2: f32, y2: f32 },

    #[error("Malformed detection: {0}")]
    MalformedDetection(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Assignment Error: {0}")]
    Assignment(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "opencv")]
    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
