use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Chunk extraction failed: {0}")]
    Extraction(String),

    #[error("Silence detection failed: {0}")]
    Detection(String),

    #[error("Segment extraction failed: {0}")]
    Segment(String),

    #[error("Cover extraction failed: {0}")]
    CoverExtraction(String),

    #[error("External tool unavailable: {0}")]
    ToolNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SplitError>;
