//! Error types for the content tools

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Source file not found: {0}")]
    SourceNotFound(String),

    #[error("Translation API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Rate limited by translation API after {0} attempts")]
    RateLimited(usize),

    #[error("Failed to parse translation response after {0} attempts")]
    UnparsableResponse(usize),

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
