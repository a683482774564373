//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Node.js not found. Install Node and run: npm i -D @playwright/test && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Suite parse error: {0}")]
    SpecParse(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("Fixtures not aligned: language {lang} {reason}")]
    FixtureAlignment { lang: String, reason: String },

    #[error("Step {index} failed: {step} - {reason}")]
    StepFailed {
        index: usize,
        step: String,
        reason: String,
    },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout after {0} ms")]
    Timeout(u64),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
