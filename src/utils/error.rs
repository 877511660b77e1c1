use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Browser session error: {0}")]
    Session(String),

    #[error("Report rejected by channel: {status}")]
    Rejected { status: u16 },
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
