use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScanError {
    /// Transport-level failures: the document could not be retrieved at all.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            ScanError::HttpError(_) | ScanError::Status { .. } | ScanError::InvalidUrl(_)
        )
    }

    /// The document was retrieved but could not be turned into a page.
    pub fn is_parse(&self) -> bool {
        matches!(self, ScanError::ParseError(_))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
