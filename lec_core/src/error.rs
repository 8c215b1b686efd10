use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("categories not found on the events page")]
    CategoriesNotFound,
}

impl Error {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport and HTTP status errors are retryable. A response body that
    /// failed to decode is structural and is not, and neither is a missing
    /// category marker.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(error) => !error.is_decode(),
            Error::Json(_) | Error::CategoriesNotFound => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
