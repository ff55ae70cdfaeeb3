use thiserror::Error;

/// Anything that goes wrong talking to the match data source. The poller
/// treats all of these as transient: skip, log, try again next cycle.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API-Football HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API-Football error: {0}")]
    Api(String),

    #[error("invalid API key header: {0}")]
    InvalidKey(#[from] reqwest::header::InvalidHeaderValue),
}

impl MonitorError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            MonitorError::Status { status, .. } => Some(*status),
            MonitorError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
