use thiserror::Error;

#[derive(Error, Debug)]
pub enum WhoisError {
    #[error("WHOIS query format error: {0}")]
    InvalidQuery(String),

    #[error("Invalid host name: {0}")]
    InvalidHostName(String),

    #[error("WHOIS request to {server} failed: {message}")]
    NetworkFailure { server: String, message: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Response from {server} exceeded {limit} bytes")]
    ResponseTooLarge { server: String, limit: usize },

    #[error("Invalid template {name}: {message}")]
    InvalidTemplate { name: String, message: String },

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Lookup failed after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: usize, last_error: String },
}

impl WhoisError {
    pub(crate) fn network(server: impl Into<String>, message: impl std::fmt::Display) -> Self {
        WhoisError::NetworkFailure {
            server: server.into(),
            message: message.to_string(),
        }
    }

    /// True for failures raised while talking to a server (connect, read,
    /// write, timeout, oversized response).
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            WhoisError::NetworkFailure { .. }
                | WhoisError::Timeout(_)
                | WhoisError::ResponseTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, WhoisError>;
