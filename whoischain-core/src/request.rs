use std::time::Duration;

use crate::error::{Result, WhoisError};
use crate::hostname::HostName;
use crate::options::{TextEncoding, WhoisOptions};

/// A single WHOIS resolution request.
///
/// Built once per lookup and not modified afterwards; the server to contact
/// next while following referrals is tracked by the engine, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct WhoisRequest {
    query: String,
    host_name: HostName,
    encoding: TextEncoding,
    timeout: Duration,
    follow_referrer: bool,
    whois_server: Option<HostName>,
}

impl WhoisRequest {
    /// Creates a request with the default options.
    ///
    /// A leading `.` is stripped, so `.com` queries the `com` TLD.
    pub fn new(query: &str) -> Result<Self> {
        Self::with_options(query, &WhoisOptions::default())
    }

    pub fn with_options(query: &str, options: &WhoisOptions) -> Result<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(WhoisError::InvalidQuery("query must not be empty".to_string()));
        }

        let query = trimmed.trim_start_matches('.');
        let host_name = HostName::parse(query)
            .map_err(|e| WhoisError::InvalidQuery(format!("'{}': {}", query, e)))?;

        Ok(Self {
            query: query.to_string(),
            host_name,
            encoding: options.encoding,
            timeout: options.timeout,
            follow_referrer: options.follow_referrer,
            whois_server: None,
        })
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_follow_referrer(mut self, follow: bool) -> Self {
        self.follow_referrer = follow;
        self
    }

    /// Queries `server` directly instead of starting at the root server.
    pub fn with_whois_server(mut self, server: HostName) -> Self {
        self.whois_server = Some(server);
        self
    }

    /// The query text as sent (before registry-specific shaping).
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn host_name(&self) -> &HostName {
        &self.host_name
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn follow_referrer(&self) -> bool {
        self.follow_referrer
    }

    pub fn whois_server(&self) -> Option<&HostName> {
        self.whois_server.as_ref()
    }
}
