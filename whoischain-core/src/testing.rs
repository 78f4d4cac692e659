//! Scripted collaborators for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, WhoisError};
use crate::hostname::HostName;
use crate::net::TextFetcher;
use crate::options::TextEncoding;

pub mod fixtures {
    pub const IANA_COM: &str = include_str!("../testdata/iana_com.txt");
    pub const IANA_8_8_8_8: &str = include_str!("../testdata/iana_8.8.8.8.txt");
    pub const VERISIGN_GOOGLE_COM: &str = include_str!("../testdata/verisign_google.com.txt");
    pub const VERISIGN_NO_MATCH: &str = include_str!("../testdata/verisign_no_match.txt");
    pub const MARKMONITOR_GOOGLE_COM: &str = include_str!("../testdata/markmonitor_google.com.txt");
    pub const ARIN_8_8_8_8: &str = include_str!("../testdata/arin_8.8.8.8.txt");
}

/// A [`TextFetcher`] answering from canned responses keyed by
/// `(server, query)`. Unknown pairs fail with a network error.
#[derive(Default)]
pub struct FakeFetcher {
    responses: HashMap<(String, String), String>,
    failing: HashMap<String, String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, server: &str, query: &str, content: &str) -> Self {
        self.responses
            .insert((server.to_string(), query.to_string()), content.to_string());
        self
    }

    /// Every query to `server` fails with `message`.
    pub fn with_failure(mut self, server: &str, message: &str) -> Self {
        self.failing.insert(server.to_string(), message.to_string());
        self
    }

    /// `(server, query)` pairs in the order they were fetched.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn contacted(&self, server: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|(s, _)| s == server)
    }

    fn answer(&self, server: &HostName, query: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((server.to_string(), query.to_string()));

        if let Some(message) = self.failing.get(server.as_str()) {
            return Err(WhoisError::network(server.as_str(), message));
        }
        self.responses
            .get(&(server.to_string(), query.to_string()))
            .cloned()
            .ok_or_else(|| WhoisError::network(server.as_str(), format!("no fixture for '{}'", query)))
    }
}

#[async_trait]
impl TextFetcher for FakeFetcher {
    async fn fetch(
        &self,
        server: &HostName,
        _port: u16,
        query: &str,
        _encoding: TextEncoding,
        _timeout: Duration,
    ) -> Result<String> {
        self.answer(server, query)
    }

    fn fetch_blocking(
        &self,
        server: &HostName,
        _port: u16,
        query: &str,
        _encoding: TextEncoding,
        _timeout: Duration,
    ) -> Result<String> {
        self.answer(server, query)
    }
}
