use std::sync::Arc;

use crate::hostname::HostName;
use crate::net::TextFetcher;
use crate::parse::{WhoisParser, ARIN_SERVER};
use crate::request::WhoisRequest;
use crate::response::{RecordKind, WhoisResponse};
use crate::servers::ServerLookup;

/// Network lookups against `whois.arin.net`.
pub struct ArinServerLookup {
    server: HostName,
    fetcher: Arc<dyn TextFetcher>,
    parser: Arc<WhoisParser>,
}

impl ArinServerLookup {
    pub fn new(fetcher: Arc<dyn TextFetcher>, parser: Arc<WhoisParser>) -> Self {
        Self {
            server: HostName::from_canonical(ARIN_SERVER),
            fetcher,
            parser,
        }
    }
}

impl ServerLookup for ArinServerLookup {
    fn default_server(&self) -> &HostName {
        &self.server
    }

    fn fetcher(&self) -> &dyn TextFetcher {
        self.fetcher.as_ref()
    }

    /// `n` restricts the search to network records.
    fn build_query(&self, request: &WhoisRequest) -> String {
        let query = request.query();
        if query.starts_with("n ") {
            query.to_string()
        } else {
            format!("n {}", query)
        }
    }

    fn interpret(&self, _request: &WhoisRequest, server: &HostName, content: String) -> WhoisResponse {
        self.parser
            .parse(server, &content, RecordKind::Network)
            .unwrap_or_else(|| WhoisResponse::unparsed(RecordKind::Network, content))
    }
}
