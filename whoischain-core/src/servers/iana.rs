use std::sync::Arc;

use crate::hostname::HostName;
use crate::net::TextFetcher;
use crate::parse::{WhoisParser, IANA_SERVER};
use crate::request::WhoisRequest;
use crate::response::{RecordKind, WhoisResponse};
use crate::servers::ServerLookup;

/// Root lookup against `whois.iana.org`, also used for every server that has
/// no dedicated strategy.
pub struct IanaServerLookup {
    server: HostName,
    fetcher: Arc<dyn TextFetcher>,
    parser: Arc<WhoisParser>,
}

impl IanaServerLookup {
    pub fn new(fetcher: Arc<dyn TextFetcher>, parser: Arc<WhoisParser>) -> Self {
        Self {
            server: HostName::from_canonical(IANA_SERVER),
            fetcher,
            parser,
        }
    }
}

impl ServerLookup for IanaServerLookup {
    fn default_server(&self) -> &HostName {
        &self.server
    }

    fn fetcher(&self) -> &dyn TextFetcher {
        self.fetcher.as_ref()
    }

    /// JPRS answers in Japanese unless the query carries the `/e` suffix.
    fn build_query(&self, request: &WhoisRequest) -> String {
        let query = request.query();
        if query.to_ascii_lowercase().ends_with("jp") {
            format!("{}/e", query)
        } else {
            query.to_string()
        }
    }

    fn interpret(&self, request: &WhoisRequest, server: &HostName, content: String) -> WhoisResponse {
        let mut response = self
            .parser
            .parse(server, &content, RecordKind::Domain)
            .unwrap_or_else(|| WhoisResponse::unparsed(RecordKind::Domain, content));

        let target = request.host_name();
        if !target.is_ip() {
            if let Some(domain) = response.domain_mut() {
                if domain.domain_name.is_none() {
                    domain.domain_name = HostName::parse(target.tld()).ok();
                }
            }
        }
        response
    }
}
