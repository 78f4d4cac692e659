use std::sync::Arc;

use crate::hostname::HostName;
use crate::net::TextFetcher;
use crate::parse::WhoisParser;
use crate::request::WhoisRequest;
use crate::response::{RecordKind, WhoisResponse};
use crate::servers::ServerLookup;

/// Plain domain lookups against a fixed server, query sent unchanged.
pub struct GenericServerLookup {
    server: HostName,
    fetcher: Arc<dyn TextFetcher>,
    parser: Arc<WhoisParser>,
}

impl GenericServerLookup {
    pub fn new(server: HostName, fetcher: Arc<dyn TextFetcher>, parser: Arc<WhoisParser>) -> Self {
        Self {
            server,
            fetcher,
            parser,
        }
    }
}

impl ServerLookup for GenericServerLookup {
    fn default_server(&self) -> &HostName {
        &self.server
    }

    fn fetcher(&self) -> &dyn TextFetcher {
        self.fetcher.as_ref()
    }

    fn interpret(&self, _request: &WhoisRequest, server: &HostName, content: String) -> WhoisResponse {
        self.parser
            .parse(server, &content, RecordKind::Domain)
            .unwrap_or_else(|| WhoisResponse::unparsed(RecordKind::Generic, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::WhoisStatus;
    use crate::testing::{fixtures, FakeFetcher};

    fn host(name: &str) -> HostName {
        HostName::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_queries_configured_server() {
        let fetcher = Arc::new(FakeFetcher::new().with_response(
            "whois.verisign-grs.com",
            "google.com",
            fixtures::VERISIGN_GOOGLE_COM,
        ));
        let lookup = GenericServerLookup::new(
            host("whois.verisign-grs.com"),
            fetcher.clone(),
            Arc::new(WhoisParser::new()),
        );
        let request = WhoisRequest::new("google.com").unwrap();

        let response = lookup.lookup(&request, None).await.unwrap();

        assert_eq!(response.status, WhoisStatus::Found);
        assert_eq!(response.whois_server().unwrap().as_str(), "whois.markmonitor.com");
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unparsed_is_generic_record() {
        let fetcher = Arc::new(FakeFetcher::new().with_response(
            "whois.nic.example",
            "foo.example",
            "???\n",
        ));
        let lookup =
            GenericServerLookup::new(host("whois.nic.example"), fetcher, Arc::new(WhoisParser::new()));
        let request = WhoisRequest::new("foo.example").unwrap();

        let response = lookup.lookup(&request, None).await.unwrap();

        assert_eq!(response.kind(), RecordKind::Generic);
        assert_eq!(response.status, WhoisStatus::Unknown);
        assert!(response.domain_name().is_none());
    }
}
