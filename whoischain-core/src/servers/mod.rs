//! Registry-specific request shaping and response interpretation.

mod arin;
mod generic;
mod iana;
mod selector;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::hostname::HostName;
use crate::net::{TextFetcher, WHOIS_PORT};
use crate::request::WhoisRequest;
use crate::response::WhoisResponse;

pub use arin::ArinServerLookup;
pub use generic::GenericServerLookup;
pub use iana::IanaServerLookup;
pub use selector::WhoisServerSelector;

/// How to talk to one kind of WHOIS server.
///
/// Implementors supply the server, the query shaping and the parsing; the
/// provided `lookup` methods do the fetching.
#[async_trait]
pub trait ServerLookup: Send + Sync {
    /// Server queried when the caller names none.
    fn default_server(&self) -> &HostName;

    fn fetcher(&self) -> &dyn TextFetcher;

    /// The text sent on the wire for `request`.
    fn build_query(&self, request: &WhoisRequest) -> String {
        request.query().to_string()
    }

    /// Builds the record for `content` returned by `server`. Content no
    /// template understands still yields a record holding the raw text.
    fn interpret(&self, request: &WhoisRequest, server: &HostName, content: String) -> WhoisResponse;

    async fn lookup(&self, request: &WhoisRequest, server: Option<&HostName>) -> Result<WhoisResponse> {
        let server = server.unwrap_or_else(|| self.default_server());
        let query = self.build_query(request);
        debug!(server = %server, query = %query, "Querying WHOIS server");

        let content = self
            .fetcher()
            .fetch(server, WHOIS_PORT, &query, request.encoding(), request.timeout())
            .await?;
        Ok(self.interpret(request, server, content))
    }

    fn lookup_blocking(&self, request: &WhoisRequest, server: Option<&HostName>) -> Result<WhoisResponse> {
        let server = server.unwrap_or_else(|| self.default_server());
        let query = self.build_query(request);
        debug!(server = %server, query = %query, "Querying WHOIS server (blocking)");

        let content = self.fetcher().fetch_blocking(
            server,
            WHOIS_PORT,
            &query,
            request.encoding(),
            request.timeout(),
        )?;
        Ok(self.interpret(request, server, content))
    }
}
