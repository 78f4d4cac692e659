//! The referral-following lookup engine.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::hostname::HostName;
use crate::net::{TcpFetcher, TextFetcher};
use crate::options::WhoisOptions;
use crate::parse::WhoisParser;
use crate::request::WhoisRequest;
use crate::response::{WhoisResponse, MAX_CHAIN_DEPTH};
use crate::servers::{ServerLookup, WhoisServerSelector};

/// Resolves queries by asking the root server and following referrals.
///
/// One engine can serve any number of concurrent lookups; the only state it
/// shares between them is the strategy cache and the template registry.
pub struct WhoisLookup {
    options: WhoisOptions,
    selector: WhoisServerSelector,
}

impl Default for WhoisLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl WhoisLookup {
    pub fn new() -> Self {
        Self::with_options(WhoisOptions::default())
    }

    pub fn with_options(options: WhoisOptions) -> Self {
        Self::with_fetcher(options, Arc::new(TcpFetcher::new()))
    }

    /// An engine using `fetcher` for every server contact, with a parser of
    /// its own.
    pub fn with_fetcher(options: WhoisOptions, fetcher: Arc<dyn TextFetcher>) -> Self {
        let selector = WhoisServerSelector::new(fetcher, Arc::new(WhoisParser::new()));
        Self::with_selector(options, selector)
    }

    pub fn with_selector(options: WhoisOptions, selector: WhoisServerSelector) -> Self {
        Self { options, selector }
    }

    pub fn options(&self) -> &WhoisOptions {
        &self.options
    }

    pub fn selector(&self) -> &WhoisServerSelector {
        &self.selector
    }

    /// Builds a request for `query` from this engine's options.
    pub fn request(&self, query: &str) -> Result<WhoisRequest> {
        WhoisRequest::with_options(query, &self.options)
    }

    #[instrument(skip(self), fields(query = %query))]
    pub async fn lookup(&self, query: &str) -> Result<WhoisResponse> {
        let request = self.request(query)?;
        self.lookup_request(&request).await
    }

    pub async fn lookup_request(&self, request: &WhoisRequest) -> Result<WhoisResponse> {
        let mut walk = ReferralWalk::new(&self.options, request, &self.selector);

        let mut current = match walk.start() {
            Some(synthetic) => synthetic,
            None => walk.lookup.lookup(request, None).await?,
        };

        while let Some(server) = walk.next_server(&current) {
            let next = walk.lookup.lookup(request, Some(&server)).await?;
            match walk.advance(current, next) {
                Step::Continue(chain) => current = chain,
                Step::Done(chain) => return Ok(chain),
            }
        }
        Ok(current)
    }

    /// Same as [`lookup`](Self::lookup) without an async runtime.
    pub fn lookup_blocking(&self, query: &str) -> Result<WhoisResponse> {
        let request = self.request(query)?;
        self.lookup_request_blocking(&request)
    }

    pub fn lookup_request_blocking(&self, request: &WhoisRequest) -> Result<WhoisResponse> {
        let mut walk = ReferralWalk::new(&self.options, request, &self.selector);

        let mut current = match walk.start() {
            Some(synthetic) => synthetic,
            None => walk.lookup.lookup_blocking(request, None)?,
        };

        while let Some(server) = walk.next_server(&current) {
            let next = walk.lookup.lookup_blocking(request, Some(&server))?;
            match walk.advance(current, next) {
                Step::Continue(chain) => current = chain,
                Step::Done(chain) => return Ok(chain),
            }
        }
        Ok(current)
    }
}

enum Step {
    Continue(WhoisResponse),
    Done(WhoisResponse),
}

/// Per-lookup state shared by the async and blocking loops: which server
/// and strategy are active, and when to stop.
struct ReferralWalk<'a> {
    options: &'a WhoisOptions,
    request: &'a WhoisRequest,
    selector: &'a WhoisServerSelector,
    active: Option<HostName>,
    lookup: Arc<dyn ServerLookup>,
}

impl<'a> ReferralWalk<'a> {
    fn new(options: &'a WhoisOptions, request: &'a WhoisRequest, selector: &'a WhoisServerSelector) -> Self {
        Self {
            options,
            request,
            selector,
            active: None,
            lookup: selector.default_lookup(),
        }
    }

    /// The starting record when the request names its server, otherwise
    /// `None` and the root lookup runs on the default strategy.
    fn start(&self) -> Option<WhoisResponse> {
        let server = self.request.whois_server()?;
        debug!(server = %server, "Starting at requested server");
        Some(WhoisResponse::with_server(server.clone()))
    }

    /// The server to contact after `current`, switching strategy when it
    /// differs from the active one. `None` ends the walk.
    fn next_server(&mut self, current: &WhoisResponse) -> Option<HostName> {
        let next = current.whois_server()?;

        if self.options.is_ignored(next) {
            debug!(server = %next, "Referral target is ignored");
            return None;
        }

        let target = self.request.host_name();
        if !target.is_ip() && target.is_tld() {
            debug!(tld = %target, "TLD query answered by the root server");
            return None;
        }

        if self.active.as_ref() != Some(next) {
            debug!(server = %next, depth = current.depth(), "Following referral");
            self.lookup = self.selector.find(next);
            self.active = Some(next.clone());
        }
        Some(next.clone())
    }

    fn advance(&self, current: WhoisResponse, next: WhoisResponse) -> Step {
        let chain = current.link(next);

        if !self.request.follow_referrer() {
            return Step::Done(chain);
        }

        if let Some(server) = chain.whois_server() {
            if chain.seen_server(server) {
                let depth = chain.depth();
                if depth >= MAX_CHAIN_DEPTH {
                    warn!(depth = depth, server = %server, "Max referral depth exceeded");
                } else {
                    debug!(server = %server, depth = depth, "Referral already visited");
                }
                return Step::Done(chain);
            }
        }
        Step::Continue(chain)
    }
}
