use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::hostname::HostName;
use crate::net::TextFetcher;
use crate::parse::{WhoisParser, ARIN_SERVER};
use crate::servers::{ArinServerLookup, IanaServerLookup, ServerLookup};

/// Picks the strategy used to talk to a given WHOIS server.
///
/// Strategies are created at most once per server and shared by every
/// lookup running on the same engine.
pub struct WhoisServerSelector {
    fetcher: Arc<dyn TextFetcher>,
    parser: Arc<WhoisParser>,
    default: Arc<dyn ServerLookup>,
    lookups: DashMap<HostName, Arc<dyn ServerLookup>>,
}

impl WhoisServerSelector {
    pub fn new(fetcher: Arc<dyn TextFetcher>, parser: Arc<WhoisParser>) -> Self {
        let default: Arc<dyn ServerLookup> =
            Arc::new(IanaServerLookup::new(fetcher.clone(), parser.clone()));
        Self {
            fetcher,
            parser,
            default,
            lookups: DashMap::new(),
        }
    }

    /// Replaces the strategy used for servers without a dedicated one.
    pub fn with_default(mut self, lookup: Arc<dyn ServerLookup>) -> Self {
        self.default = lookup;
        self
    }

    /// Routes `server` to `lookup`.
    pub fn with_lookup(self, server: HostName, lookup: Arc<dyn ServerLookup>) -> Self {
        self.lookups.insert(server, lookup);
        self
    }

    /// The strategy for the root lookup.
    pub fn default_lookup(&self) -> Arc<dyn ServerLookup> {
        self.default.clone()
    }

    /// The parser handed to strategies this selector creates.
    pub fn parser(&self) -> &Arc<WhoisParser> {
        &self.parser
    }

    pub fn find(&self, server: &HostName) -> Arc<dyn ServerLookup> {
        if let Some(lookup) = self.lookups.get(server) {
            return lookup.value().clone();
        }

        if *server == ARIN_SERVER {
            let entry = self.lookups.entry(server.clone()).or_insert_with(|| {
                debug!(server = %server, "Creating ARIN strategy");
                let lookup: Arc<dyn ServerLookup> =
                    Arc::new(ArinServerLookup::new(self.fetcher.clone(), self.parser.clone()));
                lookup
            });
            return entry.value().clone();
        }

        self.default.clone()
    }

    /// Number of servers with a dedicated strategy.
    pub fn dedicated_count(&self) -> usize {
        self.lookups.len()
    }
}
