//! WHOIS response records and the referral chain that links them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hostname::HostName;

/// Upper bound on the number of records in a referral chain.
pub const MAX_CHAIN_DEPTH: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhoisStatus {
    #[default]
    Unknown,
    Found,
    NotFound,
    Limited,
    Reserved,
    Throttled,
    Error,
}

impl std::fmt::Display for WhoisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WhoisStatus::Unknown => "unknown",
            WhoisStatus::Found => "found",
            WhoisStatus::NotFound => "not found",
            WhoisStatus::Limited => "limited",
            WhoisStatus::Reserved => "reserved",
            WhoisStatus::Throttled => "throttled",
            WhoisStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: Option<String>,
    pub organization: Option<String>,
    pub email: Option<String>,
    pub telephone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<String>,
}

impl Contact {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.organization.is_none()
            && self.email.is_none()
            && self.telephone.is_none()
            && self.address.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registrar {
    pub name: Option<String>,
    pub iana_id: Option<String>,
    pub url: Option<String>,
    pub abuse_email: Option<String>,
    /// The server to contact next, if the response refers onwards.
    pub whois_server: Option<HostName>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub domain_name: Option<HostName>,
    pub registry_domain_id: Option<String>,
    pub domain_status: Vec<String>,
    pub registered: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub expiration: Option<DateTime<Utc>>,
    pub registrant: Option<Contact>,
    pub admin_contact: Option<Contact>,
    pub technical_contact: Option<Contact>,
    pub billing_contact: Option<Contact>,
    pub zone_contact: Option<Contact>,
    pub name_servers: Vec<String>,
    pub remarks: Option<String>,
    pub dnssec: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    /// Address blocks in CIDR notation.
    pub networks: Vec<String>,
    pub range: Option<String>,
    pub name: Option<String>,
    pub handle: Option<String>,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Domain,
    Network,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WhoisRecord {
    Domain(DomainRecord),
    Network(NetworkRecord),
    Generic,
}

impl WhoisRecord {
    pub fn empty(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Domain => WhoisRecord::Domain(DomainRecord::default()),
            RecordKind::Network => WhoisRecord::Network(NetworkRecord::default()),
            RecordKind::Generic => WhoisRecord::Generic,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            WhoisRecord::Domain(_) => RecordKind::Domain,
            WhoisRecord::Network(_) => RecordKind::Network,
            WhoisRecord::Generic => RecordKind::Generic,
        }
    }
}

/// The result of contacting one WHOIS server.
///
/// `referrer` points at the response that named this response's server, so
/// the final response of a lookup carries the whole provenance chain back to
/// the root lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhoisResponse {
    pub record: WhoisRecord,
    pub content: Option<String>,
    pub status: WhoisStatus,
    pub fields_parsed: usize,
    pub parsing_errors: usize,
    pub template_name: Option<String>,
    pub registrar: Option<Registrar>,
    pub referrer: Option<Box<WhoisResponse>>,
}

impl WhoisResponse {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            record: WhoisRecord::empty(kind),
            content: None,
            status: WhoisStatus::Unknown,
            fields_parsed: 0,
            parsing_errors: 0,
            template_name: None,
            registrar: None,
            referrer: None,
        }
    }

    /// A response holding only raw content, used when no template matched.
    pub fn unparsed(kind: RecordKind, content: String) -> Self {
        Self {
            content: Some(content),
            ..Self::new(kind)
        }
    }

    /// A synthetic starting point whose only purpose is to name `server`.
    pub fn with_server(server: HostName) -> Self {
        Self {
            status: WhoisStatus::Found,
            registrar: Some(Registrar {
                whois_server: Some(server),
                ..Registrar::default()
            }),
            ..Self::new(RecordKind::Domain)
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.record.kind()
    }

    pub fn content_length(&self) -> usize {
        self.content.as_ref().map_or(0, |c| c.len())
    }

    /// The server this response refers to, if any.
    pub fn whois_server(&self) -> Option<&HostName> {
        self.registrar.as_ref()?.whois_server.as_ref()
    }

    pub fn domain(&self) -> Option<&DomainRecord> {
        match &self.record {
            WhoisRecord::Domain(domain) => Some(domain),
            _ => None,
        }
    }

    pub fn domain_mut(&mut self) -> Option<&mut DomainRecord> {
        match &mut self.record {
            WhoisRecord::Domain(domain) => Some(domain),
            _ => None,
        }
    }

    pub fn network(&self) -> Option<&NetworkRecord> {
        match &self.record {
            WhoisRecord::Network(network) => Some(network),
            _ => None,
        }
    }

    pub fn domain_name(&self) -> Option<&HostName> {
        self.domain()?.domain_name.as_ref()
    }

    pub fn referrer(&self) -> Option<&WhoisResponse> {
        self.referrer.as_deref()
    }

    /// Links `next` behind this response and returns it.
    pub fn link(self, mut next: WhoisResponse) -> WhoisResponse {
        next.referrer = Some(Box::new(self));
        next
    }

    /// Iterates from this response back to the root of the chain.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Number of responses in the chain, this one included.
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// The referral targets named along the chain, newest first.
    pub fn servers(&self) -> Vec<&HostName> {
        self.chain().filter_map(|r| r.whois_server()).collect()
    }

    /// True when an earlier response in the chain already referred to
    /// `server`, or when the chain has reached [`MAX_CHAIN_DEPTH`].
    ///
    /// This response itself is not compared: its own server is the
    /// candidate being checked.
    pub fn seen_server(&self, server: &HostName) -> bool {
        let mut depth = 1;
        let mut ancestor = self.referrer();

        while let Some(record) = ancestor {
            depth += 1;
            if depth > MAX_CHAIN_DEPTH {
                return true;
            }
            if record.whois_server() == Some(server) {
                return true;
            }
            ancestor = record.referrer();
        }

        depth >= MAX_CHAIN_DEPTH
    }
}

pub struct Chain<'a> {
    next: Option<&'a WhoisResponse>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a WhoisResponse;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.referrer();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str) -> HostName {
        HostName::parse(name).unwrap()
    }

    fn referring_to(server: &str) -> WhoisResponse {
        let mut response = WhoisResponse::new(RecordKind::Domain);
        response.registrar = Some(Registrar {
            whois_server: Some(host(server)),
            ..Registrar::default()
        });
        response
    }

    #[test]
    fn test_with_server() {
        let response = WhoisResponse::with_server(host("whois.markmonitor.com"));
        assert_eq!(response.status, WhoisStatus::Found);
        assert_eq!(
            response.whois_server().map(|s| s.as_str()),
            Some("whois.markmonitor.com")
        );
        assert!(response.referrer().is_none());
    }

    #[test]
    fn test_unparsed_keeps_content() {
        let response = WhoisResponse::unparsed(RecordKind::Network, "raw".to_string());
        assert_eq!(response.status, WhoisStatus::Unknown);
        assert_eq!(response.content_length(), 3);
        assert_eq!(response.kind(), RecordKind::Network);
        assert!(response.whois_server().is_none());
    }

    #[test]
    fn test_link_builds_chain() {
        let root = referring_to("whois.verisign-grs.com");
        let middle = root.link(referring_to("whois.markmonitor.com"));
        let last = middle.link(WhoisResponse::new(RecordKind::Domain));

        assert_eq!(last.depth(), 3);
        let servers: Vec<&str> = last.servers().iter().map(|s| s.as_str()).collect();
        assert_eq!(servers, vec!["whois.markmonitor.com", "whois.verisign-grs.com"]);
    }

    #[test]
    fn test_seen_server_skips_newest_record() {
        let root = referring_to("whois.verisign-grs.com");
        let next = root.link(referring_to("whois.markmonitor.com"));

        assert!(!next.seen_server(&host("whois.markmonitor.com")));
        assert!(next.seen_server(&host("whois.verisign-grs.com")));
        assert!(next.seen_server(&host("WHOIS.VERISIGN-GRS.COM")));
    }

    #[test]
    fn test_seen_server_respects_depth_ceiling() {
        let mut chain = referring_to("whois0.example.net");
        for i in 1..MAX_CHAIN_DEPTH {
            chain = chain.link(referring_to(&format!("whois{}.example.net", i)));
        }
        assert_eq!(chain.depth(), MAX_CHAIN_DEPTH);
        assert!(chain.seen_server(&host("never-seen.example.net")));

        let shallow = referring_to("a.example.net").link(referring_to("b.example.net"));
        assert!(!shallow.seen_server(&host("never-seen.example.net")));
    }

    #[test]
    fn test_serializes_chain() {
        let chain = referring_to("whois.verisign-grs.com").link(WhoisResponse::new(RecordKind::Domain));
        let json = serde_json::to_value(&chain).unwrap();
        assert_eq!(json["record"]["kind"], "domain");
        assert_eq!(
            json["referrer"]["registrar"]["whois_server"],
            "whois.verisign-grs.com"
        );
    }
}
