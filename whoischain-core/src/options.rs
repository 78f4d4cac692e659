//! Defaults applied to every request built by a [`WhoisLookup`](crate::WhoisLookup).

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hostname::HostName;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Text encoding used to decode a server's response bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// UTF-8, falling back to Latin-1 when the bytes are not valid UTF-8.
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    pub fn decode(self, bytes: Vec<u8>) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes)
                .unwrap_or_else(|e| latin1(e.as_bytes())),
            TextEncoding::Latin1 => latin1(&bytes),
        }
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&c| c as char).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhoisOptions {
    pub encoding: TextEncoding,
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
    pub follow_referrer: bool,
    /// Referral targets that end the chain instead of being contacted.
    pub ignored_whois_servers: HashSet<HostName>,
}

impl Default for WhoisOptions {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::default(),
            timeout: DEFAULT_TIMEOUT,
            follow_referrer: true,
            ignored_whois_servers: HashSet::new(),
        }
    }
}

impl WhoisOptions {
    pub fn new() -> Self {
        Self::default()
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

    pub fn with_ignored_server(mut self, server: HostName) -> Self {
        self.ignored_whois_servers.insert(server);
        self
    }

    pub fn is_ignored(&self, server: &HostName) -> bool {
        self.ignored_whois_servers.contains(server)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = WhoisOptions::default();
        assert_eq!(options.encoding, TextEncoding::Utf8);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert!(options.follow_referrer);
        assert!(options.ignored_whois_servers.is_empty());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let json = r#"{"timeout_secs": 30, "ignored_whois_servers": ["WHOIS.Example.NET"]}"#;
        let options: WhoisOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert!(options.follow_referrer);
        assert!(options.is_ignored(&HostName::parse("whois.example.net").unwrap()));
    }

    #[test]
    fn test_utf8_falls_back_to_latin1() {
        assert_eq!(TextEncoding::Utf8.decode("café".as_bytes().to_vec()), "café");
        assert_eq!(TextEncoding::Utf8.decode(vec![0x63, 0x61, 0x66, 0xe9]), "café");
        assert_eq!(TextEncoding::Latin1.decode(vec![0xe9]), "é");
    }
}
