//! Host name validation and normalization.
//!
//! A [`HostName`] is always lowercase ASCII: Unicode labels are converted to
//! their ASCII-compatible encoding (`xn--...`) before validation, and the
//! value must classify as a DNS host name, an IPv4 literal or an IPv6 literal.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WhoisError};

/// Prefix marking an ASCII-compatible encoded label.
const ACE_PREFIX: &str = "xn--";
const MAX_NAME_LENGTH: usize = 255;
const MAX_LABEL_LENGTH: usize = 63;

/// A validated, canonical (lowercase, ASCII) host name, IPv4 or IPv6 literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostName(String);

impl HostName {
    /// Parses and normalizes `text`.
    ///
    /// Leading and trailing whitespace is ignored. Non-ASCII input is
    /// converted to its ASCII-compatible encoding first.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(WhoisError::InvalidHostName(
                "host name must not be empty".to_string(),
            ));
        }

        let ascii = if trimmed.is_ascii() {
            trimmed.to_ascii_lowercase()
        } else {
            idna::domain_to_ascii(trimmed).map_err(|e| {
                WhoisError::InvalidHostName(format!("'{}' cannot be ACE encoded: {}", trimmed, e))
            })?
        };

        canonicalize(&ascii)
            .map(HostName)
            .ok_or_else(|| WhoisError::InvalidHostName(format!("'{}' is not a valid host name", trimmed)))
    }

    /// Wraps a name already in canonical form, such as a built-in server.
    pub(crate) fn from_canonical(name: &str) -> Self {
        debug_assert_eq!(canonicalize(name).as_deref(), Some(name));
        HostName(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the name has no dot, e.g. `com`.
    pub fn is_tld(&self) -> bool {
        !self.0.contains('.')
    }

    /// The part after the last dot (the whole value for a bare TLD).
    pub fn tld(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    pub fn is_ipv4(&self) -> bool {
        self.0.parse::<Ipv4Addr>().is_ok()
    }

    pub fn is_ipv6(&self) -> bool {
        self.0.parse::<Ipv6Addr>().is_ok()
    }

    pub fn is_ip(&self) -> bool {
        self.is_ipv4() || self.is_ipv6()
    }

    pub fn is_ace_encoded(&self) -> bool {
        self.0.contains(ACE_PREFIX)
    }

    /// Human-readable form with ACE labels decoded back to Unicode.
    pub fn to_unicode(&self) -> String {
        if self.is_ip() || !self.is_ace_encoded() {
            return self.0.clone();
        }
        let (unicode, result) = idna::domain_to_unicode(&self.0);
        match result {
            Ok(()) => unicode,
            Err(_) => self.0.clone(),
        }
    }
}

/// Returns the canonical form of an already-lowercased ASCII name, or `None`
/// when it is neither an IP literal nor a DNS host name.
fn canonicalize(value: &str) -> Option<String> {
    if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        return inner.parse::<Ipv6Addr>().ok().map(|_| inner.to_string());
    }

    if value.parse::<Ipv4Addr>().is_ok() || value.parse::<Ipv6Addr>().is_ok() {
        return Some(value.to_string());
    }

    let name = value.strip_suffix('.').unwrap_or(value);
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return None;
    }

    let valid = name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LENGTH
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    });

    valid.then(|| name.to_string())
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HostName {
    type Err = WhoisError;

    fn from_str(s: &str) -> Result<Self> {
        HostName::parse(s)
    }
}

impl TryFrom<String> for HostName {
    type Error = WhoisError;

    fn try_from(value: String) -> Result<Self> {
        HostName::parse(&value)
    }
}

impl From<HostName> for String {
    fn from(host: HostName) -> Self {
        host.0
    }
}

impl AsRef<str> for HostName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for HostName {
    fn eq(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for HostName {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lowercases() {
        let host = HostName::parse("WHOIS.MarkMonitor.COM").unwrap();
        assert_eq!(host.as_str(), "whois.markmonitor.com");
        assert_eq!(host, HostName::parse("whois.markmonitor.com").unwrap());
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(HostName::parse("").is_err());
        assert!(HostName::parse("   ").is_err());
        assert!(HostName::parse("exa mple.com").is_err());
        assert!(HostName::parse("example..com").is_err());
        assert!(HostName::parse("-example.com").is_err());
        assert!(HostName::parse("example-.com").is_err());
        assert!(HostName::parse("exa!mple.com").is_err());
        assert!(HostName::parse(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let inputs = [
            "google.com",
            "COM",
            "sub.domain.example.co.uk",
            "192.168.0.1",
            "2001:4860:4860::8888",
            "[::1]",
            "münchen.de",
            "example.com.",
        ];
        for input in inputs {
            let once = HostName::parse(input).unwrap();
            let twice = HostName::parse(&once.to_string()).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_unicode_round_trip() {
        let host = HostName::parse("münchen.de").unwrap();
        assert!(host.is_ace_encoded());
        assert_eq!(host.as_str(), "xn--mnchen-3ya.de");
        assert_eq!(host.to_unicode(), "münchen.de");

        let upper = HostName::parse("MÜNCHEN.de").unwrap();
        assert_eq!(upper.to_unicode(), "münchen.de");
    }

    #[test]
    fn test_tld_classification() {
        let tld = HostName::parse("com").unwrap();
        assert!(tld.is_tld());
        assert_eq!(tld.tld(), "com");

        let domain = HostName::parse("example.co.uk").unwrap();
        assert!(!domain.is_tld());
        assert_eq!(domain.tld(), "uk");
    }

    #[test]
    fn test_ip_classification() {
        let v4 = HostName::parse("8.8.8.8").unwrap();
        assert!(v4.is_ipv4());
        assert!(v4.is_ip());
        assert!(!v4.is_ipv6());

        let v6 = HostName::parse("[2001:DB8::1]").unwrap();
        assert!(v6.is_ipv6());
        assert!(v6.is_ip());
        assert_eq!(v6.as_str(), "2001:db8::1");

        let name = HostName::parse("example.com").unwrap();
        assert!(!name.is_ip());
    }

    #[test]
    fn test_case_insensitive_str_comparison() {
        let host = HostName::parse("whois.arin.net").unwrap();
        assert!(host == "WHOIS.ARIN.NET");
    }

    #[test]
    fn test_serde_as_string() {
        let host = HostName::parse("whois.iana.org").unwrap();
        let json = serde_json::to_string(&host).unwrap();
        assert_eq!(json, "\"whois.iana.org\"");

        let back: HostName = serde_json::from_str("\"WHOIS.IANA.ORG\"").unwrap();
        assert_eq!(back, host);
        assert!(serde_json::from_str::<HostName>("\"not valid!\"").is_err());
    }
}
