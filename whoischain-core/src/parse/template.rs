//! Template definitions: which lines of a response map to which record field.

use regex::Regex;

use crate::error::{Result, WhoisError};
use crate::response::{RecordKind, WhoisStatus};

/// Tag carried by templates that apply to any server.
pub const CATCH_ALL_TAG: &str = "catch-all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactRole {
    Registrant,
    Admin,
    Technical,
    Billing,
    Zone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactField {
    Name,
    Organization,
    Email,
    Telephone,
    Address,
}

/// A record field a template rule can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    DomainName,
    RegistryDomainId,
    DomainStatus,
    Registered,
    Updated,
    Expiration,
    NameServer,
    Remarks,
    DnsSec,
    RegistrarName,
    RegistrarIanaId,
    RegistrarUrl,
    RegistrarAbuseEmail,
    WhoisServer,
    Contact(ContactRole, ContactField),
    /// A single contact block some registries publish for every role.
    SharedContact(ContactField),
    Network,
    NetworkRange,
    NetworkName,
    NetworkHandle,
    NetworkOrganization,
}

impl Field {
    /// Fields that collect every occurrence instead of keeping the first.
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            Field::DomainStatus
                | Field::NameServer
                | Field::Network
                | Field::Contact(_, ContactField::Address)
                | Field::SharedContact(ContactField::Address)
        )
    }
}

/// One extraction rule. The first capture group is the value.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: Field,
    pub pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    tags: Vec<String>,
    kind: RecordKind,
    status: Option<WhoisStatus>,
    anchors: Vec<Regex>,
    rules: Vec<FieldRule>,
}

impl Template {
    pub fn builder(name: impl Into<String>, kind: RecordKind) -> TemplateBuilder {
        TemplateBuilder {
            name: name.into(),
            kind,
            tags: Vec::new(),
            status: None,
            anchors: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Status assigned to every record this template produces.
    pub fn status(&self) -> Option<WhoisStatus> {
        self.status
    }

    /// Patterns that must all match for the template to apply at all.
    pub fn anchors(&self) -> &[Regex] {
        &self.anchors
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }
}

pub struct TemplateBuilder {
    name: String,
    kind: RecordKind,
    tags: Vec<String>,
    status: Option<WhoisStatus>,
    anchors: Vec<String>,
    rules: Vec<(Field, String)>,
}

impl TemplateBuilder {
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn status(mut self, status: WhoisStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn anchor(mut self, pattern: impl Into<String>) -> Self {
        self.anchors.push(pattern.into());
        self
    }

    /// Adds a raw rule; `pattern` must have one capture group.
    pub fn field(mut self, field: Field, pattern: impl Into<String>) -> Self {
        self.rules.push((field, pattern.into()));
        self
    }

    /// Adds a rule for a `Label: value` line. The label match is
    /// case-insensitive and anchored at the start of the line.
    pub fn line(self, field: Field, label: &str) -> Self {
        let pattern = format!(r"(?im)^[ \t]*{}:[ \t]*(.*?)[ \t]*\r?$", regex::escape(label));
        self.field(field, pattern)
    }

    pub fn build(self) -> Result<Template> {
        let name = self.name;
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| WhoisError::InvalidTemplate {
                name: name.clone(),
                message: e.to_string(),
            })
        };

        let anchors = self
            .anchors
            .iter()
            .map(|p| compile(p.as_str()))
            .collect::<Result<Vec<_>>>()?;

        let mut rules = Vec::with_capacity(self.rules.len());
        for (field, pattern) in &self.rules {
            let regex = compile(pattern.as_str())?;
            if regex.captures_len() < 2 {
                return Err(WhoisError::InvalidTemplate {
                    name: name.clone(),
                    message: format!("pattern '{}' has no capture group", pattern),
                });
            }
            rules.push(FieldRule {
                field: *field,
                pattern: regex,
            });
        }

        Ok(Template {
            name,
            tags: self.tags,
            kind: self.kind,
            status: self.status,
            anchors,
            rules,
        })
    }
}

/// Supplies template definitions by group name.
///
/// A group is either a WHOIS server host name or one of the catch-all group
/// names (`generic`, `tld`).
pub trait TemplateSource: Send + Sync {
    fn templates(&self, group: &str) -> Vec<Template>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_rule_captures_value() {
        let template = Template::builder("test", RecordKind::Domain)
            .line(Field::DomainName, "Domain Name")
            .build()
            .unwrap();
        let rule = &template.rules()[0];
        let caps = rule
            .pattern
            .captures("Registry Domain ID: 1\n   domain name:  EXAMPLE.COM  \r\n")
            .unwrap();
        assert_eq!(&caps[1], "EXAMPLE.COM");
    }

    #[test]
    fn test_line_rule_does_not_match_longer_label() {
        let template = Template::builder("test", RecordKind::Domain)
            .line(Field::RegistrarName, "Registrar")
            .build()
            .unwrap();
        let rule = &template.rules()[0];
        assert!(rule
            .pattern
            .captures("Registrar WHOIS Server: whois.markmonitor.com\n")
            .is_none());
        assert!(rule.pattern.captures("Sponsoring Registrar: X\n").is_none());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = Template::builder("broken", RecordKind::Domain)
            .field(Field::DomainName, "(unclosed")
            .build()
            .unwrap_err();
        assert!(matches!(err, WhoisError::InvalidTemplate { ref name, .. } if name == "broken"));

        let err = Template::builder("no-group", RecordKind::Domain)
            .field(Field::DomainName, "Domain Name: .*")
            .build()
            .unwrap_err();
        assert!(matches!(err, WhoisError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_tags_are_case_insensitive() {
        let template = Template::builder("t", RecordKind::Network)
            .tag("whois.arin.net")
            .build()
            .unwrap();
        assert!(template.has_tag("WHOIS.ARIN.NET"));
        assert!(!template.has_tag(CATCH_ALL_TAG));
    }
}
