//! Matching raw response text against registered templates.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::hostname::HostName;
use crate::parse::template::{ContactField, ContactRole, Field, Template};
use crate::response::{Contact, RecordKind, Registrar, WhoisRecord, WhoisResponse, WhoisStatus};

/// The outcome of applying the best template to a response.
#[derive(Debug, Clone)]
pub struct TemplateMatch {
    pub template_name: String,
    pub response: WhoisResponse,
    /// Every captured value in rule order, including values the record has
    /// no slot for. Fixups work from these.
    pub values: Vec<(Field, String)>,
    pub fields_matched: usize,
    pub errors: Vec<String>,
}

impl TemplateMatch {
    pub fn values_of(&self, field: Field) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(move |(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }
}

/// Turns raw text into a structured record using a registry of templates.
pub trait TemplateMatcher: Send + Sync {
    /// Registers `template`, replacing any template with the same name.
    fn register(&self, template: Template);

    fn contains_tag(&self, tag: &str) -> bool;

    fn template_count(&self) -> usize;

    /// The template tagged with one of `tags` that extracts the most fields
    /// from `content`, restricted to templates producing records of `kind`.
    fn best_match(
        &self,
        content: &str,
        tags: &[&str],
        kind: RecordKind,
    ) -> Option<TemplateMatch>;
}

/// [`TemplateMatcher`] driven by the regex rules of each template.
#[derive(Debug, Default)]
pub struct RegexMatcher {
    templates: RwLock<Vec<Template>>,
}

impl RegexMatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateMatcher for RegexMatcher {
    fn register(&self, template: Template) {
        let mut templates = self.templates.write().unwrap_or_else(|poisoned| {
            warn!("Template store lock poisoned, recovering");
            poisoned.into_inner()
        });
        match templates.iter_mut().find(|t| t.name() == template.name()) {
            Some(existing) => *existing = template,
            None => templates.push(template),
        }
    }

    fn contains_tag(&self, tag: &str) -> bool {
        let templates = self.templates.read().unwrap_or_else(|p| p.into_inner());
        templates.iter().any(|t| t.has_tag(tag))
    }

    fn template_count(&self) -> usize {
        self.templates.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn best_match(
        &self,
        content: &str,
        tags: &[&str],
        kind: RecordKind,
    ) -> Option<TemplateMatch> {
        let templates = self.templates.read().unwrap_or_else(|p| p.into_inner());

        let mut best: Option<TemplateMatch> = None;
        for template in templates
            .iter()
            .filter(|t| t.kind() == kind && tags.iter().any(|tag| t.has_tag(tag)))
        {
            let Some(candidate) = apply_template(template, content) else {
                continue;
            };
            debug!(
                template = template.name(),
                fields = candidate.fields_matched,
                errors = candidate.errors.len(),
                "Template matched"
            );
            let better = match &best {
                None => true,
                Some(current) => {
                    candidate.fields_matched > current.fields_matched
                        || (candidate.fields_matched == current.fields_matched
                            && candidate.errors.len() < current.errors.len())
                }
            };
            if better {
                best = Some(candidate);
            }
        }
        best
    }
}

fn apply_template(template: &Template, content: &str) -> Option<TemplateMatch> {
    if !template.anchors().iter().all(|a| a.is_match(content)) {
        return None;
    }

    let mut response = WhoisResponse::new(template.kind());
    response.status = template.status().unwrap_or(WhoisStatus::Unknown);

    let mut fields_matched = template.anchors().len();
    let mut values = Vec::new();
    let mut errors = Vec::new();

    for rule in template.rules() {
        for caps in rule.pattern.captures_iter(content) {
            let Some(value) = caps.get(1).map(|m| m.as_str().trim()) else {
                continue;
            };
            if value.is_empty() || value.eq_ignore_ascii_case("redacted") {
                continue;
            }

            match apply_field(&mut response, rule.field, value) {
                Ok(true) => {
                    fields_matched += 1;
                    values.push((rule.field, value.to_string()));
                }
                Ok(false) => {}
                Err(e) => errors.push(e),
            }

            if !rule.field.is_multi_valued() {
                break;
            }
        }
    }

    if fields_matched == 0 {
        return None;
    }

    Some(TemplateMatch {
        template_name: template.name().to_string(),
        response,
        values,
        fields_matched,
        errors,
    })
}

/// Stores `value` in the record. `Ok(false)` means the value was a duplicate
/// or the record kind has no slot for it.
fn apply_field(
    response: &mut WhoisResponse,
    field: Field,
    value: &str,
) -> std::result::Result<bool, String> {
    match field {
        Field::WhoisServer => {
            let host = referral_host(value)
                .ok_or_else(|| format!("invalid WHOIS server '{}'", value))?;
            Ok(set_once(&mut registrar(response).whois_server, host))
        }
        Field::RegistrarName => Ok(set_once(&mut registrar(response).name, value.to_string())),
        Field::RegistrarIanaId => Ok(set_once(&mut registrar(response).iana_id, value.to_string())),
        Field::RegistrarUrl => Ok(set_once(&mut registrar(response).url, value.to_string())),
        Field::RegistrarAbuseEmail => Ok(set_once(
            &mut registrar(response).abuse_email,
            value.to_string(),
        )),
        // Kept only in the match values; the fixups decide where it goes.
        Field::SharedContact(_) => Ok(true),
        Field::Network
        | Field::NetworkRange
        | Field::NetworkName
        | Field::NetworkHandle
        | Field::NetworkOrganization => apply_network_field(&mut response.record, field, value),
        _ => apply_domain_field(&mut response.record, field, value),
    }
}

fn apply_domain_field(
    record: &mut WhoisRecord,
    field: Field,
    value: &str,
) -> std::result::Result<bool, String> {
    let WhoisRecord::Domain(domain) = record else {
        return Ok(false);
    };

    let applied = match field {
        Field::DomainName => {
            let host = HostName::parse(value).map_err(|e| e.to_string())?;
            set_once(&mut domain.domain_name, host)
        }
        Field::RegistryDomainId => set_once(&mut domain.registry_domain_id, value.to_string()),
        Field::DomainStatus => {
            // Drop the trailing ICANN explanation URL
            let status = value.split_whitespace().next().unwrap_or(value).to_string();
            push_unique(&mut domain.domain_status, status)
        }
        Field::Registered => set_once(&mut domain.registered, date(value)?),
        Field::Updated => set_once(&mut domain.updated, date(value)?),
        Field::Expiration => set_once(&mut domain.expiration, date(value)?),
        Field::NameServer => {
            let ns = value
                .split_whitespace()
                .next()
                .unwrap_or(value)
                .trim_end_matches('.')
                .to_lowercase();
            push_unique(&mut domain.name_servers, ns)
        }
        Field::Remarks => set_once(&mut domain.remarks, value.to_string()),
        Field::DnsSec => set_once(&mut domain.dnssec, value.to_string()),
        Field::Contact(role, contact_field) => {
            let slot = match role {
                ContactRole::Registrant => &mut domain.registrant,
                ContactRole::Admin => &mut domain.admin_contact,
                ContactRole::Technical => &mut domain.technical_contact,
                ContactRole::Billing => &mut domain.billing_contact,
                ContactRole::Zone => &mut domain.zone_contact,
            };
            set_contact_field(slot.get_or_insert_with(Contact::default), contact_field, value)
        }
        _ => false,
    };
    Ok(applied)
}

fn apply_network_field(
    record: &mut WhoisRecord,
    field: Field,
    value: &str,
) -> std::result::Result<bool, String> {
    let WhoisRecord::Network(network) = record else {
        return Ok(false);
    };

    let applied = match field {
        Field::Network => {
            let mut added = false;
            for cidr in value.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                added |= push_unique(&mut network.networks, cidr.to_string());
            }
            added
        }
        Field::NetworkRange => set_once(&mut network.range, value.to_string()),
        Field::NetworkName => set_once(&mut network.name, value.to_string()),
        Field::NetworkHandle => set_once(&mut network.handle, value.to_string()),
        Field::NetworkOrganization => set_once(&mut network.organization, value.to_string()),
        _ => false,
    };
    Ok(applied)
}

pub(crate) fn set_contact_field(contact: &mut Contact, field: ContactField, value: &str) -> bool {
    match field {
        ContactField::Name => set_once(&mut contact.name, value.to_string()),
        ContactField::Organization => set_once(&mut contact.organization, value.to_string()),
        ContactField::Email => set_once(&mut contact.email, value.to_string()),
        ContactField::Telephone => set_once(&mut contact.telephone, value.to_string()),
        ContactField::Address => {
            contact.address.push(value.to_string());
            true
        }
    }
}

fn registrar(response: &mut WhoisResponse) -> &mut Registrar {
    response.registrar.get_or_insert_with(Registrar::default)
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}

fn push_unique(list: &mut Vec<String>, value: String) -> bool {
    if value.is_empty() || list.contains(&value) {
        return false;
    }
    list.push(value);
    true
}

/// Extracts the host from referral values such as `whois://whois.arin.net`
/// or `rwhois.example.net:4321`.
fn referral_host(value: &str) -> Option<HostName> {
    let stripped = value
        .split("://")
        .last()
        .unwrap_or(value)
        .split('/')
        .next()
        .unwrap_or(value);
    HostName::parse(stripped).ok().or_else(|| match stripped.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => HostName::parse(host).ok(),
        _ => None,
    })
}

fn date(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_date(value).ok_or_else(|| format!("unrecognized date '{}'", value))
}

pub(crate) fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let formats = [
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d",
        "%d-%b-%Y",
        "%d-%B-%Y",
        "%Y.%m.%d",
        "%Y/%m/%d",
        "%d.%m.%Y",
        "%d/%m/%Y",
        "%b %d %Y",
    ];

    let cleaned = date_str
        .trim()
        .replace(" (UTC)", "")
        .replace(" UTC", "Z")
        .replace(" +0000", "Z");

    if let Ok(dt) = DateTime::parse_from_str(&cleaned, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in &formats {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt.and_utc());
        }
        if let Ok(d) = chrono::NaiveDate::parse_from_str(&cleaned, fmt) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    cleaned.parse::<DateTime<Utc>>().ok()
}
