//! Post-match corrections for registries whose output the templates cannot
//! express directly.

use crate::hostname::HostName;
use crate::parse::matcher::{set_contact_field, TemplateMatch};
use crate::parse::template::{ContactField, Field};
use crate::response::Contact;

/// A correction applied to a template match before it is returned.
pub trait Fixup: Send + Sync {
    fn can_fixup(&self, server: &HostName, matched: &TemplateMatch) -> bool;

    fn fixup(&self, matched: &mut TemplateMatch);
}

/// Copies a contact published once for all roles into every admin,
/// technical and billing slot that is still empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipleContactFixup;

const SHARED_FIELDS: [ContactField; 5] = [
    ContactField::Name,
    ContactField::Organization,
    ContactField::Email,
    ContactField::Telephone,
    ContactField::Address,
];

impl Fixup for MultipleContactFixup {
    fn can_fixup(&self, _server: &HostName, matched: &TemplateMatch) -> bool {
        matched.response.domain().is_some()
            && matched
                .values
                .iter()
                .any(|(field, _)| matches!(field, Field::SharedContact(_)))
    }

    fn fixup(&self, matched: &mut TemplateMatch) {
        let mut shared = Contact::default();
        for field in SHARED_FIELDS {
            for value in matched.values_of(Field::SharedContact(field)) {
                set_contact_field(&mut shared, field, value);
            }
        }
        if shared.is_empty() {
            return;
        }

        let Some(domain) = matched.response.domain_mut() else {
            return;
        };
        for slot in [
            &mut domain.admin_contact,
            &mut domain.technical_contact,
            &mut domain.billing_contact,
        ] {
            if slot.as_ref().map_or(true, Contact::is_empty) {
                *slot = Some(shared.clone());
            }
        }
    }
}

/// `whois.isoc.org.il` reports statuses as phrases ("Transfer Locked");
/// folds each into a single code (`transferLocked`).
#[derive(Debug, Clone, Copy, Default)]
pub struct IsocOrgIlFixup;

const ISOC_ORG_IL: &str = "whois.isoc.org.il";

impl Fixup for IsocOrgIlFixup {
    fn can_fixup(&self, server: &HostName, matched: &TemplateMatch) -> bool {
        *server == ISOC_ORG_IL
            && matched.response.domain().is_some()
            && matched.values_of(Field::DomainStatus).next().is_some()
    }

    fn fixup(&self, matched: &mut TemplateMatch) {
        let statuses: Vec<String> = matched
            .values_of(Field::DomainStatus)
            .map(camel_case)
            .filter(|s| !s.is_empty())
            .collect();

        if let Some(domain) = matched.response.domain_mut() {
            domain.domain_status.clear();
            for status in statuses {
                if !domain.domain_status.contains(&status) {
                    domain.domain_status.push(status);
                }
            }
        }
    }
}

fn camel_case(phrase: &str) -> String {
    let mut out = String::with_capacity(phrase.len());
    for (i, word) in phrase.split_whitespace().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{RecordKind, WhoisResponse};

    fn host(name: &str) -> HostName {
        HostName::parse(name).unwrap()
    }

    fn domain_match(values: Vec<(Field, &str)>) -> TemplateMatch {
        TemplateMatch {
            template_name: "test".to_string(),
            response: WhoisResponse::new(RecordKind::Domain),
            values: values.into_iter().map(|(f, v)| (f, v.to_string())).collect(),
            fields_matched: 0,
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_shared_contact_fills_empty_roles() {
        let mut matched = domain_match(vec![
            (Field::SharedContact(ContactField::Name), "Hostmaster"),
            (Field::SharedContact(ContactField::Email), "hostmaster@example.net"),
        ]);
        matched.response.domain_mut().unwrap().technical_contact = Some(Contact {
            name: Some("NOC".to_string()),
            ..Contact::default()
        });

        let fixup = MultipleContactFixup;
        assert!(fixup.can_fixup(&host("whois.example.net"), &matched));
        fixup.fixup(&mut matched);

        let domain = matched.response.domain().unwrap();
        let admin = domain.admin_contact.as_ref().unwrap();
        assert_eq!(admin.name.as_deref(), Some("Hostmaster"));
        assert_eq!(admin.email.as_deref(), Some("hostmaster@example.net"));
        assert_eq!(domain.billing_contact, domain.admin_contact);
        assert_eq!(
            domain.technical_contact.as_ref().unwrap().name.as_deref(),
            Some("NOC")
        );
        assert!(domain.registrant.is_none());
    }

    #[test]
    fn test_shared_contact_needs_values() {
        let matched = domain_match(vec![(Field::DomainName, "example.net")]);
        assert!(!MultipleContactFixup.can_fixup(&host("whois.example.net"), &matched));
    }

    #[test]
    fn test_isoc_statuses_are_folded() {
        let mut matched = domain_match(vec![
            (Field::DomainStatus, "Transfer Locked"),
            (Field::DomainStatus, "Transfer Allowed"),
        ]);
        matched.response.domain_mut().unwrap().domain_status = vec!["Transfer".to_string()];

        let fixup = IsocOrgIlFixup;
        assert!(!fixup.can_fixup(&host("whois.example.net"), &matched));
        assert!(fixup.can_fixup(&host("WHOIS.ISOC.ORG.IL"), &matched));

        fixup.fixup(&mut matched);
        assert_eq!(
            matched.response.domain().unwrap().domain_status,
            vec!["transferLocked", "transferAllowed"]
        );
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("Transfer Locked"), "transferLocked");
        assert_eq!(camel_case("  active  "), "active");
        assert_eq!(camel_case("NOT FOUND here"), "notFoundHere");
    }
}
