//! Templates compiled into the crate.
//!
//! Server groups cover the two registries the engine always talks to
//! (`whois.iana.org`, `whois.arin.net`). The `generic` and `tld` groups hold
//! the catch-all templates used for every other server.

use tracing::warn;

use crate::parse::template::{
    ContactField, ContactRole, Field, Template, TemplateBuilder, TemplateSource, CATCH_ALL_TAG,
};
use crate::response::{RecordKind, WhoisStatus};

pub const IANA_SERVER: &str = "whois.iana.org";
pub const ARIN_SERVER: &str = "whois.arin.net";

/// The built-in [`TemplateSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl BuiltinTemplates {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateSource for BuiltinTemplates {
    fn templates(&self, group: &str) -> Vec<Template> {
        let builders = match group.to_ascii_lowercase().as_str() {
            IANA_SERVER => iana(),
            ARIN_SERVER => arin(),
            "generic" => generic(),
            "tld" => tld(),
            _ => Vec::new(),
        };

        builders
            .into_iter()
            .filter_map(|builder| match builder.build() {
                Ok(template) => Some(template),
                Err(e) => {
                    warn!(group = group, error = %e, "Skipping built-in template");
                    None
                }
            })
            .collect()
    }
}

fn iana() -> Vec<TemplateBuilder> {
    let found = Template::builder("whois.iana.org/Found", RecordKind::Domain)
        .tag(IANA_SERVER)
        .status(WhoisStatus::Found)
        .anchor(r"(?im)^domain:[ \t]+\S")
        .line(Field::DomainName, "domain")
        .line(Field::WhoisServer, "whois")
        .line(Field::WhoisServer, "refer")
        .line(Field::Contact(ContactRole::Registrant, ContactField::Organization), "organisation")
        .line(Field::DomainStatus, "status")
        .line(Field::Registered, "created")
        .line(Field::Updated, "changed")
        .line(Field::NameServer, "nserver")
        .line(Field::Remarks, "remarks");

    // Objects other than TLDs (address blocks, AS numbers) only carry the
    // referral.
    let referral = Template::builder("whois.iana.org/Referral", RecordKind::Domain)
        .tag(IANA_SERVER)
        .status(WhoisStatus::Found)
        .line(Field::WhoisServer, "refer")
        .line(Field::Updated, "changed");

    let not_found = Template::builder("whois.iana.org/NotFound", RecordKind::Domain)
        .tag(IANA_SERVER)
        .status(WhoisStatus::NotFound)
        .anchor(r"(?im)^%.*returned 0 objects")
        .field(Field::Remarks, r"(?im)^%[ \t]*(This query returned 0 objects.*?)\r?$");

    vec![found, referral, not_found]
}

fn arin() -> Vec<TemplateBuilder> {
    let found = Template::builder("whois.arin.net/Found", RecordKind::Network)
        .tag(ARIN_SERVER)
        .status(WhoisStatus::Found)
        .anchor(r"(?im)^NetRange:[ \t]+\S")
        .line(Field::NetworkRange, "NetRange")
        .line(Field::Network, "CIDR")
        .line(Field::NetworkName, "NetName")
        .line(Field::NetworkHandle, "NetHandle")
        .line(Field::NetworkOrganization, "Organization")
        .line(Field::NetworkOrganization, "OrgName")
        .line(Field::WhoisServer, "ReferralServer");

    let not_found = Template::builder("whois.arin.net/NotFound", RecordKind::Network)
        .tag(ARIN_SERVER)
        .status(WhoisStatus::NotFound)
        .anchor(r"(?im)^No match found for");

    vec![found, not_found]
}

fn generic() -> Vec<TemplateBuilder> {
    let mut found = Template::builder("generic/Found", RecordKind::Domain)
        .tag(CATCH_ALL_TAG)
        .status(WhoisStatus::Found)
        .anchor(r"(?im)^[ \t]*(domain name|domain):[ \t]*\S");

    let lines: &[(Field, &[&str])] = &[
        (Field::DomainName, &["Domain Name", "Domain"]),
        (Field::RegistryDomainId, &["Registry Domain ID", "ROID"]),
        (
            Field::WhoisServer,
            &["Registrar WHOIS Server", "Whois Server", "WHOIS Server"],
        ),
        (Field::RegistrarName, &["Registrar", "Registrar Name", "Sponsoring Registrar"]),
        (Field::RegistrarIanaId, &["Registrar IANA ID"]),
        (Field::RegistrarUrl, &["Registrar URL", "Referral URL"]),
        (Field::RegistrarAbuseEmail, &["Registrar Abuse Contact Email"]),
        (
            Field::Registered,
            &["Creation Date", "Created Date", "Created On", "Created", "Registration Date", "Registration Time", "Registered"],
        ),
        (
            Field::Updated,
            &["Updated Date", "Last Updated On", "Last Modified", "Last Updated", "Changed", "Modified"],
        ),
        (
            Field::Expiration,
            &[
                "Registry Expiry Date",
                "Registrar Registration Expiration Date",
                "Expiration Date",
                "Expiry Date",
                "Expires On",
                "Expiration Time",
                "paid-till",
                "Expires",
            ],
        ),
        (Field::NameServer, &["Name Server", "Nameserver", "Nameservers", "nserver"]),
        (Field::DomainStatus, &["Domain Status", "Status", "state"]),
        (Field::DnsSec, &["DNSSEC"]),
        (Field::Contact(ContactRole::Registrant, ContactField::Name), &["Registrant Name", "Registrant"]),
        (
            Field::Contact(ContactRole::Registrant, ContactField::Organization),
            &["Registrant Organization", "Registrant Organisation", "org"],
        ),
        (Field::Contact(ContactRole::Registrant, ContactField::Email), &["Registrant Email"]),
        (Field::Contact(ContactRole::Registrant, ContactField::Telephone), &["Registrant Phone"]),
        (Field::Contact(ContactRole::Registrant, ContactField::Address), &["Registrant Street"]),
        (Field::Contact(ContactRole::Admin, ContactField::Name), &["Admin Name"]),
        (Field::Contact(ContactRole::Admin, ContactField::Organization), &["Admin Organization"]),
        (Field::Contact(ContactRole::Admin, ContactField::Email), &["Admin Email"]),
        (Field::Contact(ContactRole::Admin, ContactField::Telephone), &["Admin Phone"]),
        (Field::Contact(ContactRole::Technical, ContactField::Name), &["Tech Name"]),
        (Field::Contact(ContactRole::Technical, ContactField::Organization), &["Tech Organization"]),
        (Field::Contact(ContactRole::Technical, ContactField::Email), &["Tech Email"]),
        (Field::Contact(ContactRole::Technical, ContactField::Telephone), &["Tech Phone"]),
        (Field::Contact(ContactRole::Billing, ContactField::Name), &["Billing Name"]),
        (Field::Contact(ContactRole::Billing, ContactField::Email), &["Billing Email"]),
        (Field::Contact(ContactRole::Zone, ContactField::Name), &["Zone Name"]),
        (Field::Contact(ContactRole::Zone, ContactField::Email), &["Zone Email"]),
        (Field::SharedContact(ContactField::Name), &["Contact Name"]),
        (Field::SharedContact(ContactField::Organization), &["Contact Organization"]),
        (Field::SharedContact(ContactField::Email), &["Contact Email"]),
        (Field::SharedContact(ContactField::Telephone), &["Contact Phone"]),
    ];

    for (field, labels) in lines {
        for label in labels.iter() {
            found = found.line(*field, label);
        }
    }

    vec![found]
}

fn tld() -> Vec<TemplateBuilder> {
    let not_found = Template::builder("tld/NotFound", RecordKind::Domain)
        .tag(CATCH_ALL_TAG)
        .status(WhoisStatus::NotFound)
        .anchor(
            r"(?im)^[ \t]*(%[ \t]*)?(no match|not found|no data found|no entries found|no object found|object does not exist|domain not found|status:[ \t]*(free|available))",
        )
        .field(Field::DomainName, r#"(?im)^[ \t]*no match for[ \t]+"?([^"\s]+?)"?\.?\r?$"#);

    let throttled = Template::builder("tld/Throttled", RecordKind::Domain)
        .tag(CATCH_ALL_TAG)
        .status(WhoisStatus::Throttled)
        .anchor(r"(?i)(rate limit|query limit|too many (requests|queries)|exceeded.{0,40}(quota|limit))");

    vec![not_found, throttled]
}
