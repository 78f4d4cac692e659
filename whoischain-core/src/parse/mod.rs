//! Turning raw WHOIS text into structured records.
//!
//! [`WhoisParser`] loads templates for a server on first use, matches the
//! response against them (falling back to the catch-all templates), runs the
//! fixups and stamps the match diagnostics onto the record.

mod fixups;
mod matcher;
mod status;
mod template;
mod templates;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::hostname::HostName;
use crate::response::{RecordKind, WhoisResponse};

pub use fixups::{Fixup, IsocOrgIlFixup, MultipleContactFixup};
pub use matcher::{RegexMatcher, TemplateMatch, TemplateMatcher};
pub use status::derive_status;
pub use template::{
    ContactField, ContactRole, Field, FieldRule, Template, TemplateBuilder, TemplateSource,
    CATCH_ALL_TAG,
};
pub use templates::{BuiltinTemplates, ARIN_SERVER, IANA_SERVER};

/// Template groups that make up the catch-all set.
const CATCH_ALL_GROUPS: [&str; 2] = ["generic", "tld"];

static SHARED_PARSER: Lazy<Arc<WhoisParser>> = Lazy::new(|| Arc::new(WhoisParser::new()));

pub struct WhoisParser {
    matcher: Arc<dyn TemplateMatcher>,
    source: Arc<dyn TemplateSource>,
    fixups: Vec<Box<dyn Fixup>>,
    loaded: Mutex<HashSet<String>>,
}

impl Default for WhoisParser {
    fn default() -> Self {
        Self::new()
    }
}

impl WhoisParser {
    /// A parser over the built-in templates with the default fixups.
    pub fn new() -> Self {
        Self::with_components(Arc::new(RegexMatcher::new()), Arc::new(BuiltinTemplates))
            .with_fixup(MultipleContactFixup)
            .with_fixup(IsocOrgIlFixup)
    }

    /// A process-wide parser for callers that want every engine to share
    /// one template registry; engines do not use it unless handed it.
    pub fn shared() -> Arc<WhoisParser> {
        SHARED_PARSER.clone()
    }

    /// A parser without fixups over the given matcher and template source.
    pub fn with_components(
        matcher: Arc<dyn TemplateMatcher>,
        source: Arc<dyn TemplateSource>,
    ) -> Self {
        Self {
            matcher,
            source,
            fixups: Vec::new(),
            loaded: Mutex::new(HashSet::new()),
        }
    }

    /// Appends a fixup; fixups run in the order they were added.
    pub fn with_fixup(mut self, fixup: impl Fixup + 'static) -> Self {
        self.fixups.push(Box::new(fixup));
        self
    }

    /// Registers an extra template directly with the matcher.
    pub fn add_template(&self, template: Template) {
        self.matcher.register(template);
    }

    /// Number of templates registered so far.
    pub fn template_count(&self) -> usize {
        self.matcher.template_count()
    }

    /// Parses `content` returned by `server` into a record of `kind`.
    ///
    /// Returns `None` when neither the server's templates nor the catch-all
    /// templates match.
    pub fn parse(&self, server: &HostName, content: &str, kind: RecordKind) -> Option<WhoisResponse> {
        self.load_group(server.as_str());

        let mut matched = self.matcher.best_match(content, &[server.as_str()], kind);
        if matched.is_none() {
            for group in CATCH_ALL_GROUPS {
                self.load_group(group);
            }
            matched = self.matcher.best_match(content, &[CATCH_ALL_TAG], kind);
        }

        let Some(mut matched) = matched else {
            debug!(server = %server, "No template matched");
            return None;
        };

        for fixup in &self.fixups {
            if fixup.can_fixup(server, &matched) {
                fixup.fixup(&mut matched);
            }
        }

        let mut response = matched.response;
        response.content = Some(content.to_string());
        response.fields_parsed = matched.fields_matched;
        response.parsing_errors = matched.errors.len();
        response.template_name = Some(matched.template_name);

        if let Some(domain) = response.domain() {
            let first = domain.domain_status.first().map(String::as_str);
            response.status = derive_status(first, response.status);
        }

        debug!(
            server = %server,
            template = response.template_name.as_deref().unwrap_or_default(),
            fields = response.fields_parsed,
            errors = response.parsing_errors,
            status = %response.status,
            "Parsed WHOIS response"
        );
        Some(response)
    }

    /// Registers the templates of `group` unless that already happened.
    fn load_group(&self, group: &str) {
        let key = group.to_ascii_lowercase();
        let mut loaded = self.loaded.lock().unwrap_or_else(|poisoned| {
            warn!("Template registry lock poisoned, recovering");
            poisoned.into_inner()
        });
        if !loaded.insert(key) {
            return;
        }

        let templates = self.source.templates(group);
        debug!(group = group, count = templates.len(), "Loading templates");
        for template in templates {
            self.matcher.register(template);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::WhoisStatus;
    use crate::testing::fixtures;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn host(name: &str) -> HostName {
        HostName::parse(name).unwrap()
    }

    /// Counts how often each group is requested.
    struct CountingSource {
        calls: AtomicUsize,
    }

    impl TemplateSource for CountingSource {
        fn templates(&self, group: &str) -> Vec<Template> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            BuiltinTemplates.templates(group)
        }
    }

    #[test]
    fn test_parse_stamps_diagnostics() {
        let parser = WhoisParser::new();
        let response = parser
            .parse(&host("whois.iana.org"), fixtures::IANA_COM, RecordKind::Domain)
            .unwrap();

        assert_eq!(response.template_name.as_deref(), Some("whois.iana.org/Found"));
        assert_eq!(response.content.as_deref(), Some(fixtures::IANA_COM));
        assert!(response.fields_parsed > 5);
        assert_eq!(response.parsing_errors, 0);
        assert_eq!(response.status, WhoisStatus::Found);
    }

    #[test]
    fn test_falls_back_to_catch_all() {
        let parser = WhoisParser::new();
        let response = parser
            .parse(
                &host("whois.markmonitor.com"),
                fixtures::MARKMONITOR_GOOGLE_COM,
                RecordKind::Domain,
            )
            .unwrap();

        assert_eq!(response.template_name.as_deref(), Some("generic/Found"));
        assert_eq!(response.domain_name().unwrap().as_str(), "google.com");
        assert_eq!(response.status, WhoisStatus::Found);
    }

    #[test]
    fn test_not_found_status_survives_derivation() {
        let parser = WhoisParser::new();
        let response = parser
            .parse(
                &host("whois.verisign-grs.com"),
                fixtures::VERISIGN_NO_MATCH,
                RecordKind::Domain,
            )
            .unwrap();
        assert_eq!(response.status, WhoisStatus::NotFound);
    }

    #[test]
    fn test_no_match_returns_none() {
        let parser = WhoisParser::new();
        assert!(parser
            .parse(&host("whois.example.net"), "nothing useful here\n", RecordKind::Domain)
            .is_none());
        assert!(parser
            .parse(&host("whois.arin.net"), fixtures::IANA_COM, RecordKind::Network)
            .is_none());
    }

    #[test]
    fn test_templates_load_once() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let parser = WhoisParser::with_components(Arc::new(RegexMatcher::new()), source.clone());
        let server = host("whois.markmonitor.com");

        parser.parse(&server, fixtures::MARKMONITOR_GOOGLE_COM, RecordKind::Domain);
        let count = parser.template_count();
        let calls = source.calls.load(Ordering::SeqCst);

        parser.parse(&server, fixtures::MARKMONITOR_GOOGLE_COM, RecordKind::Domain);
        parser.parse(&server, fixtures::MARKMONITOR_GOOGLE_COM, RecordKind::Domain);

        assert_eq!(count, 3);
        assert_eq!(parser.template_count(), count);
        // the server group plus the two catch-all groups
        assert_eq!(calls, 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn test_shared_parser_is_one_instance() {
        assert!(Arc::ptr_eq(&WhoisParser::shared(), &WhoisParser::shared()));
    }

    #[test]
    fn test_fixups_run_in_order() {
        struct Tag(&'static str);

        impl Fixup for Tag {
            fn can_fixup(&self, _server: &HostName, _matched: &TemplateMatch) -> bool {
                true
            }

            fn fixup(&self, matched: &mut TemplateMatch) {
                matched.template_name.push_str(self.0);
            }
        }

        let parser = WhoisParser::new().with_fixup(Tag("+a")).with_fixup(Tag("+b"));
        let response = parser
            .parse(&host("whois.iana.org"), fixtures::IANA_COM, RecordKind::Domain)
            .unwrap();
        assert_eq!(response.template_name.as_deref(), Some("whois.iana.org/Found+a+b"));
    }
}
