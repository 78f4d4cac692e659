use chrono::{DateTime, Utc};
use colored::Colorize;

use super::OutputFormatter;
use crate::bulk::BulkResult;
use crate::response::{WhoisRecord, WhoisResponse, WhoisStatus};

pub struct HumanFormatter {
    use_colors: bool,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn label(&self, text: &str) -> String {
        if self.use_colors {
            text.cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn value(&self, text: &str) -> String {
        if self.use_colors {
            text.white().to_string()
        } else {
            text.to_string()
        }
    }

    fn success(&self, text: &str) -> String {
        if self.use_colors {
            text.green().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.use_colors {
            text.yellow().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn error(&self, text: &str) -> String {
        if self.use_colors {
            text.red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        if self.use_colors {
            format!("\n{}\n{}", text.magenta().bold(), "─".repeat(text.chars().count()).dimmed())
        } else {
            format!("\n{}\n{}", text, "-".repeat(text.chars().count()))
        }
    }

    fn status(&self, status: WhoisStatus) -> String {
        let text = status.to_string();
        match status {
            WhoisStatus::Found => self.success(&text),
            WhoisStatus::NotFound | WhoisStatus::Reserved | WhoisStatus::Limited => self.warning(&text),
            WhoisStatus::Throttled | WhoisStatus::Error => self.error(&text),
            WhoisStatus::Unknown => self.value(&text),
        }
    }

    fn field(&self, output: &mut Vec<String>, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            output.push(format!("  {}: {}", self.label(name), self.value(value)));
        }
    }

    fn list(&self, output: &mut Vec<String>, name: &str, values: &[String]) {
        if values.is_empty() {
            return;
        }
        output.push(format!("  {}:", self.label(name)));
        for value in values {
            output.push(format!("    - {}", self.value(value)));
        }
    }

    fn date(&self, output: &mut Vec<String>, name: &str, date: Option<DateTime<Utc>>) {
        let formatted = date.map(|d| d.format("%Y-%m-%d").to_string());
        self.field(output, name, formatted.as_deref());
    }

    fn expiry(&self, output: &mut Vec<String>, expires: DateTime<Utc>) {
        let days_until = (expires - Utc::now()).num_days();
        let expiry_str = expires.format("%Y-%m-%d").to_string();
        let text = if days_until < 30 {
            self.error(&format!("{} (expires in {} days!)", expiry_str, days_until))
        } else if days_until < 90 {
            self.warning(&format!("{} ({} days)", expiry_str, days_until))
        } else {
            self.value(&format!("{} ({} days)", expiry_str, days_until))
        };
        output.push(format!("  {}: {}", self.label("Expires"), text));
    }

    fn title(response: &WhoisResponse) -> String {
        match &response.record {
            WhoisRecord::Domain(domain) => domain
                .domain_name
                .as_ref()
                .map(|name| name.to_unicode())
                .unwrap_or_else(|| "unknown domain".to_string()),
            WhoisRecord::Network(network) => network
                .range
                .clone()
                .or_else(|| network.networks.first().cloned())
                .unwrap_or_else(|| "unknown network".to_string()),
            WhoisRecord::Generic => "response".to_string(),
        }
    }

    fn record(&self, output: &mut Vec<String>, response: &WhoisResponse) {
        match &response.record {
            WhoisRecord::Domain(domain) => {
                if let Some(registrar) = &response.registrar {
                    self.field(output, "Registrar", registrar.name.as_deref());
                    self.field(output, "Registrar URL", registrar.url.as_deref());
                    self.field(output, "Abuse Email", registrar.abuse_email.as_deref());
                }
                let registrant = domain
                    .registrant
                    .as_ref()
                    .and_then(|c| c.organization.as_deref().or(c.name.as_deref()));
                self.field(output, "Registrant", registrant);
                self.date(output, "Created", domain.registered);
                if let Some(expires) = domain.expiration {
                    self.expiry(output, expires);
                }
                self.date(output, "Updated", domain.updated);
                self.list(output, "Nameservers", &domain.name_servers);
                self.list(output, "Domain Status", &domain.domain_status);
                self.field(output, "DNSSEC", domain.dnssec.as_deref());
            }
            WhoisRecord::Network(network) => {
                self.field(output, "Range", network.range.as_deref());
                self.list(output, "CIDR", &network.networks);
                self.field(output, "Name", network.name.as_deref());
                self.field(output, "Handle", network.handle.as_deref());
                self.field(output, "Organization", network.organization.as_deref());
            }
            WhoisRecord::Generic => {}
        }
    }

    fn chain(&self, output: &mut Vec<String>, response: &WhoisResponse) {
        let mut records: Vec<&WhoisResponse> = response.chain().collect();
        records.reverse();

        output.push(format!("\n  {}:", self.label("Referral chain")));
        for (i, record) in records.iter().enumerate() {
            let queried = record
                .referrer()
                .and_then(|r| r.whois_server())
                .map(|s| s.to_string())
                .unwrap_or_else(|| "root server".to_string());
            let refers = record
                .whois_server()
                .map(|s| format!(" -> {}", s))
                .unwrap_or_default();
            let template = record
                .template_name
                .as_deref()
                .map(|t| format!(" [{}]", t))
                .unwrap_or_default();
            output.push(format!(
                "    {}. {} ({}){}{}",
                i + 1,
                self.value(&queried),
                self.status(record.status),
                refers,
                template
            ));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_response(&self, response: &WhoisResponse) -> String {
        let mut output = Vec::new();

        output.push(self.header(&format!("WHOIS: {}", Self::title(response))));
        output.push(format!("  {}: {}", self.label("Status"), self.status(response.status)));

        if response.status == WhoisStatus::NotFound {
            output.push(format!("  {} Not registered", self.success("✓")));
        } else {
            self.record(&mut output, response);
        }

        if let Some(template) = &response.template_name {
            output.push(format!(
                "  {}: {} ({} fields, {} errors)",
                self.label("Template"),
                self.value(template),
                response.fields_parsed,
                response.parsing_errors
            ));
        }

        self.chain(&mut output, response);
        output.join("\n")
    }

    fn format_bulk(&self, results: &[BulkResult]) -> String {
        let succeeded = results.iter().filter(|r| r.success).count();
        let mut output = vec![self.header(&format!(
            "Bulk WHOIS: {}/{} succeeded",
            succeeded,
            results.len()
        ))];

        for result in results {
            let line = match (&result.data, &result.error) {
                (Some(response), _) => format!(
                    "  {} {} ({}, {} servers, {}ms)",
                    self.success("✓"),
                    self.value(&result.query),
                    self.status(response.status),
                    response.depth(),
                    result.duration_ms
                ),
                (None, error) => format!(
                    "  {} {}: {}",
                    self.error("✗"),
                    self.value(&result.query),
                    self.error(error.as_deref().unwrap_or("unknown error"))
                ),
            };
            output.push(line);
        }

        output.join("\n")
    }
}
