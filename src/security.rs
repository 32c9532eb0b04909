//! Security-compliance analysis of IFlow content.
//!
//! Authentication facts show up in four independent shapes: a literal
//! `authenticationMethod` value, a `{{parameterized}}` value resolved from a
//! properties file, a per-message-flow override, and bare keyword mentions.
//! Each detector stage below handles one shape and merges partial findings
//! into a single report; no stage is exclusive.

use crate::config::ScanOptions;
use crate::parser::element_properties;
use crate::profiles::profiles;
use crate::properties::PropertyMap;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Outcome of the compliance pass over one definition file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityReport {
    pub detected_methods: Vec<String>,
    pub is_compliant: bool,
    pub issues: Vec<String>,
    pub details: Vec<String>,
}

impl SecurityReport {
    fn new() -> Self {
        Self {
            detected_methods: Vec::new(),
            is_compliant: true,
            issues: Vec::new(),
            details: Vec::new(),
        }
    }

    fn add_method(&mut self, method: String) {
        if !self.detected_methods.contains(&method) {
            self.detected_methods.push(method);
        }
    }

    fn flag_basic(&mut self, issue: String) {
        self.is_compliant = false;
        self.issues.push(issue);
    }
}

fn is_basic(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "basic" | "basic authentication")
}

/// `authenticationMethod` / `authMethod` key-value element spellings
fn direct_auth_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"<key>authentication[mM]ethod</key>\s*<value>([^<]+)</value>",
            r"<key>auth[mM]ethod</key>\s*<value>([^<]+)</value>",
            r#"authentication[mM]ethod\s*=\s*"([^"]+)""#,
            r#"auth[mM]ethod\s*=\s*"([^"]+)""#,
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    })
}

/// Same key positions with a `{{param}}` placeholder value
fn param_auth_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"<key>authentication[mM]ethod</key>\s*<value>\{\{([^}]+)\}\}</value>",
            r"<key>auth[mM]ethod</key>\s*<value>\{\{([^}]+)\}\}</value>",
            r#"authentication[mM]ethod\s*=\s*"\{\{([^}]+)\}\}""#,
            r#"auth[mM]ethod\s*=\s*"\{\{([^}]+)\}\}""#,
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    })
}

fn external_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(https?://|endpoint|url|uri)").expect("valid regex"))
}

/// Run the full compliance pipeline over raw definition content and the
/// resolved property map.
pub fn check_security_compliance(
    content: &str,
    properties: &PropertyMap,
    options: &ScanOptions,
) -> SecurityReport {
    let mut report = SecurityReport::new();

    scan_direct_methods(content, &mut report);
    scan_parameterized_methods(content, properties, &mut report);
    scan_message_flows(content, properties, &mut report);
    scan_keyword_fallback(content, &mut report);
    scan_property_map(properties, &mut report);

    dedup_preserving_order(&mut report.detected_methods);
    dedup_preserving_order(&mut report.issues);
    dedup_preserving_order(&mut report.details);

    apply_endpoint_policy(content, options, &mut report);

    debug!(
        "Security check: methods={:?} compliant={} issues={}",
        report.detected_methods,
        report.is_compliant,
        report.issues.len()
    );

    report
}

/// Stage 1: literal authentication values
fn scan_direct_methods(content: &str, report: &mut SecurityReport) {
    for pattern in direct_auth_patterns() {
        for captures in pattern.captures_iter(content) {
            let method = captures[1].trim();
            // Placeholder values belong to the parameterized stage
            if method.is_empty() || method.starts_with("{{") {
                continue;
            }
            report.add_method(method.to_string());
            if is_basic(method) {
                report.flag_basic(format!("Direct Basic Authentication detected: '{method}'"));
            }
        }
    }
}

/// Stage 2: `{{param}}` values resolved against the property map
fn scan_parameterized_methods(content: &str, properties: &PropertyMap, report: &mut SecurityReport) {
    for pattern in param_auth_patterns() {
        for captures in pattern.captures_iter(content) {
            let param_name = captures[1].trim();
            report
                .details
                .push(format!("Found parameterized authentication: {{{{{param_name}}}}}"));
            resolve_parameter(param_name, properties, report, "");
        }
    }
}

/// Resolve one placeholder; `context` distinguishes message-flow findings
fn resolve_parameter(
    param_name: &str,
    properties: &PropertyMap,
    report: &mut SecurityReport,
    context: &str,
) {
    match properties.resolve(param_name) {
        Some((_, value)) => {
            report.add_method(format!("{value} (from {param_name})"));
            if is_basic(value) {
                report.flag_basic(format!(
                    "Basic Authentication detected via parameter{context}: '{param_name}' = '{value}'"
                ));
            }
        }
        None => {
            report
                .details
                .push(format!("Could not resolve parameter{context}: '{param_name}'"));
        }
    }
}

/// Stage 3: authentication declared per message flow rather than globally
fn scan_message_flows(content: &str, properties: &PropertyMap, report: &mut SecurityReport) {
    let doc = match roxmltree::Document::parse(content) {
        Ok(doc) => doc,
        Err(err) => {
            report
                .details
                .push(format!("XML parsing error during security check: {err}"));
            return;
        }
    };

    for profile in profiles() {
        let flows: Vec<_> = doc
            .descendants()
            .filter(|n| profile.is_bpmn(*n, "messageFlow"))
            .collect();
        if flows.is_empty() {
            continue;
        }

        for flow in flows {
            for prop in element_properties(flow) {
                if prop.key != "authenticationMethod" {
                    continue;
                }
                let value = prop.value.trim();
                if let Some(param_name) = value
                    .strip_prefix("{{")
                    .and_then(|rest| rest.strip_suffix("}}"))
                {
                    let param_name = param_name.trim();
                    report.details.push(format!(
                        "Found parameterized authentication in message flow: {value}"
                    ));
                    resolve_parameter(param_name, properties, report, " in message flow");
                } else if !value.is_empty() {
                    report.add_method(value.to_string());
                    if is_basic(value) {
                        report.flag_basic(format!(
                            "Direct Basic Authentication detected in message flow: '{value}'"
                        ));
                    }
                }
            }
        }
        // First profile that sees message flows wins
        break;
    }
}

/// Stage 4: broad keyword families, only when nothing was detected so far
fn scan_keyword_fallback(content: &str, report: &mut SecurityReport) {
    if !report.detected_methods.is_empty() {
        return;
    }

    const BASIC_KEYWORDS: [&str; 4] =
        ["basicAuthentication", "Basic Authentication", "BasicAuth", "basic_auth"];
    const BASIC_JSON: [&str; 2] = [
        r#""authentication"\s*:\s*"basic""#,
        r#""auth_type"\s*:\s*"basic""#,
    ];
    const OAUTH_KEYWORDS: [&str; 5] =
        ["oauth", "Authorization Code", "Client Credentials", "Bearer", "JWT"];
    const CERT_KEYWORDS: [&str; 4] = ["certificate", "x509", "client cert", "mutual auth"];

    let lowered = content.to_lowercase();

    let basic_found = BASIC_KEYWORDS
        .iter()
        .any(|k| lowered.contains(&k.to_lowercase()))
        || BASIC_JSON.iter().any(|p| {
            Regex::new(&format!("(?i){p}"))
                .map(|re| re.is_match(content))
                .unwrap_or(false)
        });
    if basic_found {
        report.add_method("Basic Authentication (pattern match)".to_string());
        report.flag_basic("Basic Authentication detected via string pattern".to_string());
    }

    if OAUTH_KEYWORDS.iter().any(|k| lowered.contains(&k.to_lowercase())) {
        report.add_method("OAuth (pattern match)".to_string());
    }

    if CERT_KEYWORDS.iter().any(|k| lowered.contains(&k.to_lowercase())) {
        report.add_method("Certificate (pattern match)".to_string());
    }
}

/// Stage 5: property-sourced methods, lower confidence
fn scan_property_map(properties: &PropertyMap, report: &mut SecurityReport) {
    for (key, value) in properties.iter() {
        let key = key.to_lowercase();
        let value = value.to_lowercase();

        if key.contains("authenticationmethod") && value.contains("certificate") {
            report.add_method("Certificate (from property)".to_string());
        }
        if (key.contains("authenticationmethod") || key.contains("auth_type"))
            && value.contains("oauth")
        {
            report.add_method("OAuth (from property)".to_string());
        }
    }
}

/// Stage 6: absence of evidence is a finding when the content looks like it
/// calls out
fn apply_endpoint_policy(content: &str, options: &ScanOptions, report: &mut SecurityReport) {
    if !options.flag_unauthenticated_endpoints {
        return;
    }
    if report.detected_methods.is_empty() && external_call_re().is_match(content) {
        report
            .details
            .push("External API calls detected but no authentication method identified".to_string());
        report
            .issues
            .push("Possible missing authentication for external services".to_string());
        report.is_compliant = false;
    }
}

fn dedup_preserving_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
