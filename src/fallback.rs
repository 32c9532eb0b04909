//! Regex-based best-effort extraction for content no namespace profile
//! could parse.

use crate::types::{ErrorHandler, ExtractionResult, MappingEntity, Participant};
use regex::Regex;
use std::sync::OnceLock;

fn name_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<[^>]+name="([^"]+)""#).expect("valid regex"))
}

fn connection_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)<(sender|receiver).*?type="([^"]+)""#).expect("valid regex"))
}

fn adapter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)<adapter-specific.*?type="([^"]+)""#).expect("valid regex"))
}

fn mapping_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?s)<mapping.*?type="([^"]+)""#).expect("valid regex"))
}

fn error_subprocess_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<[^>]*subProcess[^>]*>.*?<[^>]*errorEvent").expect("valid regex")
    })
}

/// Recover whatever structure loose pattern matching can find in raw text
pub fn extract_with_regex(content: &str, result: &mut ExtractionResult) {
    if let Some(captures) = name_attr_re().captures(content) {
        result.artifact_name = captures[1].to_string();
    }

    for captures in connection_re().captures_iter(content) {
        let entry = Participant {
            name: captures[1].to_string(),
            adapter_type: Some(captures[2].to_string()),
            properties: Vec::new(),
        };
        if captures[1].eq_ignore_ascii_case("sender") {
            result.senders.push(entry);
        } else {
            result.receivers.push(entry);
        }
    }

    for captures in adapter_re().captures_iter(content) {
        let adapter = captures[1].to_string();
        if !result.adapters_used.contains(&adapter) {
            result.adapters_used.push(adapter);
        }
    }

    for captures in mapping_re().captures_iter(content) {
        let name = captures[1].to_string();
        if !result.mapping_entities.iter().any(|m| m.name == name) {
            result.mapping_entities.push(MappingEntity {
                name,
                uri: "Not specified".to_string(),
                properties: Vec::new(),
            });
        }
    }

    if content.contains("<error-handling") {
        result
            .error_handling
            .push(ErrorHandler::detail("Basic error handling configured"));
    }
    if content.contains("<dead-letter-queue") {
        result
            .error_handling
            .push(ErrorHandler::detail("Dead letter queue configured"));
    }
    if error_subprocess_re().is_match(content) {
        result
            .error_handling
            .push(ErrorHandler::detail("Error handling subprocess detected"));
        result.has_proper_error_handling = true;
    }
}
