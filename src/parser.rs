//! Structural parsing of BPMN/IFL process definitions.
//!
//! Element discovery runs under the ordered namespace-profile list and
//! stops at the first profile that yields a structural signal (any
//! participant or process). Individual extractors are best-effort: an
//! element that does not carry the expected attributes or properties is
//! skipped, never fatal.

use crate::profiles::{profiles, NamespaceProfile};
use crate::types::{
    ConnectionDetail, ErrorHandler, ExtractionResult, KeyStep, MappingEntity, Parameter,
    WorkflowProcess,
};
use roxmltree::{Document, Node};
use tracing::{debug, warn};

/// Flow elements reported as workflow steps, in document order
const STEP_TAGS: [&str; 5] = [
    "startEvent",
    "serviceTask",
    "callActivity",
    "endEvent",
    "subProcess",
];

/// Parse `content` and populate the structural fields of `result`.
///
/// Returns `true` when some namespace profile yielded a structural signal;
/// `false` (XML syntax error, or no profile found anything) means the
/// caller should fall back to regex extraction.
pub fn parse_definition(content: &str, result: &mut ExtractionResult) -> bool {
    let doc = match Document::parse(content) {
        Ok(doc) => doc,
        Err(err) => {
            warn!("XML parsing failed, structural extraction unavailable: {err}");
            result.push_processing_error(format!("XML parse error: {err}"));
            return false;
        }
    };

    for profile in profiles() {
        if !has_structural_signal(&doc, profile) {
            continue;
        }
        debug!("Extracting under namespace profile '{}'", profile.name);

        extract_purpose(&doc, profile, result);
        extract_workflow(&doc, profile, result);
        extract_key_steps(&doc, profile, result);
        extract_adapters(&doc, profile, result);
        extract_participants(&doc, profile, result);
        extract_mappings(&doc, profile, result);
        extract_parameters(&doc, result);
        extract_error_handling(&doc, profile, result);
        extract_connection_details(&doc, profile, result);
        return true;
    }

    debug!("No namespace profile matched any participant or process");
    false
}

/// A profile is considered usable when it can see at least one participant
/// or process element. The dual-namespace profile additionally requires the
/// IFL namespace to actually occur in the document, so content whose
/// extension namespace drifted falls through to the laxer profiles.
fn has_structural_signal(doc: &Document<'_>, profile: &NamespaceProfile) -> bool {
    let has_structure = doc
        .descendants()
        .any(|n| profile.is_bpmn(n, "participant") || profile.is_bpmn(n, "process"));
    if !has_structure {
        return false;
    }

    match profile.ifl_ns {
        Some(ns) => doc.descendants().any(|n| {
            n.tag_name().namespace() == Some(ns)
                || n.attributes().any(|a| a.namespace() == Some(ns))
        }),
        None => true,
    }
}

fn extract_purpose(doc: &Document<'_>, profile: &NamespaceProfile, result: &mut ExtractionResult) {
    let Some(collaboration) = doc
        .descendants()
        .find(|n| profile.is_bpmn(*n, "collaboration"))
    else {
        return;
    };

    let mut purpose = collaboration
        .attribute("name")
        .unwrap_or("Not specified")
        .to_string();

    let process_names: Vec<&str> = doc
        .descendants()
        .filter(|n| profile.is_bpmn(*n, "process"))
        .map(|p| p.attribute("name").unwrap_or(""))
        .collect();
    if !process_names.is_empty() {
        purpose.push_str(&format!(
            " involving processes: {}",
            process_names.join(", ")
        ));
    }

    result.purpose = purpose;
}

fn extract_workflow(doc: &Document<'_>, profile: &NamespaceProfile, result: &mut ExtractionResult) {
    for process in doc.descendants().filter(|n| profile.is_bpmn(*n, "process")) {
        let steps: Vec<String> = process
            .descendants()
            .filter(|n| n.is_element())
            .filter_map(|n| {
                let local = n.tag_name().name();
                if STEP_TAGS.iter().any(|tag| profile.is_bpmn(n, tag)) {
                    Some(n.attribute("name").unwrap_or(local).to_string())
                } else {
                    None
                }
            })
            .collect();

        if !steps.is_empty() {
            result.workflow.push(WorkflowProcess {
                process: process.attribute("name").unwrap_or("Unnamed Process").to_string(),
                steps,
            });
        }
    }
}

fn extract_key_steps(doc: &Document<'_>, profile: &NamespaceProfile, result: &mut ExtractionResult) {
    let tasks = doc
        .descendants()
        .filter(|n| profile.is_bpmn(*n, "serviceTask") || profile.is_bpmn(*n, "callActivity"));

    for task in tasks {
        let properties = element_properties(task);

        let step_type = properties
            .iter()
            .find(|p| {
                matches!(
                    p.key.to_lowercase().as_str(),
                    "activitytype" | "activity_type" | "type"
                )
            })
            .map(|p| p.value.clone())
            .unwrap_or_else(|| task.tag_name().name().to_string());

        result.key_steps.push(KeyStep {
            name: task.attribute("name").unwrap_or("Unnamed Task").to_string(),
            step_type,
            properties,
        });
    }
}

fn extract_adapters(doc: &Document<'_>, profile: &NamespaceProfile, result: &mut ExtractionResult) {
    for flow in doc.descendants().filter(|n| profile.is_bpmn(*n, "messageFlow")) {
        let properties = element_properties(flow);

        let component_type = properties
            .iter()
            .find(|p| matches!(p.key.as_str(), "ComponentType" | "adapterType" | "adapter" | "type"))
            .map(|p| p.value.clone())
            .or_else(|| flow.attribute("type").map(String::from));

        if let Some(component_type) = component_type {
            if !result.adapters_used.contains(&component_type) {
                result.adapters_used.push(component_type);
            }
        }
    }
}

fn extract_participants(
    doc: &Document<'_>,
    profile: &NamespaceProfile,
    result: &mut ExtractionResult,
) {
    for participant in doc.descendants().filter(|n| profile.is_bpmn(*n, "participant")) {
        let name = participant.attribute("name").unwrap_or("Unnamed").to_string();
        let properties = element_properties(participant);

        // Explicit type attribute/property decides first; the name-based
        // heuristic only runs when no type was declared, so a participant
        // can never land in both lists.
        let participant_type = profile
            .ifl_attr(participant, "type")
            .map(String::from)
            .or_else(|| {
                properties
                    .iter()
                    .find(|p| {
                        matches!(
                            p.key.to_lowercase().as_str(),
                            "type" | "participanttype" | "role"
                        )
                    })
                    .map(|p| p.value.clone())
            });

        let entry = crate::types::Participant { name: name.clone(), adapter_type: None, properties };

        match participant_type {
            Some(declared) => {
                let declared = declared.to_lowercase();
                if declared.contains("sender") {
                    result.senders.push(entry);
                } else if declared.contains("receiver") || declared.contains("recevier") {
                    // SAP tooling emits the misspelled "EndpointRecevier" type
                    result.receivers.push(entry);
                }
            }
            None => {
                let has_endpoint = entry.properties.iter().any(|p| {
                    let key = p.key.to_lowercase();
                    key == "address" || key.contains("url")
                });
                if has_endpoint {
                    let lowered = name.to_lowercase();
                    if ["sender", "source", "from"].iter().any(|s| lowered.contains(s)) {
                        result.senders.push(entry);
                    } else if ["receiver", "target", "to", "destination"]
                        .iter()
                        .any(|s| lowered.contains(s))
                    {
                        result.receivers.push(entry);
                    }
                }
            }
        }
    }
}

fn extract_mappings(doc: &Document<'_>, profile: &NamespaceProfile, result: &mut ExtractionResult) {
    for activity in doc.descendants().filter(|n| profile.is_bpmn(*n, "callActivity")) {
        let properties = element_properties(activity);

        let mut mapping_name = None;
        let mut mapping_uri = "Not specified".to_string();
        for p in &properties {
            match p.key.to_lowercase().as_str() {
                "mappingname" | "mapping_name" | "name" => mapping_name = Some(p.value.clone()),
                "mappinguri" | "mapping_uri" | "uri" => mapping_uri = p.value.clone(),
                _ => {}
            }
        }

        if mapping_name.is_none() {
            if let Some(activity_name) = activity.attribute("name") {
                if activity_name.to_lowercase().contains("map") {
                    mapping_name = Some(activity_name.to_string());
                }
            }
        }

        if let Some(name) = mapping_name {
            result.mapping_entities.push(MappingEntity { name, uri: mapping_uri, properties });
        }
    }

    // Direct mapping elements, whichever namespace variant emitted them
    for mapping in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "mapping")
    {
        let properties = element_properties(mapping);

        let mut name = mapping.attribute("name").unwrap_or("Unnamed Mapping").to_string();
        let mut uri = mapping.attribute("uri").unwrap_or("Not specified").to_string();
        for p in &properties {
            match p.key.to_lowercase().as_str() {
                "name" => name = p.value.clone(),
                "uri" => uri = p.value.clone(),
                _ => {}
            }
        }

        result.mapping_entities.push(MappingEntity { name, uri, properties });
    }
}

fn extract_parameters(doc: &Document<'_>, result: &mut ExtractionResult) {
    for prop in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "property")
    {
        if let (Some(key), Some(value)) = (child_text(prop, "key"), child_text(prop, "value")) {
            result.parameters.push(Parameter::new(key, value));
        } else if let (Some(key), Some(value)) = (prop.attribute("key"), prop.attribute("value")) {
            result.parameters.push(Parameter::new(key, value));
        } else if let (Some(key), Some(value)) = (prop.attribute("name"), prop.attribute("value")) {
            result.parameters.push(Parameter::new(key, value));
        }
    }
}

fn extract_error_handling(
    doc: &Document<'_>,
    profile: &NamespaceProfile,
    result: &mut ExtractionResult,
) {
    let mut has_proper = false;

    for subprocess in doc.descendants().filter(|n| profile.is_bpmn(*n, "subProcess")) {
        let name = subprocess.attribute("name").unwrap_or("Unnamed Subprocess");

        let has_error_event = subprocess
            .descendants()
            .any(|n| n.is_element() && n.tag_name().name() == "errorEventDefinition");
        if has_error_event {
            result.error_handling.push(ErrorHandler::subprocess(
                name,
                "Handles errors with error start and end events",
            ));
            has_proper = true;
        }

        for p in element_properties(subprocess) {
            if p.key.eq_ignore_ascii_case("activitytype") && p.value.to_lowercase().contains("error")
            {
                result.error_handling.push(ErrorHandler::subprocess(
                    name,
                    format!("Error handling subprocess: {}", p.value),
                ));
                break;
            }
        }
    }

    for handler in doc.descendants().filter(|n| {
        n.is_element() && matches!(n.tag_name().name(), "errorHandler" | "deadLetterQueue")
    }) {
        result
            .error_handling
            .push(ErrorHandler::detail(format!("{} configured", handler.tag_name().name())));
    }

    // Only an error-event definition counts as proper error handling
    result.has_proper_error_handling = has_proper;

    if result.error_handling.is_empty() {
        result.error_handling.push(ErrorHandler::detail("No error handling detected"));
    } else if !has_proper {
        result.error_handling.push(ErrorHandler::detail(
            "Basic error handling elements found but no proper error subprocesses",
        ));
    }
}

fn extract_connection_details(
    doc: &Document<'_>,
    profile: &NamespaceProfile,
    result: &mut ExtractionResult,
) {
    for flow in doc.descendants().filter(|n| profile.is_bpmn(*n, "messageFlow")) {
        let properties = element_properties(flow);

        let mut connection = ConnectionDetail {
            name: flow.attribute("name").unwrap_or("Unnamed Flow").to_string(),
            address: None,
            protocol: None,
            message_protocol: None,
            properties: Vec::new(),
        };

        for p in &properties {
            match p.key.to_lowercase().as_str() {
                "address" | "url" | "uri" | "endpoint" => connection.address = Some(p.value.clone()),
                "transportprotocol" | "transport_protocol" | "protocol" => {
                    connection.protocol = Some(p.value.clone());
                }
                "messageprotocol" | "message_protocol" | "format" => {
                    connection.message_protocol = Some(p.value.clone());
                }
                _ => {}
            }
        }

        connection.properties = properties;
        result.connection_details.push(connection);
    }
}

/// Extract key/value properties from an element, tolerating the schema
/// drift across SAP tooling versions: `property` descendants with
/// `key`/`value` sub-elements first, then `key`/`value` or `name`/`value`
/// attribute pairs directly on the element.
pub(crate) fn element_properties(element: Node<'_, '_>) -> Vec<Parameter> {
    let mut props = Vec::new();

    for prop in element
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "property")
    {
        if let (Some(key), Some(value)) = (child_text(prop, "key"), child_text(prop, "value")) {
            props.push(Parameter::new(key, value));
        } else if let (Some(key), Some(value)) = (prop.attribute("key"), prop.attribute("value")) {
            props.push(Parameter::new(key, value));
        } else if let (Some(key), Some(value)) = (prop.attribute("name"), prop.attribute("value")) {
            props.push(Parameter::new(key, value));
        }
    }

    if props.is_empty() {
        if let (Some(key), Some(value)) = (element.attribute("key"), element.attribute("value")) {
            props.push(Parameter::new(key, value));
        }
        if let (Some(key), Some(value)) = (element.attribute("name"), element.attribute("value")) {
            props.push(Parameter::new(key, value));
        }
    }

    props
}

/// Text of the first child element with this local name, whichever
/// namespace it carries
fn child_text(node: Node<'_, '_>, local: &str) -> Option<String> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == local)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
}
