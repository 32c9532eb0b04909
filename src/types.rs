use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main extraction output structure, one per analyzed artifact
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub schema_version: String,
    pub analyzed_at: DateTime<Utc>,
    pub source_path: String,
    pub artifact_id: String,
    pub artifact_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sha256: String,
    /// Derived collaboration/process description
    pub purpose: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workflow: Vec<WorkflowProcess>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_steps: Vec<KeyStep>,
    pub adapters_used: Vec<String>,
    pub senders: Vec<Participant>,
    pub receivers: Vec<Participant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mapping_entities: Vec<MappingEntity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    pub error_handling: Vec<ErrorHandler>,
    pub has_proper_error_handling: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connection_details: Vec<ConnectionDetail>,
    pub security_methods: Vec<String>,
    pub security_compliant: bool,
    pub security_issues: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_details: Vec<String>,
    /// Relative paths of files actually consulted during extraction
    pub project_files: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta_info: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub manifest: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_structure: Option<FolderStructure>,
    /// Non-fatal issues accumulated while parsing
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub processing_errors: Vec<String>,
    /// Set only when the artifact could not be analyzed at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn new<S: Into<String>>(source_path: S) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            analyzed_at: Utc::now(),
            source_path: source_path.into(),
            artifact_id: "unknown".to_string(),
            artifact_name: "Unknown IFlow".to_string(),
            project_name: None,
            sha256: String::new(),
            purpose: String::new(),
            workflow: Vec::new(),
            key_steps: Vec::new(),
            adapters_used: Vec::new(),
            senders: Vec::new(),
            receivers: Vec::new(),
            mapping_entities: Vec::new(),
            parameters: Vec::new(),
            error_handling: Vec::new(),
            has_proper_error_handling: false,
            connection_details: Vec::new(),
            security_methods: Vec::new(),
            security_compliant: false,
            security_issues: Vec::new(),
            security_details: Vec::new(),
            project_files: Vec::new(),
            meta_info: BTreeMap::new(),
            manifest: BTreeMap::new(),
            folder_structure: None,
            processing_errors: Vec::new(),
            error: None,
        }
    }

    /// Record a non-fatal processing problem
    pub fn push_processing_error<S: Into<String>>(&mut self, message: S) {
        self.processing_errors.push(message.into());
    }

    /// Serialize the record to the JSON document callers consume
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One BPMN process with its steps in document order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowProcess {
    pub process: String,
    pub steps: Vec<String>,
}

/// A service/call-activity step with its configuration properties
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyStep {
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Parameter>,
}

/// A sender or receiver system boundary from the collaboration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Parameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingEntity {
    pub name: String,
    pub uri: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Parameter>,
}

/// A key/value configuration pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Parameter {
    pub key: String,
    pub value: String,
}

impl Parameter {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// An error-handling construct discovered in the process definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorHandler {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subprocess: Option<String>,
    pub details: String,
}

impl ErrorHandler {
    pub fn detail<S: Into<String>>(details: S) -> Self {
        Self { subprocess: None, details: details.into() }
    }

    pub fn subprocess<N: Into<String>, S: Into<String>>(name: N, details: S) -> Self {
        Self { subprocess: Some(name.into()), details: details.into() }
    }
}

/// Connection configuration carried by a message flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionDetail {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_protocol: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Parameter>,
}

/// Shape of the artifact archive as listed, before selective extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderStructure {
    pub file_count: usize,
    pub main_directories: Vec<String>,
}
