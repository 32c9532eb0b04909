//! Artifact-level orchestration: sniff the kind, unpack, parse with
//! fallback, run the security pass, assemble one result record.

use crate::config::{ScanOptions, DEFINITION_SCAN_BUDGET};
use crate::fallback;
use crate::parser;
use crate::properties::{extract_properties, PropertyMap};
use crate::security::{check_security_compliance, SecurityReport};
use crate::sniff::{detect_kind, looks_like_xml, read_sample, ArtifactKind};
use crate::types::{ExtractionResult, FolderStructure};
use crate::unpack::unpack_artifact;
use anyhow::Context;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Markers identifying an XML file as an IFlow definition
const DEFINITION_MARKERS: [&str; 4] = ["<IntegrationFlow", "<ifl:", "<bpmn2:", "<bpmn:"];

/// Analyzes one artifact per call and returns a best-effort
/// [`ExtractionResult`], never an error: anything short of failing to read
/// the artifact at all degrades into `processing_errors`.
#[derive(Debug, Default)]
pub struct Inspector {
    options: ScanOptions,
}

impl Inspector {
    #[must_use]
    pub fn new() -> Self {
        Self { options: ScanOptions::default() }
    }

    #[must_use]
    pub fn with_options(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Analyze the artifact at `path`.
    ///
    /// Each invocation owns its own scratch directory and shares no state,
    /// so independent threads may call this concurrently.
    pub fn analyze<P: AsRef<Path>>(&self, path: P) -> ExtractionResult {
        let path = path.as_ref();
        let mut result = ExtractionResult::new(path.display().to_string());

        if !path.exists() {
            result.error = Some(format!("File does not exist: {}", path.display()));
            return result;
        }

        apply_identity_from_filename(path, &mut result);

        match fs::read(path) {
            Ok(bytes) => {
                result.sha256 = format!("{:x}", Sha256::digest(&bytes));
            }
            Err(e) => {
                result.error = Some(format!("Failed to read artifact: {e}"));
                return result;
            }
        }

        match detect_kind(path) {
            ArtifactKind::Zip => self.process_zip(path, &mut result),
            ArtifactKind::Xml => self.process_xml(path, &mut result),
            ArtifactKind::Unknown => self.process_unknown(path, &mut result),
        }

        log_summary(&result);
        result
    }

    fn process_zip(&self, path: &Path, result: &mut ExtractionResult) {
        let unpacked = match unpack_artifact(path, &self.options.archive_limits) {
            Ok(unpacked) => unpacked,
            Err(e) => {
                result.error = Some(format!("Extraction error: {e}"));
                return;
            }
        };

        result.folder_structure = Some(FolderStructure {
            file_count: unpacked.file_count,
            main_directories: unpacked.main_directories.clone(),
        });
        result.processing_errors.extend(unpacked.errors.iter().cloned());

        process_project_file(unpacked.root(), result);
        process_metainfo_file(unpacked.root(), result);
        process_manifest_file(unpacked.root(), result);

        let mut properties = unpacked.properties.clone();
        result.project_files.extend(unpacked.property_sources.iter().cloned());
        if properties.is_empty() {
            load_sidecar_properties(path, &mut properties, result);
        }

        let definition_files = find_definition_files(unpacked.root());
        debug!("Found {} potential IFlow definition files", definition_files.len());

        let mut security_ran = false;
        for file in &definition_files {
            self.process_definition(file, unpacked.root(), &properties, result, &mut security_ran);
        }
        // Scratch directory is removed when `unpacked` drops here
    }

    fn process_xml(&self, path: &Path, result: &mut ExtractionResult) {
        let content = match read_text(path) {
            Ok(content) => content,
            Err(e) => {
                result.push_processing_error(format!("Error processing XML file: {e:#}"));
                return;
            }
        };

        if let Some(name) = path.file_name() {
            result.project_files.push(name.to_string_lossy().into_owned());
        }

        let mut properties = PropertyMap::new();
        load_sidecar_properties(path, &mut properties, result);

        if !parser::parse_definition(&content, result) {
            fallback::extract_with_regex(&content, result);
        }

        let report = check_security_compliance(&content, &properties, &self.options);
        let mut security_ran = false;
        merge_security(result, report, &mut security_ran);
    }

    /// Last resort for content the magic-byte sniff could not place: read
    /// it as text and retry as XML before falling back to raw regex
    /// extraction.
    fn process_unknown(&self, path: &Path, result: &mut ExtractionResult) {
        match fs::read(path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                if looks_like_xml(&content) {
                    debug!("File content appears to be XML, processing as XML");
                    self.process_xml(path, result);
                } else {
                    debug!("Processing unknown file with regex extraction");
                    fallback::extract_with_regex(&content, result);
                }
            }
            Err(e) => {
                result.push_processing_error(format!("Could not process unknown file: {e}"));
            }
        }
    }

    fn process_definition(
        &self,
        file: &Path,
        root: &Path,
        properties: &PropertyMap,
        result: &mut ExtractionResult,
        security_ran: &mut bool,
    ) {
        let content = match read_text(file) {
            Ok(content) => content,
            Err(e) => {
                result.push_processing_error(format!("Error processing file: {e:#}"));
                return;
            }
        };

        result.project_files.push(relative_name(file, root));

        if !parser::parse_definition(&content, result) {
            warn!(
                "Structural parsing failed for {}, falling back to regex",
                file.display()
            );
            fallback::extract_with_regex(&content, result);
        }

        let report = check_security_compliance(&content, properties, &self.options);
        merge_security(result, report, security_ran);
    }
}

/// The download convention names artifacts `<name>____<id>.<ext>`
fn apply_identity_from_filename(path: &Path, result: &mut ExtractionResult) {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return;
    };
    if let Some((name, id)) = stem.split_once("____") {
        result.artifact_name = name.to_string();
        if !id.is_empty() {
            result.artifact_id = id.to_string();
        }
    } else {
        result.artifact_id = stem.to_string();
    }
}

/// Fold one file's security report into the accumulated result. Compliance
/// across definition files is the conjunction.
fn merge_security(result: &mut ExtractionResult, report: SecurityReport, security_ran: &mut bool) {
    if *security_ran {
        result.security_compliant = result.security_compliant && report.is_compliant;
    } else {
        result.security_compliant = report.is_compliant;
        *security_ran = true;
    }

    for method in report.detected_methods {
        if !result.security_methods.contains(&method) {
            result.security_methods.push(method);
        }
    }
    for issue in report.issues {
        if !result.security_issues.contains(&issue) {
            result.security_issues.push(issue);
        }
    }
    for detail in report.details {
        if !result.security_details.contains(&detail) {
            result.security_details.push(detail);
        }
    }
}

fn process_project_file(root: &Path, result: &mut ExtractionResult) {
    let project_file = root.join(".project");
    let content = match fs::read_to_string(&project_file) {
        Ok(content) => content,
        Err(_) => return,
    };
    result.project_files.push(".project".to_string());

    let parsed_name = roxmltree::Document::parse(&content)
        .ok()
        .and_then(|doc| {
            doc.root_element()
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == "name")
                .and_then(|n| n.text())
                .map(|t| t.trim().to_string())
        })
        .filter(|name| !name.is_empty())
        .or_else(|| {
            // Malformed project XML still usually carries a readable name tag
            let re = regex::Regex::new(r"<name>([^<]+)</name>").expect("valid regex");
            re.captures(&content).map(|c| c[1].trim().to_string())
        });

    match parsed_name {
        Some(name) => {
            debug!("Found project name: {name}");
            result.project_name = Some(name.clone());
            result.artifact_name = name;
        }
        None => debug!("Could not parse .project file"),
    }
}

fn process_metainfo_file(root: &Path, result: &mut ExtractionResult) {
    let metainfo_file = root.join("metainfo.prop");
    let content = match fs::read_to_string(&metainfo_file) {
        Ok(content) => content,
        Err(_) => return,
    };
    result.project_files.push("metainfo.prop".to_string());

    result.meta_info = extract_properties(&content);
    debug!("Found {} properties in metainfo.prop", result.meta_info.len());

    for key in ["artifactDisplayName", "iflowName", "name"] {
        if let Some(value) = result.meta_info.get(key) {
            result.artifact_name = value.clone();
            break;
        }
    }
}

fn process_manifest_file(root: &Path, result: &mut ExtractionResult) {
    let mut candidates: Vec<PathBuf> =
        vec![root.join("META-INF").join("MANIFEST.MF"), root.join("MANIFEST.MF")];
    candidates.extend(
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == "MANIFEST.MF")
            .map(|e| e.path().to_path_buf()),
    );

    for manifest_file in candidates {
        let content = match fs::read_to_string(&manifest_file) {
            Ok(content) => content,
            Err(_) => continue,
        };

        result.project_files.push(relative_name(&manifest_file, root));
        result.manifest = parse_manifest(&content);
        debug!("Found {} entries in MANIFEST.MF", result.manifest.len());
        break;
    }
}

/// JAR manifest syntax: continuation lines start with a space and extend
/// the previous entry's value.
fn parse_manifest(content: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    let mut current_key: Option<String> = None;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some(key) = &current_key {
                if let Some(value) = entries.get_mut(key) {
                    *value += continuation.trim();
                }
            }
        } else if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_string();
            entries.insert(key.clone(), value.trim().to_string());
            current_key = Some(key);
        }
    }

    entries
}

fn load_sidecar_properties(
    artifact_path: &Path,
    properties: &mut PropertyMap,
    result: &mut ExtractionResult,
) {
    let Some(parent) = artifact_path.parent() else { return };
    let params_path = parent.join("parameters.prop");
    let Ok(content) = fs::read_to_string(&params_path) else { return };

    debug!("Found parameters.prop next to artifact: {}", params_path.display());
    properties.merge_first_wins("parameters.prop", extract_properties(&content));
    result.project_files.push("parameters.prop".to_string());
}

/// Three-tier search for the most plausible IFlow definition files, each
/// tier capped at a fixed scan budget to bound cost on pathological
/// archives.
fn find_definition_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut scanned = 0usize;

    // Tier 1: .iflw files, and .xml files with BPMN/IFL markers up front
    for entry in walk_files(root) {
        if scanned >= DEFINITION_SCAN_BUDGET {
            break;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.ends_with(".iflw") {
            scanned += 1;
            files.push(entry.path().to_path_buf());
        } else if name.ends_with(".xml") {
            scanned += 1;
            if let Ok(sample) = read_sample(entry.path()) {
                let text = String::from_utf8_lossy(&sample);
                if DEFINITION_MARKERS.iter().any(|m| text.contains(m)) {
                    files.push(entry.path().to_path_buf());
                }
            }
        }
    }

    // Tier 2: any XML file
    if files.is_empty() {
        scanned = 0;
        for entry in walk_files(root) {
            if scanned >= DEFINITION_SCAN_BUDGET {
                break;
            }
            if entry.file_name().to_string_lossy().to_lowercase().ends_with(".xml") {
                scanned += 1;
                files.push(entry.path().to_path_buf());
            }
        }
        if !files.is_empty() {
            debug!("No specific IFlow files found, added {} XML files", files.len());
        }
    }

    // Tier 3: any text-like file with angle brackets
    if files.is_empty() {
        scanned = 0;
        for entry in walk_files(root) {
            if scanned >= DEFINITION_SCAN_BUDGET {
                break;
            }
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if name.ends_with(".class") || name.ends_with(".jar") {
                continue;
            }
            if let Ok(sample) = read_sample(entry.path()) {
                let head = &sample[..sample.len().min(100)];
                if head.contains(&b'<') && head.contains(&b'>') {
                    scanned += 1;
                    files.push(entry.path().to_path_buf());
                }
            }
        }
        if !files.is_empty() {
            debug!(
                "No XML files found, added {} potentially relevant files",
                files.len()
            );
        }
    }

    files
}

/// Read a file as text, tolerating invalid UTF-8 the way the rest of the
/// pipeline does (lossy replacement, never a decode failure).
fn read_text(path: &Path) -> anyhow::Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn walk_files(root: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
}

fn relative_name(file: &Path, root: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .into_owned()
}

fn log_summary(result: &ExtractionResult) {
    debug!(
        "Analysis summary for '{}': processes={} key_steps={} adapters={} senders={} receivers={} \
         mappings={} parameters={} connections={} proper_error_handling={} security_methods={:?} \
         compliant={} files={} errors={}",
        result.artifact_name,
        result.workflow.len(),
        result.key_steps.len(),
        result.adapters_used.len(),
        result.senders.len(),
        result.receivers.len(),
        result.mapping_entities.len(),
        result.parameters.len(),
        result.connection_details.len(),
        result.has_proper_error_handling,
        result.security_methods,
        result.security_compliant,
        result.project_files.len(),
        result.processing_errors.len(),
    );
}
