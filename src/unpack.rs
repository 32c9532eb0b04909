//! Selective archive extraction into a disposable scratch directory.

use crate::config::ArchiveLimits;
use crate::error::{Result, ScanError};
use crate::properties::{extract_properties, PropertyMap};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Archive entries worth extracting: process definitions, project metadata,
/// manifests, property files. Bounds work on archives with thousands of
/// irrelevant entries.
const KNOWN_PATTERNS: [&str; 9] = [
    ".xml",
    ".iflw",
    ".project",
    "metainfo.prop",
    "MANIFEST.MF",
    ".prop",
    "parameters.prop",
    "IntegrationFlow",
    "META-INF",
];

/// Outcome of unpacking one artifact archive. Dropping it removes the
/// scratch directory.
#[derive(Debug)]
pub struct UnpackedArchive {
    scratch: TempDir,
    /// Entry names actually extracted, as stored in the archive
    pub extracted: Vec<String>,
    /// Total number of entries the archive listed
    pub file_count: usize,
    /// First path segment of multi-segment entry names
    pub main_directories: Vec<String>,
    /// Properties collected in-memory from `.prop` entries
    pub properties: PropertyMap,
    /// Relative names of the property files that contributed
    pub property_sources: Vec<String>,
    /// Non-fatal per-entry failures
    pub errors: Vec<String>,
}

impl UnpackedArchive {
    /// Root of the scratch directory holding the extracted entries
    pub fn root(&self) -> &Path {
        self.scratch.path()
    }
}

/// Unpack the structurally meaningful entries of `path` into a fresh
/// scratch directory next to the artifact.
///
/// Only a completely unreadable archive is an error; individual entry
/// failures are recorded and skipped. The scratch directory is removed when
/// the returned value is dropped, on every exit path.
pub fn unpack_artifact(path: &Path, limits: &ArchiveLimits) -> Result<UnpackedArchive> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| ScanError::archive_extraction(format!("Failed to read ZIP archive: {e}")))?;

    let scratch = scratch_dir_for(path)?;
    debug!(
        "Extracting {} into scratch directory {}",
        path.display(),
        scratch.path().display()
    );

    let mut unpacked = UnpackedArchive {
        scratch,
        extracted: Vec::new(),
        file_count: archive.len(),
        main_directories: Vec::new(),
        properties: PropertyMap::new(),
        property_sources: Vec::new(),
        errors: Vec::new(),
    };

    let mut total_size: u64 = 0;

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                unpacked.errors.push(format!("Error reading archive entry {index}: {e}"));
                continue;
            }
        };
        let name = entry.name().to_string();

        if let Some((first, _)) = name.split_once('/') {
            if !first.is_empty() && !unpacked.main_directories.contains(&first.to_string()) {
                unpacked.main_directories.push(first.to_string());
            }
        }

        if entry.is_dir() || !KNOWN_PATTERNS.iter().any(|p| name.contains(p)) {
            continue;
        }

        if is_property_entry(&name) {
            let mut content = String::new();
            match entry.read_to_string(&mut content) {
                Ok(_) => {
                    debug!("Collected properties from archive entry {name}");
                    unpacked.properties.merge_first_wins(&name, extract_properties(&content));
                    unpacked.property_sources.push(name.clone());
                }
                Err(e) => {
                    unpacked.errors.push(format!("Error reading property file {name}: {e}"));
                }
            }
            continue;
        }

        if let Err(e) = limits.check_limits(unpacked.extracted.len(), total_size) {
            unpacked.errors.push(format!("Stopping extraction: {e}"));
            break;
        }
        if entry.size() > limits.max_entry_size {
            unpacked.errors.push(
                ScanError::entry_too_large(entry.size(), limits.max_entry_size).to_string(),
            );
            continue;
        }

        let Some(target) = sanitize_entry_path(&name, unpacked.scratch.path()) else {
            warn!("Skipping archive entry escaping the scratch directory: {name}");
            unpacked
                .errors
                .push(ScanError::directory_traversal(&name).to_string());
            continue;
        };

        if let Err(e) = extract_entry(&mut entry, &target) {
            unpacked.errors.push(format!("Error extracting {name}: {e}"));
            continue;
        }

        total_size += entry.size();
        unpacked.extracted.push(name);
    }

    debug!(
        "Extracted {} of {} entries",
        unpacked.extracted.len(),
        unpacked.file_count
    );

    Ok(unpacked)
}

/// Property files are consulted in-memory rather than written to disk
fn is_property_entry(name: &str) -> bool {
    let lowered = name.to_lowercase();
    lowered.ends_with(".prop") && (lowered.contains("parameter") || lowered.contains("propert"))
}

/// Create the uniquely named scratch directory, preferring the artifact's
/// parent so large extractions stay on the same filesystem.
fn scratch_dir_for(path: &Path) -> Result<TempDir> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = tempfile::Builder::new().prefix("extracted_").tempdir_in(parent) {
            return Ok(dir);
        }
    }
    tempfile::Builder::new()
        .prefix("extracted_")
        .tempdir()
        .map_err(|e| ScanError::archive_extraction(format!("Failed to create scratch directory: {e}")))
}

/// Rebuild an entry path component by component under `dest_dir`, rejecting
/// absolute paths, parent references and prefixes.
fn sanitize_entry_path(entry_name: &str, dest_dir: &Path) -> Option<PathBuf> {
    let path = Path::new(entry_name);
    if path.is_absolute() {
        return None;
    }

    let mut result = dest_dir.to_path_buf();
    for component in path.components() {
        match component {
            Component::Normal(c) => result.push(c),
            Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => return None,
        }
    }

    if !result.starts_with(dest_dir) {
        return None;
    }

    Some(result)
}

fn extract_entry<R: Read>(entry: &mut R, target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(target)?;
    std::io::copy(entry, &mut out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(dir: &Path, entries: &[(&str, &str)]) -> PathBuf {
        let path = dir.join("artifact.zip");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn extracts_only_matching_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            &[
                ("src/main/resources/scenarioflows/integrationflow/flow.iflw", "<bpmn2:definitions/>"),
                ("irrelevant.bin", "binary"),
                ("notes.txt", "text"),
                (".project", "<projectDescription><name>Flow</name></projectDescription>"),
            ],
        );

        let unpacked = unpack_artifact(&path, &ArchiveLimits::default()).unwrap();
        assert_eq!(unpacked.file_count, 4);
        assert_eq!(unpacked.extracted.len(), 2);
        assert!(unpacked.root().join(".project").exists());
        assert!(!unpacked.root().join("irrelevant.bin").exists());
        assert!(unpacked.main_directories.contains(&"src".to_string()));
    }

    #[test]
    fn property_entries_are_read_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            &[
                ("flow.iflw", "<bpmn2:definitions/>"),
                ("src/main/resources/parameters.prop", "AUTH_METHOD=Basic\n"),
            ],
        );

        let unpacked = unpack_artifact(&path, &ArchiveLimits::default()).unwrap();
        assert_eq!(unpacked.properties.get("AUTH_METHOD"), Some("Basic"));
        assert_eq!(unpacked.property_sources.len(), 1);
    }

    #[test]
    fn traversal_entries_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            &[
                ("../escape.xml", "<x/>"),
                ("flow.iflw", "<bpmn2:definitions/>"),
            ],
        );

        let unpacked = unpack_artifact(&path, &ArchiveLimits::default()).unwrap();
        assert_eq!(unpacked.extracted, vec!["flow.iflw".to_string()]);
        assert!(unpacked.errors.iter().any(|e| e.contains("traversal")));
        assert!(!dir.path().join("escape.xml").exists());
    }

    #[test]
    fn scratch_directory_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(dir.path(), &[("flow.iflw", "<bpmn2:definitions/>")]);

        let scratch_path = {
            let unpacked = unpack_artifact(&path, &ArchiveLimits::default()).unwrap();
            unpacked.root().to_path_buf()
        };
        assert!(!scratch_path.exists());
    }

    #[test]
    fn corrupt_zip_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        fs::write(&path, b"PK\x03\x04truncated").unwrap();

        let result = unpack_artifact(&path, &ArchiveLimits::default());
        assert!(matches!(result, Err(ScanError::ArchiveExtraction { .. })));
    }
}
