//! Artifact kind detection: extension first, content sniffing second.

use crate::config::SNIFF_SAMPLE_LEN;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Real kind of an artifact file, regardless of what its name claims
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Zip,
    Xml,
    Unknown,
}

/// Determine the artifact kind by extension, falling back to content
/// sniffing when the extension is absent or unrecognized.
pub fn detect_kind(path: &Path) -> ArtifactKind {
    let name = path.to_string_lossy().to_lowercase();
    if name.ends_with(".zip") {
        return ArtifactKind::Zip;
    }
    if name.ends_with(".xml") || name.ends_with(".iflw") {
        return ArtifactKind::Xml;
    }

    match read_sample(path) {
        Ok(sample) => {
            let kind = sniff_bytes(&sample);
            debug!("Sniffed {} as {:?}", path.display(), kind);
            kind
        }
        Err(_) => ArtifactKind::Unknown,
    }
}

/// Classify a leading byte sample: ZIP magic (`PK`) or XML markers.
pub fn sniff_bytes(sample: &[u8]) -> ArtifactKind {
    if sample.starts_with(b"PK") {
        return ArtifactKind::Zip;
    }
    if contains(sample, b"<?xml") || contains(sample, b"<bpmn") || contains(sample, b"<ifl:") {
        return ArtifactKind::Xml;
    }
    ArtifactKind::Unknown
}

/// Loose check for XML-like text content
pub fn looks_like_xml(content: &str) -> bool {
    let trimmed = content.trim_start();
    trimmed.starts_with('<') && (content.contains("<?xml") || content.contains("<bpmn"))
}

/// Read up to the sniff sample length from the start of a file
pub fn read_sample(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut sample = vec![0u8; SNIFF_SAMPLE_LEN];
    let read = file.read(&mut sample)?;
    sample.truncate(read);
    Ok(sample)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_magic_wins() {
        assert_eq!(sniff_bytes(b"PK\x03\x04rest"), ArtifactKind::Zip);
    }

    #[test]
    fn xml_markers_detected_mid_sample() {
        assert_eq!(sniff_bytes(b"\xef\xbb\xbf<?xml version=\"1.0\"?>"), ArtifactKind::Xml);
        assert_eq!(sniff_bytes(b"<bpmn2:definitions>"), ArtifactKind::Xml);
        assert_eq!(sniff_bytes(b"<ifl:property>"), ArtifactKind::Xml);
    }

    #[test]
    fn garbage_is_unknown() {
        assert_eq!(sniff_bytes(b"\x00\x01\x02plain bytes"), ArtifactKind::Unknown);
    }

    #[test]
    fn xml_like_text_check() {
        assert!(looks_like_xml("  <?xml version=\"1.0\"?><a/>"));
        assert!(looks_like_xml("<bpmn2:definitions/>"));
        assert!(!looks_like_xml("name=value"));
        assert!(!looks_like_xml("text mentioning <?xml later"));
    }
}
