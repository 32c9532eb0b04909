//! Namespace profiles for BPMN/IFL documents.
//!
//! Different SAP tooling versions emit different namespace-prefix
//! combinations for the same process definition. Element discovery runs
//! under an ordered list of immutable profiles, most specific first, and
//! short-circuits on the first profile that yields a structural signal.

use roxmltree::Node;

pub const BPMN_MODEL_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
pub const IFL_NS: &str = "http:///com.sap.ifl.model/Ifl.xsd";
pub const BPMN_DI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";

/// One fixed namespace dictionary used to locate elements in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceProfile {
    pub name: &'static str,
    /// BPMN model namespace; `None` matches on local names alone
    pub bpmn_ns: Option<&'static str>,
    /// SAP IFL extension namespace; `None` matches on local names alone
    pub ifl_ns: Option<&'static str>,
}

// The IFL namespace URI has drifted across SAP tooling versions; the middle
// profile keeps the BPMN namespace strict but matches extension elements by
// local name.
const PROFILES: [NamespaceProfile; 3] = [
    NamespaceProfile {
        name: "bpmn2+ifl",
        bpmn_ns: Some(BPMN_MODEL_NS),
        ifl_ns: Some(IFL_NS),
    },
    NamespaceProfile {
        name: "bpmn",
        bpmn_ns: Some(BPMN_MODEL_NS),
        ifl_ns: None,
    },
    NamespaceProfile { name: "bare", bpmn_ns: None, ifl_ns: None },
];

/// Ordered profile list, most specific first
pub fn profiles() -> &'static [NamespaceProfile] {
    &PROFILES
}

impl NamespaceProfile {
    /// Does `node` match a BPMN element with this local name under this
    /// profile?
    pub fn is_bpmn(&self, node: Node<'_, '_>, local: &str) -> bool {
        node.is_element()
            && node.tag_name().name() == local
            && match self.bpmn_ns {
                Some(ns) => node.tag_name().namespace() == Some(ns),
                None => true,
            }
    }

    /// Does `node` match an IFL extension element with this local name?
    pub fn is_ifl(&self, node: Node<'_, '_>, local: &str) -> bool {
        node.is_element()
            && node.tag_name().name() == local
            && match self.ifl_ns {
                Some(ns) => node.tag_name().namespace() == Some(ns),
                None => true,
            }
    }

    /// Look up an attribute, preferring the IFL-namespaced spelling
    /// (`ifl:type`) over the plain one.
    pub fn ifl_attr<'a>(&self, node: Node<'a, '_>, local: &str) -> Option<&'a str> {
        if let Some(ns) = self.ifl_ns {
            if let Some(value) = node.attribute((ns, local)) {
                return Some(value);
            }
        } else {
            // Bare profile: accept the attribute under any namespace
            if let Some(attr) = node.attributes().find(|a| a.name() == local) {
                return Some(attr.value());
            }
        }
        node.attribute(local)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<bpmn2:definitions xmlns:bpmn2="http://www.omg.org/spec/BPMN/20100524/MODEL"
                   xmlns:ifl="http:///com.sap.ifl.model/Ifl.xsd">
  <bpmn2:collaboration name="C">
    <bpmn2:participant ifl:type="EndpointSender" name="S"/>
  </bpmn2:collaboration>
</bpmn2:definitions>"#;

    #[test]
    fn namespaced_profile_matches_prefixed_elements() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let profile = profiles()[0];
        let participant = doc
            .descendants()
            .find(|n| profile.is_bpmn(*n, "participant"))
            .expect("participant");
        assert_eq!(profile.ifl_attr(participant, "type"), Some("EndpointSender"));
        assert_eq!(participant.attribute("name"), Some("S"));
    }

    #[test]
    fn bare_profile_matches_unprefixed_elements() {
        let doc =
            roxmltree::Document::parse(r#"<definitions><participant type="Sender"/></definitions>"#)
                .unwrap();
        let bare = profiles()[2];
        let participant = doc
            .descendants()
            .find(|n| bare.is_bpmn(*n, "participant"))
            .expect("participant");
        assert_eq!(bare.ifl_attr(participant, "type"), Some("Sender"));
    }

    #[test]
    fn namespaced_profile_rejects_unprefixed_elements() {
        let doc =
            roxmltree::Document::parse(r#"<definitions><participant type="Sender"/></definitions>"#)
                .unwrap();
        let strict = profiles()[0];
        assert!(!doc.descendants().any(|n| strict.is_bpmn(n, "participant")));
    }
}
