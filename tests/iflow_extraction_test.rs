//! End-to-end extraction tests over real ZIP artifacts built on the fly.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use cpiscan::{analyze_artifact, Inspector, ScanOptions};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Write a ZIP artifact with the given entries into `dir`
fn write_zip(dir: &Path, file_name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(file_name);
    let file = File::create(&path).expect("create zip");
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in entries {
        writer.start_file(*name, options).expect("start entry");
        writer.write_all(content.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish zip");
    path
}

/// A well-formed BPMN2+IFL definition with one sender, one receiver, an
/// outbound message flow carrying the given authentication value, and an
/// error subprocess with an error event.
fn sample_iflow(auth_value: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn2:definitions xmlns:bpmn2="http://www.omg.org/spec/BPMN/20100524/MODEL"
                   xmlns:ifl="http:///com.sap.ifl.model/Ifl.xsd">
  <bpmn2:collaboration name="Order Replication">
    <bpmn2:participant id="P1" ifl:type="EndpointSender" name="Sender_ERP"/>
    <bpmn2:participant id="P2" ifl:type="EndpointRecevier" name="Receiver_CRM"/>
    <bpmn2:messageFlow id="MF1" name="HTTPS Outbound">
      <bpmn2:extensionElements>
        <ifl:property><key>ComponentType</key><value>HTTP</value></ifl:property>
        <ifl:property><key>address</key><value>https://api.example.com/orders</value></ifl:property>
        <ifl:property><key>authenticationMethod</key><value>{auth_value}</value></ifl:property>
      </bpmn2:extensionElements>
    </bpmn2:messageFlow>
  </bpmn2:collaboration>
  <bpmn2:process id="PR1" name="Integration Process">
    <bpmn2:startEvent id="SE1" name="Start"/>
    <bpmn2:subProcess id="SP1" name="Exception Subprocess">
      <bpmn2:startEvent id="ES1" name="Error Start">
        <bpmn2:errorEventDefinition/>
      </bpmn2:startEvent>
    </bpmn2:subProcess>
    <bpmn2:endEvent id="EE1" name="End"/>
  </bpmn2:process>
</bpmn2:definitions>
"#
    )
}

fn no_scratch_left_behind(dir: &Path) {
    let leftovers: Vec<_> = fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("extracted_"))
        .collect();
    assert!(leftovers.is_empty(), "scratch directories persisted: {leftovers:?}");
}

#[test]
fn well_formed_archive_round_trips() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let iflow = sample_iflow("Certificate");
    let artifact = write_zip(
        dir.path(),
        "Order_Flow____com.example.order.zip",
        &[
            ("src/main/resources/scenarioflows/integrationflow/Order_Flow.iflw", iflow.as_str()),
            (".project", "<projectDescription><name>Order Flow</name></projectDescription>"),
            ("metainfo.prop", "artifactDisplayName=Order Replication Flow\nversion=1.0.4\n"),
            ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\nBundle-SymbolicName: com.example.order;\n singleton:=true\n"),
        ],
    );

    let result = analyze_artifact(&artifact, &ScanOptions::default());

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert_eq!(result.artifact_id, "com.example.order");
    // metainfo display name wins over the filename prefix
    assert_eq!(result.artifact_name, "Order Replication Flow");
    assert_eq!(result.project_name.as_deref(), Some("Order Flow"));

    assert_eq!(result.senders.len(), 1);
    assert_eq!(result.senders[0].name, "Sender_ERP");
    assert_eq!(result.receivers.len(), 1);
    assert_eq!(result.receivers[0].name, "Receiver_CRM");
    assert!(result.has_proper_error_handling);
    assert_eq!(result.adapters_used, vec!["HTTP".to_string()]);

    assert!(result.purpose.contains("Order Replication"));
    assert!(result
        .manifest
        .get("Bundle-SymbolicName")
        .is_some_and(|v| v.contains("singleton:=true")));
    assert_eq!(result.meta_info.get("version").map(String::as_str), Some("1.0.4"));

    assert!(result.project_files.iter().any(|f| f.ends_with(".iflw")));
    assert!(result.project_files.contains(&".project".to_string()));

    let folder = result.folder_structure.as_ref().expect("folder structure");
    assert_eq!(folder.file_count, 4);
    assert!(folder.main_directories.contains(&"src".to_string()));

    no_scratch_left_behind(dir.path());
}

#[test]
fn direct_basic_authentication_is_flagged() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let iflow = sample_iflow("Basic");
    let artifact = write_zip(dir.path(), "flow.zip", &[("flow.iflw", iflow.as_str())]);

    let result = analyze_artifact(&artifact, &ScanOptions::default());

    assert!(!result.security_compliant);
    assert!(result.security_methods.iter().any(|m| m == "Basic"));
    assert!(!result.security_issues.is_empty());
}

#[test]
fn parameterized_basic_resolved_from_archive_properties() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let iflow = sample_iflow("{{AUTH_METHOD}}");
    let artifact = write_zip(
        dir.path(),
        "flow.zip",
        &[
            ("test.iflw", iflow.as_str()),
            ("src/main/resources/parameters.prop", "AUTH_METHOD=Basic\n"),
        ],
    );

    let result = analyze_artifact(&artifact, &ScanOptions::default());

    assert!(!result.security_compliant);
    assert!(result
        .security_issues
        .iter()
        .any(|i| i.contains("AUTH_METHOD") && i.contains("Basic")));

    no_scratch_left_behind(dir.path());
}

#[test]
fn parameterized_certificate_is_not_flagged() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let iflow = sample_iflow("{{AUTH_METHOD}}");
    let artifact = write_zip(
        dir.path(),
        "flow.zip",
        &[
            ("test.iflw", iflow.as_str()),
            ("src/main/resources/parameters.prop", "AUTH_METHOD=Client Certificate\n"),
        ],
    );

    let result = analyze_artifact(&artifact, &ScanOptions::default());

    assert!(result.security_compliant);
    assert!(result.security_issues.is_empty());
    assert!(result
        .security_methods
        .iter()
        .any(|m| m.contains("Client Certificate")));
}

#[test]
fn sidecar_parameters_prop_is_consulted_for_bare_xml() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let artifact = dir.path().join("flow.iflw");
    fs::write(&artifact, sample_iflow("{{AUTH_METHOD}}")).expect("write iflw");
    fs::write(dir.path().join("parameters.prop"), "AUTH_METHOD=Basic\n").expect("write props");

    let result = analyze_artifact(&artifact, &ScanOptions::default());

    assert!(!result.security_compliant);
    assert!(result
        .security_issues
        .iter()
        .any(|i| i.contains("AUTH_METHOD")));
    assert!(result.project_files.contains(&"parameters.prop".to_string()));
}

#[test]
fn archive_without_structural_files_yields_empty_result() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let artifact = write_zip(
        dir.path(),
        "empty.zip",
        &[("docs/readme.txt", "nothing structural here"), ("data.bin", "xx")],
    );

    let result = analyze_artifact(&artifact, &ScanOptions::default());

    assert!(result.error.is_none());
    assert!(result.workflow.is_empty());
    assert!(result.senders.is_empty());
    assert!(result.receivers.is_empty());
    assert!(result.adapters_used.is_empty());
    assert_eq!(result.folder_structure.as_ref().map(|f| f.file_count), Some(2));

    no_scratch_left_behind(dir.path());
}

#[test]
fn corrupt_zip_reports_error_field() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let artifact = dir.path().join("broken.zip");
    fs::write(&artifact, b"PK\x03\x04this is not a real archive").expect("write");

    let result = analyze_artifact(&artifact, &ScanOptions::default());

    assert!(result.error.is_some());
    no_scratch_left_behind(dir.path());
}

#[test]
fn missing_artifact_reports_error_field() {
    init_tracing();
    let result = analyze_artifact("/nonexistent/path/flow.zip", &ScanOptions::default());
    assert!(result.error.is_some());
    assert!(result.error.as_ref().is_some_and(|e| e.contains("does not exist")));
}

#[test]
fn malformed_definition_falls_back_to_regex() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let broken = r#"<bpmn2:definitions name="Broken Flow">
        <sender id="s" type="HTTPS"/>
        <receiver id="r" type="SFTP"/>
        <unclosed"#;
    let artifact = write_zip(dir.path(), "broken.zip", &[("flow.iflw", broken)]);

    let result = analyze_artifact(&artifact, &ScanOptions::default());

    assert!(result.error.is_none());
    assert!(!result.processing_errors.is_empty());
    assert_eq!(result.senders.len(), 1);
    assert_eq!(result.senders[0].adapter_type.as_deref(), Some("HTTPS"));
    assert_eq!(result.receivers.len(), 1);

    no_scratch_left_behind(dir.path());
}

#[test]
fn unmarked_xml_is_found_by_second_tier_search() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    // Bare tags, no bpmn/ifl markers in the first kilobyte
    let bare = r#"<definitions>
  <collaboration name="Plain">
    <participant type="Sender" name="From_System"/>
    <participant type="Receiver" name="To_System"/>
  </collaboration>
  <process name="P"><startEvent name="Start"/></process>
</definitions>"#;
    let artifact = write_zip(dir.path(), "plain.zip", &[("content/flow.xml", bare)]);

    let result = analyze_artifact(&artifact, &ScanOptions::default());

    assert_eq!(result.senders.len(), 1);
    assert_eq!(result.receivers.len(), 1);
    assert_eq!(result.workflow.len(), 1);
}

#[test]
fn result_serializes_to_json() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let iflow = sample_iflow("Basic");
    let artifact = write_zip(dir.path(), "flow.zip", &[("flow.iflw", iflow.as_str())]);

    let result = analyze_artifact(&artifact, &ScanOptions::default());
    let json = result.to_json().expect("serialize");

    assert!(json.contains("\"senders\""));
    assert!(json.contains("\"security_compliant\""));
    assert!(json.contains("\"has_proper_error_handling\""));
}

#[test]
fn concurrent_analyses_do_not_interfere() {
    init_tracing();
    let dir = TempDir::new().expect("tempdir");
    let basic = sample_iflow("Basic");
    let certificate = sample_iflow("Certificate");
    let a = write_zip(dir.path(), "a.zip", &[("a.iflw", basic.as_str())]);
    let b = write_zip(dir.path(), "b.zip", &[("b.iflw", certificate.as_str())]);

    let handle_a = std::thread::spawn(move || Inspector::new().analyze(a));
    let handle_b = std::thread::spawn(move || Inspector::new().analyze(b));

    let result_a = handle_a.join().expect("thread a");
    let result_b = handle_b.join().expect("thread b");

    assert!(!result_a.security_compliant);
    assert!(result_b.security_compliant);
    no_scratch_left_behind(dir.path());
}
