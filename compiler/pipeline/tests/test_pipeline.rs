use std::fs;
use std::path::Path;

use pipeline::{ErrorKind, Pipeline, PipelineError, PipelineOptions};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_crate(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"shop\"\nversion = \"0.1.0\"\n")
        .expect("write manifest");
    for (relative, contents) in files {
        let path = dir.path().join("src").join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write source");
    }
    dir
}

const GREETER: &str = r#"
pub struct UserInfo {
    pub name: String,
}

#[entrypoint]
pub struct Greeter;

impl Greeter {
    pub fn greet(&self, user: UserInfo) -> String {
        format!("Hello, {}!", user.name)
    }
}
"#;

const TELEMETRY: &str = r#"
use futures::stream::BoxStream;

pub struct Reading {
    pub sensor: String,
    pub value: f64,
}

/// Sensor telemetry.
#[entrypoint]
pub trait Telemetry {
    /// Upload a batch of readings.
    fn upload(&self, readings: BoxStream<'static, Reading>) -> u64;
    fn latest(&self, sensor: String) -> Option<Reading>;
}
"#;

fn greeter_crate() -> TempDir { write_crate(&[("lib.rs", GREETER)]) }

fn pipeline() -> Pipeline { Pipeline::new(PipelineOptions::default()) }

fn files_under(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root)
        .expect("read output")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn greeter_is_shown_with_its_shape() {
    let dir = greeter_crate();
    let shown = pipeline().show(dir.path(), false).expect("show");
    assert!(shown.starts_with("* Greeter (crate::Greeter)\n"));
    assert!(shown.contains("   * greet(user: UserInfo) -> text [unary]\n"));
    assert!(shown.contains("* record UserInfo (crate::UserInfo)\n   * name: text\n"));
}

#[test]
fn greeter_json_dump_names_the_record() {
    let dir = greeter_crate();
    let json = pipeline().show(dir.path(), true).expect("show json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["services"][0]["name"], "Greeter");
    assert_eq!(value["services"][0]["methods"][0]["shape"], "unary");
    assert!(value["types"]["UserInfo"].is_object());
}

#[test]
fn greeter_axum_artifacts_land_in_src_generated() {
    let dir = greeter_crate();
    let report = pipeline().generate(dir.path(), "axum", false).expect("generate");

    let root = dir.path().join("src").join("generated");
    assert_eq!(report.output_dir, root);
    assert!(report.written);
    assert_eq!(files_under(&root), vec!["client.rs", "mod.rs", "models.rs", "server.rs", "wire.rs"]);

    let models = fs::read_to_string(root.join("models.rs")).expect("models");
    assert!(models.contains("pub struct UserInfo {"));
    assert!(models.contains("pub struct GreeterGreetRequest {"));

    let server = fs::read_to_string(root.join("server.rs")).expect("server");
    assert!(server.contains("models::GreeterGreetRequest"));
    assert!(server.contains("service.greet("));

    let client = fs::read_to_string(root.join("client.rs")).expect("client");
    assert!(client.contains("pub async fn greet(&self"));
    assert!(client.contains("/greeter/greet"));
}

#[test]
fn generating_twice_gives_identical_files() {
    let dir = write_crate(&[("lib.rs", "pub mod greeter;\n"), ("greeter.rs", GREETER)]);
    let out = TempDir::new().expect("out");
    let pipeline = Pipeline::new(PipelineOptions {
        output_dir: Some(out.path().join("first")),
        ..PipelineOptions::default()
    });
    pipeline.generate(dir.path(), "axum", false).expect("first run");

    let again = Pipeline::new(PipelineOptions {
        output_dir: Some(out.path().join("second")),
        ..PipelineOptions::default()
    });
    again.generate(dir.path(), "axum", false).expect("second run");

    for name in files_under(&out.path().join("first")) {
        let first = fs::read_to_string(out.path().join("first").join(&name)).expect("first");
        let second = fs::read_to_string(out.path().join("second").join(&name)).expect("second");
        assert_eq!(first, second, "{} differs between runs", name);
    }
}

#[test]
fn regenerating_does_not_pick_up_generated_sources() {
    let dir = greeter_crate();
    let first = pipeline().generate(dir.path(), "axum", false).expect("first run");
    let second = pipeline().generate(dir.path(), "axum", false).expect("second run");
    assert_eq!(first.artifacts, second.artifacts);
}

#[test]
fn jsonrpc_rejects_streaming_and_writes_nothing() {
    let dir = write_crate(&[("lib.rs", TELEMETRY)]);
    let err = pipeline().generate(dir.path(), "jsonrpc", false).expect_err("streaming rejected");

    assert_eq!(err.kind(), ErrorKind::Backend);
    assert_eq!(err.code(), "unsupported-shape");
    assert!(err.to_string().contains("Telemetry.upload"));
    assert!(!dir.path().join("src").join("generated").exists());
}

#[test]
fn dry_run_lists_artifacts_without_writing() {
    let dir = greeter_crate();
    let report = pipeline().generate(dir.path(), "jsonrpc", true).expect("dry run");

    assert!(!report.written);
    let paths: Vec<&str> = report.artifacts.iter().map(|(path, _)| path.as_str()).collect();
    assert_eq!(paths, vec!["client.rs", "mod.rs", "models.rs", "server.rs", "wire.rs"]);
    assert!(report.artifacts.iter().all(|(_, size)| *size > 0));
    assert!(!report.output_dir.exists());
}

#[test]
fn unknown_backend_fails_before_scanning() {
    let missing = Path::new("/definitely/not/here");
    match pipeline().generate(missing, "grpc", false) {
        Err(err @ PipelineError::Codegen(_)) => {
            assert_eq!(err.code(), "unknown-backend");
            assert!(err.to_string().contains("axum, jsonrpc"));
        }
        other => panic!("expected unknown backend, got {:?}", other),
    }
}

#[test]
fn missing_source_is_a_discovery_error() {
    let err = pipeline().show(Path::new("/definitely/not/here"), false).expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::Discovery);
    assert_eq!(err.code(), "source-not-found");
}

#[test]
fn conflicting_records_are_reported_as_ir_consistency() {
    let dir = write_crate(&[
        ("lib.rs", "pub mod a;\npub mod b;\n"),
        (
            "a.rs",
            "pub struct Item { pub id: u32 }\n#[entrypoint]\npub struct Store;\nimpl Store {\n    pub fn put(&self, item: Item) -> bool { true }\n}\n",
        ),
        (
            "b.rs",
            "pub struct Item { pub label: String }\n#[entrypoint]\npub struct Archive;\nimpl Archive {\n    pub fn keep(&self, item: Item) -> bool { true }\n}\n",
        ),
    ]);
    let err = pipeline().show(dir.path(), false).expect_err("conflict");
    assert_eq!(err.kind(), ErrorKind::IrConsistency);
    assert_eq!(err.code(), "record-name-conflict");
}

#[test]
fn broken_modules_are_skipped_when_tolerated() {
    let dir = write_crate(&[("lib.rs", "pub mod broken;\n"), ("broken.rs", "fn (")]);
    let strict = pipeline().show(dir.path(), false).expect_err("parse failure aborts");
    assert_eq!(strict.code(), "load-failed");

    let dir = write_crate(&[
        ("lib.rs", "pub mod broken;\npub mod greeter;\n"),
        ("broken.rs", "fn ("),
        ("greeter.rs", GREETER),
    ]);
    let tolerant =
        Pipeline::new(PipelineOptions { tolerate_load_errors: true, ..PipelineOptions::default() });
    let report = tolerant.generate(dir.path(), "axum", true).expect("tolerated");
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].path.ends_with("broken.rs"));
}
