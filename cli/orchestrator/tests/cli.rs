use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

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

const FEED: &str = r#"
use futures::stream::BoxStream;

#[entrypoint]
pub struct Feed;

impl Feed {
    pub fn follow(&self, topic: String) -> BoxStream<'static, String> {
        unimplemented!()
    }
}
"#;

fn write_crate(lib: &str) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"shop\"\nversion = \"0.1.0\"\n")
        .expect("write manifest");
    fs::create_dir(dir.path().join("src")).expect("src");
    fs::write(dir.path().join("src").join("lib.rs"), lib).expect("write lib");
    dir
}

fn portico(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("portico"));
    // Keep the user's configuration and log filter out of the run.
    cmd.current_dir(dir.path()).env_remove("RUST_LOG").env("HOME", dir.path()).env(
        "XDG_CONFIG_HOME",
        dir.path().join("config-home"),
    );
    cmd
}

#[test]
fn show_prints_the_greeter() {
    let dir = write_crate(GREETER);
    portico(&dir)
        .args(["show", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("* Greeter (crate::Greeter)"))
        .stdout(predicate::str::contains("   * greet(user: UserInfo) -> text [unary]"));
}

#[test]
fn show_json_prints_the_ir() {
    let dir = write_crate(GREETER);
    let output = portico(&dir).args(["show", ".", "--json"]).output().expect("run");
    assert!(output.status.success());
    let ir: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(ir["services"][0]["methods"][0]["name"], "greet");
}

#[test]
fn generate_writes_the_axum_layer() {
    let dir = write_crate(GREETER);
    let out = dir.path().join("out");
    portico(&dir)
        .args(["generate", ".", "axum", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote 5 files for backend `axum`"));
    assert!(out.join("server.rs").is_file());
    assert!(out.join("client.rs").is_file());
}

#[test]
fn dry_run_lists_without_writing() {
    let dir = write_crate(GREETER);
    portico(&dir)
        .args(["generate", ".", "jsonrpc", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run: 5 files"))
        .stdout(predicate::str::contains("  models.rs ("));
    assert!(!dir.path().join("src").join("generated").exists());
}

#[test]
fn streaming_on_jsonrpc_fails_with_a_backend_diagnostic() {
    let dir = write_crate(FEED);
    portico(&dir)
        .args(["generate", ".", "jsonrpc"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error[backend/unsupported-shape]"))
        .stderr(predicate::str::contains("Feed.follow"));
    assert!(!dir.path().join("src").join("generated").exists());
}

#[test]
fn unknown_backend_lists_the_alternatives() {
    let dir = write_crate(GREETER);
    portico(&dir)
        .args(["generate", ".", "grpc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[backend/unknown-backend]"))
        .stderr(predicate::str::contains("axum, jsonrpc"));
}

#[test]
fn missing_source_is_a_discovery_failure() {
    let dir = write_crate(GREETER);
    portico(&dir)
        .args(["show", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[discovery/source-not-found]"));
}

#[test]
fn project_configuration_sets_the_output_dir() {
    let dir = write_crate(GREETER);
    fs::write(dir.path().join("portico.toml"), "[codegen]\noutput_dir = \"transport\"\n")
        .expect("write config");
    portico(&dir).args(["generate", "."]).assert().success();
    assert!(dir.path().join("transport").join("mod.rs").is_file());
}

#[test]
fn invalid_configuration_is_reported() {
    let dir = write_crate(GREETER);
    let config = dir.path().join("broken.toml");
    fs::write(&config, "[codegen]\nchannel_capacity = 0\n").expect("write config");
    portico(&dir)
        .args(["backends", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[config/config]"));
}

#[test]
fn backends_are_listed() {
    let dir = write_crate(GREETER);
    portico(&dir)
        .arg("backends")
        .assert()
        .success()
        .stdout(predicate::str::contains("axum"))
        .stdout(predicate::str::contains("jsonrpc"));
}
