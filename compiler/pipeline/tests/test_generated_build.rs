//! Builds the generated transport layer inside a scratch crate and runs its
//! client against its router. Needs network access for the dependencies and
//! a full compile, so it only runs with `cargo test -- --ignored`.

use std::fs;
use std::path::Path;
use std::process::Command;

use pipeline::{Pipeline, PipelineOptions};
use tempfile::TempDir;

const MANIFEST: &str = r#"[package]
name = "shop"
version = "0.1.0"
edition = "2021"

[workspace]

[dependencies]
axum = { version = "0.8", features = ["ws"] }
chrono = { version = "0.4", features = ["serde"] }
futures = "0.3"
reqwest = { version = "0.12", default-features = false, features = ["json"] }
serde = { version = "1.0", features = ["derive"] }
serde_json = "1.0"
thiserror = "2.0"
tokio = { version = "1", features = ["full"] }
tokio-stream = "0.1"
tokio-tungstenite = "0.26"
tracing = "0.1"
"#;

const LIB: &str = r#"use futures::stream::{BoxStream, StreamExt};

pub mod generated;

pub struct UserInfo {
    pub name: String,
}

#[cfg_attr(portico, entrypoint)]
pub struct Greeter;

impl Greeter {
    pub async fn greet(&self, user: UserInfo) -> String {
        format!("Hello, {}!", user.name)
    }

    pub fn count(&self, upto: u32) -> BoxStream<'static, u32> {
        futures::stream::iter(0..upto).boxed()
    }

    pub async fn total(&self, values: BoxStream<'static, i64>) -> i64 {
        values.fold(0, |sum, value| async move { sum + value }).await
    }
}
"#;

const ROUNDTRIP: &str = r#"use std::sync::Arc;

use shop::generated::client::GreeterClient;
use shop::generated::models::UserInfo;

#[tokio::test]
async fn client_and_router_agree() {
    let app = shop::generated::router(Arc::new(shop::Greeter));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });

    let client = GreeterClient::new(base);
    let reply = client.greet(UserInfo { name: "Ann".into() }).await.expect("greet");
    assert_eq!(reply, "Hello, Ann!");

    let mut counted = Vec::new();
    let mut stream = client.count(3).await.expect("count");
    while let Some(item) = stream.recv().await {
        counted.push(item.expect("item"));
    }
    assert_eq!(counted, vec![0, 1, 2]);

    let call = client.total().await.expect("total");
    for value in [1, 2, 3] {
        call.send(value).await.expect("send");
    }
    assert_eq!(call.finish().await.expect("finish"), 6);
}
"#;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, contents).expect("write");
}

#[test]
#[ignore = "compiles the generated crate and its dependencies"]
fn generated_axum_layer_builds_and_round_trips() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "Cargo.toml", MANIFEST);
    write(dir.path(), "src/lib.rs", LIB);
    write(dir.path(), "tests/roundtrip.rs", ROUNDTRIP);

    let report = Pipeline::new(PipelineOptions::default())
        .generate(dir.path(), "axum", false)
        .expect("generate");
    assert_eq!(report.output_dir, dir.path().join("src").join("generated"));

    let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
    let output = Command::new(cargo)
        .args(["test", "--quiet"])
        .current_dir(dir.path())
        .env("CARGO_TARGET_DIR", dir.path().join("target"))
        .env_remove("RUSTFLAGS")
        .output()
        .expect("run cargo");
    assert!(
        output.status.success(),
        "generated crate failed:\n{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}
