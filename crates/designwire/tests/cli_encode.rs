#![cfg(all(unix, feature = "cli"))]

use std::io::Read;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

const SESSION: &str = r#"{
    "workspaces": [
        { "handle": 1, "name": "demo", "window_bounds": { "x": 0, "y": 0, "width": 800, "height": 600 } }
    ],
    "library_sets": [{
        "id": "framework",
        "items": [{
            "library": {
                "handle": 10,
                "path": "libs/framework.swc",
                "file": { "url": "file:///libs/framework.swc", "presentable_url": "libs/framework.swc" }
            }
        }]
    }],
    "units": [{ "handle": 5, "workspace": 1, "library_sets": ["framework"] }],
    "documents": [
        {
            "handle": 100, "unit": 5, "class_name": "Main",
            "file": { "url": "file:///src/Main.mxml", "presentable_url": "src/Main.mxml" },
            "strings": ["label"], "payload": "main", "references": [101]
        },
        {
            "handle": 101, "unit": 5, "class_name": "views.Panel",
            "file": { "url": "file:///src/views/Panel.mxml", "presentable_url": "src/views/Panel.mxml" },
            "strings": ["title"], "payload": "panel"
        },
        {
            "handle": 102, "unit": 5, "class_name": "Broken",
            "file": { "url": "file:///src/Broken.mxml", "presentable_url": "src/Broken.mxml" },
            "strings": ["orphan"], "fail": "unexpected end of tag"
        }
    ],
    "steps": [
        { "op": "open_workspace", "workspace": 1 },
        { "op": "register_unit", "unit": 5 },
        { "op": "open_document", "document": 100, "notify": true },
        { "op": "open_document", "document": 102 }
    ]
}"#;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/dwcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn write_script(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("session.json");
    std::fs::write(&path, text).expect("script should be writable");
    path
}

fn designwire(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_designwire"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("designwire should run")
}

fn report(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be a json report")
}

fn methods(report: &Value) -> Vec<String> {
    report["messages"]
        .as_array()
        .expect("messages array")
        .iter()
        .map(|record| record["method"].as_str().expect("method name").to_string())
        .collect()
}

#[test]
fn encode_to_file_reports_the_committed_journal() {
    let dir = unique_temp_dir("file");
    let script = write_script(&dir, SESSION);
    let out = dir.join("session.bin");

    let output = designwire(&[
        "--format",
        "json",
        "encode",
        script.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report = report(&output);
    assert_eq!(
        methods(&report),
        vec![
            "openWorkspace",
            "registerLibrarySet",
            "registerUnit",
            "registerDocumentFactory",
            "registerDocumentFactory",
            "openDocument",
            "updateStringRegistry",
        ]
    );

    let stream = std::fs::read(&out).expect("stream file should exist");
    assert_eq!(report["bytes"].as_u64(), Some(stream.len() as u64));
    assert_eq!(&stream[..2], &[0, 0]);

    let documents = report["documents"].as_array().unwrap();
    assert_eq!(documents[0]["ok"], Value::Bool(true));
    assert_eq!(documents[1]["ok"], Value::Bool(false));

    let problems = report["problems"].as_array().unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0]["message"], "unexpected end of tag");
    assert_eq!(problems[0]["source"], "src/Broken.mxml");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn raw_format_prints_the_same_stream() {
    let dir = unique_temp_dir("raw");
    let script = write_script(&dir, SESSION);
    let out = dir.join("session.bin");

    let to_file = designwire(&["--format", "json", "encode", script.to_str().unwrap(), "--out", out.to_str().unwrap()]);
    assert!(to_file.status.success());
    let raw = designwire(&["--format", "raw", "encode", script.to_str().unwrap()]);
    assert!(raw.status.success());

    assert_eq!(raw.stdout, std::fs::read(&out).unwrap());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn socket_sink_streams_to_the_connecting_engine() {
    let dir = unique_temp_dir("sock");
    let script = write_script(&dir, SESSION);
    let sock_path = dir.join("engine.sock");

    let child = Command::new(env!("CARGO_BIN_EXE_designwire"))
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("raw")
        .arg("encode")
        .arg(&script)
        .arg("--socket")
        .arg(&sock_path)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("encode should start");

    let start = Instant::now();
    let mut engine = loop {
        match UnixStream::connect(&sock_path) {
            Ok(stream) => break stream,
            Err(_) if start.elapsed() < Duration::from_secs(3) => thread::sleep(Duration::from_millis(25)),
            Err(err) => panic!("engine could not connect: {err}"),
        }
    };
    let mut received = Vec::new();
    engine.read_to_end(&mut received).expect("stream should be readable");

    let output = child.wait_with_output().expect("encode should exit");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let raw = designwire(&["--format", "raw", "encode", script.to_str().unwrap()]);
    assert_eq!(received, raw.stdout);
    assert!(!sock_path.exists(), "socket file should be removed");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_script_is_a_usage_error() {
    let output = designwire(&["encode", "/nonexistent/designwire/session.json"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn malformed_script_is_invalid_data() {
    let dir = unique_temp_dir("bad");
    let script = write_script(&dir, r#"{ "steps": [{ "op": "open_workspace" }] }"#);

    let output = designwire(&["encode", script.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("session.json"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn out_of_order_step_names_the_step() {
    let dir = unique_temp_dir("order");
    let script = write_script(
        &dir,
        r#"{
            "units": [{ "handle": 5, "workspace": 1 }],
            "steps": [{ "op": "register_unit", "unit": 5 }]
        }"#,
    );

    let output = designwire(&["encode", script.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("step 0 (register_unit)"), "stderr: {stderr}");
    assert!(stderr.contains("workspace#1"), "stderr: {stderr}");
    let _ = std::fs::remove_dir_all(&dir);
}
