// CLI integration tests for inspect/header/codes flows.
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_plantstore");
    Command::new(exe)
}

fn parse_json(output: &[u8]) -> Value {
    let text = std::str::from_utf8(output).expect("utf8");
    serde_json::from_str(text.trim()).expect("valid json")
}

fn write_description(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write description");
    path.to_str().expect("utf8 path").to_string()
}

const FILTER: &str = r#"{"plants":[
  {"type":2,"leaves":[
    {"key":"name","seed":"string","values":["blur"],"flags":3},
    {"key":"params","seed":"plantptr","values":[1]}
  ]},
  {"type":7,"leaves":[
    {"key":"range","seed":"double","values":[0.0,1.0]},
    {"key":"label","seed":"string","values":[]}
  ]}
]}"#;

#[test]
fn inspect_prints_plants_in_creation_order() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write_description(temp.path(), "filter.json", FILTER);

    let output = cmd().args(["inspect", &file]).output().expect("inspect");
    assert!(output.status.success());
    let json = parse_json(&output.stdout);
    let plants = json["plants"].as_array().expect("plants");
    assert_eq!(plants.len(), 2);

    let first = &plants[0];
    assert_eq!(first["type"], 2);
    let keys: Vec<&str> = first["leaves"]
        .as_array()
        .expect("leaves")
        .iter()
        .map(|leaf| leaf["key"].as_str().expect("key"))
        .collect();
    assert_eq!(keys, ["type", "name", "params"]);
    assert_eq!(first["leaves"][1]["flags"], 3);
    assert_eq!(first["leaves"][2]["seed"], "plantptr");
    assert_eq!(first["leaves"][2]["values"][0], 1);

    let second = &plants[1];
    assert_eq!(second["leaves"][2]["count"], 0);
    assert_eq!(second["leaves"][1]["values"][1], 1.0);
    assert!(json["bytes_in_use"].as_u64().expect("bytes") > 0);
}

#[test]
fn inspect_reads_stdin_and_output_feeds_back() {
    let mut child = cmd()
        .arg("inspect")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(FILTER.as_bytes())
        .expect("write stdin");
    let first = child.wait_with_output().expect("wait");
    assert!(first.status.success());
    let first_json = parse_json(&first.stdout);

    let temp = tempfile::tempdir().expect("tempdir");
    let file = write_description(
        temp.path(),
        "again.json",
        &serde_json::to_string(&first_json).expect("encode"),
    );
    let second = cmd().args(["inspect", &file]).output().expect("inspect");
    assert!(second.status.success());
    assert_eq!(parse_json(&second.stdout)["plants"], first_json["plants"]);
}

#[test]
fn inspect_reports_store_errors_as_json() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write_description(
        temp.path(),
        "bad.json",
        r#"{"plants":[{"type":1,"leaves":[
            {"key":"x","seed":"int","values":[1],"flags":2},
            {"key":"x","seed":"int","values":[2]}
        ]}]}"#,
    );

    let output = cmd().args(["inspect", &file]).output().expect("inspect");
    assert_eq!(output.status.code(), Some(7));
    let err = parse_json(&output.stderr);
    assert_eq!(err["error"]["kind"], "IMMUTABLE");
    assert_eq!(err["error"]["code"], 5);
    assert_eq!(err["error"]["key"], "x");
}

#[test]
fn inspect_rejects_malformed_input() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write_description(temp.path(), "broken.json", "{\"plants\": [");
    let output = cmd().args(["inspect", &file]).output().expect("inspect");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json(&output.stderr);
    assert_eq!(err["error"]["kind"], "Input");

    let missing = temp.path().join("missing.json");
    let output = cmd()
        .args(["inspect", missing.to_str().expect("path")])
        .output()
        .expect("inspect");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(parse_json(&output.stderr)["error"]["kind"], "Io");
}

#[test]
fn max_bytes_limits_the_store() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write_description(temp.path(), "filter.json", FILTER);
    let output = cmd()
        .args(["--max-bytes", "64", "inspect", &file])
        .output()
        .expect("inspect");
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(parse_json(&output.stderr)["error"]["kind"], "MEMORY_ALLOCATION");
}

#[test]
fn header_emits_one_typedef_per_plant() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = write_description(temp.path(), "filter.json", FILTER);
    let output = cmd()
        .args(["header", &file, "--name", "blur"])
        .output()
        .expect("header");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8");
    assert!(text.contains("#ifndef BLUR_H"));
    assert!(text.contains("char *name; /* immutable, undeletable */"));
    assert!(text.contains("pst_plant_t params;"));
    assert!(text.contains("double range[2];"));
    assert!(text.contains("} blur_0_t;"));
    assert!(text.contains("} blur_1_t;"));
}

#[test]
fn codes_and_version_are_json() {
    let output = cmd().arg("codes").output().expect("codes");
    assert!(output.status.success());
    let codes = parse_json(&output.stdout);
    let string_seed = codes["seed_types"]
        .as_array()
        .expect("seeds")
        .iter()
        .find(|seed| seed["name"] == "string")
        .expect("string seed");
    assert_eq!(string_seed["code"], 4);
    assert_eq!(codes["flags"]["UNDELETABLE"], 1);

    let output = cmd().arg("version").output().expect("version");
    assert!(output.status.success());
    let version = parse_json(&output.stdout);
    assert_eq!(version["name"], "plantstore");
    assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let output = cmd().args(["inspect", "--bogus"]).output().expect("run");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_json(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
}
