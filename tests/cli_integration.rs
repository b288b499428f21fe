// CLI integration tests: shell-fmt drives the runtime exactly like a host.
use std::path::Path;
use std::process::Command;

use serde_json::{Value, json};

const UNFORMATTED: &str = "if [ \"$1\" = \"ok\" ];then\n echo ok\nfi\n";
const FORMATTED: &str = "if [ \"$1\" = \"ok\" ]; then\n  echo ok\nfi\n";

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_shell-fmt");
    let mut command = Command::new(exe);
    command.env_remove("RUST_LOG");
    command
}

fn json_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect()
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path.to_str().expect("utf-8 path").to_string()
}

#[test]
fn fmt_rewrites_changed_files_and_skips_formatted_ones() {
    let temp = tempfile::tempdir().expect("tempdir");
    let messy = write(temp.path(), "messy.sh", UNFORMATTED);
    let clean = write(temp.path(), "clean.sh", FORMATTED);

    let output = cmd().args(["fmt", &messy, &clean]).output().expect("fmt");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], json!({"path": messy, "result": "formatted"}));
    assert_eq!(lines[1], json!({"path": clean, "result": "unchanged"}));
    assert_eq!(std::fs::read_to_string(&messy).expect("read"), FORMATTED);
}

#[test]
fn check_reports_without_writing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let messy = write(temp.path(), "messy.sh", UNFORMATTED);

    let output = cmd().args(["fmt", "--check", &messy]).output().expect("fmt");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json_lines(&output.stdout)[0]["result"], json!("would_format"));
    assert_eq!(std::fs::read_to_string(&messy).expect("read"), UNFORMATTED);
}

#[test]
fn syntax_errors_are_reported_per_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let broken = write(temp.path(), "broken.sh", "if true; then\n  echo hi\n");
    let clean = write(temp.path(), "clean.sh", "echo ok\n");

    let output = cmd().args(["fmt", &broken, &clean]).output().expect("fmt");
    assert_eq!(output.status.code(), Some(1));
    let lines = json_lines(&output.stdout);
    assert_eq!(lines[0]["result"], json!("error"));
    assert!(
        lines[0]["message"].as_str().expect("message").contains("\"fi\""),
        "{}",
        lines[0]
    );
    assert_eq!(lines[1]["result"], json!("unchanged"));
}

#[test]
fn dprint_config_file_drives_formatting() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = write(
        temp.path(),
        "dprint.json",
        r#"{"indentWidth": 4, "shfmt": {"switchCaseIndent": true}}"#,
    );
    let script = write(temp.path(), "block.bash", "{\necho\n}\n");

    let output = cmd()
        .args(["fmt", "--config", &config, &script])
        .output()
        .expect("fmt");
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&script).expect("read"), "{\n    echo\n}\n");
}

#[test]
fn config_prints_resolution_and_diagnostics() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = write(
        temp.path(),
        "raw.json",
        r#"{"plugin": {"indentWidth": "8", "bogus": 1}, "global": {"useTabs": true}}"#,
    );

    let output = cmd().args(["config", "--config", &config]).output().expect("config");
    assert!(output.status.success());
    let value = &json_lines(&output.stdout)[0];
    assert_eq!(value["config"]["indentWidth"], json!(8));
    assert_eq!(value["config"]["useTabs"], json!(true));
    assert_eq!(value["diagnostics"][0]["propertyName"], json!("bogus"));
    assert_eq!(value["fileMatching"]["fileExtensions"][0], json!("sh"));
}

#[test]
fn info_prints_plugin_metadata() {
    let output = cmd().arg("info").output().expect("info");
    assert!(output.status.success());
    let value = &json_lines(&output.stdout)[0];
    assert_eq!(value["name"], json!("dprint-plugin-shell"));
    assert_eq!(value["configKey"], json!("shfmt"));
    assert_eq!(value["pluginSchemaVersion"], json!(4));
}

#[test]
fn errors_are_json_on_stderr_with_exit_codes() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("missing.sh");

    let output = cmd()
        .args(["fmt", missing.to_str().expect("utf-8 path")])
        .output()
        .expect("fmt");
    assert_eq!(output.status.code(), Some(5));
    let err = &json_lines(&output.stderr)[0]["error"];
    assert_eq!(err["kind"], json!("Io"));
    assert!(err["path"].as_str().expect("path").ends_with("missing.sh"));

    let output = cmd().arg("fmt").output().expect("fmt");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(json_lines(&output.stderr)[0]["error"]["kind"], json!("Usage"));

    let bad = write(temp.path(), "bad.json", "{");
    let output = cmd().args(["config", "--config", &bad]).output().expect("config");
    assert_eq!(output.status.code(), Some(4));
}
