use assert_cmd::Command;
use serde_json::Value;
use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn ecgsim() -> Command {
    Command::cargo_bin("ecgsim").unwrap()
}

fn stderr_of_failure(args: &[&str]) -> String {
    let output = ecgsim().args(args).assert().failure().get_output().clone();
    String::from_utf8(output.stderr).unwrap()
}

fn stdout_json(args: &[&str]) -> Value {
    let output = ecgsim().args(args).assert().success().get_output().clone();
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn list_prints_every_rhythm() {
    let output = ecgsim().arg("list").assert().success().get_output().clone();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let entries: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(entries.len(), 29);
    assert_eq!(entries[0]["id"], "nsr");
    assert_eq!(entries[0]["category"], "supraventricular");
    assert_eq!(entries[28]["id"], "lbbb");
    assert_eq!(entries[28]["category"], "ventricular");
}

#[test]
fn describe_shows_criteria() {
    let json = stdout_json(&["describe", "--rhythm", "avb_1st_degree"]);
    assert_eq!(json["id"], "avb_1st_degree");
    assert!(json["criteria"]["pr_interval"].is_string());
    assert_eq!(json["rhythm"]["policy"], "regular");
}

#[test]
fn unknown_rhythm_fails() {
    let stderr = stderr_of_failure(&["describe", "--rhythm", "sinus_arrest"]);
    assert!(stderr.contains("unknown rhythm"), "{stderr}");
}

#[test]
fn generate_json_is_keyed_by_lead() {
    let json = stdout_json(&[
        "generate",
        "--rhythm",
        "nsr",
        "--duration",
        "4",
        "--no-jitter",
    ]);
    assert_eq!(json["leads"].as_object().unwrap().len(), 12);
    assert!(json["leads"]["aVF"].as_array().unwrap().len() > 10);
    assert_eq!(json["beats"].as_array().unwrap().len(), 5);
}

#[test]
fn generate_tsv_filters_leads() {
    let output = ecgsim()
        .args([
            "generate",
            "--rhythm",
            "vtach",
            "--duration",
            "3",
            "--format",
            "tsv",
            "--lead",
            "V1",
            "--lead",
            "avr",
        ])
        .assert()
        .success()
        .get_output()
        .clone();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("lead\ttime\tvalue"));
    let body: Vec<&str> = lines.collect();
    assert!(!body.is_empty());
    assert!(body
        .iter()
        .all(|line| line.starts_with("V1\t") || line.starts_with("aVR\t")));
}

#[test]
fn generate_rejects_unknown_lead() {
    let stderr = stderr_of_failure(&["generate", "--rhythm", "nsr", "--lead", "V7"]);
    assert!(stderr.contains("V7"), "{stderr}");
}

#[test]
fn summary_reports_ventricular_rate() {
    let json = stdout_json(&["summary", "--rhythm", "vtach", "--duration", "10"]);
    let rate = json["ventricular_rate_bpm"].as_f64().unwrap();
    assert!((rate - 180.0).abs() < 0.5, "{rate}");
    assert!(json["pr"].is_null());
}

#[test]
fn session_prints_manifest() {
    let design = workspace_root().join("test_data/session_nsr.toml");
    let json = stdout_json(&["session", "--design", design.to_str().unwrap()]);
    assert_eq!(json["name"], "nsr-demo");
    assert_eq!(json["rhythm"], "nsr");
    assert_eq!(json["seed"], 42);
    assert_eq!(json["jitter"], false);
    assert_eq!(json["total_beats"], 5);
    assert_eq!(json["leads"].as_array().unwrap().len(), 12);
}

#[test]
fn session_with_unknown_rhythm_fails() {
    let design = workspace_root().join("test_data/session_unknown.toml");
    let stderr = stderr_of_failure(&["session", "--design", design.to_str().unwrap()]);
    assert!(stderr.contains("sinus_arrest"), "{stderr}");
}
