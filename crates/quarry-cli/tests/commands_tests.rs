//! End-to-end tests for `qry` commands against files on disk

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use quarry_cli::{cli::Cli, commands};
use quarry_config::QuarryConfig;
use tempfile::TempDir;

const DOMAIN: &str = r#"{
    "entity": {
        "patient": {
            "title": "Patient",
            "attribute": {
                "id": {"type": "text"},
                "age": {"type": "number", "groupBy": true},
                "sex": {"type": "text"},
                "visit": {"type": "visit", "card": "seq", "title": "Visits"}
            }
        },
        "visit": {
            "title": "Visit",
            "attribute": {
                "code": {"type": "text"}
            }
        }
    }
}"#;

const PATIENTS: &str = r#"{"name": "pipeline", "pipeline": [{"name": "navigate", "path": "patient"}]}"#;

struct Fixture {
    _dir: TempDir,
    domain: PathBuf,
    query: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let domain = dir.path().join("domain.json");
    let query = dir.path().join("query.json");
    fs::write(&domain, DOMAIN).unwrap();
    fs::write(&query, PATIENTS).unwrap();
    Fixture {
        _dir: dir,
        domain,
        query,
    }
}

fn run(args: &[&str]) -> anyhow::Result<String> {
    let mut full = vec!["qry"];
    full.extend_from_slice(args);
    let cli = Cli::try_parse_from(full).unwrap();
    commands::execute(cli.command, &QuarryConfig::default())
}

#[test]
fn test_normalize_seeds_columns() {
    let f = fixture();
    let output = run(&[
        "normalize",
        "-d",
        f.domain.to_str().unwrap(),
        "-q",
        f.query.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(
        output,
        "pipeline(navigate(patient), select(age: pipeline(navigate(age)), \
         id: pipeline(navigate(id)), sex: pipeline(navigate(sex))))"
    );
}

#[test]
fn test_normalize_json_round_trips_through_loader() {
    let f = fixture();
    let output = run(&[
        "normalize",
        "-d",
        f.domain.to_str().unwrap(),
        "-q",
        f.query.to_str().unwrap(),
        "-f",
        "json",
    ])
    .unwrap();
    let reloaded = quarry_core::model::load_query(&output).unwrap();
    assert!(reloaded.select_tail().is_some());
}

#[test]
fn test_columns_without_query_lists_entities() {
    let f = fixture();
    let output = run(&["columns", "-d", f.domain.to_str().unwrap()]).unwrap();
    let names: Vec<&str> = output
        .lines()
        .map(|line| line.split_whitespace().next().unwrap())
        .collect();
    assert_eq!(names, vec!["patient", "visit"]);
}

#[test]
fn test_columns_marks_selected() {
    let f = fixture();
    let output = run(&[
        "columns",
        "-d",
        f.domain.to_str().unwrap(),
        "-q",
        f.query.to_str().unwrap(),
    ])
    .unwrap();
    let selected: Vec<&str> = output
        .lines()
        .filter(|line| line.starts_with('*'))
        .map(|line| line.split_whitespace().nth(1).unwrap())
        .collect();
    assert_eq!(selected, vec!["id", "age", "sex"]);
    assert!(output.contains("Visits"));
}

#[test]
fn test_navigate_appends_steps() {
    let f = fixture();
    let output = run(&[
        "navigate",
        "-d",
        f.domain.to_str().unwrap(),
        "-q",
        f.query.to_str().unwrap(),
        "visit",
    ])
    .unwrap();
    assert_eq!(
        output,
        "pipeline(navigate(patient), navigate(visit), select(code: pipeline(navigate(code))))"
    );
}

#[test]
fn test_select_dotted_path() {
    let f = fixture();
    let output = run(&[
        "select",
        "-d",
        f.domain.to_str().unwrap(),
        "-q",
        f.query.to_str().unwrap(),
        "visit.code",
    ])
    .unwrap();
    assert!(output.ends_with(
        "visit: pipeline(navigate(visit), select(code: pipeline(navigate(code))))))"
    ));
}

#[test]
fn test_select_rejects_empty_segment() {
    let f = fixture();
    let err = run(&["select", "-d", f.domain.to_str().unwrap(), "visit..code"]).unwrap_err();
    assert!(err.to_string().contains("visit..code"));
}

#[test]
fn test_group_appends_group_step() {
    let f = fixture();
    let output = run(&[
        "group",
        "-d",
        f.domain.to_str().unwrap(),
        "-q",
        f.query.to_str().unwrap(),
        "age",
    ])
    .unwrap();
    assert_eq!(
        output,
        "pipeline(navigate(patient), group(age), select(age: pipeline(navigate(age))))"
    );
}

#[test]
fn test_missing_domain_reports_path() {
    let err = run(&["normalize", "-d", "/nonexistent/domain.json"]).unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/domain.json"));
}
