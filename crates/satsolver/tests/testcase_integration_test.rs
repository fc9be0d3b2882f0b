/// Integration tests for JSON testcases
///
/// Every file under `tests/data` is loaded, solved and checked against the
/// result it declares.
use satsolver::json::{
    build_testcase, check_result, load_testcase, parse_testcase, write_testcase, JobJson, JobKindJson,
    LoadError,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

fn fixtures() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = fs::read_dir(data_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    paths
}

#[test]
fn test_all_fixtures_match_expected_result() {
    let paths = fixtures();
    assert!(!paths.is_empty());

    for path in paths {
        let testcase = load_testcase(&path).unwrap();
        let loaded = build_testcase(&testcase).unwrap();
        let outcome = loaded.solve().unwrap();

        let expected = loaded
            .expected
            .as_ref()
            .unwrap_or_else(|| panic!("{} declares no result", path.display()));
        let mismatches = check_result(expected, &loaded.pool, &outcome);
        assert!(
            mismatches.is_empty(),
            "{}: {}",
            path.display(),
            mismatches.join(", ")
        );
    }
}

#[test]
fn test_fixtures_are_deterministic() {
    for path in fixtures() {
        let loaded = build_testcase(&load_testcase(&path).unwrap()).unwrap();
        let first = loaded.solve().unwrap();
        let second = loaded.solve().unwrap();
        assert_eq!(first, second, "{} differs between runs", path.display());
    }
}

#[test]
fn test_write_and_reload_testcase() {
    let temp_dir = TempDir::new().unwrap();
    let original = load_testcase(&data_dir().join("update_obsoletes.json")).unwrap();

    let path = temp_dir.path().join("copy.json");
    write_testcase(&path, &original).unwrap();
    let reloaded = load_testcase(&path).unwrap();

    let before = build_testcase(&original).unwrap();
    let after = build_testcase(&reloaded).unwrap();
    assert_eq!(before.solve().unwrap(), after.solve().unwrap());
    assert_eq!(reloaded.result, original.result);
}

#[test]
fn test_relaxing_a_fixture_job() {
    let mut testcase = load_testcase(&data_dir().join("hard_obsoletes.json")).unwrap();
    testcase.jobs.retain(|job| job.kind != JobKindJson::Lock);

    let loaded = build_testcase(&testcase).unwrap();
    let outcome = loaded.solve().unwrap();
    assert_eq!(
        outcome.transaction().unwrap().describe(&loaded.pool),
        vec!["upgrade old-1.noarch to new-1.noarch".to_string()]
    );
}

#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = load_testcase(&temp_dir.path().join("absent.json"));
    assert!(matches!(result, Err(LoadError::Io(_))));
}

#[test]
fn test_invalid_json() {
    assert!(matches!(parse_testcase("{ \"jobs\": [ }"), Err(LoadError::Parse(_))));
    assert!(matches!(
        parse_testcase(r#"{"jobs": [{"kind": "reinstall", "name": "a"}]}"#),
        Err(LoadError::Parse(_))
    ));
}

#[test]
fn test_job_with_two_selectors_is_rejected() {
    let mut testcase = parse_testcase(r#"{"repositories": [{"name": "main"}]}"#).unwrap();
    let mut job = JobJson::name(JobKindJson::Install, "a");
    job.provides = Some("a".to_string());
    testcase.jobs.push(job);

    match build_testcase(&testcase) {
        Err(LoadError::Validation(msg)) => assert!(msg.contains("exactly one")),
        other => panic!("expected a validation error, got {:?}", other.map(|_| ())),
    }
}
