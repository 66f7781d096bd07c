mod common;

use common::{suite_dir, write_suite};
use restsuite::discovery::SuiteDiscoverer;

fn names(dir: &std::path::Path) -> Vec<String> {
    SuiteDiscoverer::new("Api", dir)
        .discover()
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect()
}

#[test]
fn dependencies_order_suites_regardless_of_file_order() {
    // SuiteB sorts first on disk but depends on SuiteA.
    let dir = suite_dir(&[
        ("A/SuiteBTest.yaml", "depends: [Api.Z.SuiteATest]\ncases:\n  - { name: b, test: true }\n"),
        ("Z/SuiteATest.yaml", "cases:\n  - { name: a, test: true }\n"),
    ]);
    assert_eq!(names(dir.path()), ["Api.Z.SuiteATest", "Api.A.SuiteBTest"]);
}

#[test]
fn chained_dependencies() {
    let dir = suite_dir(&[
        ("AaTest.yaml", "depends: [Api.BbTest]\n"),
        ("BbTest.yaml", "depends: [Api.CcTest]\n"),
        ("CcTest.yml", "cases: []\n"),
    ]);
    assert_eq!(names(dir.path()), ["Api.CcTest", "Api.BbTest", "Api.AaTest"]);
}

#[test]
fn ignored_suites_and_other_files_are_skipped() {
    let dir = suite_dir(&[
        ("UserTest.yaml", "cases:\n  - { name: list, test: true }\n"),
        ("LegacyTest.yaml", "ignore: true\n"),
        ("fixtures/users.yaml", "not: a suite\n"),
        ("README.md", "# docs\n"),
    ]);
    assert_eq!(names(dir.path()), ["Api.UserTest"]);
}

#[test]
fn json_suites_are_discovered() {
    let dir = suite_dir(&[("PingTest.json", r#"{"cases": [{"name": "ping", "test": true}]}"#)]);
    let suites = SuiteDiscoverer::new("", dir.path()).discover().unwrap();
    assert_eq!(suites[0].name, "PingTest");
    assert_eq!(suites[0].cases[0].name, "ping");
}

#[test]
fn missing_suite_dependency_is_a_configuration_error() {
    let dir = suite_dir(&[("UserTest.yaml", "depends: [Api.AuthTest]\n")]);
    let err = SuiteDiscoverer::new("Api", dir.path()).discover().unwrap_err();
    assert_eq!(err.kind(), "ConfigurationError");
    assert!(err.to_string().contains("Dependency suite \"Api.AuthTest\" not found"));
}

#[test]
fn ignored_dependency_is_not_loadable() {
    let dir = suite_dir(&[
        ("AuthTest.yaml", "ignore: true\n"),
        ("PingTest.yaml", "cases: []\n"),
        ("UserTest.yaml", "depends: [Api.AuthTest]\n"),
    ]);
    let err = SuiteDiscoverer::new("Api", dir.path()).discover().unwrap_err();
    assert!(err.to_string().contains("dependencies do not exist for \"Api.AuthTest\""), "{err}");
}

#[test]
fn mutual_suite_dependency_is_cyclic() {
    let dir = suite_dir(&[
        ("AuthTest.yaml", "depends: [Api.UserTest]\n"),
        ("UserTest.yaml", "depends: [Api.AuthTest]\n"),
        ("PingTest.yaml", "cases: []\n"),
    ]);
    let err = SuiteDiscoverer::new("Api", dir.path()).discover().unwrap_err();
    assert!(err.to_string().contains("cyclic"), "{err}");
}

#[test]
fn malformed_suite_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    write_suite(dir.path(), "BrokenTest.yaml", "cases: [\n");
    let err = SuiteDiscoverer::new("Api", dir.path()).discover().unwrap_err();
    assert_eq!(err.kind(), "LoadError");
}

#[test]
fn cases_are_ordered_within_a_suite() {
    let dir = suite_dir(&[(
        "UserTest.yaml",
        r#"
cases:
  - { name: delete_user, test: true, depends: [update_user] }
  - { name: update_user, test: true, depends: [create_user] }
  - { name: create_user, test: true }
  - { name: setup, test: true }
"#,
    )]);
    let suites = SuiteDiscoverer::new("Api", dir.path()).discover().unwrap();
    let cases: Vec<_> = suites[0].cases.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(cases, ["create_user", "update_user", "delete_user"]);
}
