use predicates::prelude::*;
use rstest::rstest;

mod common;

#[test]
fn test_classical_prints_three_scenarios() {
    common::nestbox()
        .arg("classical")
        .assert()
        .success()
        .stdout("b0: a0.x 17, a1->x 42\nb1: a0.x 18, a1->x 42\nb2: a0.x 19, a1->x 42\n");
}

#[rstest]
#[case::permissive(&[])]
#[case::strict(&["--strict"])]
fn test_classical_policy_independent(#[case] flags: &[&str]) {
    common::nestbox()
        .args(flags)
        .arg("classical")
        .assert()
        .success()
        .stdout(predicate::str::contains("b2: a0.x 19, a1->x 42"));
}

#[test]
fn test_classical_json() {
    let output = common::nestbox()
        .args(["classical", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["scenario"], "classical");
    assert_eq!(lines[1]["label"], "b1");
    assert_eq!(lines[1]["a0"]["x"], 18);
    assert_eq!(lines[2]["a1"]["x"], 42);
}

#[rstest]
#[case(1)]
#[case(2)]
fn test_classical_budget_exhausted(#[case] budget: usize) {
    common::nestbox()
        .args(["--allocation-budget", &budget.to_string(), "classical"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("allocation failed"));
}

#[test]
fn test_classical_fits_budget_of_three() {
    common::nestbox()
        .args(["--allocation-budget", "3", "classical"])
        .assert()
        .success();
}
