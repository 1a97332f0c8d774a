use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn help_mentions_overrides() {
    let mut cmd = cargo_bin_cmd!("wordcount");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--deadline"))
        .stdout(predicate::str::contains("--workers"))
        .stdout(predicate::str::contains("--fetch-timeout"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn missing_documents_fail_validation() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("wordcount");
    cmd.current_dir(dir.path())
        .env_remove("WORDCOUNT_CONFIG_PATH")
        .env_remove("WORDCOUNT_CONFIG_JSON")
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one document URI"));
}

#[test]
fn relative_uri_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("wordcount");
    cmd.current_dir(dir.path())
        .env_remove("WORDCOUNT_CONFIG_PATH")
        .env_remove("WORDCOUNT_CONFIG_JSON")
        .arg("not/absolute")
        .assert()
        .failure()
        .stderr(predicate::str::contains("absolute URI"));
}
