//! End-to-end tests for the offline commands

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(
        src.join("user.ts"),
        "import { db } from './db';\n\nexport async function getUser(id: string) {\n  if (id && db) {\n    return db.find(id);\n  }\n  return null;\n}\n",
    )
    .unwrap();
    fs::write(
        src.join("lib.rs"),
        "pub struct Account {\n    pub id: u64,\n}\n\npub fn validate_account(a: &Account) -> bool {\n    a.id > 0\n}\n",
    )
    .unwrap();
    dir
}

fn semcode(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("semcode").unwrap();
    cmd.arg("--root")
        .arg(root)
        .arg("--config")
        .arg(root.join("no-such-config.toml"))
        .env_remove("RUST_LOG")
        .env_remove("SEMCODE_DB");
    cmd
}

#[test]
fn index_reports_files_and_chunks() {
    let dir = project();

    semcode(dir.path())
        .arg("index")
        .assert()
        .success()
        .stdout(predicate::str::contains("Indexing Successful"))
        .stdout(predicate::str::contains("Chunks Written"));

    assert!(dir.path().join(".semcode/index.db").exists());
}

#[test]
fn index_lists_skipped_files_with_reasons() {
    let dir = project();
    let big = format!("// {}\nfunction huge() {{ return 1; }}\n", "x".repeat(250 * 1024));
    fs::write(dir.path().join("src/big.ts"), big).unwrap();

    semcode(dir.path())
        .arg("index")
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed with Warnings"))
        .stdout(predicate::str::contains("src/big.ts"))
        .stdout(predicate::str::contains("byte limit"));
}

#[test]
fn grep_finds_indexed_chunk() {
    let dir = project();
    semcode(dir.path()).arg("index").assert().success();

    semcode(dir.path())
        .args(["grep", "getUser"])
        .assert()
        .success()
        .stdout(predicate::str::contains("getUser"))
        .stdout(predicate::str::contains("src/user.ts:3-8"));
}

#[test]
fn file_json_includes_classification() {
    let dir = project();
    semcode(dir.path()).arg("index").assert().success();

    semcode(dir.path())
        .args(["file", "src/lib.rs", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"Account\""))
        .stdout(predicate::str::contains("\"purpose\": \"validation\""));
}

#[test]
fn stats_counts_chunks() {
    let dir = project();
    semcode(dir.path()).arg("index").assert().success();

    semcode(dir.path())
        .args(["stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"totalFiles\": 2"))
        .stdout(predicate::str::contains("\"totalChunks\": 3"))
        .stdout(predicate::str::contains("\"totalEmbeddings\": 0"));
}

#[test]
fn rules_check_accepts_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("rules.toml");
    fs::write(
        &rules,
        "domains = []\ntype_clusters = []\n\n[purpose]\n\n[[purpose.rules]]\nlabel = \"loader\"\nconditions = [{ name_starts_with = \"load\" }]\n",
    )
    .unwrap();

    semcode(dir.path())
        .args(["rules", "--check"])
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 purpose rules"));
}

#[test]
fn rules_check_flags_unrecognized_condition() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("rules.toml");
    fs::write(
        &rules,
        "domains = []\ntype_clusters = []\n\n[purpose]\n\n[[purpose.rules]]\nlabel = \"loader\"\nconditions = [{ name_starts_with = \"load\" }]\n\n[[purpose.rules]]\nlabel = \"saver\"\nconditions = [{ name_startswith = \"save\" }]\n",
    )
    .unwrap();

    semcode(dir.path())
        .args(["rules", "--check"])
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 purpose rules"))
        .stdout(predicate::str::contains("Rule `saver` in `purpose`"))
        .stdout(predicate::str::contains("name_startswith"));
}

#[test]
fn rules_check_rejects_missing_section() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("rules.toml");
    fs::write(&rules, "[purpose]\ndomains = []\n").unwrap();

    semcode(dir.path())
        .args(["rules", "--check"])
        .arg(&rules)
        .assert()
        .failure()
        .stderr(predicate::str::contains("domains").or(predicate::str::contains("type_clusters")));
}

#[test]
fn rules_prints_builtin_set_by_default() {
    let dir = tempfile::tempdir().unwrap();

    semcode(dir.path())
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("# built-in rules"))
        .stdout(predicate::str::contains("data retrieval"));
}
