use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_entries(path: &Path, entries: &Value) {
    fs::write(path, serde_json::to_string_pretty(entries).expect("render")).expect("write entries");
}

fn three_entries() -> Value {
    json!([
        {
            "id": "guid-a",
            "title": "First",
            "link": "https://news.example/a",
            "description": "<p>a</p>",
            "published": "2025-11-09T10:00:00+01:00"
        },
        {
            "id": "guid-b",
            "title": "Second",
            "link": "https://news.example/b",
            "published": "2025-11-09T11:00:00+01:00"
        },
        {
            "id": "guid-c",
            "title": "Third",
            "link": "https://news.example/c",
            "published": "2025-11-09T12:00:00+01:00"
        }
    ])
}

#[test]
fn ingest_archives_new_entries_and_resubmission_adds_nothing() {
    let tmp = tempdir().expect("tempdir");
    let vault_home = tmp.path().join("vault");
    let entries_file = tmp.path().join("entries.json");
    write_entries(&entries_file, &three_entries());

    let assert = assert_cmd::cargo::cargo_bin_cmd!("newsvault")
        .current_dir(tmp.path())
        .env("NEWSVAULT_HOME", &vault_home)
        .arg("ingest")
        .args(["--entries", entries_file.to_str().expect("utf8 path")])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let added: Vec<Value> = serde_json::from_str(&stdout).expect("added json");
    assert_eq!(added.len(), 3);

    let partition = vault_home.join("data/2025/11/09-11.json");
    assert!(partition.exists());

    // Same three entries again: the cycle archives nothing.
    assert_cmd::cargo::cargo_bin_cmd!("newsvault")
        .current_dir(tmp.path())
        .env("NEWSVAULT_HOME", &vault_home)
        .arg("ingest")
        .args(["--entries", entries_file.to_str().expect("utf8 path")])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]").trim());

    let stored: Vec<Value> =
        serde_json::from_str(&fs::read_to_string(&partition).expect("partition")).expect("json");
    assert_eq!(stored.len(), 3);
}

#[test]
fn empty_cycle_leaves_index_and_stats_untouched() {
    let tmp = tempdir().expect("tempdir");
    let vault_home = tmp.path().join("vault");
    let entries_file = tmp.path().join("entries.json");
    write_entries(&entries_file, &three_entries());

    assert_cmd::cargo::cargo_bin_cmd!("newsvault")
        .current_dir(tmp.path())
        .env("NEWSVAULT_HOME", &vault_home)
        .arg("ingest")
        .args(["--entries", entries_file.to_str().expect("utf8 path")])
        .assert()
        .success();

    let stats_path = vault_home.join("global_index/stats.json");
    let pagination_path = vault_home.join("global_index/pagination.json");
    let stats_before = fs::read(&stats_path).expect("stats");
    let pagination_before = fs::read(&pagination_path).expect("pagination");

    assert_cmd::cargo::cargo_bin_cmd!("newsvault")
        .current_dir(tmp.path())
        .env("NEWSVAULT_HOME", &vault_home)
        .arg("ingest")
        .args(["--entries", entries_file.to_str().expect("utf8 path")])
        .assert()
        .success();

    assert_eq!(fs::read(&stats_path).expect("stats"), stats_before);
    assert_eq!(
        fs::read(&pagination_path).expect("pagination"),
        pagination_before
    );
}

#[test]
fn entries_spanning_two_days_build_two_partitions() {
    let tmp = tempdir().expect("tempdir");
    let vault_home = tmp.path().join("vault");
    let entries_file = tmp.path().join("entries.json");
    write_entries(
        &entries_file,
        &json!([
            {
                "id": "late",
                "title": "Late november",
                "link": "https://news.example/late",
                "published": "2025-11-30T23:00:00+01:00"
            },
            {
                "id": "early",
                "title": "Early december",
                "link": "https://news.example/early",
                "published": "2025-12-01T00:30:00+01:00"
            }
        ]),
    );

    assert_cmd::cargo::cargo_bin_cmd!("newsvault")
        .current_dir(tmp.path())
        .env("NEWSVAULT_HOME", &vault_home)
        .arg("ingest")
        .args(["--entries", entries_file.to_str().expect("utf8 path")])
        .assert()
        .success();

    assert!(vault_home.join("data/2025/11/30-11.json").exists());
    assert!(vault_home.join("data/2025/12/01-12.json").exists());
    assert!(vault_home.join("data/2025/11/month_manifest.json").exists());
    assert!(vault_home.join("data/2025/12/month_manifest.json").exists());
    assert!(vault_home.join("data/2025/year_manifest.json").exists());
}
