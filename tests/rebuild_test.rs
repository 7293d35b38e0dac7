use std::fs;
use tempfile::tempdir;

#[test]
fn rebuild_is_idempotent_and_picks_up_backfilled_days() {
    let tmp = tempdir().expect("tempdir");
    let vault_home = tmp.path().join("vault");
    let month_dir = vault_home.join("data/2025/11");
    fs::create_dir_all(&month_dir).expect("mkdir");
    fs::write(month_dir.join("20-11.json"), "[]\n").expect("touch");

    assert_cmd::cargo::cargo_bin_cmd!("newsvault")
        .current_dir(tmp.path())
        .env("NEWSVAULT_HOME", &vault_home)
        .arg("rebuild")
        .assert()
        .success();

    let manifest_path = month_dir.join("month_manifest.json");
    let first = fs::read(&manifest_path).expect("manifest");

    assert_cmd::cargo::cargo_bin_cmd!("newsvault")
        .current_dir(tmp.path())
        .env("NEWSVAULT_HOME", &vault_home)
        .arg("rebuild")
        .assert()
        .success();
    assert_eq!(fs::read(&manifest_path).expect("manifest"), first);

    // Backfill an earlier day; the next full rebuild lists it without replay.
    fs::write(month_dir.join("02-11.json"), "[]\n").expect("touch");
    assert_cmd::cargo::cargo_bin_cmd!("newsvault")
        .current_dir(tmp.path())
        .env("NEWSVAULT_HOME", &vault_home)
        .args(["rebuild", "--year", "2025", "--month", "11"])
        .assert()
        .success();

    let raw = fs::read_to_string(&manifest_path).expect("manifest");
    assert!(raw.contains("\"20\""));
    assert!(raw.contains("\"02\""));

    assert!(vault_home.join("data/2025/year_manifest.json").exists());
}
