use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::TempDir;

const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

fn build_assets() -> TempDir {
    let dir = TempDir::new().expect("temp asset dir");
    let models = dir.path().join("models");
    std::fs::create_dir(&models).expect("models dir");

    for name in ["rocket", "moon", "ufo", "meteorite", "meteorite2", "title"] {
        let mut file = std::fs::File::create(models.join(format!("{name}.obj"))).expect("model");
        file.write_all(TRIANGLE_OBJ.as_bytes()).expect("write model");
    }

    let manifest = r#"<assets>
  <asset><name>rocket</name><path>models/rocket.obj</path></asset>
  <asset><name>moon</name><path>models/moon.obj</path></asset>
  <asset><name>ufo</name><path>models/ufo.obj</path></asset>
  <asset><name>meteorite</name><path>models/meteorite.obj</path><kind>cluster</kind></asset>
  <asset><name>meteorite2</name><path>models/meteorite2.obj</path><kind>cluster</kind></asset>
  <asset><name>title</name><path>models/title.obj</path><kind>overlay</kind></asset>
</assets>
"#;
    std::fs::write(dir.path().join("scene.xml"), manifest).expect("write manifest");
    dir
}

#[test]
fn headless_run_reports_exact_rotations() {
    let assets = build_assets();
    let mut cmd = Command::cargo_bin("space-scene").expect("binary exists");
    cmd.arg(assets.path().join("scene.xml"))
        .arg("--summary-only")
        .arg("--frames")
        .arg("100");
    cmd.assert()
        .success()
        .stdout(contains("Loaded manifest with 6 assets"))
        .stdout(contains("Final state after 100 frames:"))
        .stdout(contains("rocket rot=(0.0000, 0.0000, 0.3500)"))
        .stdout(contains("moon rot=(0.0500, 0.0000, 0.0000)"))
        .stdout(contains("planet rot=(0.0000, 0.0000, 0.1000)"))
        .stdout(contains("sun rot=(-0.0600"))
        .stdout(contains("ufo rot=(0.0000, -0.7000, 0.0000)"))
        .stdout(contains("stars count=8000 yaw=-0.1000 velocity=0.2000"))
        .stdout(contains("overlay opacity=0.43"));
}

#[test]
fn missing_assets_leave_groups_empty_but_run_succeeds() {
    let dir = TempDir::new().expect("temp dir");
    let manifest = r#"<assets>
  <asset><name>rocket</name><path>models/missing.obj</path></asset>
</assets>
"#;
    std::fs::write(dir.path().join("scene.xml"), manifest).expect("write manifest");

    let mut cmd = Command::cargo_bin("space-scene").expect("binary exists");
    cmd.arg(dir.path().join("scene.xml"))
        .arg("--summary-only")
        .arg("--frames")
        .arg("10");
    cmd.assert()
        .success()
        .stdout(contains("Final state after 10 frames:"));
}

#[test]
fn unknown_flag_is_rejected() {
    let assets = build_assets();
    let mut cmd = Command::cargo_bin("space-scene").expect("binary exists");
    cmd.arg(assets.path().join("scene.xml")).arg("--bogus");
    cmd.assert().failure().stderr(contains("Unknown argument"));
}

#[test]
fn missing_manifest_is_an_error() {
    let mut cmd = Command::cargo_bin("space-scene").expect("binary exists");
    cmd.arg("/nonexistent/scene.xml").arg("--summary-only");
    cmd.assert()
        .failure()
        .stderr(contains("failed to read manifest"));
}
