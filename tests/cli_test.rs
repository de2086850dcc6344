//! Command-line integration tests.

use assert_cmd::cargo::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn openskynet() -> Command {
    let mut cmd = Command::new(cargo_bin("openskynet"));
    for var in [
        "OSN_IMAGE",
        "OSN_SERVICE_URL",
        "OSN_MODEL",
        "OSN_OUTPUT",
        "OSN_FORMAT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_actions() {
    openskynet()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("landcover"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_detect_help_lists_options() {
    openskynet()
        .args(["detect", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--window-size"))
        .stdout(predicate::str::contains("--nms"))
        .stdout(predicate::str::contains("--bbox"));
}

#[test]
fn test_config_path() {
    openskynet()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_detect_without_input_fails() {
    openskynet()
        .args(["detect", "--model", "model.onnx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no input specified"));
}

#[test]
fn test_detect_without_model_fails() {
    openskynet()
        .args(["detect", "--image", "scene.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no model specified"));
}

#[test]
fn test_inverted_bbox_rejected() {
    openskynet()
        .args([
            "detect",
            "--image",
            "scene.png",
            "--model",
            "model.onnx",
            "--bbox",
            "11",
            "40",
            "10",
            "41",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("west must be less than east"));
}

#[test]
fn test_tile_service_requires_bbox() {
    openskynet()
        .args([
            "landcover",
            "--service-url",
            "https://tiles.example.com/{z}/{x}/{y}.png",
            "--model",
            "model.onnx",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bbox"));
}

#[test]
fn test_missing_image_reports_source_error() {
    let dir = tempfile::TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let image = dir.path().join("missing.png");

    openskynet()
        .args(["detect", "--no-progress", "-q", "--model", "model.onnx", "--image"])
        .arg(&image)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open image"));
}

#[test]
fn test_out_of_range_confidence_rejected() {
    openskynet()
        .args(["detect", "--confidence", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("confidence must be between"));
}
