use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn imgsan(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("imgsan");
    cmd.env("IMGSAN_HOME", home)
        .env_remove("IMGSAN_IMAGE_BACKEND")
        .env_remove("RUST_LOG");
    cmd
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
    .save_with_format(&path, image::ImageFormat::Png)
    .unwrap();
    path
}

#[test]
fn test_help_shows_all_commands() {
    let home = TempDir::new().unwrap();
    imgsan(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sanitize"))
        .stdout(predicate::str::contains("sniff"))
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("resize"))
        .stdout(predicate::str::contains("backend"));
}

#[test]
fn test_sniff_reports_png() {
    let home = TempDir::new().unwrap();
    let png = write_png(home.path(), "shot.jpg", 8, 8);

    imgsan(home.path())
        .arg("sniff")
        .arg(&png)
        .assert()
        .success()
        .stdout("image/png\n");
}

#[test]
fn test_sniff_unknown_bytes() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("notes.txt");
    std::fs::write(&file, "plain text, nothing to see").unwrap();

    imgsan(home.path())
        .arg("sniff")
        .arg(&file)
        .assert()
        .success()
        .stdout("unknown\n");
}

#[test]
fn test_sanitize_empty_image_becomes_placeholder() {
    let home = TempDir::new().unwrap();
    let input = json!({
        "content": [
            {"type": "text", "text": "captured"},
            {"type": "image", "data": "", "mimeType": "image/png"}
        ],
        "details": {"source": "browser"}
    });

    let output = imgsan(home.path())
        .args(["sanitize", "--tool", "screenshot"])
        .write_stdin(input.to_string())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(
        value,
        json!({
            "content": [
                {"type": "text", "text": "captured"},
                {"type": "text", "text": "[screenshot] omitted empty image payload"}
            ],
            "details": {"source": "browser"}
        })
    );
}

#[test]
fn test_sanitize_read_empty_image_fails_with_path() {
    let home = TempDir::new().unwrap();
    let input = json!({
        "content": [
            {"type": "text", "text": "Read image file [image/png]"},
            {"type": "image", "data": "", "mimeType": "image/png"}
        ]
    });

    imgsan(home.path())
        .args(["sanitize", "--tool", "read", "--path", "/work/empty.png"])
        .write_stdin(input.to_string())
        .assert()
        .failure()
        .stderr(predicate::str::contains("/work/empty.png"));
}

#[test]
fn test_sanitize_rejects_invalid_json() {
    let home = TempDir::new().unwrap();
    imgsan(home.path())
        .arg("sanitize")
        .write_stdin("not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse tool result"));
}

#[test]
fn test_backend_override_flag() {
    let home = TempDir::new().unwrap();
    imgsan(home.path())
        .args(["--backend", "external-tool", "backend"])
        .assert()
        .success()
        .stdout("external-tool\n");
}

#[test]
fn test_backend_override_env() {
    let home = TempDir::new().unwrap();
    imgsan(home.path())
        .env("IMGSAN_IMAGE_BACKEND", "native")
        .arg("backend")
        .assert()
        .success()
        .stdout("native\n");
}

#[test]
fn test_config_generate_prints_defaults() {
    let home = TempDir::new().unwrap();
    imgsan(home.path())
        .args(["config", "generate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_dimension_px = 2000"))
        .stdout(predicate::str::contains("jpeg_quality = 85"));
}

#[test]
fn test_config_path_uses_home() {
    let home = TempDir::new().unwrap();
    imgsan(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[cfg(feature = "native")]
#[test]
fn test_probe_and_resize_with_native_backend() {
    let home = TempDir::new().unwrap();
    let png = write_png(home.path(), "wide.png", 400, 200);
    let out = home.path().join("small.png");

    imgsan(home.path())
        .args(["--backend", "native", "probe"])
        .arg(&png)
        .assert()
        .success()
        .stdout("400x200\n");

    imgsan(home.path())
        .args(["--backend", "native", "resize", "--max-side", "100"])
        .arg(&png)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("image/png "));

    let resized = image::open(&out).unwrap();
    assert_eq!((resized.width(), resized.height()), (100, 50));
}
