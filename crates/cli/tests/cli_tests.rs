//! CLI integration tests
use std::path::Path;

use image::{Rgba, RgbaImage};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("portada")
}

fn write_png(path: &Path, w: u32, h: u32, color: [u8; 4]) {
    RgbaImage::from_pixel(w, h, Rgba(color)).save(path).unwrap();
}

/// Settings pointing the logo at a red square in `dir`, with PNG output.
fn write_settings(dir: &Path) -> String {
    let logo = dir.join("logo.png");
    write_png(&logo, 10, 10, [255, 0, 0, 255]);

    let settings = dir.join("settings.json");
    let body = json!({
        "logo": { "logo_file": logo, "logo_position": "top-left", "logo_margin": 0 },
        "output": { "format": "png" }
    });
    std::fs::write(&settings, body.to_string()).unwrap();
    settings.to_string_lossy().into_owned()
}

#[test]
fn test_cli_requires_input() {
    cmd()
        .args(["--caption", "logo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--link"));
}

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--image").and(predicate::str::contains("--editions-dir")));
}

#[test]
fn test_cli_rejects_two_inputs() {
    cmd()
        .args(["--image", "a.png", "--video", "b.mp4"])
        .assert()
        .failure();
}

#[test]
fn test_cli_missing_image() {
    let dir = TempDir::new().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["--image", "no-existe.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_cli_image_with_logo() {
    let dir = TempDir::new().unwrap();
    let settings = write_settings(dir.path());
    let input = dir.path().join("foto.png");
    write_png(&input, 200, 200, [0, 0, 0, 255]);
    let output = dir.path().join("salida.png");

    cmd()
        .current_dir(dir.path())
        .args(["--image", &input.to_string_lossy(), "--caption", "logo", "--settings", &settings])
        .args(["--defaults", "missing-defaults.json", "--output", &output.to_string_lossy()])
        .assert()
        .success()
        .stdout(predicate::str::contains("salida.png"));

    let out = image::open(&output).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (200, 200));
    assert_eq!(out.get_pixel(20, 20), &Rgba([255, 0, 0, 255]));
    assert_eq!(out.get_pixel(100, 100), &Rgba([0, 0, 0, 255]));
}

#[test]
fn test_cli_recorte_without_editions_keeps_image() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("foto.png");
    write_png(&input, 64, 48, [0, 128, 0, 255]);

    cmd()
        .current_dir(dir.path())
        .args(["--image", "foto.png", "--caption", "recorte", "--editions-dir", "sin-ediciones"])
        .args(["--output", "recorte.jpg"])
        .assert()
        .success();

    let out = image::open(dir.path().join("recorte.jpg")).unwrap();
    assert_eq!((out.width(), out.height()), (64, 48));
}

#[test]
fn test_cli_malformed_link() {
    let dir = TempDir::new().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["--link", "htp:/roto"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to generate editions from link"));

    assert!(!dir.path().join("output-recorte.jpg").exists());
}
