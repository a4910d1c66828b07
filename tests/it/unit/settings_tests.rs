//! Unit tests for settings.

use pdfshelf::settings::{Settings, default_settings_path};
use pdfshelf::types::ThumbnailSize;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.cache_dir, PathBuf::from("thumbnail_cache"));
    assert_eq!(settings.thumbnail_size(), ThumbnailSize::new(100, 140));
    assert_eq!(settings.render_scale, 2.0);
    assert!(settings.pdfium_library_path.is_none());
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, r#"{ "cache_dir": "/tmp/thumbs", "thumbnail_width": 200 }"#).unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.cache_dir, PathBuf::from("/tmp/thumbs"));
    assert_eq!(settings.thumbnail_width, 200);
    assert_eq!(settings.thumbnail_height, 140);
}

#[test]
fn test_out_of_range_values_are_clamped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{ "thumbnail_width": 1, "thumbnail_height": 100000, "render_scale": 50.0 }"#,
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.thumbnail_width, 16);
    assert_eq!(settings.thumbnail_height, 1024);
    assert_eq!(settings.render_scale, 8.0);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(Settings::load_from(&path).is_err());
}

#[test]
fn test_save_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/settings.json");
    let settings = Settings {
        cache_dir: PathBuf::from("cache"),
        thumbnail_width: 120,
        thumbnail_height: 160,
        render_scale: 1.5,
        pdfium_library_path: Some(PathBuf::from("/opt/pdfium")),
    };

    settings.save_to(&path).unwrap();
    assert_eq!(Settings::load_from(&path).unwrap(), settings);
}

#[test]
fn test_default_path() {
    // None only when the platform has no config dir (e.g. HOME unset)
    if let Some(path) = default_settings_path() {
        assert!(path.ends_with("pdfshelf/settings.json"));
    }
}
