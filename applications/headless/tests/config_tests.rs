//! Loading the harness configuration

use musik_headless::{HeadlessConfig, HeadlessError};
use std::io::Write;
use std::path::PathBuf;

#[test]
fn file_values_override_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
preferences_path = "/var/lib/musik/prefs.toml"

[playback]
seek_debounce_ms = 250
played_fraction = 0.5

[library]
tracks = 7
"#
    )
    .unwrap();

    let config = HeadlessConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.playback.seek_debounce_ms, 250);
    assert_eq!(config.playback.played_fraction, 0.5);
    assert_eq!(config.playback.track_query_timeout_ms, 5000);
    assert_eq!(config.library.tracks, 7);
    assert_eq!(config.library.track_seconds, 180.0);
    assert_eq!(
        config.preferences_path,
        Some(PathBuf::from("/var/lib/musik/prefs.toml"))
    );
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = HeadlessConfig::load(Some(dir.path().join("absent.toml").as_path()));
    assert!(matches!(result, Err(HeadlessError::Config(_))));
}

#[test]
fn defaults_without_a_file() {
    let config = HeadlessConfig::load(None).unwrap();
    assert_eq!(config.library.tracks, 20);
    assert_eq!(config.playback.seek_debounce_ms, 500);
}
