//! Common test utilities and fixtures
#![allow(dead_code)]

use musik_headless::{HeadlessConfig, LibrarySettings, Player};
use std::path::PathBuf;

/// Config with `tracks` synthetic tracks and in-memory preferences
pub fn config(tracks: usize) -> HeadlessConfig {
    HeadlessConfig {
        library: LibrarySettings {
            tracks,
            ..LibrarySettings::default()
        },
        ..HeadlessConfig::default()
    }
}

/// Same as `config`, persisting preferences to `path`
pub fn config_with_prefs(tracks: usize, path: PathBuf) -> HeadlessConfig {
    HeadlessConfig {
        preferences_path: Some(path),
        ..config(tracks)
    }
}

/// Player without a dispatcher thread; call `settle` to handle messages
pub fn player(tracks: usize) -> Player {
    Player::build(&config(tracks))
}

/// Handle every due message on the test thread
pub fn settle(player: &Player) {
    player.service.process_pending();
}
