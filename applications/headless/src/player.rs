//! Playback service wired to a simulated transport and a synthetic library

use crate::commands::{Command, HELP};
use crate::config::HeadlessConfig;
use crate::error::{HeadlessError, Result};
use crate::remote::LoggingRemote;
use musik_core::{InMemoryLibrary, Track, TrackId, TrackList};
use musik_playback::{
    MemoryPreferenceStore, PlaybackService, PlaybackState, PreferenceStore, RepeatMode,
    SimulatedTransport, TomlPreferenceStore,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// What a command produced
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nothing to print
    Done,
    /// Print this
    Text(String),
    /// Leave the command loop
    Quit,
}

/// Snapshot printed by `status`
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub state: PlaybackState,
    pub index: Option<usize>,
    pub next_index: Option<usize>,
    pub count: usize,
    pub track_id: Option<TrackId>,
    pub repeat_mode: RepeatMode,
    pub shuffled: bool,
    pub volume: f64,
    pub muted: bool,
    pub position: f64,
    pub duration: f64,
}

/// URI of synthetic track `id`
pub fn track_uri(id: i64) -> String {
    format!("/music/{:04}.flac", id)
}

pub struct Player {
    pub library: Arc<InMemoryLibrary>,
    pub transport: Arc<SimulatedTransport>,
    pub service: Arc<PlaybackService>,
}

impl Player {
    /// Wire everything up and handle startup on the calling thread
    ///
    /// The saved playback context is restored; if it held no queue, the
    /// playlist is seeded with the whole library. No dispatcher runs yet.
    pub fn build(config: &HeadlessConfig) -> Self {
        let settings = &config.library;
        let library = Arc::new(InMemoryLibrary::with_tracks((1..=settings.tracks as i64).map(
            |id| {
                let mut track = Track::new(id, track_uri(id), format!("Track {}", id))
                    .with_duration(settings.track_seconds);
                track.artist = Some(format!("Artist {}", (id - 1) / 10 + 1));
                track.album = Some(format!("Album {}", (id - 1) / 5 + 1));
                track
            },
        )));
        library.set_latency(Duration::from_millis(settings.latency_ms));

        let preferences: Arc<dyn PreferenceStore> = match &config.preferences_path {
            Some(path) => {
                info!("Preferences at {}", path.display());
                Arc::new(TomlPreferenceStore::new(path.clone()))
            }
            None => Arc::new(MemoryPreferenceStore::new()),
        };

        let transport = Arc::new(SimulatedTransport::new());
        let service = PlaybackService::builder(library.clone(), transport.clone())
            .preferences(preferences)
            .config(config.playback.clone())
            .remote(Arc::new(LoggingRemote::new()))
            .build();
        service.process_pending();

        if service.count() == 0 {
            let ids = (1..=settings.tracks as i64).map(TrackId::new).collect();
            service.copy_from(&TrackList::with_ids(library.clone(), ids));
            service.process_pending();
        }
        info!(
            "Library of {} tracks, playlist of {}",
            library.len(),
            service.count()
        );

        Self {
            library,
            transport,
            service,
        }
    }

    /// Same as [`build`](Self::build), then hand message handling to the
    /// dispatcher thread
    pub fn start(config: &HeadlessConfig) -> Result<Self> {
        let player = Self::build(config);
        player.service.start()?;
        Ok(player)
    }

    /// Current state of the service
    pub fn status(&self) -> Status {
        let service = &self.service;
        Status {
            state: service.playback_state(),
            index: service.index(),
            next_index: service.next_index(),
            count: service.count(),
            track_id: service.playing_track().map(|track| track.id),
            repeat_mode: service.repeat_mode(),
            shuffled: service.is_shuffled(),
            volume: service.volume(),
            muted: service.is_muted(),
            position: service.position(),
            duration: service.duration(),
        }
    }

    /// The playlist, one entry per line, playing entry marked
    pub fn listing(&self) -> String {
        let playing = self.service.index();
        (0..self.service.count())
            .map(|index| {
                let marker = if Some(index) == playing { '>' } else { ' ' };
                match self.service.track(index) {
                    Some(track) => {
                        format!("{} {:3}  {}  [{}]", marker, index, track.title, track.id)
                    }
                    None => format!("{} {:3}  <unavailable>", marker, index),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn execute(&self, command: &Command) -> Result<Reply> {
        let service = &self.service;

        let reply = match *command {
            Command::Play(index) => {
                if !service.play(index) {
                    return Err(HeadlessError::Command(format!(
                        "nothing playable at {}",
                        index
                    )));
                }
                Reply::Done
            }
            Command::Next => {
                if service.next() {
                    Reply::Done
                } else {
                    Reply::Text("no next track".to_string())
                }
            }
            Command::Prev => {
                if service.previous() {
                    Reply::Done
                } else {
                    Reply::Text("no previous track".to_string())
                }
            }
            Command::Pause => {
                service.pause_or_resume();
                Reply::Done
            }
            Command::Stop => {
                service.stop();
                Reply::Done
            }
            Command::Shuffle => {
                service.toggle_shuffle();
                Reply::Done
            }
            Command::Repeat => {
                service.toggle_repeat_mode();
                Reply::Text(format!("repeat {:?}", service.repeat_mode()).to_lowercase())
            }
            Command::Seek(seconds) => {
                service.set_position(seconds);
                Reply::Done
            }
            Command::Volume(volume) => {
                service.set_volume(volume);
                Reply::Done
            }
            Command::Mute => {
                service.toggle_mute();
                Reply::Done
            }
            Command::Delete(index) => {
                let id = service.edit().delete(index)?;
                Reply::Text(format!("removed track {}", id))
            }
            Command::Move { from, to } => {
                service.edit().move_to(from, to)?;
                Reply::Done
            }
            Command::Add(id) => {
                if !(1..=self.library.len() as i64).contains(&id.get()) {
                    return Err(HeadlessError::Command(format!(
                        "no track {} in the library",
                        id
                    )));
                }
                service.edit().add(id);
                Reply::Done
            }
            Command::Clear => {
                service.edit().clear();
                Reply::Done
            }
            Command::List => Reply::Text(self.listing()),
            Command::Status => Reply::Text(
                serde_json::to_string(&self.status())
                    .map_err(|e| HeadlessError::Command(e.to_string()))?,
            ),
            Command::Reload => {
                service.reload_output();
                Reply::Done
            }
            Command::Finish => {
                self.transport.finish_track();
                Reply::Done
            }
            Command::Help => Reply::Text(HELP.to_string()),
            Command::Quit => Reply::Quit,
        };
        Ok(reply)
    }
}
