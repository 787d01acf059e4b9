//! Audio announcements for turn-by-turn guidance
pub mod cues;
pub mod scheduler;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use self::cues::CueId;

/// Plays audio clips for cues. Decoding and mixing happen in the host.
pub trait AudioPlayer: Send {
    /// Start playing `cue`; its clip is nominally `duration` long
    fn play(&mut self, cue: &CueId, duration: Duration);

    /// Silence whatever is playing
    fn stop(&mut self);
}

/// Logs play requests instead of sounding them
#[derive(Debug, Default)]
pub struct LogAudioPlayer;

impl AudioPlayer for LogAudioPlayer {
    fn play(&mut self, cue: &CueId, duration: Duration) {
        log::info!("Now playing: {} ({:.1}s)", cue, duration.as_secs_f64());
    }

    fn stop(&mut self) {
        log::debug!("Audio stopped");
    }
}

/// What a [`RecordingPlayer`] was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Played(CueId),
    Stopped,
}

/// Records play requests; clones share one log
#[derive(Debug, Clone, Default)]
pub struct RecordingPlayer {
    events: Arc<Mutex<Vec<PlayerEvent>>>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Cues played so far, oldest first
    pub fn played(&self) -> Vec<CueId> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PlayerEvent::Played(cue) => Some(cue),
                PlayerEvent::Stopped => None,
            })
            .collect()
    }
}

impl AudioPlayer for RecordingPlayer {
    fn play(&mut self, cue: &CueId, _duration: Duration) {
        if let Ok(mut events) = self.events.lock() {
            events.push(PlayerEvent::Played(cue.clone()));
        }
    }

    fn stop(&mut self) {
        if let Ok(mut events) = self.events.lock() {
            events.push(PlayerEvent::Stopped);
        }
    }
}
