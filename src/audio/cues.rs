//! Audio cue identifiers and their clip lengths

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Opaque identifier of an audio announcement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CueId(String);

impl CueId {
    pub const TURN_LEFT: &'static str = "turn_left";
    pub const TURN_RIGHT: &'static str = "turn_right";
    pub const DISTANCE_ALERT: &'static str = "distance_alert";
    pub const DESTINATION_REACHED: &'static str = "destination_reached";

    pub fn new(id: &str) -> Self {
        CueId(id.to_string())
    }

    pub fn turn_left() -> Self {
        CueId::new(Self::TURN_LEFT)
    }

    pub fn turn_right() -> Self {
        CueId::new(Self::TURN_RIGHT)
    }

    pub fn distance_alert() -> Self {
        CueId::new(Self::DISTANCE_ALERT)
    }

    pub fn destination_reached() -> Self {
        CueId::new(Self::DESTINATION_REACHED)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Nominal clip durations for every cue the player can sound
#[derive(Debug, Clone, Default)]
pub struct CueCatalog {
    durations: HashMap<CueId, Duration>,
}

impl CueCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cue: CueId, duration: Duration) {
        self.durations.insert(cue, duration);
    }

    /// Builder form of [`CueCatalog::insert`]
    pub fn with(mut self, cue: &str, duration: Duration) -> Self {
        self.insert(CueId::new(cue), duration);
        self
    }

    /// Clip length, or `None` for a cue the player does not know
    pub fn duration(&self, cue: &CueId) -> Option<Duration> {
        self.durations.get(cue).copied()
    }
}
