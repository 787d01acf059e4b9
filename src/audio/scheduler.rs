//! Announcement scheduling
//!
//! Cues wait in a FIFO queue that never holds the same cue twice. One cue
//! plays at a time: after a cue starts, the scheduler stays "speaking" for
//! the clip's nominal length plus a fixed cooldown, and only then lets the
//! next queued cue start.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use super::cues::{CueCatalog, CueId};
use super::AudioPlayer;
use crate::common::timer::{DeferredTimers, TimerHandle};
use crate::config::{check_duration, AudioSection};
use crate::error::Result;
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};

/// Single-consumer cue queue with a speaking gate
pub struct AnnouncementScheduler {
    base: LifecycleNodeBase,
    catalog: CueCatalog,
    player: Box<dyn AudioPlayer>,
    queue: VecDeque<CueId>,
    speaking: bool,
    timers: DeferredTimers<()>,
    speech_reset: Option<TimerHandle>,
    cooldown: Duration,
}

impl AnnouncementScheduler {
    pub fn new(catalog: CueCatalog, player: Box<dyn AudioPlayer>, audio: &AudioSection) -> Self {
        AnnouncementScheduler {
            base: LifecycleNodeBase::new("announcement_scheduler"),
            catalog,
            player,
            queue: VecDeque::new(),
            speaking: false,
            timers: DeferredTimers::new(),
            speech_reset: None,
            cooldown: audio.announcement_cooldown(),
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_queued(&self, cue: &CueId) -> bool {
        self.queue.contains(cue)
    }

    /// Queue `cue` unless it is already waiting. Returns true if it was added.
    pub fn enqueue(&mut self, cue: &CueId) -> bool {
        if self.duration_of(cue).is_none() {
            return false;
        }
        if self.queue.contains(cue) {
            log::debug!("{} already queued", cue);
            return false;
        }
        log::info!("Queuing audio: {}", cue);
        self.queue.push_back(cue.clone());
        true
    }

    /// Drop everything queued and play `cue` right now, cutting off any cue in progress
    pub fn play_priority(&mut self, cue: &CueId, now: Duration) -> bool {
        let Some(duration) = self.duration_of(cue) else {
            return false;
        };
        log::info!("Playing priority cue: {}", cue);
        self.player.stop();
        self.queue.clear();
        self.start(cue, duration, now);
        true
    }

    /// One scheduling step: release the speaking gate if due, then start the
    /// oldest queued cue if nothing is playing. Returns the cue started.
    pub fn tick(&mut self, now: Duration) -> Option<CueId> {
        if !self.timers.drain_due(now).is_empty() {
            self.speaking = false;
            self.speech_reset = None;
        }
        if self.speaking {
            return None;
        }

        let cue = self.queue.pop_front()?;
        // Catalog is fixed, so anything queued has a duration
        let duration = self.catalog.duration(&cue).unwrap_or_default();
        self.start(&cue, duration, now);
        Some(cue)
    }

    /// Empty the queue and release the speaking gate
    pub fn clear(&mut self) {
        self.queue.clear();
        self.timers.clear();
        self.speech_reset = None;
        if self.speaking {
            self.player.stop();
            self.speaking = false;
        }
    }

    /// Retune the announcement cooldown at runtime
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        if let Some(&cooldown) = params.get("announcement_cooldown_secs") {
            self.cooldown = check_duration("announcement_cooldown_secs", cooldown)?;
        }
        Ok(())
    }

    fn start(&mut self, cue: &CueId, duration: Duration, now: Duration) {
        if let Some(handle) = self.speech_reset.take() {
            self.timers.cancel(handle);
        }
        self.player.play(cue, duration);
        self.speaking = true;
        self.speech_reset = Some(self.timers.schedule(now, duration + self.cooldown, ()));
    }

    fn duration_of(&self, cue: &CueId) -> Option<Duration> {
        if cue.is_empty() {
            log::warn!("Tried to play an empty audio cue");
            return None;
        }
        let duration = self.catalog.duration(cue);
        if duration.is_none() {
            log::warn!("Tried to play unknown audio cue `{}`", cue);
        }
        duration
    }
}

impl LifecycleNode for AnnouncementScheduler {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn on_configure(&mut self) -> Result<()> {
        self.base.transition("configure", State::Unconfigured, State::Inactive)
    }

    fn on_activate(&mut self) -> Result<()> {
        self.base.transition("activate", State::Inactive, State::Active)
    }

    fn on_deactivate(&mut self) -> Result<()> {
        self.clear();
        self.base.transition("deactivate", State::Active, State::Inactive)
    }

    fn on_cleanup(&mut self) -> Result<()> {
        self.base.transition("clean up", State::Inactive, State::Unconfigured)
    }

    fn on_shutdown(&mut self) -> Result<()> {
        self.base.transition("shut down", State::Unconfigured, State::Finalized)
    }
}
