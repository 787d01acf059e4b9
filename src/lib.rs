pub mod audio;
pub mod common;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod navigation;
pub mod perception;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::cues::CueId;
use crate::audio::scheduler::AnnouncementScheduler;
use crate::audio::AudioPlayer;
use crate::common::notify::Notifier;
use crate::common::types::Vec3;
use crate::config::WayfindingConfig;
use crate::error::Result;
use crate::lifecycle::LifecycleNode;
use crate::navigation::{CueReport, TurnCueEngine};
use crate::perception::{
    DecodePoll, FrameSource, MarkerDecoder, PoseSource, RelocalizationOutcome, Relocalizer,
    ScanState, TransformApplier,
};

/// Host collaborators the session pulls from and pushes to
pub struct SessionHost {
    pub frame_source: Box<dyn FrameSource>,
    pub decoder: Box<dyn MarkerDecoder>,
    pub pose_source: Box<dyn PoseSource>,
    pub transform_applier: Box<dyn TransformApplier>,
    pub audio_player: Box<dyn AudioPlayer>,
    pub notifier: Arc<dyn Notifier>,
}

/// What happened during one session tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickReport {
    /// Set when a decode result was handled this tick
    pub relocalization: Option<RelocalizationOutcome>,
    pub cues: CueReport,
    /// Cue the scheduler started playing this tick
    pub started_cue: Option<CueId>,
}

/// One navigation session: relocalization, turn cueing and announcements
/// driven by a single cooperative tick
pub struct NavigationSession {
    relocalizer: Relocalizer,
    scheduler: AnnouncementScheduler,
    turn_cues: TurnCueEngine,
    decoder: Box<dyn MarkerDecoder>,
    pose_source: Box<dyn PoseSource>,
    transform_applier: Box<dyn TransformApplier>,
    decode_outstanding: bool,
    active: bool,
}

impl NavigationSession {
    /// Build the engines described by `config` around the host collaborators
    pub fn new(config: &WayfindingConfig, host: SessionHost) -> Result<Self> {
        config.validate()?;
        let relocalizer = Relocalizer::new(
            config.anchor_registry()?,
            host.frame_source,
            host.notifier,
            &config.scanning,
        );
        let scheduler =
            AnnouncementScheduler::new(config.cue_catalog(), host.audio_player, &config.audio);

        Ok(NavigationSession {
            relocalizer,
            scheduler,
            turn_cues: TurnCueEngine::new(&config.audio),
            decoder: host.decoder,
            pose_source: host.pose_source,
            transform_applier: host.transform_applier,
            decode_outstanding: false,
            active: false,
        })
    }

    fn components(&mut self) -> [&mut dyn LifecycleNode; 2] {
        [&mut self.relocalizer, &mut self.scheduler]
    }

    /// Configure and activate every component
    pub fn init(&mut self) -> Result<()> {
        for component in self.components() {
            component.on_configure()?;
            component.on_activate()?;
            log::debug!("{} active", component.name());
        }
        self.active = true;
        Ok(())
    }

    /// Deactivate, clean up and finalize every component. The session
    /// cannot be initialized again afterwards.
    pub fn shutdown(&mut self) -> Result<()> {
        self.active = false;
        self.abandon_decode();
        for component in self.components() {
            component.on_deactivate()?;
            component.on_cleanup()?;
            component.on_shutdown()?;
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn scan_state(&self) -> ScanState {
        self.relocalizer.state()
    }

    pub fn scheduler(&self) -> &AnnouncementScheduler {
        &self.scheduler
    }

    /// Retune components at runtime. Each component checks its own keys and
    /// leaves its settings untouched when one of them is rejected.
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        self.turn_cues.configure(params)?;
        self.relocalizer.configure(params)?;
        self.scheduler.configure(params)
    }

    /// User-initiated scan start
    pub fn start_scanning(&mut self) -> bool {
        if !self.active {
            log::warn!("start_scanning called on an inactive session");
            return false;
        }
        self.relocalizer.start_scanning()
    }

    pub fn stop_scanning(&mut self) -> bool {
        self.abandon_decode();
        self.relocalizer.stop_scanning()
    }

    /// New route from the path planner; replaces the previous one
    pub fn on_path_updated(&mut self, corners: Vec<Vec3>, destination: Vec3) {
        self.turn_cues.on_path_updated(corners, destination);
    }

    /// Play a high-priority cue immediately
    pub fn play_priority(&mut self, cue: &CueId, now: Duration) -> bool {
        self.active && self.scheduler.play_priority(cue, now)
    }

    /// Advance the session to `now` (time since the session started)
    pub fn tick(&mut self, now: Duration) -> TickReport {
        if !self.active {
            return TickReport::default();
        }

        let relocalization = self.tick_relocalization(now);
        let user = self.pose_source.user_pose();
        let cues = self.turn_cues.tick(user.position, &mut self.scheduler);
        let started_cue = self.scheduler.tick(now);

        TickReport {
            relocalization,
            cues,
            started_cue,
        }
    }

    fn tick_relocalization(&mut self, now: Duration) -> Option<RelocalizationOutcome> {
        self.relocalizer.advance(now);

        if self.relocalizer.state() != ScanState::InProgress {
            self.abandon_decode();
        }
        if !self.decode_outstanding && self.relocalizer.poll_frame_source(now) {
            self.decoder.request_decode();
            self.decode_outstanding = true;
        }
        if !self.decode_outstanding {
            return None;
        }

        let payload = match self.decoder.poll_decode() {
            DecodePoll::Pending => return None,
            DecodePoll::NoMarker => None,
            DecodePoll::Decoded(payload) => Some(payload),
        };
        self.decode_outstanding = false;

        let user = self.pose_source.user_pose();
        let outcome = self
            .relocalizer
            .on_decode_result(payload.as_deref(), user.position, now);
        if let RelocalizationOutcome::Relocalized { correction, .. } = &outcome {
            self.transform_applier.apply_correction(correction);
        }
        Some(outcome)
    }

    fn abandon_decode(&mut self) {
        if self.decode_outstanding {
            log::debug!("Outstanding decode abandoned");
            self.decoder.cancel();
            self.decode_outstanding = false;
        }
    }
}
