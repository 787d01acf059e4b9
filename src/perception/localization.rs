//! Marker relocalization
//!
//! A decoded marker names an anchor. When the anchor is known, the user's
//! tracking frame is shifted so the user stands on the anchor, and its
//! rotation is reset to identity. Heading is not solved for: the user is
//! assumed to be facing the way the map expects when they scan.
//!
//! Scanning is governed by [`ScanState`]:
//!
//! ```text
//! Idle --start--> Enabled --attempt--> InProgress --success--> Cooldown --elapsed--> Idle
//!                    ^                      |
//!                    +--- no marker / unknown marker / timeout
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::anchors::AnchorRegistry;
use super::sensors::{Correction, FrameSource};
use crate::common::notify::Notifier;
use crate::common::timer::{DeferredTimers, TimerHandle};
use crate::common::types::{Rotation, Vec3};
use crate::config::{check_duration, check_positive_duration, ScanningSection};
use crate::error::{Result, WayfindingError};
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};

/// Scanning state, one per navigation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Not scanning. Initial state, and where scanning rests after a fix.
    #[default]
    Idle,
    /// Scanning; waiting for a frame to start an attempt
    Enabled,
    /// One attempt is outstanding
    InProgress,
    /// A fix was just applied; scanning is winding down
    Cooldown,
}

/// Result of [`Relocalizer::begin_attempt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStart {
    Started,
    /// An attempt is already outstanding
    Busy,
    /// Scanning is not enabled
    NotScanning,
}

/// Result of handing a decode result to the relocalizer
#[derive(Debug, Clone, PartialEq)]
pub enum RelocalizationOutcome {
    /// The marker matched an anchor; apply this correction
    Relocalized {
        anchor_id: String,
        correction: Correction,
    },
    /// The frame contained no marker
    NoMarker,
    /// The marker does not name a registered anchor
    UnknownMarker(String),
    /// No attempt was outstanding, so the result was dropped
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanEvent {
    CooldownElapsed,
    AttemptTimedOut,
}

/// Maps decoded markers to anchor corrections and owns the scan state machine
pub struct Relocalizer {
    base: LifecycleNodeBase,
    registry: AnchorRegistry,
    frame_source: Box<dyn FrameSource>,
    notifier: Arc<dyn Notifier>,
    state: ScanState,
    timers: DeferredTimers<ScanEvent>,
    attempt_timer: Option<TimerHandle>,
    success_cooldown: Duration,
    attempt_timeout: Duration,
}

impl Relocalizer {
    /// Create a relocalizer over a fixed anchor registry
    pub fn new(
        registry: AnchorRegistry,
        frame_source: Box<dyn FrameSource>,
        notifier: Arc<dyn Notifier>,
        scanning: &ScanningSection,
    ) -> Self {
        Relocalizer {
            base: LifecycleNodeBase::new("relocalizer"),
            registry,
            frame_source,
            notifier,
            state: ScanState::Idle,
            timers: DeferredTimers::new(),
            attempt_timer: None,
            success_cooldown: scanning.success_cooldown(),
            attempt_timeout: scanning.attempt_timeout(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Turn scanning on. Returns false if scanning was already running.
    pub fn start_scanning(&mut self) -> bool {
        if self.state != ScanState::Idle {
            log::debug!("start_scanning ignored in state {:?}", self.state);
            return false;
        }
        self.state = ScanState::Enabled;
        self.frame_source.start();
        log::info!("Scanning started with {}", self.frame_source.name());
        self.notifier.notify("Scanning started");
        true
    }

    /// Turn scanning off from any state, abandoning an outstanding attempt
    pub fn stop_scanning(&mut self) -> bool {
        if self.state == ScanState::Idle {
            return false;
        }
        self.timers.clear();
        self.attempt_timer = None;
        self.frame_source.stop();
        self.state = ScanState::Idle;
        self.notifier.notify("Scanning stopped");
        true
    }

    /// Mark the start of a scan attempt. At most one attempt is outstanding.
    pub fn begin_attempt(&mut self, now: Duration) -> AttemptStart {
        match self.state {
            ScanState::Enabled => {
                self.state = ScanState::InProgress;
                self.attempt_timer = Some(self.timers.schedule(
                    now,
                    self.attempt_timeout,
                    ScanEvent::AttemptTimedOut,
                ));
                log::debug!("Scan attempt started");
                AttemptStart::Started
            }
            ScanState::InProgress => {
                log::debug!("Scan attempt rejected: one is already in progress");
                AttemptStart::Busy
            }
            ScanState::Idle | ScanState::Cooldown => AttemptStart::NotScanning,
        }
    }

    /// Start an attempt if scanning and the frame source has a frame ready
    pub fn poll_frame_source(&mut self, now: Duration) -> bool {
        if self.state != ScanState::Enabled || !self.frame_source.poll_frame(now) {
            return false;
        }
        self.begin_attempt(now) == AttemptStart::Started
    }

    /// Handle the decode result of the outstanding attempt.
    ///
    /// `user_position` is the user's tracked world position when the result arrives.
    pub fn on_decode_result(
        &mut self,
        payload: Option<&str>,
        user_position: Vec3,
        now: Duration,
    ) -> RelocalizationOutcome {
        if self.state != ScanState::InProgress {
            log::warn!("Decode result dropped: no attempt in progress ({:?})", self.state);
            return RelocalizationOutcome::Ignored;
        }
        if let Some(handle) = self.attempt_timer.take() {
            self.timers.cancel(handle);
        }

        let payload = match payload {
            Some(payload) => payload,
            None => {
                self.state = ScanState::Enabled;
                self.notifier.notify("No marker detected");
                return RelocalizationOutcome::NoMarker;
            }
        };

        let anchor = match self.registry.lookup(payload) {
            Some(anchor) => anchor,
            None => {
                log::warn!("Marker `{}` does not match any anchor", payload);
                self.state = ScanState::Enabled;
                self.notifier.notify("Location not found");
                return RelocalizationOutcome::UnknownMarker(payload.to_string());
            }
        };

        let correction = Correction {
            offset: user_position - anchor.pose.position,
            rotation: Rotation::identity(),
        };
        log::info!(
            "Relocalized on `{}`: offset ({:.3}, {:.3}, {:.3})",
            anchor.id,
            correction.offset.x,
            correction.offset.y,
            correction.offset.z
        );
        let anchor_id = anchor.id.clone();

        self.state = ScanState::Cooldown;
        self.frame_source.stop();
        self.timers.schedule(now, self.success_cooldown, ScanEvent::CooldownElapsed);
        self.notifier.notify(&format!("Location found: {}", anchor_id));
        self.notifier.notify("Scanning completed");

        RelocalizationOutcome::Relocalized {
            anchor_id,
            correction,
        }
    }

    /// Fire due timers: cooldown expiry and stuck attempts
    pub fn advance(&mut self, now: Duration) {
        for event in self.timers.drain_due(now) {
            match event {
                ScanEvent::CooldownElapsed if self.state == ScanState::Cooldown => {
                    self.state = ScanState::Idle;
                    self.notifier.notify("Scanning stopped");
                }
                ScanEvent::AttemptTimedOut if self.state == ScanState::InProgress => {
                    log::warn!("Scan attempt timed out after {:?}", self.attempt_timeout);
                    self.attempt_timer = None;
                    self.state = ScanState::Enabled;
                    self.notifier.notify("Scan timed out");
                }
                stale => log::trace!("Ignoring stale scan event {:?}", stale),
            }
        }
    }

    /// Retune timings at runtime
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        let cooldown = match params.get("success_cooldown_secs") {
            Some(&secs) => Some(check_duration("success_cooldown_secs", secs)?),
            None => None,
        };
        let timeout = match params.get("attempt_timeout_secs") {
            Some(&secs) => Some(check_positive_duration("attempt_timeout_secs", secs)?),
            None => None,
        };

        if let Some(cooldown) = cooldown {
            self.success_cooldown = cooldown;
        }
        if let Some(timeout) = timeout {
            self.attempt_timeout = timeout;
        }
        Ok(())
    }
}

impl LifecycleNode for Relocalizer {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn on_configure(&mut self) -> Result<()> {
        if self.registry.is_empty() {
            log::warn!("Relocalizer configured with no anchors; every marker will be unknown");
        }
        self.base.transition("configure", State::Unconfigured, State::Inactive)
    }

    fn on_activate(&mut self) -> Result<()> {
        self.base.transition("activate", State::Inactive, State::Active)
    }

    fn on_deactivate(&mut self) -> Result<()> {
        self.stop_scanning();
        self.base.transition("deactivate", State::Active, State::Inactive)
    }

    fn on_cleanup(&mut self) -> Result<()> {
        if self.state != ScanState::Idle {
            return Err(WayfindingError::Lifecycle {
                component: self.base.name.clone(),
                transition: "clean up",
                state: format!("{:?}", self.state),
            });
        }
        self.base.transition("clean up", State::Inactive, State::Unconfigured)
    }

    fn on_shutdown(&mut self) -> Result<()> {
        self.base.transition("shut down", State::Unconfigured, State::Finalized)
    }
}
