//! Host-side inputs to relocalization
//!
//! The camera, the marker decoder and the AR tracking session all live in
//! the host. These traits are the seams the relocalizer talks through.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::common::types::{Pose, Rotation, Vec3};

/// Supplies camera frames for scan attempts
pub trait FrameSource: Send {
    /// Get the frame source name
    fn name(&self) -> &str;

    /// Begin producing frames
    fn start(&mut self);

    /// Stop producing frames
    fn stop(&mut self);

    /// Whether a fresh frame is available for a scan attempt at `now`
    fn poll_frame(&mut self, now: Duration) -> bool;
}

/// Offers a frame at a fixed cadence while running (desktop webcam)
#[derive(Debug)]
pub struct PollingFrameSource {
    interval: Duration,
    running: bool,
    last_offer: Option<Duration>,
}

impl PollingFrameSource {
    pub fn new(interval: Duration) -> Self {
        PollingFrameSource {
            interval,
            running: false,
            last_offer: None,
        }
    }
}

impl FrameSource for PollingFrameSource {
    fn name(&self) -> &str {
        "PollingFrameSource"
    }

    fn start(&mut self) {
        self.running = true;
        self.last_offer = None;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn poll_frame(&mut self, now: Duration) -> bool {
        if !self.running {
            return false;
        }
        let due = match self.last_offer {
            Some(last) => now.saturating_sub(last) > self.interval,
            None => true,
        };
        if due {
            self.last_offer = Some(now);
        }
        due
    }
}

/// Host-side handle that reports camera frames to a [`CameraFeedFrameSource`]
#[derive(Debug, Clone, Default)]
pub struct CameraFeed {
    frames: Arc<AtomicU64>,
}

impl CameraFeed {
    /// Called by the host each time the AR camera produces a frame
    pub fn frame_received(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }
}

/// Offers a frame whenever the device camera delivered one since the last poll
#[derive(Debug, Default)]
pub struct CameraFeedFrameSource {
    feed: CameraFeed,
    running: bool,
    seen: u64,
}

impl CameraFeedFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the host's camera callback
    pub fn feed(&self) -> CameraFeed {
        self.feed.clone()
    }

    fn frame_count(&self) -> u64 {
        self.feed.frames.load(Ordering::Relaxed)
    }
}

impl FrameSource for CameraFeedFrameSource {
    fn name(&self) -> &str {
        "CameraFeedFrameSource"
    }

    fn start(&mut self) {
        self.running = true;
        // Frames that arrived while stopped are stale
        self.seen = self.frame_count();
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn poll_frame(&mut self, _now: Duration) -> bool {
        if !self.running {
            return false;
        }
        let count = self.frame_count();
        if count == self.seen {
            return false;
        }
        self.seen = count;
        true
    }
}

/// Result of polling an outstanding decode request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodePoll {
    /// Still decoding
    Pending,
    /// The frame contained no readable marker
    NoMarker,
    /// The marker payload
    Decoded(String),
}

/// Decodes markers from the latest frame, possibly over several ticks
pub trait MarkerDecoder: Send {
    /// Ask for the latest frame to be decoded
    fn request_decode(&mut self);

    /// Poll the outstanding request
    fn poll_decode(&mut self) -> DecodePoll;

    /// Drop the outstanding request. Its result must not surface from a later poll.
    fn cancel(&mut self);
}

/// Supplies the user's current tracked pose on demand
pub trait PoseSource: Send {
    fn user_pose(&self) -> Pose;
}

/// One-shot correction for the tracking origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    /// Subtracted from the tracking origin position
    pub offset: Vec3,
    /// Replaces the tracking origin rotation
    pub rotation: Rotation,
}

/// Applies relocalization corrections to the tracking origin
pub trait TransformApplier: Send {
    fn apply_correction(&mut self, correction: &Correction);
}
