//! Turn-by-turn cue generation
//!
//! Every tick the engine checks the user's distance to the destination and
//! looks for the first corner along the path that is close enough to announce
//! and sharp enough to count as a turn. Turns are measured about +Y; a
//! positive signed angle is a right turn.

use std::collections::HashMap;

use super::path::{corner_triples, polyline_length, PathCorners};
use crate::audio::cues::CueId;
use crate::audio::scheduler::AnnouncementScheduler;
use crate::common::types::{up, Vec3};
use crate::config::{check_angle, check_non_negative, AudioSection};
use crate::error::Result;

/// Segments shorter than this have no direction
const MIN_SEGMENT_LENGTH: f64 = 1e-6;

/// Which way a turn goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Classify a signed angle about the up axis
    pub fn from_signed_angle(angle_deg: f64) -> Self {
        if angle_deg > 0.0 {
            TurnDirection::Right
        } else {
            TurnDirection::Left
        }
    }

    pub fn cue(self) -> CueId {
        match self {
            TurnDirection::Left => CueId::turn_left(),
            TurnDirection::Right => CueId::turn_right(),
        }
    }
}

/// A turn that was announced this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnouncedTurn {
    pub direction: TurnDirection,
    pub corner: Vec3,
    pub angle_deg: f64,
}

/// What one evaluation requested from the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CueReport {
    /// The user is within announce range of the destination
    pub near_destination: bool,
    pub turn: Option<AnnouncedTurn>,
}

/// Signed angle in degrees from `from` to `to` about `axis`.
///
/// `None` when either vector is too short to have a direction.
pub fn signed_angle_deg(from: &Vec3, to: &Vec3, axis: &Vec3) -> Option<f64> {
    let from = from.try_normalize(MIN_SEGMENT_LENGTH)?;
    let to = to.try_normalize(MIN_SEGMENT_LENGTH)?;
    let unsigned = from.dot(&to).clamp(-1.0, 1.0).acos().to_degrees();
    let sign = if axis.dot(&from.cross(&to)) < 0.0 { -1.0 } else { 1.0 };
    Some(unsigned * sign)
}

/// Detects upcoming turns and destination proximity and requests cues
#[derive(Debug, Clone)]
pub struct TurnCueEngine {
    turn_threshold_deg: f64,
    turn_announce_distance: f64,
    destination_announce_distance: f64,
    // Exact position of the last corner announced
    last_announced_turn: Option<Vec3>,
    route: Option<(PathCorners, Vec3)>,
}

impl TurnCueEngine {
    pub fn new(audio: &AudioSection) -> Self {
        TurnCueEngine {
            turn_threshold_deg: audio.turn_threshold_deg,
            turn_announce_distance: audio.turn_announce_distance,
            destination_announce_distance: audio.destination_announce_distance,
            last_announced_turn: None,
            route: None,
        }
    }

    pub fn last_announced_turn(&self) -> Option<Vec3> {
        self.last_announced_turn
    }

    pub fn route(&self) -> Option<(&PathCorners, Vec3)> {
        self.route.as_ref().map(|(path, destination)| (path, *destination))
    }

    /// Replace the stored route wholesale. An invalid path clears it.
    pub fn on_path_updated(&mut self, corners: Vec<Vec3>, destination: Vec3) {
        match PathCorners::new(corners) {
            Some(path) => {
                log::debug!("Route updated: {} corners, {:.2}m", path.len(), path.length());
                self.route = Some((path, destination));
            }
            None => {
                log::warn!("Invalid path corners array");
                self.route = None;
            }
        }
    }

    /// Evaluate the stored route for the user's current position
    pub fn tick(
        &mut self,
        user_position: Vec3,
        scheduler: &mut AnnouncementScheduler,
    ) -> CueReport {
        match self.route.take() {
            Some((path, destination)) => {
                let report = self.on_update(user_position, path.as_slice(), destination, scheduler);
                self.route = Some((path, destination));
                report
            }
            None => CueReport::default(),
        }
    }

    /// Evaluate one tick against `corners` and `destination`
    pub fn on_update(
        &mut self,
        user_position: Vec3,
        corners: &[Vec3],
        destination: Vec3,
        scheduler: &mut AnnouncementScheduler,
    ) -> CueReport {
        if corners.len() < 2 {
            log::warn!("Invalid path corners array ({} corners)", corners.len());
            return CueReport::default();
        }

        let near_destination = self.check_destination(
            user_position,
            destination,
            corners,
            scheduler,
        );
        let turn = self.detect_turn(user_position, corners);
        if let Some(turn) = &turn {
            log::info!("Queuing turn: {:?} at {:?}", turn.direction, turn.corner);
            scheduler.enqueue(&turn.direction.cue());
            self.last_announced_turn = Some(turn.corner);
        }

        CueReport {
            near_destination,
            turn,
        }
    }

    /// Retune thresholds at runtime
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        if let Some(&threshold) = params.get("turn_threshold_deg") {
            check_angle("turn_threshold_deg", threshold)?;
        }
        if let Some(&distance) = params.get("turn_announce_distance") {
            check_non_negative("turn_announce_distance", distance)?;
        }
        if let Some(&distance) = params.get("destination_announce_distance") {
            check_non_negative("destination_announce_distance", distance)?;
        }

        if let Some(&threshold) = params.get("turn_threshold_deg") {
            self.turn_threshold_deg = threshold;
        }
        if let Some(&distance) = params.get("turn_announce_distance") {
            self.turn_announce_distance = distance;
        }
        if let Some(&distance) = params.get("destination_announce_distance") {
            self.destination_announce_distance = distance;
        }
        Ok(())
    }

    fn check_destination(
        &self,
        user_position: Vec3,
        destination: Vec3,
        corners: &[Vec3],
        scheduler: &mut AnnouncementScheduler,
    ) -> bool {
        let remaining = (destination - user_position).norm();
        if remaining > self.destination_announce_distance {
            return false;
        }
        log::debug!(
            "Near destination ({:.2}m, route {:.2}m)",
            remaining,
            polyline_length(corners)
        );
        scheduler.enqueue(&CueId::distance_alert());
        true
    }

    // First corner in path order that qualifies wins, even if a nearer one comes later
    fn detect_turn(&self, user_position: Vec3, corners: &[Vec3]) -> Option<AnnouncedTurn> {
        for (i, previous, corner, next) in corner_triples(corners) {
            if (corner - user_position).norm() > self.turn_announce_distance {
                continue;
            }
            if self.last_announced_turn == Some(*corner) {
                continue;
            }

            let Some(angle) = signed_angle_deg(&(corner - previous), &(next - corner), &up()) else {
                log::debug!("Turn check at point {}: degenerate segment", i);
                continue;
            };
            log::debug!("Turn check at point {}: {:.1}°", i, angle);

            if angle.abs() > self.turn_threshold_deg {
                return Some(AnnouncedTurn {
                    direction: TurnDirection::from_signed_angle(angle),
                    corner: *corner,
                    angle_deg: angle,
                });
            }
        }

        log::debug!("No valid turns detected in path");
        None
    }
}
