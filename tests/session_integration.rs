use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use approx::assert_abs_diff_eq;
use wayfinder_core::audio::cues::CueId;
use wayfinder_core::audio::RecordingPlayer;
use wayfinder_core::common::notify::RecordingNotifier;
use wayfinder_core::common::types::{Pose, Rotation, Vec3};
use wayfinder_core::config::WayfindingConfig;
use wayfinder_core::navigation::TurnDirection;
use wayfinder_core::perception::{
    CameraFeed, CameraFeedFrameSource, Correction, DecodePoll, FrameSource, MarkerDecoder,
    PollingFrameSource, PoseSource, RelocalizationOutcome, ScanState, TransformApplier,
};
use wayfinder_core::{NavigationSession, SessionHost};

const CONFIG: &str = r#"
audio:
  turn_threshold_deg: 30
  turn_announce_distance: 3
  destination_announce_distance: 5
  announcement_cooldown_secs: 0.5
scanning:
  scan_interval_secs: 0.5
  success_cooldown_secs: 0.5
  attempt_timeout_secs: 2.0
anchors:
  - id: lobby
    position: [2.0, 0.0, 3.0]
  - id: lab
    position: [20.0, 0.0, -5.0]
cues:
  - id: turn_left
    duration_secs: 1.0
  - id: turn_right
    duration_secs: 1.0
  - id: distance_alert
    duration_secs: 2.0
  - id: destination_reached
    duration_secs: 1.5
"#;

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

#[derive(Debug, Default)]
struct Tracking {
    position: Vec3,
    corrections: Vec<Correction>,
}

#[derive(Clone, Default)]
struct SharedTracking(Arc<Mutex<Tracking>>);

impl SharedTracking {
    fn set_position(&self, position: Vec3) {
        self.0.lock().unwrap().position = position;
    }

    fn position(&self) -> Vec3 {
        self.0.lock().unwrap().position
    }

    fn corrections(&self) -> Vec<Correction> {
        self.0.lock().unwrap().corrections.clone()
    }
}

impl PoseSource for SharedTracking {
    fn user_pose(&self) -> Pose {
        Pose::from_position(self.position())
    }
}

impl TransformApplier for SharedTracking {
    fn apply_correction(&mut self, correction: &Correction) {
        let mut tracking = self.0.lock().unwrap();
        tracking.position -= correction.offset;
        tracking.corrections.push(*correction);
    }
}

/// Hands out queued results; an empty script means the decode is still running.
/// Cancelling drops whatever result was waiting.
#[derive(Clone, Default)]
struct ScriptedDecoder {
    results: Arc<Mutex<VecDeque<DecodePoll>>>,
    requests: Arc<Mutex<u32>>,
}

impl ScriptedDecoder {
    fn push(&self, result: DecodePoll) {
        self.results.lock().unwrap().push_back(result);
    }

    fn requests(&self) -> u32 {
        *self.requests.lock().unwrap()
    }
}

impl MarkerDecoder for ScriptedDecoder {
    fn request_decode(&mut self) {
        *self.requests.lock().unwrap() += 1;
    }

    fn poll_decode(&mut self) -> DecodePoll {
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(DecodePoll::Pending)
    }

    fn cancel(&mut self) {
        self.results.lock().unwrap().clear();
    }
}

struct Harness {
    session: NavigationSession,
    tracking: SharedTracking,
    decoder: ScriptedDecoder,
    player: RecordingPlayer,
    notifier: Arc<RecordingNotifier>,
}

fn harness_with(frame_source: Box<dyn FrameSource>) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();

    let config = WayfindingConfig::from_yaml(CONFIG).unwrap();
    let tracking = SharedTracking::default();
    let decoder = ScriptedDecoder::default();
    let player = RecordingPlayer::new();
    let notifier = Arc::new(RecordingNotifier::new());

    let host = SessionHost {
        frame_source,
        decoder: Box::new(decoder.clone()),
        pose_source: Box::new(tracking.clone()),
        transform_applier: Box::new(tracking.clone()),
        audio_player: Box::new(player.clone()),
        notifier: notifier.clone(),
    };
    let mut session = NavigationSession::new(&config, host).unwrap();
    session.init().unwrap();

    Harness {
        session,
        tracking,
        decoder,
        player,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(Box::new(PollingFrameSource::new(secs(0.5))))
}

#[test]
fn scanning_known_marker_relocalizes_user() {
    let mut h = harness();
    h.tracking.set_position(Vec3::new(5.5, 0.2, -1.0));
    h.decoder.push(DecodePoll::Decoded("lobby".to_string()));

    assert!(h.session.start_scanning());
    let report = h.session.tick(secs(0.0));

    match report.relocalization {
        Some(RelocalizationOutcome::Relocalized { anchor_id, .. }) => {
            assert_eq!(anchor_id, "lobby")
        }
        other => panic!("expected relocalization, got {:?}", other),
    }
    assert_abs_diff_eq!(
        (h.tracking.position() - Vec3::new(2.0, 0.0, 3.0)).norm(),
        0.0,
        epsilon = 1e-12
    );
    let corrections = h.tracking.corrections();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].rotation, Rotation::identity());

    assert_eq!(h.session.scan_state(), ScanState::Cooldown);
    h.session.tick(secs(0.5));
    assert_eq!(h.session.scan_state(), ScanState::Idle);
    assert!(h.notifier.contains("Location found: lobby"));
    assert_eq!(h.notifier.last().as_deref(), Some("Scanning stopped"));
}

#[test]
fn unknown_marker_keeps_scanning_without_correction() {
    let mut h = harness();
    h.decoder.push(DecodePoll::Decoded("cafeteria".to_string()));
    h.session.start_scanning();

    let report = h.session.tick(secs(0.0));
    assert_eq!(
        report.relocalization,
        Some(RelocalizationOutcome::UnknownMarker("cafeteria".to_string()))
    );
    assert_eq!(h.session.scan_state(), ScanState::Enabled);
    assert!(h.tracking.corrections().is_empty());
    assert!(h.notifier.contains("Location not found"));

    // Next attempt waits for the polling interval
    h.session.tick(secs(0.3));
    assert_eq!(h.decoder.requests(), 1);
    h.decoder.push(DecodePoll::Decoded("lab".to_string()));
    let report = h.session.tick(secs(0.6));
    assert_eq!(h.decoder.requests(), 2);
    assert!(matches!(
        report.relocalization,
        Some(RelocalizationOutcome::Relocalized { .. })
    ));
}

#[test]
fn pending_decode_blocks_new_attempts_until_timeout() {
    let mut h = harness();
    h.session.start_scanning();

    h.session.tick(secs(0.0));
    assert_eq!(h.session.scan_state(), ScanState::InProgress);
    for t in [0.6, 1.2, 1.8] {
        assert!(h.session.tick(secs(t)).relocalization.is_none());
    }
    assert_eq!(h.decoder.requests(), 1);

    // 2s timeout: abandoned, then a fresh attempt on the next frame
    h.session.tick(secs(2.0));
    assert!(h.notifier.contains("Scan timed out"));
    assert_eq!(h.decoder.requests(), 2);
    assert_eq!(h.session.scan_state(), ScanState::InProgress);
}

#[test]
fn stop_scanning_discards_late_result() {
    let mut h = harness();
    h.session.start_scanning();
    h.session.tick(secs(0.0));
    // Result is ready in the decoder but not yet polled
    h.decoder.push(DecodePoll::Decoded("lobby".to_string()));
    assert!(h.session.stop_scanning());

    let report = h.session.tick(secs(0.1));
    assert!(report.relocalization.is_none());
    assert_eq!(h.session.scan_state(), ScanState::Idle);

    // The stale result must not answer the next attempt
    assert!(h.session.start_scanning());
    let report = h.session.tick(secs(0.2));
    assert!(report.relocalization.is_none());
    assert_eq!(h.decoder.requests(), 2);
    assert_eq!(h.session.scan_state(), ScanState::InProgress);
    assert!(h.tracking.corrections().is_empty());

    h.decoder.push(DecodePoll::Decoded("lab".to_string()));
    match h.session.tick(secs(0.3)).relocalization {
        Some(RelocalizationOutcome::Relocalized { anchor_id, .. }) => assert_eq!(anchor_id, "lab"),
        other => panic!("expected relocalization, got {:?}", other),
    }
}

#[test]
fn timed_out_attempt_discards_late_result() {
    let mut h = harness();
    h.session.start_scanning();
    h.session.tick(secs(0.0));

    // Timeout at 2.0s abandons the attempt; the next frame starts a new one
    h.session.tick(secs(1.9));
    h.decoder.push(DecodePoll::Decoded("lobby".to_string()));
    let report = h.session.tick(secs(2.0));
    assert!(report.relocalization.is_none());
    assert_eq!(h.decoder.requests(), 2);
    assert!(h.tracking.corrections().is_empty());
}

#[test]
fn camera_feed_source_starts_attempt_per_frame() {
    let source = CameraFeedFrameSource::new();
    let feed: CameraFeed = source.feed();
    let mut h = harness_with(Box::new(source));
    h.session.start_scanning();

    h.session.tick(secs(0.0));
    assert_eq!(h.decoder.requests(), 0);

    feed.frame_received();
    h.decoder.push(DecodePoll::NoMarker);
    let report = h.session.tick(secs(0.1));
    assert_eq!(report.relocalization, Some(RelocalizationOutcome::NoMarker));
    assert_eq!(h.decoder.requests(), 1);
    assert!(h.notifier.contains("No marker detected"));
}

#[test]
fn walking_the_route_announces_turn_then_destination() {
    let mut h = harness();
    let corners = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(5.0, 0.0, 0.0),
        Vec3::new(5.0, 0.0, 4.0),
    ];
    let destination = Vec3::new(5.0, 0.0, 4.0);
    h.session.on_path_updated(corners, destination);

    h.tracking.set_position(Vec3::new(1.0, 0.0, 0.0));
    let report = h.session.tick(secs(0.0));
    assert!(report.cues.turn.is_none());
    assert!(report.started_cue.is_none());

    h.tracking.set_position(Vec3::new(4.0, 0.0, 0.0));
    let report = h.session.tick(secs(1.0));
    assert_eq!(report.cues.turn.map(|t| t.direction), Some(TurnDirection::Left));
    assert!(report.cues.near_destination);
    // Destination alert was queued first
    assert_eq!(report.started_cue, Some(CueId::distance_alert()));

    // Alert holds the gate for 2.0s + 0.5s
    assert!(h.session.tick(secs(3.0)).started_cue.is_none());
    assert_eq!(h.session.tick(secs(3.5)).started_cue, Some(CueId::turn_left()));
    assert_eq!(
        h.player.played(),
        vec![CueId::distance_alert(), CueId::turn_left()]
    );
}

#[test]
fn priority_cue_interrupts_queue() {
    let mut h = harness();
    let destination = Vec3::new(10.0, 0.0, 0.0);
    h.session.on_path_updated(vec![Vec3::zeros(), destination], destination);
    h.tracking.set_position(Vec3::new(8.0, 0.0, 0.0));
    h.session.tick(secs(0.0));
    assert!(h.session.scheduler().is_speaking());

    assert!(h.session.play_priority(&CueId::destination_reached(), secs(0.5)));
    assert_eq!(h.session.scheduler().queue_len(), 0);
    assert_eq!(
        h.player.played(),
        vec![CueId::distance_alert(), CueId::destination_reached()]
    );
}

#[test]
fn inactive_session_does_nothing() {
    let mut h = harness();
    h.session.shutdown().unwrap();
    assert!(!h.session.is_active());
    assert!(!h.session.start_scanning());

    h.decoder.push(DecodePoll::Decoded("lobby".to_string()));
    let report = h.session.tick(secs(0.0));
    assert_eq!(report, Default::default());
    assert_eq!(h.decoder.requests(), 0);
}

#[test]
fn session_configure_retunes_components() {
    let mut h = harness();
    let destination = Vec3::new(10.0, 0.0, 0.0);
    h.session.on_path_updated(vec![Vec3::zeros(), destination], destination);

    let mut params = HashMap::new();
    params.insert("announcement_cooldown_secs".to_string(), 1.0e30);
    assert!(h.session.configure(&params).is_err());

    params.clear();
    params.insert("destination_announce_distance".to_string(), 1.0);
    h.session.configure(&params).unwrap();
    h.tracking.set_position(Vec3::new(8.0, 0.0, 0.0));
    assert!(!h.session.tick(secs(0.0)).cues.near_destination);
    h.tracking.set_position(Vec3::new(9.5, 0.0, 0.0));
    assert!(h.session.tick(secs(0.1)).cues.near_destination);
}

#[test]
fn shutdown_is_final() {
    let mut h = harness();
    h.session.shutdown().unwrap();
    assert!(h.session.init().is_err());
    assert!(!h.session.is_active());
}

#[test]
fn shutdown_stops_active_scanning() {
    let mut h = harness();
    h.session.start_scanning();
    h.session.tick(secs(0.0));
    h.session.shutdown().unwrap();
    assert_eq!(h.session.scan_state(), ScanState::Idle);
}
