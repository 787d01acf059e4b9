use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wayfinder_core::audio::LogAudioPlayer;
use wayfinder_core::common::notify::LogNotifier;
use wayfinder_core::common::types::{Pose, Vec3};
use wayfinder_core::config::{AnchorEntry, WayfindingConfig};
use wayfinder_core::navigation::path::polyline_length;
use wayfinder_core::perception::{
    Correction, DecodePoll, MarkerDecoder, PollingFrameSource, PoseSource, RelocalizationOutcome,
    TransformApplier,
};
use wayfinder_core::{NavigationSession, SessionHost};

/// Simulated seconds per tick
const SIM_STEP: f64 = 0.1;
/// Real time between ticks
const REAL_STEP: Duration = Duration::from_millis(20);
const WALKING_SPEED: f64 = 1.4;
const MAX_TICKS: u32 = 1000;

/// Ground truth walker plus the tracking frame's error
#[derive(Debug)]
struct Tracking {
    walker: Vec3,
    origin_error: Vec3,
}

struct SimPoseSource(Arc<Mutex<Tracking>>);

impl PoseSource for SimPoseSource {
    fn user_pose(&self) -> Pose {
        let tracking = self.0.lock().unwrap_or_else(|e| e.into_inner());
        Pose::from_position(tracking.walker + tracking.origin_error)
    }
}

struct SimTransformApplier(Arc<Mutex<Tracking>>);

impl TransformApplier for SimTransformApplier {
    fn apply_correction(&mut self, correction: &Correction) {
        let mut tracking = self.0.lock().unwrap_or_else(|e| e.into_inner());
        tracking.origin_error -= correction.offset;
        log::info!(
            "Tracking origin corrected, residual error {:.3}m",
            tracking.origin_error.norm()
        );
    }
}

/// Replays a fixed list of decode results, each taking a couple of ticks
struct ScriptedDecoder {
    script: VecDeque<DecodePoll>,
    current: Option<(u32, DecodePoll)>,
}

impl ScriptedDecoder {
    fn new(script: impl IntoIterator<Item = DecodePoll>) -> Self {
        ScriptedDecoder {
            script: script.into_iter().collect(),
            current: None,
        }
    }
}

impl MarkerDecoder for ScriptedDecoder {
    fn request_decode(&mut self) {
        let result = self.script.pop_front().unwrap_or(DecodePoll::NoMarker);
        self.current = Some((2, result));
    }

    fn poll_decode(&mut self) -> DecodePoll {
        match self.current.take() {
            Some((0, result)) => result,
            Some((remaining, result)) => {
                self.current = Some((remaining - 1, result));
                DecodePoll::Pending
            }
            None => DecodePoll::NoMarker,
        }
    }

    fn cancel(&mut self) {
        self.current = None;
    }
}

/// Point `distance` meters along the polyline, clamped to its end
fn point_along(route: &[Vec3], mut distance: f64) -> Vec3 {
    for segment in route.windows(2) {
        let step = segment[1] - segment[0];
        let length = step.norm();
        if distance <= length && length > 0.0 {
            return segment[0] + step * (distance / length);
        }
        distance -= length;
    }
    route.last().copied().unwrap_or_else(Vec3::zeros)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => WayfindingConfig::load(Path::new(&path))
            .with_context(|| format!("loading config from {}", path))?,
        None => WayfindingConfig::load_default().context("loading default config")?,
    };
    if config.anchors.is_empty() {
        config.anchors.push(AnchorEntry {
            id: "lobby".to_string(),
            position: [0.0, 0.0, 0.0],
            rotation: None,
        });
    }
    let anchor_id = config.anchors[0].id.clone();
    let [ax, ay, az] = config.anchors[0].position;
    let start = Vec3::new(ax, ay, az);

    let route = vec![
        start,
        start + Vec3::new(6.0, 0.0, 0.0),
        start + Vec3::new(6.0, 0.0, 8.0),
        start + Vec3::new(12.0, 0.0, 8.0),
    ];
    let destination = route[route.len() - 1];

    let tracking = Arc::new(Mutex::new(Tracking {
        walker: start,
        origin_error: Vec3::new(2.0, 0.0, -1.5),
    }));
    let host = SessionHost {
        frame_source: Box::new(PollingFrameSource::new(config.scanning.scan_interval())),
        decoder: Box::new(ScriptedDecoder::new([
            DecodePoll::NoMarker,
            DecodePoll::Decoded("unknown-marker".to_string()),
            DecodePoll::Decoded(anchor_id),
        ])),
        pose_source: Box::new(SimPoseSource(Arc::clone(&tracking))),
        transform_applier: Box::new(SimTransformApplier(Arc::clone(&tracking))),
        audio_player: Box::new(LogAudioPlayer),
        notifier: Arc::new(LogNotifier),
    };

    let mut session = NavigationSession::new(&config, host).context("building session")?;
    session.init()?;
    session.on_path_updated(route.clone(), destination);
    session.start_scanning();

    let mut interval = tokio::time::interval(REAL_STEP);
    let mut relocalized = false;
    let mut walked = 0.0;
    let route_length = polyline_length(&route);

    for tick in 0..MAX_TICKS {
        interval.tick().await;
        let now = Duration::from_secs_f64(tick as f64 * SIM_STEP);

        if relocalized && walked < route_length {
            walked = (walked + WALKING_SPEED * SIM_STEP).min(route_length);
            let mut state = tracking.lock().unwrap_or_else(|e| e.into_inner());
            state.walker = point_along(&route, walked);
        }

        let report = session.tick(now);
        if let Some(RelocalizationOutcome::Relocalized { anchor_id, .. }) = &report.relocalization {
            log::info!(
                "Relocalized on {} at t={:.1}s, starting walk",
                anchor_id,
                now.as_secs_f64()
            );
            relocalized = true;
        }

        let scheduler = session.scheduler();
        if walked >= route_length && !scheduler.is_speaking() && scheduler.queue_len() == 0 {
            log::info!("Arrived after {:.1}s", now.as_secs_f64());
            break;
        }
    }

    session.shutdown()?;
    Ok(())
}
