//! Wayfinding configuration loaded from YAML

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::cues::{CueCatalog, CueId};
use crate::common::types::{Rotation, Vec3};
use crate::error::{Result, WayfindingError};
use crate::perception::anchors::{Anchor, AnchorRegistry};

/// Turn and proximity cueing parameters (meters, degrees, seconds)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSection {
    /// Minimum absolute turn angle that gets announced
    pub turn_threshold_deg: f64,
    /// Distance to a corner at which its turn is announced
    pub turn_announce_distance: f64,
    /// Distance to the destination at which the proximity alert plays
    pub destination_announce_distance: f64,
    /// Silence kept after each cue before the next may start
    pub announcement_cooldown_secs: f64,
}

impl Default for AudioSection {
    fn default() -> Self {
        AudioSection {
            turn_threshold_deg: 30.0,
            turn_announce_distance: 3.0,
            destination_announce_distance: 5.0,
            announcement_cooldown_secs: 0.5,
        }
    }
}

impl AudioSection {
    pub fn announcement_cooldown(&self) -> Duration {
        saturating_duration(self.announcement_cooldown_secs)
    }
}

/// Marker scanning parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningSection {
    /// Cadence of the polling frame source
    pub scan_interval_secs: f64,
    /// Time spent in cooldown after a successful fix
    pub success_cooldown_secs: f64,
    /// An attempt outstanding longer than this is abandoned
    pub attempt_timeout_secs: f64,
}

impl Default for ScanningSection {
    fn default() -> Self {
        ScanningSection {
            scan_interval_secs: 0.5,
            success_cooldown_secs: 0.5,
            attempt_timeout_secs: 5.0,
        }
    }
}

impl ScanningSection {
    pub fn scan_interval(&self) -> Duration {
        saturating_duration(self.scan_interval_secs)
    }

    pub fn success_cooldown(&self) -> Duration {
        saturating_duration(self.success_cooldown_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        saturating_duration(self.attempt_timeout_secs)
    }
}

/// A named anchor as written in the config file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnchorEntry {
    pub id: String,
    pub position: [f64; 3],
    /// Quaternion as `[x, y, z, w]`; identity when omitted
    #[serde(default)]
    pub rotation: Option<[f64; 4]>,
}

impl AnchorEntry {
    fn to_anchor(&self) -> Anchor {
        let [x, y, z] = self.position;
        let rotation = match self.rotation {
            Some([qx, qy, qz, qw]) => {
                Rotation::from_quaternion(nalgebra::Quaternion::new(qw, qx, qy, qz))
            }
            None => Rotation::identity(),
        };
        Anchor::new(&self.id, Vec3::new(x, y, z), rotation)
    }
}

/// An audio cue and the nominal length of its clip
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CueEntry {
    pub id: String,
    pub duration_secs: f64,
}

fn default_cues() -> Vec<CueEntry> {
    [
        (CueId::TURN_LEFT, 1.2),
        (CueId::TURN_RIGHT, 1.2),
        (CueId::DISTANCE_ALERT, 2.0),
        (CueId::DESTINATION_REACHED, 1.8),
    ]
    .into_iter()
    .map(|(id, duration_secs)| CueEntry {
        id: id.to_string(),
        duration_secs,
    })
    .collect()
}

/// Full wayfinding configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WayfindingConfig {
    #[serde(default)]
    pub audio: AudioSection,

    #[serde(default)]
    pub scanning: ScanningSection,

    /// Anchors that markers may resolve to
    #[serde(default)]
    pub anchors: Vec<AnchorEntry>,

    /// Cue clips known to the audio player
    #[serde(default = "default_cues")]
    pub cues: Vec<CueEntry>,
}

impl Default for WayfindingConfig {
    fn default() -> Self {
        WayfindingConfig {
            audio: AudioSection::default(),
            scanning: ScanningSection::default(),
            anchors: Vec::new(),
            cues: default_cues(),
        }
    }
}

impl WayfindingConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| WayfindingError::ConfigIo(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&contents)
    }

    /// Load from the default config path (configs/wayfinding.yaml)
    pub fn load_default() -> Result<Self> {
        let path = Path::new("configs/wayfinding.yaml");
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WayfindingConfig =
            serde_yaml::from_str(yaml).map_err(|e| WayfindingError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is in range and every id is unique
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        check_angle("turn_threshold_deg", audio.turn_threshold_deg)?;
        check_non_negative("turn_announce_distance", audio.turn_announce_distance)?;
        check_non_negative(
            "destination_announce_distance",
            audio.destination_announce_distance,
        )?;
        check_duration("announcement_cooldown_secs", audio.announcement_cooldown_secs)?;

        let scanning = &self.scanning;
        check_positive_duration("scan_interval_secs", scanning.scan_interval_secs)?;
        check_duration("success_cooldown_secs", scanning.success_cooldown_secs)?;
        check_positive_duration("attempt_timeout_secs", scanning.attempt_timeout_secs)?;

        let mut seen = HashSet::new();
        for anchor in &self.anchors {
            if anchor.id.is_empty() {
                return Err(WayfindingError::invalid("anchors.id", "must not be empty"));
            }
            if !anchor.position.iter().all(|v| v.is_finite()) {
                return Err(WayfindingError::invalid(
                    "anchors.position",
                    format!("non-finite coordinate for `{}`", anchor.id),
                ));
            }
            if !seen.insert(anchor.id.as_str()) {
                return Err(WayfindingError::DuplicateAnchor(anchor.id.clone()));
            }
        }

        for cue in &self.cues {
            if cue.id.is_empty() {
                return Err(WayfindingError::invalid("cues.id", "must not be empty"));
            }
            check_positive_duration("cues.duration_secs", cue.duration_secs)?;
        }

        Ok(())
    }

    /// Build the anchor registry described by this config
    pub fn anchor_registry(&self) -> Result<AnchorRegistry> {
        AnchorRegistry::new(self.anchors.iter().map(AnchorEntry::to_anchor))
    }

    /// Build the cue catalog described by this config
    pub fn cue_catalog(&self) -> CueCatalog {
        let mut catalog = CueCatalog::new();
        for cue in &self.cues {
            catalog.insert(CueId::new(&cue.id), saturating_duration(cue.duration_secs));
        }
        catalog
    }
}

pub(crate) fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(WayfindingError::invalid(name, "must be a non-negative number"));
    }
    Ok(())
}

pub(crate) fn check_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(WayfindingError::invalid(name, "must be positive"));
    }
    Ok(())
}

/// Seconds as a [`Duration`]; a value that does not fit is rejected
pub(crate) fn check_duration(name: &str, secs: f64) -> Result<Duration> {
    check_non_negative(name, secs)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| WayfindingError::invalid(name, "is too large for a duration"))
}

pub(crate) fn check_positive_duration(name: &str, secs: f64) -> Result<Duration> {
    check_positive(name, secs)?;
    check_duration(name, secs)
}

// Getters on unvalidated sections clamp instead of panicking
fn saturating_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

pub(crate) fn check_angle(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=180.0).contains(&value) {
        return Err(WayfindingError::invalid(name, "must be within [0, 180] degrees"));
    }
    Ok(())
}
