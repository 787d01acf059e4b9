//! Perception module: marker relocalization against known anchors
pub mod anchors;
pub mod localization;
pub mod sensors;

pub use anchors::{Anchor, AnchorRegistry};
pub use localization::{AttemptStart, RelocalizationOutcome, Relocalizer, ScanState};
pub use sensors::{
    CameraFeed, CameraFeedFrameSource, Correction, DecodePoll, FrameSource, MarkerDecoder,
    PollingFrameSource, PoseSource, TransformApplier,
};
