//! Navigation module: route geometry and turn-by-turn cueing
pub mod path;
pub mod turn_cues;

pub use path::PathCorners;
pub use turn_cues::{AnnouncedTurn, CueReport, TurnCueEngine, TurnDirection};
