//! Known anchors that decoded markers resolve to

use std::collections::HashMap;

use crate::common::types::{Pose, Rotation, Vec3};
use crate::error::{Result, WayfindingError};

/// A named world pose used as ground truth for relocalization
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub id: String,
    pub pose: Pose,
}

impl Anchor {
    pub fn new(id: &str, position: Vec3, rotation: Rotation) -> Self {
        Anchor {
            id: id.to_string(),
            pose: Pose::new(position, rotation),
        }
    }

    pub fn at(id: &str, position: Vec3) -> Self {
        Anchor::new(id, position, Rotation::identity())
    }
}

/// Immutable lookup table from marker id to anchor
#[derive(Debug, Clone, Default)]
pub struct AnchorRegistry {
    anchors: HashMap<String, Anchor>,
}

impl AnchorRegistry {
    /// Build the registry once; ids must be unique
    pub fn new(anchors: impl IntoIterator<Item = Anchor>) -> Result<Self> {
        let mut map = HashMap::new();
        for anchor in anchors {
            if map.contains_key(&anchor.id) {
                return Err(WayfindingError::DuplicateAnchor(anchor.id));
            }
            map.insert(anchor.id.clone(), anchor);
        }
        log::debug!("Anchor registry loaded with {} anchors", map.len());
        Ok(AnchorRegistry { anchors: map })
    }

    /// Find the anchor registered under `id`
    pub fn lookup(&self, id: &str) -> Option<&Anchor> {
        self.anchors.get(id)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
