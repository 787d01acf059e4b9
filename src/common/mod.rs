//! Common utilities and types shared by the wayfinding engines
pub mod notify;
pub mod timer;

/// Common types used across the codebase
pub mod types {
    use nalgebra::{UnitQuaternion, Vector3};

    /// A point or direction in world space (meters, +Y up)
    pub type Vec3 = Vector3<f64>;

    /// An orientation in world space
    pub type Rotation = UnitQuaternion<f64>;

    /// The vertical axis turns are measured about
    pub fn up() -> Vec3 {
        Vector3::y()
    }

    /// A position plus orientation
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Pose {
        pub position: Vec3,
        pub rotation: Rotation,
    }

    impl Pose {
        pub fn new(position: Vec3, rotation: Rotation) -> Self {
            Pose { position, rotation }
        }

        /// A pose at `position` with identity rotation
        pub fn from_position(position: Vec3) -> Self {
            Pose {
                position,
                rotation: Rotation::identity(),
            }
        }
    }
}
