//! Route polylines supplied by the external path planner

use crate::common::types::Vec3;

/// An ordered polyline of at least two corners
#[derive(Debug, Clone, PartialEq)]
pub struct PathCorners {
    corners: Vec<Vec3>,
}

impl PathCorners {
    /// Wrap `corners`, or `None` if there are fewer than two
    pub fn new(corners: Vec<Vec3>) -> Option<Self> {
        if corners.len() < 2 {
            return None;
        }
        Some(PathCorners { corners })
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.corners
    }

    pub fn len(&self) -> usize {
        self.corners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    /// Total length of the polyline in meters
    pub fn length(&self) -> f64 {
        polyline_length(&self.corners)
    }
}

/// Sum of segment lengths; zero for fewer than two points
pub fn polyline_length(corners: &[Vec3]) -> f64 {
    corners.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// Consecutive corner triples `(p[i], p[i+1], p[i+2])` in path order
pub fn corner_triples(corners: &[Vec3]) -> impl Iterator<Item = (usize, &Vec3, &Vec3, &Vec3)> {
    corners
        .windows(3)
        .enumerate()
        .map(|(i, w)| (i, &w[0], &w[1], &w[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn short_paths_are_rejected() {
        assert!(PathCorners::new(vec![]).is_none());
        assert!(PathCorners::new(vec![Vec3::zeros()]).is_none());
        assert!(PathCorners::new(vec![Vec3::zeros(), Vec3::x()]).is_some());
    }

    #[test]
    fn length_sums_segments() {
        let path = PathCorners::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 5.0),
            Vec3::new(8.0, 4.0, 5.0),
        ])
        .unwrap();
        assert_relative_eq!(path.length(), 15.0, epsilon = 1e-12);
    }

    #[test]
    fn triples_walk_in_order() {
        let corners = [Vec3::zeros(), Vec3::x(), Vec3::y(), Vec3::z()];
        let middles: Vec<_> = corner_triples(&corners).map(|(i, _, m, _)| (i, *m)).collect();
        assert_eq!(middles, vec![(0, Vec3::x()), (1, Vec3::y())]);
        assert_eq!(corner_triples(&corners[..2]).count(), 0);
    }
}
