//! Paths through the spatial grid, segmented per cell.
//!
//! A [`SpatialGridPath`] starts at a position, runs along a direction, and
//! is chopped by the grid into [`PathSegment`]s. The medium system later
//! annotates each segment with the cumulative optical depth at its exit
//! boundary.

use crate::Vec3;

/// One piece of a path lying inside a single cell (or outside the grid).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathSegment {
    /// Cell crossed by this segment, `None` for gaps outside the grid.
    pub cell: Option<usize>,
    /// Length of the segment.
    pub ds: f64,
    /// Cumulative distance from the path origin to the segment exit.
    pub s: f64,
    /// Cumulative optical depth at the segment exit.
    pub tau: f64,
}

/// An ordered sequence of segments along a ray.
#[derive(Clone, Debug)]
pub struct SpatialGridPath {
    position: Vec3,
    direction: Vec3,
    segments: Vec<PathSegment>,
}

impl SpatialGridPath {
    /// Create an empty path starting at `position` along unit `direction`.
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            direction,
            segments: Vec::new(),
        }
    }

    /// Starting position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Propagation direction (unit vector).
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Move the origin and direction; drops any existing segments.
    pub fn set(&mut self, position: Vec3, direction: Vec3) {
        self.position = position;
        self.direction = direction;
        self.segments.clear();
    }

    /// Drop all segments, keeping origin and direction.
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Append a segment of length `ds` in `cell`.
    ///
    /// The cumulative distance is derived from the previous segment; the
    /// optical depth starts out as zero.
    pub fn add_segment(&mut self, cell: Option<usize>, ds: f64) {
        let s = self.total_length() + ds;
        self.segments.push(PathSegment {
            cell,
            ds,
            s,
            tau: 0.0,
        });
    }

    /// The segments in path order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Mutable access to the segments (for optical-depth annotation).
    pub fn segments_mut(&mut self) -> &mut [PathSegment] {
        &mut self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Distance from the origin to the exit of the last segment.
    pub fn total_length(&self) -> f64 {
        self.segments.last().map_or(0.0, |seg| seg.s)
    }

    /// Cumulative optical depth at the exit of the last segment.
    pub fn total_optical_depth(&self) -> f64 {
        self.segments.last().map_or(0.0, |seg| seg.tau)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_distance_tracks_segments() {
        let mut p = SpatialGridPath::new(Vec3::zeros(), Vec3::x());
        p.add_segment(None, 0.5);
        p.add_segment(Some(0), 1.0);
        p.add_segment(Some(1), 2.0);
        let s: Vec<f64> = p.segments().iter().map(|seg| seg.s).collect();
        assert_eq!(s, vec![0.5, 1.5, 3.5]);
        assert_eq!(p.total_length(), 3.5);
    }

    #[test]
    fn set_drops_segments() {
        let mut p = SpatialGridPath::new(Vec3::zeros(), Vec3::x());
        p.add_segment(Some(0), 1.0);
        p.set(Vec3::new(1.0, 0.0, 0.0), Vec3::y());
        assert!(p.is_empty());
        assert_eq!(p.total_optical_depth(), 0.0);
    }
}
