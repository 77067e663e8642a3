//! Spatial tessellation of the simulation domain.

use std::ops::ControlFlow;

use rand::RngCore;

use crate::path::SpatialGridPath;
use crate::Vec3;

/// Partition of space into cells, able to chop rays into per-cell segments.
///
/// # Thread Safety
///
/// Shared read-only by every transport worker, hence `Send + Sync`.
pub trait SpatialGrid: Send + Sync {
    /// Symmetry dimension of the grid: 1, 2 or 3.
    fn dimension(&self) -> u8;

    /// Number of cells.
    fn num_cells(&self) -> usize;

    /// Volume of cell `m`.
    fn volume(&self, m: usize) -> f64;

    /// Representative position inside cell `m`.
    fn central_position(&self, m: usize) -> Vec3;

    /// Uniformly distributed random position inside cell `m`.
    fn random_position(&self, m: usize, rng: &mut dyn RngCore) -> Vec3;

    /// Walk the ray from `position` along `direction`, calling `visit`
    /// with `(cell, ds)` for each crossed segment in order.
    ///
    /// Segments outside the grid are reported with `cell = None`. The walk
    /// stops early when `visit` returns [`ControlFlow::Break`].
    fn walk(
        &self,
        position: Vec3,
        direction: Vec3,
        visit: &mut dyn FnMut(Option<usize>, f64) -> ControlFlow<()>,
    );

    /// Replace the segments of `path` with the complete tessellation of
    /// its ray.
    fn path(&self, path: &mut SpatialGridPath) {
        let position = path.position();
        let direction = path.direction();
        path.clear();
        self.walk(position, direction, &mut |cell, ds| {
            path.add_segment(cell, ds);
            ControlFlow::Continue(())
        });
    }
}
