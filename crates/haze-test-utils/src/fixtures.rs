//! Reusable collaborator fixtures.
//!
//! - [`ConstantMix`]: wavelength-independent cross sections, isotropic
//!   scattering, optional peel-off wavelength shift and polarization.
//! - [`PowerLawMix`]: cross sections scaling as `λ^-β`.
//! - [`UniformMedium`]: constant (or linearly varying) density along x.
//! - [`SlabGrid`]: cells are slabs stacked along x with unit cross-section.

use std::f64::consts::PI;
use std::ops::ControlFlow;
use std::sync::Arc;

use haze_core::{
    MaterialMix, MaterialState, MaterialType, Medium, PeelOffOutcome, PhotonPacket,
    ScatteringOutcome, SpatialGrid, Vec3,
};
use rand::{Rng, RngCore};

/// Draw an isotropic unit vector.
fn isotropic_direction(rng: &mut dyn RngCore) -> Vec3 {
    let cos_theta = 2.0 * rng.random::<f64>() - 1.0;
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * rng.random::<f64>();
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Mix with constant per-entity cross sections.
#[derive(Clone, Debug)]
pub struct ConstantMix {
    pub material_type: MaterialType,
    pub mass: f64,
    pub section_abs: f64,
    pub section_sca: f64,
    /// Multiplies the wavelength of peel-off and scattering outcomes.
    pub wavelength_shift: Option<f64>,
    /// Linear polarization fraction reported in peel-off outcomes.
    pub peel_off_q: f64,
}

impl ConstantMix {
    pub fn new(material_type: MaterialType, section_abs: f64, section_sca: f64) -> Self {
        Self {
            material_type,
            mass: 1.0,
            section_abs,
            section_sca,
            wavelength_shift: None,
            peel_off_q: 0.0,
        }
    }

    pub fn dust(section_abs: f64, section_sca: f64) -> Self {
        Self::new(MaterialType::Dust, section_abs, section_sca)
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_wavelength_shift(mut self, factor: f64) -> Self {
        self.wavelength_shift = Some(factor);
        self
    }

    pub fn with_peel_off_polarization(mut self, q: f64) -> Self {
        self.peel_off_q = q;
        self
    }

    pub fn shared(self) -> Arc<dyn MaterialMix> {
        Arc::new(self)
    }

    fn outgoing(&self, lambda: f64) -> f64 {
        self.wavelength_shift.map_or(lambda, |f| lambda * f)
    }
}

impl MaterialMix for ConstantMix {
    fn material_type(&self) -> MaterialType {
        self.material_type
    }

    fn mass(&self) -> f64 {
        self.mass
    }

    fn section_abs(&self, _lambda: f64) -> f64 {
        self.section_abs
    }

    fn section_sca(&self, _lambda: f64) -> f64 {
        self.section_sca
    }

    fn has_polarized_scattering(&self) -> bool {
        self.peel_off_q != 0.0
    }

    fn perform_scattering(
        &self,
        lambda: f64,
        _state: &MaterialState,
        _pp: &PhotonPacket,
        rng: &mut dyn RngCore,
    ) -> ScatteringOutcome {
        ScatteringOutcome {
            direction: isotropic_direction(rng),
            wavelength: self.outgoing(lambda),
            stokes: None,
        }
    }

    fn peel_off_scattering(
        &self,
        lambda: f64,
        _state: &MaterialState,
        _pp: &PhotonPacket,
        _bfkobs: Vec3,
        _bfky: Vec3,
    ) -> PeelOffOutcome {
        PeelOffOutcome {
            i: 1.0,
            q: self.peel_off_q,
            u: 0.0,
            v: 0.0,
            wavelength: self.outgoing(lambda),
        }
    }
}

/// Mix whose cross sections follow `σ(λ) = σ_ref (λ / λ_ref)^-β`.
#[derive(Clone, Debug)]
pub struct PowerLawMix {
    pub material_type: MaterialType,
    pub mass: f64,
    pub section_ext_ref: f64,
    pub albedo: f64,
    pub lambda_ref: f64,
    pub beta: f64,
}

impl PowerLawMix {
    pub fn dust(section_ext_ref: f64, albedo: f64, lambda_ref: f64, beta: f64) -> Self {
        Self {
            material_type: MaterialType::Dust,
            mass: 1.0,
            section_ext_ref,
            albedo,
            lambda_ref,
            beta,
        }
    }

    pub fn shared(self) -> Arc<dyn MaterialMix> {
        Arc::new(self)
    }

    fn section_ext_at(&self, lambda: f64) -> f64 {
        self.section_ext_ref * (lambda / self.lambda_ref).powf(-self.beta)
    }
}

impl MaterialMix for PowerLawMix {
    fn material_type(&self) -> MaterialType {
        self.material_type
    }

    fn mass(&self) -> f64 {
        self.mass
    }

    fn section_abs(&self, lambda: f64) -> f64 {
        (1.0 - self.albedo) * self.section_ext_at(lambda)
    }

    fn section_sca(&self, lambda: f64) -> f64 {
        self.albedo * self.section_ext_at(lambda)
    }

    fn perform_scattering(
        &self,
        lambda: f64,
        _state: &MaterialState,
        _pp: &PhotonPacket,
        rng: &mut dyn RngCore,
    ) -> ScatteringOutcome {
        ScatteringOutcome {
            direction: isotropic_direction(rng),
            wavelength: lambda,
            stokes: None,
        }
    }

    fn peel_off_scattering(
        &self,
        lambda: f64,
        _state: &MaterialState,
        _pp: &PhotonPacket,
        _bfkobs: Vec3,
        _bfky: Vec3,
    ) -> PeelOffOutcome {
        PeelOffOutcome {
            i: 1.0,
            q: 0.0,
            u: 0.0,
            v: 0.0,
            wavelength: lambda,
        }
    }
}

/// Medium with density `n0 + gradient * x` (clamped at zero).
pub struct UniformMedium {
    pub mix: Arc<dyn MaterialMix>,
    pub density: f64,
    pub gradient: f64,
    pub velocity: Option<Vec3>,
    pub magnetic_field: Option<Vec3>,
    pub temperature: Option<f64>,
    /// Mix used for `x >= split`, making the mix vary per cell.
    pub split_mix: Option<(f64, Arc<dyn MaterialMix>)>,
    pub dimension: u8,
}

impl UniformMedium {
    pub fn new(mix: Arc<dyn MaterialMix>, density: f64) -> Self {
        Self {
            mix,
            density,
            gradient: 0.0,
            velocity: None,
            magnetic_field: None,
            temperature: None,
            split_mix: None,
            dimension: 1,
        }
    }

    pub fn with_gradient(mut self, gradient: f64) -> Self {
        self.gradient = gradient;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_magnetic_field(mut self, field: Vec3) -> Self {
        self.magnetic_field = Some(field);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_split_mix(mut self, split: f64, mix: Arc<dyn MaterialMix>) -> Self {
        self.split_mix = Some((split, mix));
        self
    }

    pub fn with_dimension(mut self, dimension: u8) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn boxed(self) -> Box<dyn Medium> {
        Box::new(self)
    }
}

impl Medium for UniformMedium {
    fn dimension(&self) -> u8 {
        self.dimension
    }

    fn mix(&self) -> Arc<dyn MaterialMix> {
        Arc::clone(&self.mix)
    }

    fn has_variable_mix(&self) -> bool {
        self.split_mix.is_some()
    }

    fn mix_at(&self, position: Vec3) -> Arc<dyn MaterialMix> {
        match &self.split_mix {
            Some((split, mix)) if position.x >= *split => Arc::clone(mix),
            _ => Arc::clone(&self.mix),
        }
    }

    fn number_density(&self, position: Vec3) -> f64 {
        (self.density + self.gradient * position.x).max(0.0)
    }

    fn has_velocity(&self) -> bool {
        self.velocity.is_some()
    }

    fn bulk_velocity(&self, _position: Vec3) -> Vec3 {
        self.velocity.unwrap_or_else(Vec3::zeros)
    }

    fn has_magnetic_field(&self) -> bool {
        self.magnetic_field.is_some()
    }

    fn magnetic_field(&self, _position: Vec3) -> Vec3 {
        self.magnetic_field.unwrap_or_else(Vec3::zeros)
    }

    fn has_temperature(&self) -> bool {
        self.temperature.is_some()
    }

    fn temperature(&self, _position: Vec3) -> f64 {
        self.temperature.unwrap_or(0.0)
    }
}

/// Slabs stacked along x, each with unit area in y and z.
///
/// Cell `m` spans `[borders[m], borders[m+1]] × [-½, ½]²`. Rays that do not
/// move along x never cross a border and yield no segments.
#[derive(Clone, Debug)]
pub struct SlabGrid {
    borders: Vec<f64>,
}

impl SlabGrid {
    /// Panics unless `borders` has at least two strictly increasing entries.
    pub fn new(borders: Vec<f64>) -> Self {
        assert!(borders.len() >= 2, "slab grid needs at least one cell");
        assert!(
            borders.windows(2).all(|w| w[0] < w[1]),
            "slab borders must increase"
        );
        Self { borders }
    }

    /// `n` equal slabs between `x0` and `x1`.
    pub fn uniform(x0: f64, x1: f64, n: usize) -> Self {
        let dx = (x1 - x0) / n as f64;
        Self::new((0..=n).map(|i| x0 + dx * i as f64).collect())
    }

    pub fn borders(&self) -> &[f64] {
        &self.borders
    }

    pub fn boxed(self) -> Box<dyn SpatialGrid> {
        Box::new(self)
    }
}

impl SpatialGrid for SlabGrid {
    fn dimension(&self) -> u8 {
        1
    }

    fn num_cells(&self) -> usize {
        self.borders.len() - 1
    }

    fn volume(&self, m: usize) -> f64 {
        self.borders[m + 1] - self.borders[m]
    }

    fn central_position(&self, m: usize) -> Vec3 {
        Vec3::new(0.5 * (self.borders[m] + self.borders[m + 1]), 0.0, 0.0)
    }

    fn random_position(&self, m: usize, rng: &mut dyn RngCore) -> Vec3 {
        let (x0, x1) = (self.borders[m], self.borders[m + 1]);
        Vec3::new(
            x0 + (x1 - x0) * rng.random::<f64>(),
            rng.random::<f64>() - 0.5,
            rng.random::<f64>() - 0.5,
        )
    }

    fn walk(
        &self,
        position: Vec3,
        direction: Vec3,
        visit: &mut dyn FnMut(Option<usize>, f64) -> ControlFlow<()>,
    ) {
        let kx = direction.x;
        if kx.abs() < 1e-15 {
            return;
        }
        let b = &self.borders;
        let n = self.num_cells();
        let x = position.x;

        if kx > 0.0 {
            if x >= b[n] {
                return;
            }
            let (mut m, mut xcur) = if x < b[0] {
                if visit(None, (b[0] - x) / kx).is_break() {
                    return;
                }
                (0, b[0])
            } else {
                (b.partition_point(|&bx| bx <= x) - 1, x)
            };
            while m < n {
                if visit(Some(m), (b[m + 1] - xcur) / kx).is_break() {
                    return;
                }
                xcur = b[m + 1];
                m += 1;
            }
        } else {
            if x <= b[0] {
                return;
            }
            let (mut m, mut xcur) = if x > b[n] {
                if visit(None, (x - b[n]) / -kx).is_break() {
                    return;
                }
                (n - 1, b[n])
            } else {
                (b.partition_point(|&bx| bx < x) - 1, x)
            };
            loop {
                if visit(Some(m), (xcur - b[m]) / -kx).is_break() {
                    return;
                }
                xcur = b[m];
                if m == 0 {
                    break;
                }
                m -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haze_core::SpatialGridPath;

    fn lengths(grid: &SlabGrid, x: f64, k: Vec3) -> Vec<(Option<usize>, f64)> {
        let mut path = SpatialGridPath::new(Vec3::new(x, 0.0, 0.0), k);
        grid.path(&mut path);
        path.segments().iter().map(|s| (s.cell, s.ds)).collect()
    }

    #[test]
    fn forward_ray_from_outside() {
        let grid = SlabGrid::uniform(0.0, 3.0, 3);
        let segs = lengths(&grid, -1.0, Vec3::x());
        assert_eq!(
            segs,
            vec![(None, 1.0), (Some(0), 1.0), (Some(1), 1.0), (Some(2), 1.0)]
        );
    }

    #[test]
    fn backward_ray_from_inside() {
        let grid = SlabGrid::uniform(0.0, 3.0, 3);
        let segs = lengths(&grid, 1.5, -Vec3::x());
        assert_eq!(segs, vec![(Some(1), 0.5), (Some(0), 1.0)]);
    }

    #[test]
    fn oblique_ray_stretches_segments() {
        let grid = SlabGrid::uniform(0.0, 2.0, 2);
        let k = Vec3::new(0.5, 0.75f64.sqrt(), 0.0);
        let segs = lengths(&grid, 0.0, k);
        assert_eq!(segs.len(), 2);
        assert!((segs[0].1 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn parallel_ray_has_no_segments() {
        let grid = SlabGrid::uniform(0.0, 2.0, 2);
        assert!(lengths(&grid, 0.5, Vec3::y()).is_empty());
    }

    #[test]
    fn walk_stops_on_break() {
        let grid = SlabGrid::uniform(0.0, 5.0, 5);
        let mut visited = 0;
        grid.walk(Vec3::zeros(), Vec3::x(), &mut |_, _| {
            visited += 1;
            if visited == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(visited, 2);
    }
}
