//! Input model for one transfer medium.

use std::sync::Arc;

use crate::material::MaterialMix;
use crate::Vec3;

/// Spatial density distribution plus material definition of one medium.
///
/// Consulted only during setup of the medium system. The material type
/// of [`mix_at`](Medium::mix_at) must match that of [`mix`](Medium::mix)
/// everywhere in the domain.
pub trait Medium: Send + Sync {
    /// Symmetry dimension: 1 spherical, 2 axial, 3 none.
    fn dimension(&self) -> u8;

    /// Representative material mix.
    fn mix(&self) -> Arc<dyn MaterialMix>;

    /// True if the mix varies with position.
    fn has_variable_mix(&self) -> bool {
        false
    }

    /// Material mix at `position`.
    fn mix_at(&self, _position: Vec3) -> Arc<dyn MaterialMix> {
        self.mix()
    }

    /// Number density at `position`.
    fn number_density(&self, position: Vec3) -> f64;

    /// True if the medium defines a bulk velocity field.
    fn has_velocity(&self) -> bool {
        false
    }

    /// Bulk velocity at `position`.
    fn bulk_velocity(&self, _position: Vec3) -> Vec3 {
        Vec3::zeros()
    }

    /// True if the medium defines a magnetic field.
    fn has_magnetic_field(&self) -> bool {
        false
    }

    /// Magnetic field at `position`.
    fn magnetic_field(&self, _position: Vec3) -> Vec3 {
        Vec3::zeros()
    }

    /// True if the medium defines a temperature.
    fn has_temperature(&self) -> bool {
        false
    }

    /// Temperature at `position`.
    fn temperature(&self, _position: Vec3) -> f64 {
        0.0
    }
}
