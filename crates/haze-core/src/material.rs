//! Material mix capability interface.
//!
//! The medium system aggregates opacities and dispatches scattering events
//! through [`MaterialMix`] without knowing which material family it talks
//! to, apart from the coarse [`MaterialType`] tag.

use std::fmt;

use rand::RngCore;

use crate::packet::{PhotonPacket, StokesVector};
use crate::Vec3;

/// Fundamental material family of a mix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialType {
    /// Dust grains.
    Dust,
    /// Free electrons.
    Electrons,
    /// Gas (atoms, ions, molecules).
    Gas,
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dust => write!(f, "dust"),
            Self::Electrons => write!(f, "electrons"),
            Self::Gas => write!(f, "gas"),
        }
    }
}

/// Local conditions of one medium component in one cell.
///
/// Handed to the mix on every opacity and scattering call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialState {
    /// Spatial cell index.
    pub cell: usize,
    /// Number density of the component in the cell.
    pub number_density: f64,
    /// Component temperature; meaningless if the medium has none.
    pub temperature: f64,
    /// Aggregate bulk velocity of the cell.
    pub bulk_velocity: Vec3,
    /// Magnetic field in the cell.
    pub magnetic_field: Vec3,
}

/// Result of a random-walk scattering event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScatteringOutcome {
    /// New propagation direction (unit vector).
    pub direction: Vec3,
    /// Outgoing wavelength in the medium rest frame.
    pub wavelength: f64,
    /// New polarization state, if the mix tracks polarization.
    pub stokes: Option<StokesVector>,
}

/// Contribution of one mix to a peel-off toward an observer.
///
/// The Stokes components are *unweighted*; the medium system applies the
/// relative component weight before summing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeelOffOutcome {
    /// Phase-function value for the observer direction (1 = isotropic).
    pub i: f64,
    /// Linear polarization contribution along the reference axes.
    pub q: f64,
    /// Linear polarization contribution at 45 degrees.
    pub u: f64,
    /// Circular polarization contribution.
    pub v: f64,
    /// Outgoing wavelength in the medium rest frame.
    pub wavelength: f64,
}

/// Optical properties and scattering microphysics of one material family.
///
/// Cross sections are per entity (grain, electron, atom). The default
/// opacity methods multiply them by the number density; mixes whose
/// opacity depends on local state or on the incoming packet override the
/// opacity methods and report `false` from
/// [`has_constant_sections`](MaterialMix::has_constant_sections).
pub trait MaterialMix: Send + Sync {
    /// Material family.
    fn material_type(&self) -> MaterialType;

    /// Mass per entity (kg).
    fn mass(&self) -> f64;

    /// Absorption cross section per entity at `lambda`.
    fn section_abs(&self, lambda: f64) -> f64;

    /// Scattering cross section per entity at `lambda`.
    fn section_sca(&self, lambda: f64) -> f64;

    /// Extinction cross section per entity at `lambda`.
    fn section_ext(&self, lambda: f64) -> f64 {
        self.section_abs(lambda) + self.section_sca(lambda)
    }

    /// True when opacity is exactly `n * section(lambda)` everywhere.
    fn has_constant_sections(&self) -> bool {
        true
    }

    /// True when scattering by this mix changes the polarization state.
    fn has_polarized_scattering(&self) -> bool {
        false
    }

    /// Absorption opacity for the given local state.
    ///
    /// `pp` is `None` when no packet is available; default conditions
    /// (unpolarized radiation) apply.
    fn opacity_abs(&self, lambda: f64, state: &MaterialState, _pp: Option<&PhotonPacket>) -> f64 {
        state.number_density * self.section_abs(lambda)
    }

    /// Scattering opacity for the given local state.
    fn opacity_sca(&self, lambda: f64, state: &MaterialState, _pp: Option<&PhotonPacket>) -> f64 {
        state.number_density * self.section_sca(lambda)
    }

    /// Extinction opacity for the given local state.
    fn opacity_ext(&self, lambda: f64, state: &MaterialState, pp: Option<&PhotonPacket>) -> f64 {
        self.opacity_abs(lambda, state, pp) + self.opacity_sca(lambda, state, pp)
    }

    /// Draw the outcome of a scattering event at medium-frame `lambda`.
    fn perform_scattering(
        &self,
        lambda: f64,
        state: &MaterialState,
        pp: &PhotonPacket,
        rng: &mut dyn RngCore,
    ) -> ScatteringOutcome;

    /// Peel-off contribution toward `bfkobs` with instrument y-axis `bfky`.
    fn peel_off_scattering(
        &self,
        lambda: f64,
        state: &MaterialState,
        pp: &PhotonPacket,
        bfkobs: Vec3,
        bfky: Vec3,
    ) -> PeelOffOutcome;
}
