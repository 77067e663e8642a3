//! Photon packets and their polarization state.

use crate::constants::SPEED_OF_LIGHT;
use crate::path::SpatialGridPath;
use crate::Vec3;

/// Normalized Stokes vector with the reference-plane normal.
///
/// `i` is 1 for any launched packet; `q`, `u`, `v` are fractions of `i`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StokesVector {
    /// Total intensity (normalized to 1).
    pub i: f64,
    /// Linear polarization along the reference axes.
    pub q: f64,
    /// Linear polarization at 45 degrees to the reference axes.
    pub u: f64,
    /// Circular polarization.
    pub v: f64,
    /// Normal to the reference plane; zero when unpolarized.
    pub normal: Vec3,
}

impl StokesVector {
    /// The unpolarized state.
    pub fn unpolarized() -> Self {
        Self {
            i: 1.0,
            q: 0.0,
            u: 0.0,
            v: 0.0,
            normal: Vec3::zeros(),
        }
    }

    /// Build a normalized vector from unnormalized components.
    ///
    /// Falls back to the unpolarized state when `i` is not positive.
    pub fn normalized(i: f64, q: f64, u: f64, v: f64, normal: Vec3) -> Self {
        if i > 0.0 {
            Self {
                i: 1.0,
                q: q / i,
                u: u / i,
                v: v / i,
                normal,
            }
        } else {
            Self::unpolarized()
        }
    }

    /// True if any polarized component is nonzero.
    pub fn is_polarized(&self) -> bool {
        self.q != 0.0 || self.u != 0.0 || self.v != 0.0
    }

    /// Degree of polarization `sqrt(q² + u² + v²) / i`.
    pub fn degree(&self) -> f64 {
        (self.q * self.q + self.u * self.u + self.v * self.v).sqrt() / self.i
    }
}

impl Default for StokesVector {
    fn default() -> Self {
        Self::unpolarized()
    }
}

/// A monochromatic photon packet travelling through the medium.
///
/// Owns the [`SpatialGridPath`] for its current ray, which the medium
/// system fills with segments and cumulative optical depths. The
/// interaction point (cell, distance) is set by the tracer when a
/// scattering location has been determined.
#[derive(Clone, Debug)]
pub struct PhotonPacket {
    path: SpatialGridPath,
    wavelength: f64,
    luminosity: f64,
    num_scatt: u32,
    stokes: StokesVector,
    interaction_cell: Option<usize>,
    interaction_distance: f64,
    interaction_position: Vec3,
}

impl PhotonPacket {
    /// A packet at the origin with zero wavelength and luminosity.
    pub fn new() -> Self {
        Self {
            path: SpatialGridPath::new(Vec3::zeros(), Vec3::z()),
            wavelength: 0.0,
            luminosity: 0.0,
            num_scatt: 0,
            stokes: StokesVector::unpolarized(),
            interaction_cell: None,
            interaction_distance: 0.0,
            interaction_position: Vec3::zeros(),
        }
    }

    /// (Re)launch the packet from an emission event.
    pub fn launch(&mut self, wavelength: f64, luminosity: f64, position: Vec3, direction: Vec3) {
        self.path.set(position, direction);
        self.wavelength = wavelength;
        self.luminosity = luminosity;
        self.num_scatt = 0;
        self.stokes = StokesVector::unpolarized();
        self.clear_interaction_point();
    }

    /// Launch this packet as a peel-off of `source` toward `direction`.
    ///
    /// The peel-off starts at the current position of `source` with the
    /// luminosity of `source` scaled by `weight`. `wavelength` is the
    /// outgoing wavelength in the medium rest frame; it is Doppler-shifted
    /// for `bulk_velocity` into the observer frame.
    pub fn launch_scattering_peel_off(
        &mut self,
        source: &PhotonPacket,
        direction: Vec3,
        bulk_velocity: Vec3,
        wavelength: f64,
        weight: f64,
    ) {
        self.path.set(source.position(), direction);
        self.wavelength = Self::shifted_emission_wavelength(wavelength, direction, bulk_velocity);
        self.luminosity = source.luminosity * weight;
        self.num_scatt = source.num_scatt + 1;
        self.stokes = StokesVector::unpolarized();
        self.clear_interaction_point();
    }

    /// Current position (origin of the current path).
    pub fn position(&self) -> Vec3 {
        self.path.position()
    }

    /// Current propagation direction.
    pub fn direction(&self) -> Vec3 {
        self.path.direction()
    }

    /// Wavelength in the observer rest frame.
    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    /// Luminosity (statistical weight) carried by the packet.
    pub fn luminosity(&self) -> f64 {
        self.luminosity
    }

    /// Change the luminosity, e.g. after absorption or biasing.
    pub fn set_luminosity(&mut self, luminosity: f64) {
        self.luminosity = luminosity;
    }

    /// Number of scattering events experienced so far.
    pub fn num_scatt(&self) -> u32 {
        self.num_scatt
    }

    /// Polarization state.
    pub fn stokes(&self) -> &StokesVector {
        &self.stokes
    }

    /// Replace the polarization state.
    pub fn set_polarized(&mut self, stokes: StokesVector) {
        self.stokes = stokes;
    }

    /// The current ray.
    pub fn path(&self) -> &SpatialGridPath {
        &self.path
    }

    /// Mutable access to the current ray.
    pub fn path_mut(&mut self) -> &mut SpatialGridPath {
        &mut self.path
    }

    /// Advance the packet along its direction and reset the path.
    ///
    /// The interaction point survives, so a packet moved onto its
    /// interaction point can still be scattered there.
    pub fn propagate(&mut self, distance: f64) {
        let position = self.position() + self.direction() * distance;
        let direction = self.direction();
        self.path.set(position, direction);
    }

    /// Apply a scattering event.
    ///
    /// Increments the scattering counter, sets the new direction, and
    /// converts the medium-frame `wavelength` to the observer frame for
    /// `bulk_velocity`. Position and luminosity are left untouched.
    pub fn scatter(&mut self, direction: Vec3, bulk_velocity: Vec3, wavelength: f64) {
        self.num_scatt += 1;
        self.wavelength = Self::shifted_emission_wavelength(wavelength, direction, bulk_velocity);
        let position = self.position();
        self.path.set(position, direction);
    }

    /// Record where along the current path the next interaction happens.
    pub fn set_interaction_point(&mut self, cell: usize, distance: f64) {
        self.interaction_cell = Some(cell);
        self.interaction_distance = distance;
        self.interaction_position = self.position() + self.direction() * distance;
    }

    fn clear_interaction_point(&mut self) {
        self.interaction_cell = None;
        self.interaction_distance = 0.0;
        self.interaction_position = Vec3::zeros();
    }

    /// Cell hosting the interaction, if one has been set.
    pub fn interaction_cell(&self) -> Option<usize> {
        self.interaction_cell
    }

    /// Distance from the launch point of the ray on which the interaction
    /// point was set.
    pub fn interaction_distance(&self) -> f64 {
        self.interaction_distance
    }

    /// Absolute position of the interaction point.
    pub fn interaction_position(&self) -> Vec3 {
        self.interaction_position
    }

    /// Wavelength perceived by a medium moving with `bulk_velocity` and
    /// receding with `expansion_velocity` (e.g. Hubble flow).
    pub fn perceived_wavelength(&self, bulk_velocity: Vec3, expansion_velocity: f64) -> f64 {
        let mut lambda =
            Self::shifted_reception_wavelength(self.wavelength, self.direction(), bulk_velocity);
        if expansion_velocity != 0.0 {
            lambda /= 1.0 - expansion_velocity / SPEED_OF_LIGHT;
        }
        lambda
    }

    /// Wavelength seen by an observer at rest for radiation emitted along
    /// `direction` by a source moving with `velocity`.
    pub fn shifted_emission_wavelength(lambda: f64, direction: Vec3, velocity: Vec3) -> f64 {
        lambda * (1.0 - direction.dot(&velocity) / SPEED_OF_LIGHT)
    }

    /// Wavelength seen by a receiver moving with `velocity` for radiation
    /// travelling along `direction`.
    pub fn shifted_reception_wavelength(lambda: f64, direction: Vec3, velocity: Vec3) -> f64 {
        lambda / (1.0 - direction.dot(&velocity) / SPEED_OF_LIGHT)
    }
}

impl Default for PhotonPacket {
    fn default() -> Self {
        Self::new()
    }
}
