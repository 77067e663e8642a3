//! Cell opacities, optionally restricted to one material type.
//!
//! The public queries assume default conditions: no incoming packet, so
//! the mixes see unpolarized radiation at the given wavelength. Tracing and
//! scattering use the packet-aware variants, which evaluate each cell at
//! the wavelength the moving, expanding medium perceives.

use haze_core::{MaterialType, PhotonPacket};

use crate::MediumSystem;

impl MediumSystem {
    // ── Per component ──────────────────────────────────────────────

    pub(crate) fn component_opacity_abs(
        &self,
        lambda: f64,
        m: usize,
        h: usize,
        pp: Option<&PhotonPacket>,
    ) -> f64 {
        self.mix(m, h).opacity_abs(lambda, &self.material_state(m, h), pp)
    }

    pub(crate) fn component_opacity_sca(
        &self,
        lambda: f64,
        m: usize,
        h: usize,
        pp: Option<&PhotonPacket>,
    ) -> f64 {
        self.mix(m, h).opacity_sca(lambda, &self.material_state(m, h), pp)
    }

    pub(crate) fn component_opacity_ext(
        &self,
        lambda: f64,
        m: usize,
        h: usize,
        pp: Option<&PhotonPacket>,
    ) -> f64 {
        self.mix(m, h).opacity_ext(lambda, &self.material_state(m, h), pp)
    }

    fn components_of(&self, ty: MaterialType) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_media()).filter(move |&h| self.is_material_type(ty, h))
    }

    // ── Filtered by material type ──────────────────────────────────

    /// Absorption opacity of the components of type `ty` in cell `m`.
    pub fn opacity_abs_of(&self, lambda: f64, m: usize, ty: MaterialType) -> f64 {
        self.components_of(ty)
            .map(|h| self.component_opacity_abs(lambda, m, h, None))
            .sum()
    }

    /// Scattering opacity of the components of type `ty` in cell `m`.
    pub fn opacity_sca_of(&self, lambda: f64, m: usize, ty: MaterialType) -> f64 {
        self.components_of(ty)
            .map(|h| self.component_opacity_sca(lambda, m, h, None))
            .sum()
    }

    /// Extinction opacity of the components of type `ty` in cell `m`.
    pub fn opacity_ext_of(&self, lambda: f64, m: usize, ty: MaterialType) -> f64 {
        self.components_of(ty)
            .map(|h| self.component_opacity_ext(lambda, m, h, None))
            .sum()
    }

    // ── All components ─────────────────────────────────────────────

    /// Absorption opacity of all components in cell `m`.
    pub fn opacity_abs(&self, lambda: f64, m: usize) -> f64 {
        (0..self.num_media())
            .map(|h| self.component_opacity_abs(lambda, m, h, None))
            .sum()
    }

    /// Scattering opacity of all components in cell `m`.
    pub fn opacity_sca(&self, lambda: f64, m: usize) -> f64 {
        (0..self.num_media())
            .map(|h| self.component_opacity_sca(lambda, m, h, None))
            .sum()
    }

    /// Extinction opacity of all components in cell `m`.
    pub fn opacity_ext(&self, lambda: f64, m: usize) -> f64 {
        (0..self.num_media())
            .map(|h| self.component_opacity_ext(lambda, m, h, None))
            .sum()
    }

    // ── Packet aware ───────────────────────────────────────────────

    /// Extinction opacity in cell `m` for `pp` at perceived wavelength
    /// `lambda`.
    pub(crate) fn opacity_ext_for(&self, lambda: f64, m: usize, pp: &PhotonPacket) -> f64 {
        (0..self.num_media())
            .map(|h| self.component_opacity_ext(lambda, m, h, Some(pp)))
            .sum()
    }

    /// Wavelength of `pp` as perceived by the medium in cell `m`, a
    /// distance `distance` along the current ray.
    pub(crate) fn perceived_wavelength(&self, pp: &PhotonPacket, m: usize, distance: f64) -> f64 {
        if !self.kinematic {
            return pp.wavelength();
        }
        pp.perceived_wavelength(
            self.bulk_velocity(m),
            self.options.hubble_expansion_rate * distance,
        )
    }

    /// Extinction in cell `m` from per-component cross sections.
    ///
    /// Only valid when every component has constant sections and a single
    /// mix.
    pub(crate) fn extinction_from_sections(&self, m: usize, sections: &[f64]) -> f64 {
        sections
            .iter()
            .enumerate()
            .map(|(h, section)| self.number_density(m, h) * section)
            .sum()
    }
}
