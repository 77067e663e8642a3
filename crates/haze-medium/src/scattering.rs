//! Scattering at the interaction point: component weights, random
//! scattering events, and peel-off toward observers.

use haze_core::{PhotonPacket, StokesVector, Vec3};
use rand::{Rng, RngCore};
use smallvec::SmallVec;

use crate::MediumSystem;

/// Relative scattering opacity per component, normalized to sum to one.
pub type ScatteringWeights = SmallVec<[f64; 4]>;

/// Index of the component selected by a uniform deviate `u` in `[0, 1)`.
fn select_component(weights: &[f64], u: f64) -> usize {
    let mut cumulative = 0.0;
    for (h, &w) in weights.iter().enumerate() {
        cumulative += w;
        if u < cumulative {
            return h;
        }
    }
    // Rounding can leave the total just below one; fall back to the last
    // component that can scatter.
    weights.iter().rposition(|&w| w > 0.0).unwrap_or(0)
}

impl MediumSystem {
    /// Wavelength perceived by the medium at the interaction point of `pp`.
    ///
    /// Falls back to the packet wavelength when no interaction point has
    /// been set.
    pub fn perceived_wavelength_for_scattering(&self, pp: &PhotonPacket) -> f64 {
        match pp.interaction_cell() {
            Some(m) => self.perceived_wavelength(pp, m, pp.interaction_distance()),
            None => pp.wavelength(),
        }
    }

    /// Scattering albedo at the interaction point of `pp`, zero where
    /// nothing extinguishes.
    pub fn albedo_for_scattering(&self, pp: &PhotonPacket) -> f64 {
        let Some(m) = pp.interaction_cell() else {
            return 0.0;
        };
        let lambda = self.perceived_wavelength_for_scattering(pp);
        let (sca, ext) = (0..self.num_media()).fold((0.0, 0.0), |(sca, ext), h| {
            (
                sca + self.component_opacity_sca(lambda, m, h, Some(pp)),
                ext + self.component_opacity_ext(lambda, m, h, Some(pp)),
            )
        });
        if ext > 0.0 {
            sca / ext
        } else {
            0.0
        }
    }

    /// Relative scattering weights of the components at the interaction
    /// point of `pp`, for perceived wavelength `lambda`.
    ///
    /// Returns `None` when no interaction point is set or every component
    /// has zero scattering opacity there.
    pub fn weights_for_scattering(
        &self,
        lambda: f64,
        pp: &PhotonPacket,
    ) -> Option<ScatteringWeights> {
        let m = pp.interaction_cell()?;
        let mut weights: ScatteringWeights = (0..self.num_media())
            .map(|h| self.component_opacity_sca(lambda, m, h, Some(pp)))
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return None;
        }
        for w in &mut weights {
            *w /= total;
        }
        Some(weights)
    }

    /// Perform a random scattering event at the interaction point of `pp`.
    ///
    /// Selects a component by its scattering weight (directly when there is
    /// only one), lets its mix draw the new direction and medium-frame
    /// wavelength, and updates the packet. Returns `false`, leaving the
    /// packet untouched, when no interaction point is set or nothing can
    /// scatter there.
    pub fn simulate_scattering(&self, rng: &mut dyn RngCore, pp: &mut PhotonPacket) -> bool {
        let Some(m) = pp.interaction_cell() else {
            return false;
        };
        let lambda = self.perceived_wavelength_for_scattering(pp);
        let h = if self.num_media() == 1 {
            0
        } else {
            let Some(weights) = self.weights_for_scattering(lambda, pp) else {
                return false;
            };
            select_component(&weights, rng.random::<f64>())
        };

        let state = self.material_state(m, h);
        let outcome = self
            .mix(m, h)
            .perform_scattering(lambda, &state, pp, &mut *rng);
        pp.scatter(outcome.direction, state.bulk_velocity, outcome.wavelength);
        if let Some(stokes) = outcome.stokes {
            pp.set_polarized(stokes);
        }
        true
    }

    /// Launch `ppp` as the peel-off of `pp` toward an observer in
    /// direction `bfkobs`, with instrument y-axis `bfky`.
    ///
    /// Every component with positive weight contributes its peel-off
    /// Stokes vector scaled by its weight. The summed intensity becomes the
    /// weight applied to the luminosity of `pp`. When a mix shifts the
    /// wavelength, the packet leaves at the shifted wavelength; with
    /// several shifting mixes the last one wins.
    pub fn peel_off_scattering(
        &self,
        lambda: f64,
        weights: &[f64],
        bfkobs: Vec3,
        bfky: Vec3,
        pp: &PhotonPacket,
        ppp: &mut PhotonPacket,
    ) {
        let Some(m) = pp.interaction_cell() else {
            return;
        };
        let (mut i, mut q, mut u, mut v) = (0.0, 0.0, 0.0, 0.0);
        let mut emitted = lambda;
        for (h, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            let state = self.material_state(m, h);
            let outcome = self
                .mix(m, h)
                .peel_off_scattering(lambda, &state, pp, bfkobs, bfky);
            i += w * outcome.i;
            q += w * outcome.q;
            u += w * outcome.u;
            v += w * outcome.v;
            if outcome.wavelength != lambda {
                emitted = outcome.wavelength;
            }
        }

        ppp.launch_scattering_peel_off(pp, bfkobs, self.bulk_velocity(m), emitted, i);
        if self.options.polarization {
            // Components are expressed in the instrument frame.
            ppp.set_polarized(StokesVector::normalized(i, q, u, v, bfky));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haze_core::MaterialType;
    use haze_test_utils::{approx_eq, ConstantMix, SlabGrid, UniformMedium};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::{MediumOptions, MediumSystemConfig};

    fn two_component(options: MediumOptions) -> MediumSystem {
        let mut cfg = MediumSystemConfig::new(
            SlabGrid::uniform(0.0, 1.0, 2).boxed(),
            vec![
                UniformMedium::new(ConstantMix::dust(1.0, 3.0).shared(), 1.0).boxed(),
                UniformMedium::new(
                    ConstantMix::new(MaterialType::Electrons, 0.0, 1.0)
                        .with_wavelength_shift(1.5)
                        .with_peel_off_polarization(0.2)
                        .shared(),
                    1.0,
                )
                .boxed(),
            ],
        );
        cfg.options = options;
        MediumSystem::new(cfg).unwrap()
    }

    fn packet_in_cell(m: usize) -> PhotonPacket {
        let mut pp = PhotonPacket::new();
        pp.launch(1e-6, 2.0, Vec3::zeros(), Vec3::x());
        pp.set_interaction_point(m, 0.25 + 0.5 * m as f64);
        pp
    }

    #[test]
    fn select_component_follows_cumulative_weights() {
        let w = [0.25, 0.0, 0.75];
        assert_eq!(select_component(&w, 0.0), 0);
        assert_eq!(select_component(&w, 0.2499), 0);
        assert_eq!(select_component(&w, 0.25), 2);
        assert_eq!(select_component(&w, 0.9999999), 2);
        assert_eq!(select_component(&[0.5, 0.4999999], 0.99999999), 1);
    }

    #[test]
    fn weights_are_normalized() {
        let sys = two_component(MediumOptions::default());
        let pp = packet_in_cell(1);
        let w = sys.weights_for_scattering(1e-6, &pp).unwrap();
        assert_eq!(w.len(), 2);
        assert!(approx_eq(w[0], 0.75, 1e-12));
        assert!(approx_eq(w.iter().sum::<f64>(), 1.0, 1e-12));
    }

    #[test]
    fn weights_fail_without_scatterers() {
        let sys = MediumSystem::new(MediumSystemConfig::new(
            SlabGrid::uniform(0.0, 1.0, 1).boxed(),
            vec![
                UniformMedium::new(ConstantMix::dust(1.0, 0.0).shared(), 1.0).boxed(),
                UniformMedium::new(ConstantMix::dust(2.0, 0.0).shared(), 1.0).boxed(),
            ],
        ))
        .unwrap();
        let pp = packet_in_cell(0);
        assert!(sys.weights_for_scattering(1e-6, &pp).is_none());
        let mut pp = pp;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(!sys.simulate_scattering(&mut rng, &mut pp));
        assert_eq!(pp.num_scatt(), 0);
    }

    #[test]
    fn albedo_at_interaction_point() {
        let sys = two_component(MediumOptions::default());
        let pp = packet_in_cell(0);
        assert!(approx_eq(sys.albedo_for_scattering(&pp), 0.8, 1e-12));
    }

    #[test]
    fn simulate_scattering_updates_packet() {
        let sys = two_component(MediumOptions::default());
        let mut pp = packet_in_cell(0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(sys.simulate_scattering(&mut rng, &mut pp));
        assert_eq!(pp.num_scatt(), 1);
        assert!(approx_eq(pp.direction().norm(), 1.0, 1e-12));
        let lambda = pp.wavelength();
        assert!(lambda == 1e-6 || approx_eq(lambda, 1.5e-6, 1e-12));
    }

    #[test]
    fn component_selection_frequencies_match_weights() {
        let sys = two_component(MediumOptions::default());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let trials = 4000;
        let mut shifted = 0;
        for _ in 0..trials {
            let mut pp = packet_in_cell(0);
            sys.simulate_scattering(&mut rng, &mut pp);
            if pp.wavelength() > 1.2e-6 {
                shifted += 1;
            }
        }
        let fraction = f64::from(shifted) / f64::from(trials);
        assert!((fraction - 0.25).abs() < 0.03, "fraction = {fraction}");
    }

    #[test]
    fn peel_off_last_wavelength_shift_wins() {
        let sys = two_component(MediumOptions::default());
        let pp = packet_in_cell(0);
        let w = sys.weights_for_scattering(1e-6, &pp).unwrap();
        let mut ppp = PhotonPacket::new();
        sys.peel_off_scattering(1e-6, &w, Vec3::z(), Vec3::y(), &pp, &mut ppp);
        assert!(approx_eq(ppp.wavelength(), 1.5e-6, 1e-12));
        assert!(approx_eq(ppp.luminosity(), 2.0, 1e-12));
        assert_eq!(ppp.direction(), Vec3::z());
        assert!(!ppp.stokes().is_polarized());
    }

    #[test]
    fn peel_off_polarization_when_enabled() {
        let sys = two_component(MediumOptions {
            polarization: true,
            ..MediumOptions::default()
        });
        let pp = packet_in_cell(0);
        let w = sys.weights_for_scattering(1e-6, &pp).unwrap();
        let mut ppp = PhotonPacket::new();
        sys.peel_off_scattering(1e-6, &w, Vec3::z(), Vec3::y(), &pp, &mut ppp);
        assert!(approx_eq(ppp.stokes().q, 0.05, 1e-12));
        assert_eq!(ppp.stokes().normal, Vec3::y());
    }
}
