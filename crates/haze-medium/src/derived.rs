//! Quantities derived from the radiation field and cell state.
//!
//! All radiation-based queries read the combined field (primary plus
//! stable secondary) and return zero, or an empty vector, when radiation
//! recording is disabled.

use std::f64::consts::PI;

use haze_core::constants::planck_lambda;
use haze_core::{MaterialMix, MaterialType, WavelengthGrid};
use rayon::prelude::*;

use crate::MediumSystem;

/// Lower bound of the equilibrium temperature search (K).
const EQUILIBRIUM_T_MIN: f64 = 0.1;

/// Upper bound of the equilibrium temperature search (K).
const EQUILIBRIUM_T_MAX: f64 = 1e5;

/// Relative width at which the bisection stops.
const EQUILIBRIUM_TOLERANCE: f64 = 1e-10;

const EQUILIBRIUM_MAX_ITERATIONS: usize = 200;

/// Temperature at which `mix` emits as much as it absorbs from the mean
/// intensity `jv`, assuming a single-size grain in equilibrium.
///
/// Zero when nothing is absorbed; clamped to the search range otherwise.
fn equilibrium_temperature(mix: &dyn MaterialMix, wavelengths: &WavelengthGrid, jv: &[f64]) -> f64 {
    let weighted: Vec<(f64, f64)> = (0..wavelengths.num_bins())
        .map(|ell| {
            let lambda = wavelengths.wavelength(ell);
            (lambda, mix.section_abs(lambda) * wavelengths.bin_width(ell))
        })
        .collect();
    let absorbed: f64 = weighted.iter().zip(jv).map(|(&(_, w), j)| w * j).sum();
    if absorbed <= 0.0 {
        return 0.0;
    }
    let emitted = |t: f64| -> f64 {
        weighted
            .iter()
            .map(|&(lambda, w)| w * planck_lambda(lambda, t))
            .sum()
    };

    let (mut lo, mut hi) = (EQUILIBRIUM_T_MIN, EQUILIBRIUM_T_MAX);
    if emitted(lo) >= absorbed {
        return lo;
    }
    if emitted(hi) <= absorbed {
        return hi;
    }
    for _ in 0..EQUILIBRIUM_MAX_ITERATIONS {
        if hi / lo - 1.0 < EQUILIBRIUM_TOLERANCE {
            break;
        }
        // Bisect in log T; emission spans many decades.
        let mid = (lo * hi).sqrt();
        if emitted(mid) < absorbed {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo * hi).sqrt()
}

impl MediumSystem {
    /// Mean intensity `J_λ` per wavelength bin in cell `m`:
    /// tally / (4π V Δλ).
    pub fn mean_intensity(&self, m: usize) -> Vec<f64> {
        let Some(rf) = &self.radiation else {
            return Vec::new();
        };
        let wavelengths = rf.wavelengths();
        let factor = 1.0 / (4.0 * PI * self.volume(m));
        (0..wavelengths.num_bins())
            .map(|ell| rf.total(m, ell) * factor / wavelengths.bin_width(ell))
            .collect()
    }

    /// Mass-weighted equilibrium temperature of the dust in cell `m`.
    ///
    /// Each dust component is treated as a single representative grain in
    /// equilibrium with the local mean intensity. The result indicates the
    /// heating level; it is not a physical grain temperature. Zero when
    /// the cell holds no dust or absorbs nothing.
    pub fn indicative_dust_temperature(&self, m: usize) -> f64 {
        let Some(rf) = &self.radiation else {
            return 0.0;
        };
        let jv = self.mean_intensity(m);
        let mut weighted = 0.0;
        let mut mass = 0.0;
        for h in (0..self.num_media()).filter(|&h| self.is_dust(h)) {
            let rho = self.mass_density(m, h);
            if rho > 0.0 {
                let t = equilibrium_temperature(self.mix(m, h), rf.wavelengths(), &jv);
                weighted += rho * t;
                mass += rho;
            }
        }
        if mass > 0.0 {
            weighted / mass
        } else {
            0.0
        }
    }

    /// Luminosity absorbed by dust in cell `m`:
    /// Σ_ℓ κ_abs,dust(λ_ℓ) · tally(m, ℓ).
    pub fn absorbed_dust_luminosity(&self, m: usize) -> f64 {
        let Some(rf) = &self.radiation else {
            return 0.0;
        };
        rf.wavelengths()
            .wavelengths()
            .enumerate()
            .map(|(ell, lambda)| {
                self.opacity_abs_of(lambda, m, MaterialType::Dust) * rf.total(m, ell)
            })
            .sum()
    }

    /// Luminosity absorbed by dust over the whole grid, from the primary
    /// table or the stable secondary table alone.
    pub fn total_absorbed_dust_luminosity(&self, primary: bool) -> f64 {
        let Some(rf) = &self.radiation else {
            return 0.0;
        };
        let wavelengths = rf.wavelengths();
        (0..self.num_cells())
            .into_par_iter()
            .map(|m| {
                wavelengths
                    .wavelengths()
                    .enumerate()
                    .map(|(ell, lambda)| {
                        let k = self.opacity_abs_of(lambda, m, MaterialType::Dust);
                        k * rf.table(primary, m, ell)
                    })
                    .sum::<f64>()
            })
            .sum()
    }

    /// Mass-weighted temperature in cell `m` of the gas components whose
    /// media define a temperature.
    pub fn indicative_gas_temperature(&self, m: usize) -> f64 {
        self.state.cell(m).temperature
    }
}
