//! Physical constants in SI units.

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 2.997_924_58e8;

/// Planck constant (J s).
pub const PLANCK: f64 = 6.626_070_15e-34;

/// Boltzmann constant (J/K).
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Planck spectral radiance `B_λ(T)` in W m⁻³ sr⁻¹.
///
/// Returns zero where the exponent would overflow, which is the correct
/// limit for short wavelengths at low temperature.
pub fn planck_lambda(lambda: f64, temperature: f64) -> f64 {
    if temperature <= 0.0 {
        return 0.0;
    }
    let x = PLANCK * SPEED_OF_LIGHT / (lambda * BOLTZMANN * temperature);
    if x > 700.0 {
        return 0.0;
    }
    let lambda5 = lambda.powi(5);
    2.0 * PLANCK * SPEED_OF_LIGHT * SPEED_OF_LIGHT / lambda5 / x.exp_m1()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planck_vanishes_at_zero_temperature() {
        assert_eq!(planck_lambda(1e-6, 0.0), 0.0);
    }

    #[test]
    fn planck_peak_follows_wien() {
        // Wien's displacement: λ_max T ≈ 2.898e-3 m K
        let t = 5000.0;
        let peak = 2.897_771_955e-3 / t;
        let b_peak = planck_lambda(peak, t);
        assert!(b_peak > planck_lambda(peak * 0.9, t));
        assert!(b_peak > planck_lambda(peak * 1.1, t));
    }

    #[test]
    fn planck_increases_with_temperature() {
        let lambda = 1e-4;
        assert!(planck_lambda(lambda, 30.0) > planck_lambda(lambda, 20.0));
    }
}
