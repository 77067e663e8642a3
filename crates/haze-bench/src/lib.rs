//! Benchmark profiles for the Haze medium system.
//!
//! Provides pre-built [`MediumSystemConfig`] profiles:
//!
//! - [`reference_profile`]: 1K-cell slab, one dust component at rest
//! - [`kinematic_profile`]: 1K-cell slab, dust plus moving electrons with
//!   Hubble expansion, so every segment takes the perceived-wavelength path
//! - [`stress_profile`]: 100K-cell slab for setup and reduction timing
//! - [`launch_packets`]: deterministic packet batch along the slab axis

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use haze_core::{MaterialType, PhotonPacket, Vec3, WavelengthGrid};
use haze_medium::{MediumOptions, MediumSystemConfig};
use haze_test_utils::{ConstantMix, PowerLawMix, SlabGrid, UniformMedium};

/// Slab length (m) shared by all profiles.
pub const SLAB_LENGTH: f64 = 1.0e16;

/// Radiation-field wavelength grid shared by all profiles.
pub fn profile_wavelengths() -> WavelengthGrid {
    WavelengthGrid::logarithmic(1e-7, 1e-3, 100).expect("reference wavelength grid is valid")
}

fn slab_config(cells: usize, seed: u64) -> MediumSystemConfig {
    let dust = PowerLawMix::dust(1e-19, 0.6, 1e-6, 1.5).shared();
    let mut config = MediumSystemConfig::new(
        SlabGrid::uniform(0.0, SLAB_LENGTH, cells).boxed(),
        vec![UniformMedium::new(dust, 1.0e4).with_gradient(-0.5e4 / SLAB_LENGTH).boxed()],
    );
    config.radiation_wavelengths = Some(profile_wavelengths());
    config.options = MediumOptions {
        seed,
        ..MediumOptions::default()
    };
    config
}

/// Reference profile: 1000 cells, static dust with a density gradient.
///
/// Extinction optical depth along the axis at 1 µm is 7.5.
pub fn reference_profile(seed: u64) -> MediumSystemConfig {
    slab_config(1000, seed)
}

/// Same slab as [`reference_profile`] plus a moving electron component and
/// cosmological expansion.
pub fn kinematic_profile(seed: u64) -> MediumSystemConfig {
    let mut config = slab_config(1000, seed);
    let electrons = ConstantMix::new(MaterialType::Electrons, 0.0, 6.65e-29).shared();
    config.media.push(
        UniformMedium::new(electrons, 1.0e10)
            .with_velocity(Vec3::new(3.0e5, 0.0, 0.0))
            .boxed(),
    );
    config.options.hubble_expansion_rate = 2.2e-18;
    config
}

/// Stress profile: 100K cells with the reference medium.
pub fn stress_profile(seed: u64) -> MediumSystemConfig {
    slab_config(100_000, seed)
}

/// Launch `n` packets at 1 µm from the slab entrance along +x.
///
/// Luminosities cycle deterministically so that peel-off thresholds vary.
pub fn launch_packets(n: usize) -> Vec<PhotonPacket> {
    (0..n)
        .map(|i| {
            let mut pp = PhotonPacket::new();
            pp.launch(
                1e-6,
                1.0 + (i % 7) as f64,
                Vec3::new(-1.0, 0.0, 0.0),
                Vec3::x(),
            );
            pp
        })
        .collect()
}
