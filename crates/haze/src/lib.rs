//! Haze: the medium system of a Monte Carlo radiative transfer code.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Haze sub-crates. For most users, adding `haze` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use haze::prelude::*;
//! use haze_test_utils::{ConstantMix, SlabGrid, UniformMedium};
//!
//! // Ten slabs of dust between x = 0 and x = 1, extinction opacity 2.
//! let mix = ConstantMix::dust(1.0, 1.0).shared();
//! let mut config = MediumSystemConfig::new(
//!     SlabGrid::uniform(0.0, 1.0, 10).boxed(),
//!     vec![UniformMedium::new(mix, 1.0).boxed()],
//! );
//! config.radiation_wavelengths = Some(WavelengthGrid::logarithmic(1e-7, 1e-3, 20).unwrap());
//! let system = MediumSystem::new(config).unwrap();
//!
//! // Launch a packet along +x and find where τ reaches 1.
//! let mut pp = PhotonPacket::new();
//! pp.launch(1e-6, 1.0, Vec3::zeros(), Vec3::x());
//! assert!(system.set_interaction_point(&mut pp, 1.0));
//! assert!((pp.interaction_distance() - 0.5).abs() < 1e-12);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `haze-core` | Packets, paths, wavelength grids, collaborator traits |
//! | [`medium`] | `haze-medium` | The medium system, its configuration and tallies |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and collaborator traits (`haze-core`).
///
/// Contains photon packets, grid paths, wavelength grids, physical
/// constants, and the [`types::SpatialGrid`], [`types::Medium`],
/// [`types::MaterialMix`] and [`types::Communicator`] traits.
pub use haze_core as types;

/// The medium system (`haze-medium`).
///
/// [`medium::MediumSystem`] with its configuration
/// ([`medium::MediumSystemConfig`], [`medium::MediumOptions`]) and the
/// [`medium::RadiationField`] tallies.
pub use haze_medium as medium;

/// Common imports for typical Haze usage.
///
/// ```rust
/// use haze::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use haze_core::{
        MaterialType, PathSegment, PhotonPacket, SpatialGridPath, StokesVector, Vec3,
        WavelengthGrid,
    };

    // Collaborator traits
    pub use haze_core::{Communicator, MaterialMix, Medium, SpatialGrid};

    // Errors
    pub use haze_core::{CommError, WavelengthGridError};
    pub use haze_medium::ConfigError;

    // Medium system
    pub use haze_medium::{
        MediumOptions, MediumSystem, MediumSystemConfig, PathDepth, RadiationField,
        ScatteringWeights,
    };
}
