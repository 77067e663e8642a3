//! Test utilities and mock collaborators for Haze development.
//!
//! Provides simple implementations of the collaborator traits
//! ([`MaterialMix`](haze_core::MaterialMix), [`Medium`](haze_core::Medium),
//! [`SpatialGrid`](haze_core::SpatialGrid)) with closed-form behavior, so
//! that optical depths, weights and temperatures can be checked against
//! hand-computed values.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{ConstantMix, PowerLawMix, SlabGrid, UniformMedium};

/// Relative closeness check used across the test suites.
pub fn approx_eq(a: f64, b: f64, rel: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= rel * a.abs().max(b.abs())
}
