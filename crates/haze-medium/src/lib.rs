//! Medium system for Monte Carlo radiative transfer.
//!
//! [`MediumSystem`] discretizes one or more transfer media on a spatial
//! grid. At construction it samples the density, velocity, magnetic field
//! and temperature of every (cell, component) pair, splitting the work
//! over threads and processes. During transport it answers:
//!
//! - **opacity** queries per cell, optionally restricted to one material type
//! - **path** queries: cumulative optical depth along a packet's ray, the
//!   interaction point for a sampled optical depth, and the attenuation
//!   toward an observer ([`PathDepth`])
//! - **scattering**: component weights, random scattering events and
//!   peel-off toward instruments ([`ScatteringWeights`])
//! - **radiation field** tallies, stored concurrently and merged across
//!   processes between phases ([`RadiationField`])
//! - **derived** quantities: mean intensity, indicative temperatures and
//!   absorbed luminosity
//!
//! # Example
//!
//! ```ignore
//! let mut config = MediumSystemConfig::new(grid, media);
//! config.radiation_wavelengths = Some(WavelengthGrid::logarithmic(1e-7, 1e-3, 50)?);
//! let system = MediumSystem::new(config)?;
//!
//! system.set_optical_depths(&mut packet);
//! if system.set_interaction_point(&mut packet, tau_scat) {
//!     packet.propagate(packet.interaction_distance());
//!     system.simulate_scattering(&mut rng, &mut packet);
//! }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;

mod derived;
mod opacity;
mod radiation;
mod scattering;
mod state;
mod system;
mod tracer;

pub use config::{ConfigError, MediumOptions, MediumSystemConfig};
pub use radiation::RadiationField;
pub use scattering::ScatteringWeights;
pub use state::{CellState, ComponentState};
pub use system::MediumSystem;
pub use tracer::PathDepth;
