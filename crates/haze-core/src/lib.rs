//! Core types and collaborator traits for the Haze medium system.
//!
//! This is the leaf crate of the workspace. It defines the value types
//! that flow through the transport hot path (photon packets, grid paths,
//! wavelength grids) and the narrow capability traits through which the
//! medium system talks to its collaborators:
//!
//! - [`SpatialGrid`]: geometric tessellation of rays into cell segments
//! - [`Medium`]: input density / velocity / field model, used at setup
//! - [`MaterialMix`]: per-wavelength cross sections and scattering physics
//! - [`Communicator`]: element-wise sum of flat buffers across processes

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod comm;
pub mod constants;
pub mod error;
pub mod grid;
pub mod material;
pub mod medium;
pub mod packet;
pub mod path;
pub mod wavelength;

/// Three-component vector for positions, directions, velocities and fields.
pub type Vec3 = nalgebra::Vector3<f64>;

pub use comm::{partition, ChannelCommunicator, Communicator, SingleProcess};
pub use error::{CommError, WavelengthGridError};
pub use grid::SpatialGrid;
pub use material::{MaterialMix, MaterialState, MaterialType, PeelOffOutcome, ScatteringOutcome};
pub use medium::Medium;
pub use packet::{PhotonPacket, StokesVector};
pub use path::{PathSegment, SpatialGridPath};
pub use wavelength::WavelengthGrid;
