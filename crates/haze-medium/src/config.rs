//! Medium system configuration, validation, and error types.
//!
//! [`MediumSystemConfig`] is the builder-input for
//! [`MediumSystem::new`](crate::MediumSystem::new).
//! [`validate()`](MediumSystemConfig::validate) checks the structural
//! invariants that can be decided before any cell is touched; the
//! constructor then reports the data-dependent ones (negative densities,
//! degenerate cells) after setup.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use haze_core::{CommError, Communicator, Medium, SingleProcess, SpatialGrid, WavelengthGrid};

// ── MediumOptions ──────────────────────────────────────────────────

/// Tunables for setup and transport.
#[derive(Clone, Debug)]
pub struct MediumOptions {
    /// Random density samples per cell used to estimate the cell mass.
    /// Default: 100. Valid range: 10..=1000.
    pub num_density_samples: u32,
    /// Seed for the per-cell sampling streams. Default: 0.
    pub seed: u64,
    /// Hubble expansion rate (1/s) used for the cosmological shift of the
    /// perceived wavelength along a path. Default: 0 (no expansion).
    pub hubble_expansion_rate: f64,
    /// Track the Stokes vector in peel-off packets. Default: false.
    pub polarization: bool,
    /// Allocate the secondary radiation-field tables. Default: false.
    pub secondary_emission: bool,
}

impl MediumOptions {
    /// Lower bound for [`num_density_samples`](Self::num_density_samples).
    pub const MIN_DENSITY_SAMPLES: u32 = 10;

    /// Upper bound for [`num_density_samples`](Self::num_density_samples).
    pub const MAX_DENSITY_SAMPLES: u32 = 1000;
}

impl Default for MediumOptions {
    fn default() -> Self {
        Self {
            num_density_samples: 100,
            seed: 0,
            hubble_expansion_rate: 0.0,
            polarization: false,
            secondary_emission: false,
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Configuration-fatal errors. Any of these aborts the run.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// No transfer media configured.
    NoMedia,
    /// The spatial grid has zero cells.
    EmptyGrid,
    /// `num_density_samples` is outside `10..=1000`.
    InvalidDensitySamples {
        /// The configured value.
        configured: u32,
    },
    /// Hubble expansion rate is negative or not finite.
    InvalidExpansionRate {
        /// The configured value.
        value: f64,
    },
    /// More than one medium specifies a magnetic field.
    MultipleMagneticFields {
        /// First medium with a magnetic field.
        first: usize,
        /// Second medium with a magnetic field.
        second: usize,
    },
    /// A medium's mix changes material type across the domain.
    InconsistentMaterialType {
        /// Index of the medium.
        medium: usize,
        /// Cell where the mismatch was found.
        cell: usize,
    },
    /// A grid cell has zero, negative or non-finite volume.
    NonPositiveVolume {
        /// Cell index.
        cell: usize,
        /// Reported volume.
        volume: f64,
    },
    /// A medium produced a negative or non-finite number density.
    InvalidDensity {
        /// Cell index.
        cell: usize,
        /// Medium index.
        medium: usize,
        /// Computed density.
        density: f64,
    },
    /// Cross-process state merge failed.
    Communication(CommError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMedia => write!(f, "medium system has no media"),
            Self::EmptyGrid => write!(f, "spatial grid has zero cells"),
            Self::InvalidDensitySamples { configured } => write!(
                f,
                "num_density_samples {configured} outside [{}, {}]",
                MediumOptions::MIN_DENSITY_SAMPLES,
                MediumOptions::MAX_DENSITY_SAMPLES,
            ),
            Self::InvalidExpansionRate { value } => {
                write!(f, "hubble_expansion_rate must be finite and >= 0, got {value}")
            }
            Self::MultipleMagneticFields { first, second } => write!(
                f,
                "media {first} and {second} both specify a magnetic field; at most one may"
            ),
            Self::InconsistentMaterialType { medium, cell } => write!(
                f,
                "medium {medium} changes material type in cell {cell}"
            ),
            Self::NonPositiveVolume { cell, volume } => {
                write!(f, "cell {cell} has non-positive volume {volume}")
            }
            Self::InvalidDensity {
                cell,
                medium,
                density,
            } => write!(
                f,
                "medium {medium} has invalid number density {density} in cell {cell}"
            ),
            Self::Communication(e) => write!(f, "state merge: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Communication(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CommError> for ConfigError {
    fn from(e: CommError) -> Self {
        Self::Communication(e)
    }
}

// ── MediumSystemConfig ─────────────────────────────────────────────

/// Complete input for constructing a [`MediumSystem`](crate::MediumSystem).
pub struct MediumSystemConfig {
    /// Spatial tessellation of the domain.
    pub grid: Box<dyn SpatialGrid>,
    /// Transfer media, indexed by component `h`.
    pub media: Vec<Box<dyn Medium>>,
    /// Wavelength bins of the radiation field; `None` disables recording.
    pub radiation_wavelengths: Option<WavelengthGrid>,
    /// Process group for state and tally merges.
    pub communicator: Arc<dyn Communicator>,
    /// Setup and transport options.
    pub options: MediumOptions,
}

impl MediumSystemConfig {
    /// Single-process configuration with default options.
    pub fn new(grid: Box<dyn SpatialGrid>, media: Vec<Box<dyn Medium>>) -> Self {
        Self {
            grid,
            media,
            radiation_wavelengths: None,
            communicator: Arc::new(SingleProcess),
            options: MediumOptions::default(),
        }
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.media.is_empty() {
            return Err(ConfigError::NoMedia);
        }
        if self.grid.num_cells() == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        let samples = self.options.num_density_samples;
        if !(MediumOptions::MIN_DENSITY_SAMPLES..=MediumOptions::MAX_DENSITY_SAMPLES)
            .contains(&samples)
        {
            return Err(ConfigError::InvalidDensitySamples {
                configured: samples,
            });
        }
        let rate = self.options.hubble_expansion_rate;
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigError::InvalidExpansionRate { value: rate });
        }
        let mut magnetic = self
            .media
            .iter()
            .enumerate()
            .filter(|(_, medium)| medium.has_magnetic_field())
            .map(|(h, _)| h);
        if let (Some(first), Some(second)) = (magnetic.next(), magnetic.next()) {
            return Err(ConfigError::MultipleMagneticFields { first, second });
        }
        Ok(())
    }
}

impl fmt::Debug for MediumSystemConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediumSystemConfig")
            .field("grid_cells", &self.grid.num_cells())
            .field("grid_dimension", &self.grid.dimension())
            .field("media", &self.media.len())
            .field(
                "radiation_bins",
                &self.radiation_wavelengths.as_ref().map(WavelengthGrid::num_bins),
            )
            .field("ranks", &self.communicator.size())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haze_core::Vec3;
    use haze_test_utils::{ConstantMix, SlabGrid, UniformMedium};

    fn valid_config() -> MediumSystemConfig {
        let mix = ConstantMix::dust(1.0, 1.0).shared();
        MediumSystemConfig::new(
            SlabGrid::uniform(0.0, 1.0, 4).boxed(),
            vec![UniformMedium::new(mix, 1.0).boxed()],
        )
    }

    #[test]
    fn validate_valid_config_succeeds() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_no_media_fails() {
        let mut cfg = valid_config();
        cfg.media.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::NoMedia));
    }

    #[test]
    fn validate_density_samples_range() {
        let mut cfg = valid_config();
        cfg.options.num_density_samples = 9;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidDensitySamples { configured: 9 })
        );
        cfg.options.num_density_samples = 1000;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_negative_expansion_fails() {
        let mut cfg = valid_config();
        cfg.options.hubble_expansion_rate = -1.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidExpansionRate { .. })
        ));
    }

    #[test]
    fn validate_two_magnetic_fields_fails() {
        let mix = ConstantMix::dust(1.0, 1.0).shared();
        let mut cfg = valid_config();
        cfg.media = vec![
            UniformMedium::new(mix.clone(), 1.0)
                .with_magnetic_field(Vec3::z())
                .boxed(),
            UniformMedium::new(mix.clone(), 1.0).boxed(),
            UniformMedium::new(mix, 1.0)
                .with_magnetic_field(Vec3::x())
                .boxed(),
        ];
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MultipleMagneticFields {
                first: 0,
                second: 2
            })
        );
    }

    #[test]
    fn config_error_source_chains_comm_error() {
        let e = ConfigError::from(CommError::Disconnected { rank: 1 });
        assert!(e.source().is_some());
        assert!(e.to_string().starts_with("state merge:"));
    }
}
