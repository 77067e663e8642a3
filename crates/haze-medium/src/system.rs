//! [`MediumSystem`]: construction and state queries.
//!
//! Opacity, tracing, scattering, radiation-field and derived-quantity
//! operations live in sibling modules as further `impl MediumSystem`
//! blocks.

use std::fmt;
use std::sync::Arc;

use haze_core::{
    Communicator, MaterialMix, MaterialState, MaterialType, SpatialGrid, Vec3, WavelengthGrid,
};
use log::{info, warn};

use crate::config::{ConfigError, MediumOptions, MediumSystemConfig};
use crate::radiation::RadiationField;
use crate::state::{CellState, ComponentState, MixTable, StateStore};

/// Spatial discretization of all transfer media.
///
/// Owns the grid, the per-cell and per-component state computed at setup,
/// and the radiation-field tallies. After construction the system is
/// shared read-only across transport threads; only the radiation tallies
/// are written concurrently (through atomics), and only the
/// `clear`/`communicate` phase operations need exclusive access.
pub struct MediumSystem {
    pub(crate) grid: Box<dyn SpatialGrid>,
    pub(crate) mixes: MixTable,
    pub(crate) state: StateStore,
    pub(crate) options: MediumOptions,
    pub(crate) communicator: Arc<dyn Communicator>,
    pub(crate) radiation: Option<RadiationField>,
    material_types: Vec<MaterialType>,
    dimension: u8,
    /// Some medium carries a bulk velocity or the universe expands, so the
    /// perceived wavelength differs from the packet wavelength.
    pub(crate) kinematic: bool,
    /// Opacity is `n * section(λ)` with one mix per component everywhere,
    /// so path tracing can reuse per-component cross sections.
    pub(crate) constant_sections: bool,
}

// Compile-time assertion: transport threads share the system by reference.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<MediumSystem>();
};

impl MediumSystem {
    /// Validate `config`, sample the state of every cell and allocate the
    /// radiation field.
    ///
    /// Collective: every rank of the configured communicator must call
    /// this with an equivalent configuration.
    pub fn new(config: MediumSystemConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let MediumSystemConfig {
            grid,
            media,
            radiation_wavelengths,
            communicator,
            options,
        } = config;

        let mixes = MixTable::resolve(&*grid, &media)?;
        let state = StateStore::compute(&*grid, &media, &mixes, &options, &*communicator)?;

        let num_media = media.len();
        let material_types: Vec<MaterialType> =
            media.iter().map(|medium| medium.mix().material_type()).collect();
        for (h, medium) in media.iter().enumerate() {
            let mass = medium.mix().mass();
            if mass <= 0.0 {
                warn!("medium {h} has entity mass {mass}; its mass density will be zero");
            }
        }
        let dimension = media
            .iter()
            .map(|medium| medium.dimension())
            .max()
            .unwrap_or(1);
        let kinematic =
            media.iter().any(|medium| medium.has_velocity()) || options.hubble_expansion_rate > 0.0;
        let constant_sections = !kinematic
            && !mixes.per_cell()
            && (0..num_media).all(|h| mixes.get(0, h).has_constant_sections());
        let radiation = radiation_wavelengths.map(|wavelengths| {
            RadiationField::new(grid.num_cells(), wavelengths, options.secondary_emission)
        });

        info!(
            "medium system ready: {} cells x {} media on {} rank(s), dimension {}, \
             {} radiation bins{}",
            grid.num_cells(),
            num_media,
            communicator.size(),
            dimension,
            radiation.as_ref().map_or(0, |rf| rf.wavelengths().num_bins()),
            if constant_sections { ", constant sections" } else { "" },
        );

        Ok(Self {
            grid,
            mixes,
            state,
            options,
            communicator,
            radiation,
            material_types,
            dimension,
            kinematic,
            constant_sections,
        })
    }

    // ── Structure ──────────────────────────────────────────────────

    /// Number of spatial cells.
    pub fn num_cells(&self) -> usize {
        self.grid.num_cells()
    }

    /// Number of medium components.
    pub fn num_media(&self) -> usize {
        self.material_types.len()
    }

    /// Dimension of the model: the highest dimension among the media.
    pub fn dimension(&self) -> u8 {
        self.dimension
    }

    /// Dimension of the spatial grid.
    pub fn grid_dimension(&self) -> u8 {
        self.grid.dimension()
    }

    /// The spatial grid.
    pub fn grid(&self) -> &dyn SpatialGrid {
        &*self.grid
    }

    /// Setup and transport options.
    pub fn options(&self) -> &MediumOptions {
        &self.options
    }

    /// The radiation field, if recording is enabled.
    pub fn radiation_field(&self) -> Option<&RadiationField> {
        self.radiation.as_ref()
    }

    /// Wavelength grid of the radiation field, if recording is enabled.
    pub fn radiation_wavelengths(&self) -> Option<&WavelengthGrid> {
        self.radiation.as_ref().map(RadiationField::wavelengths)
    }

    // ── Material types ─────────────────────────────────────────────

    /// Material mix of component `h` in cell `m`.
    pub fn mix(&self, m: usize, h: usize) -> &dyn MaterialMix {
        self.mixes.get(m, h)
    }

    /// True if component `h` is of type `ty`.
    pub fn is_material_type(&self, ty: MaterialType, h: usize) -> bool {
        self.material_types[h] == ty
    }

    /// True if component `h` is dust.
    pub fn is_dust(&self, h: usize) -> bool {
        self.is_material_type(MaterialType::Dust, h)
    }

    /// True if component `h` is electrons.
    pub fn is_electrons(&self, h: usize) -> bool {
        self.is_material_type(MaterialType::Electrons, h)
    }

    /// True if component `h` is gas.
    pub fn is_gas(&self, h: usize) -> bool {
        self.is_material_type(MaterialType::Gas, h)
    }

    /// True if any component is of type `ty`.
    pub fn has_material_type(&self, ty: MaterialType) -> bool {
        self.material_types.contains(&ty)
    }

    /// True if any component is dust.
    pub fn has_dust(&self) -> bool {
        self.has_material_type(MaterialType::Dust)
    }

    /// True if any component is electrons.
    pub fn has_electrons(&self) -> bool {
        self.has_material_type(MaterialType::Electrons)
    }

    /// True if any component is gas.
    pub fn has_gas(&self) -> bool {
        self.has_material_type(MaterialType::Gas)
    }

    // ── Cell state ─────────────────────────────────────────────────

    /// Aggregate state of cell `m`.
    pub fn cell_state(&self, m: usize) -> &CellState {
        self.state.cell(m)
    }

    /// State of component `h` in cell `m`.
    pub fn component_state(&self, m: usize, h: usize) -> &ComponentState {
        self.state.component(m, h)
    }

    /// Volume of cell `m`.
    pub fn volume(&self, m: usize) -> f64 {
        self.state.cell(m).volume
    }

    /// Aggregate bulk velocity in cell `m`.
    pub fn bulk_velocity(&self, m: usize) -> Vec3 {
        self.state.cell(m).bulk_velocity
    }

    /// Magnetic field in cell `m`.
    pub fn magnetic_field(&self, m: usize) -> Vec3 {
        self.state.cell(m).magnetic_field
    }

    /// Number density of component `h` in cell `m`.
    pub fn number_density(&self, m: usize, h: usize) -> f64 {
        self.state.component(m, h).number_density
    }

    /// Mass density of component `h` in cell `m`.
    pub fn mass_density(&self, m: usize, h: usize) -> f64 {
        self.number_density(m, h) * self.mix(m, h).mass()
    }

    /// Temperature of component `h` in cell `m` as given by its medium.
    pub fn temperature(&self, m: usize, h: usize) -> f64 {
        self.state.component(m, h).temperature
    }

    /// Local state handed to the material mix of component `h` in cell `m`.
    pub(crate) fn material_state(&self, m: usize, h: usize) -> MaterialState {
        let cell = self.state.cell(m);
        MaterialState {
            cell: m,
            number_density: self.number_density(m, h),
            temperature: self.temperature(m, h),
            bulk_velocity: cell.bulk_velocity,
            magnetic_field: cell.magnetic_field,
        }
    }
}

impl fmt::Debug for MediumSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediumSystem")
            .field("num_cells", &self.num_cells())
            .field("material_types", &self.material_types)
            .field("dimension", &self.dimension)
            .field("constant_sections", &self.constant_sections)
            .field("options", &self.options)
            .field("radiation", &self.radiation)
            .finish()
    }
}
