//! Per-cell and per-component state, and the parallel setup that fills it.
//!
//! Setup runs in three phases:
//!
//! 1. **Mix resolution** (serial, every rank): pick the material mix of each
//!    component, per cell when any medium varies its mix.
//! 2. **Sampling** (rayon, this rank's contiguous chunk of cells): average
//!    number densities over random positions inside the cell and evaluate
//!    velocity, magnetic field and temperature at the cell center.
//! 3. **Merge** (collective): each rank contributes its chunk to a flat
//!    buffer that is summed across ranks, so every rank ends up with the
//!    full state.
//!
//! Sampling uses one ChaCha stream per cell derived from the configured
//! seed, so the result does not depend on the number of threads or ranks.

use std::sync::Arc;

use haze_core::{partition, Communicator, MaterialMix, MaterialType, Medium, SpatialGrid, Vec3};
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::{ConfigError, MediumOptions};

/// Doubles per cell in the merge buffer: volume, velocity, field, temperature.
const CELL_STRIDE: usize = 8;

/// Doubles per component in the merge buffer: number density, temperature.
const COMPONENT_STRIDE: usize = 2;

// ── CellState ──────────────────────────────────────────────────────

/// Aggregate state of one spatial cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellState {
    /// Cell volume.
    pub volume: f64,
    /// Bulk velocity averaged over all components, weighted by number
    /// density; static components count with zero velocity.
    pub bulk_velocity: Vec3,
    /// Magnetic field; zero when no medium defines one.
    pub magnetic_field: Vec3,
    /// Mass-weighted temperature of the gas components; zero when no gas
    /// medium defines one.
    pub temperature: f64,
}

impl Default for CellState {
    fn default() -> Self {
        Self {
            volume: 0.0,
            bulk_velocity: Vec3::zeros(),
            magnetic_field: Vec3::zeros(),
            temperature: 0.0,
        }
    }
}

/// State of one medium component within one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ComponentState {
    /// Number density of entities.
    pub number_density: f64,
    /// Component temperature; zero when the medium defines none.
    pub temperature: f64,
}

// ── MixTable ───────────────────────────────────────────────────────

/// Material mix per component, optionally per cell.
pub(crate) struct MixTable {
    num_media: usize,
    per_cell: bool,
    mixes: Vec<Arc<dyn MaterialMix>>,
}

impl MixTable {
    /// Resolve the mixes of all media on `grid`.
    ///
    /// Variable mixes are evaluated at the cell center and must keep the
    /// material type of the medium's reference mix.
    pub(crate) fn resolve(
        grid: &dyn SpatialGrid,
        media: &[Box<dyn Medium>],
    ) -> Result<Self, ConfigError> {
        let num_media = media.len();
        let reference: Vec<Arc<dyn MaterialMix>> =
            media.iter().map(|medium| medium.mix()).collect();
        let per_cell = media.iter().any(|medium| medium.has_variable_mix());
        if !per_cell {
            return Ok(Self {
                num_media,
                per_cell,
                mixes: reference,
            });
        }

        let num_cells = grid.num_cells();
        let mut mixes = Vec::with_capacity(num_cells * num_media);
        for m in 0..num_cells {
            let center = grid.central_position(m);
            for (h, medium) in media.iter().enumerate() {
                if !medium.has_variable_mix() {
                    mixes.push(Arc::clone(&reference[h]));
                    continue;
                }
                let mix = medium.mix_at(center);
                if mix.material_type() != reference[h].material_type() {
                    return Err(ConfigError::InconsistentMaterialType { medium: h, cell: m });
                }
                mixes.push(mix);
            }
        }
        Ok(Self {
            num_media,
            per_cell,
            mixes,
        })
    }

    /// True when at least one component varies its mix across cells.
    pub(crate) fn per_cell(&self) -> bool {
        self.per_cell
    }

    /// Mix of component `h` in cell `m`.
    pub(crate) fn get(&self, m: usize, h: usize) -> &dyn MaterialMix {
        let index = if self.per_cell {
            m * self.num_media + h
        } else {
            h
        };
        &*self.mixes[index]
    }
}

// ── StateStore ─────────────────────────────────────────────────────

/// Cell and component state for the whole grid.
pub(crate) struct StateStore {
    num_media: usize,
    cells: Vec<CellState>,
    components: Vec<ComponentState>,
}

impl StateStore {
    /// Sample, merge and validate the state of every cell.
    pub(crate) fn compute(
        grid: &dyn SpatialGrid,
        media: &[Box<dyn Medium>],
        mixes: &MixTable,
        options: &MediumOptions,
        comm: &dyn Communicator,
    ) -> Result<Self, ConfigError> {
        let num_cells = grid.num_cells();
        let num_media = media.len();
        let mut cells = vec![CellState::default(); num_cells];
        let mut components = vec![ComponentState::default(); num_cells * num_media];

        let chunk = partition(num_cells, comm.rank(), comm.size());
        debug!(
            "rank {} samples cells {}..{} of {}",
            comm.rank(),
            chunk.start,
            chunk.end,
            num_cells
        );
        let sampler = CellSampler {
            grid,
            media,
            mixes,
            samples: options.num_density_samples as usize,
            seed: options.seed,
        };
        let chunk_components = &mut components[chunk.start * num_media..chunk.end * num_media];
        cells[chunk.clone()]
            .par_iter_mut()
            .zip(chunk_components.par_chunks_mut(num_media))
            .enumerate()
            .for_each(|(offset, (cell, comps))| sampler.sample(chunk.start + offset, cell, comps));

        let mut store = Self {
            num_media,
            cells,
            components,
        };
        if comm.is_multi_process() {
            store.merge(comm)?;
        }
        store.validate()?;
        Ok(store)
    }

    /// State of cell `m`.
    pub(crate) fn cell(&self, m: usize) -> &CellState {
        &self.cells[m]
    }

    /// State of component `h` in cell `m`.
    pub(crate) fn component(&self, m: usize, h: usize) -> &ComponentState {
        &self.components[m * self.num_media + h]
    }

    /// Sum the partial states of all ranks.
    ///
    /// Cells outside a rank's chunk are zero on that rank, so the sum
    /// reproduces every sampled value exactly.
    fn merge(&mut self, comm: &dyn Communicator) -> Result<(), ConfigError> {
        let num_cells = self.cells.len();
        let len = num_cells * CELL_STRIDE + self.components.len() * COMPONENT_STRIDE;
        let mut buffer = vec![0.0; len];
        let (cell_part, component_part) = buffer.split_at_mut(num_cells * CELL_STRIDE);
        for (cell, out) in self.cells.iter().zip(cell_part.chunks_exact_mut(CELL_STRIDE)) {
            out[0] = cell.volume;
            out[1..4].copy_from_slice(cell.bulk_velocity.as_slice());
            out[4..7].copy_from_slice(cell.magnetic_field.as_slice());
            out[7] = cell.temperature;
        }
        for (comp, out) in self
            .components
            .iter()
            .zip(component_part.chunks_exact_mut(COMPONENT_STRIDE))
        {
            out[0] = comp.number_density;
            out[1] = comp.temperature;
        }

        comm.sum_all(&mut buffer)?;

        let (cell_part, component_part) = buffer.split_at(num_cells * CELL_STRIDE);
        for (cell, src) in self.cells.iter_mut().zip(cell_part.chunks_exact(CELL_STRIDE)) {
            cell.volume = src[0];
            cell.bulk_velocity = Vec3::from_column_slice(&src[1..4]);
            cell.magnetic_field = Vec3::from_column_slice(&src[4..7]);
            cell.temperature = src[7];
        }
        for (comp, src) in self
            .components
            .iter_mut()
            .zip(component_part.chunks_exact(COMPONENT_STRIDE))
        {
            comp.number_density = src[0];
            comp.temperature = src[1];
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (m, cell) in self.cells.iter().enumerate() {
            if !(cell.volume.is_finite() && cell.volume > 0.0) {
                return Err(ConfigError::NonPositiveVolume {
                    cell: m,
                    volume: cell.volume,
                });
            }
            for h in 0..self.num_media {
                let density = self.component(m, h).number_density;
                if !(density.is_finite() && density >= 0.0) {
                    return Err(ConfigError::InvalidDensity {
                        cell: m,
                        medium: h,
                        density,
                    });
                }
            }
        }
        Ok(())
    }
}

// ── CellSampler ────────────────────────────────────────────────────

struct CellSampler<'a> {
    grid: &'a dyn SpatialGrid,
    media: &'a [Box<dyn Medium>],
    mixes: &'a MixTable,
    samples: usize,
    seed: u64,
}

impl CellSampler<'_> {
    fn sample(&self, m: usize, cell: &mut CellState, comps: &mut [ComponentState]) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(m as u64);
        let positions: Vec<Vec3> = (0..self.samples)
            .map(|_| self.grid.random_position(m, &mut rng))
            .collect();
        let center = self.grid.central_position(m);
        cell.volume = self.grid.volume(m);

        let mut momentum = Vec3::zeros();
        let mut total_density = 0.0;
        let mut thermal_mass = 0.0;
        let mut mass = 0.0;
        for (h, medium) in self.media.iter().enumerate() {
            let n = positions
                .iter()
                .map(|&position| medium.number_density(position))
                .sum::<f64>()
                / self.samples as f64;
            comps[h].number_density = n;

            if medium.has_velocity() {
                momentum += medium.bulk_velocity(center) * n;
            }
            total_density += n;
            if medium.has_magnetic_field() {
                cell.magnetic_field = medium.magnetic_field(center);
            }
            if medium.has_temperature() {
                let t = medium.temperature(center);
                comps[h].temperature = t;
                let mix = self.mixes.get(m, h);
                if mix.material_type() == MaterialType::Gas {
                    let rho = n * mix.mass();
                    thermal_mass += rho * t;
                    mass += rho;
                }
            }
        }
        if total_density > 0.0 {
            cell.bulk_velocity = momentum / total_density;
        }
        if mass > 0.0 {
            cell.temperature = thermal_mass / mass;
        }
    }
}
