//! Radiation-field tallies.
//!
//! Each table holds one `f64` per (cell, wavelength bin): the sum of
//! luminosity times path length of every packet segment that crossed the
//! cell in that bin. Transport threads add to the tables concurrently
//! through `&self`; the phase operations `clear` and `communicate` take
//! `&mut self`, so the borrow checker guarantees no store is in flight
//! while they run.
//!
//! With secondary emission enabled there are two secondary tables: the
//! *stable* one holds the result of the previous secondary iteration and is
//! what derived quantities read, while the *accumulating* one collects the
//! current iteration. Communicating the secondary field moves the merged
//! accumulating table into the stable one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use haze_core::{CommError, Communicator, WavelengthGrid};
use log::debug;

use crate::MediumSystem;

// ── AtomicTable ────────────────────────────────────────────────────

/// Dense (cell, bin) table of `f64` values supporting lock-free addition.
struct AtomicTable {
    num_bins: usize,
    bins: Vec<AtomicU64>,
}

impl AtomicTable {
    fn new(num_cells: usize, num_bins: usize) -> Self {
        Self {
            num_bins,
            bins: (0..num_cells * num_bins).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Add `value` to entry `(m, ell)` with a compare-and-swap loop on the
    /// bit pattern.
    fn add(&self, m: usize, ell: usize, value: f64) {
        let slot = &self.bins[m * self.num_bins + ell];
        let mut current = slot.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match slot.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn get(&self, m: usize, ell: usize) -> f64 {
        f64::from_bits(self.bins[m * self.num_bins + ell].load(Ordering::Relaxed))
    }

    fn clear(&mut self) {
        for slot in &mut self.bins {
            *slot.get_mut() = 0;
        }
    }

    fn to_vec(&mut self) -> Vec<f64> {
        self.bins
            .iter_mut()
            .map(|slot| f64::from_bits(*slot.get_mut()))
            .collect()
    }

    fn load(&mut self, values: &[f64]) {
        for (slot, value) in self.bins.iter_mut().zip(values) {
            *slot.get_mut() = value.to_bits();
        }
    }

    /// Sum the table across all ranks of `comm`.
    fn sum_all(&mut self, comm: &dyn Communicator) -> Result<(), CommError> {
        if !comm.is_multi_process() {
            return Ok(());
        }
        let mut buffer = self.to_vec();
        comm.sum_all(&mut buffer)?;
        self.load(&buffer);
        Ok(())
    }
}

// ── RadiationField ─────────────────────────────────────────────────

struct SecondaryTables {
    stable: Vec<f64>,
    accumulating: AtomicTable,
}

/// Primary and optional secondary radiation-field tallies.
pub struct RadiationField {
    wavelengths: WavelengthGrid,
    primary: AtomicTable,
    secondary: Option<SecondaryTables>,
}

impl RadiationField {
    /// Zeroed tables for `num_cells` cells on `wavelengths`.
    pub fn new(num_cells: usize, wavelengths: WavelengthGrid, secondary: bool) -> Self {
        let num_bins = wavelengths.num_bins();
        Self {
            primary: AtomicTable::new(num_cells, num_bins),
            secondary: secondary.then(|| SecondaryTables {
                stable: vec![0.0; num_cells * num_bins],
                accumulating: AtomicTable::new(num_cells, num_bins),
            }),
            wavelengths,
        }
    }

    /// Wavelength bins of the tables.
    pub fn wavelengths(&self) -> &WavelengthGrid {
        &self.wavelengths
    }

    /// True if secondary tables are allocated.
    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    /// Start a new primary or secondary iteration.
    ///
    /// Clearing the primary field also zeroes the stable secondary table.
    /// Clearing the secondary field zeroes only the accumulating table; the
    /// stable one keeps serving derived quantities until the next
    /// `communicate`.
    pub fn clear(&mut self, primary: bool) {
        if primary {
            self.primary.clear();
            if let Some(secondary) = &mut self.secondary {
                secondary.stable.fill(0.0);
            }
        } else if let Some(secondary) = &mut self.secondary {
            secondary.accumulating.clear();
        }
    }

    /// Add `lds` (luminosity times path length) to bin `ell` of cell `m`.
    ///
    /// Secondary contributions are dropped when no secondary tables exist.
    pub fn store(&self, primary: bool, m: usize, ell: usize, lds: f64) {
        if primary {
            self.primary.add(m, ell, lds);
        } else if let Some(secondary) = &self.secondary {
            secondary.accumulating.add(m, ell, lds);
        }
    }

    /// Sum the primary table, or the accumulating secondary table, across
    /// ranks. For the secondary field the merged result then replaces the
    /// stable table.
    pub fn communicate(&mut self, primary: bool, comm: &dyn Communicator) -> Result<(), CommError> {
        if primary {
            return self.primary.sum_all(comm);
        }
        if let Some(secondary) = &mut self.secondary {
            secondary.accumulating.sum_all(comm)?;
            secondary.stable = secondary.accumulating.to_vec();
        }
        Ok(())
    }

    /// Primary tally of bin `ell` in cell `m`.
    pub fn primary(&self, m: usize, ell: usize) -> f64 {
        self.primary.get(m, ell)
    }

    /// Stable secondary tally of bin `ell` in cell `m`; zero without
    /// secondary tables.
    pub fn secondary(&self, m: usize, ell: usize) -> f64 {
        self.secondary
            .as_ref()
            .map_or(0.0, |s| s.stable[m * self.wavelengths.num_bins() + ell])
    }

    /// Combined tally used by derived quantities: primary plus stable
    /// secondary.
    pub fn total(&self, m: usize, ell: usize) -> f64 {
        self.primary(m, ell) + self.secondary(m, ell)
    }

    /// The primary tally when `primary`, else the stable secondary tally.
    pub fn table(&self, primary: bool, m: usize, ell: usize) -> f64 {
        if primary {
            self.primary(m, ell)
        } else {
            self.secondary(m, ell)
        }
    }
}

impl fmt::Debug for RadiationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadiationField")
            .field("num_bins", &self.wavelengths.num_bins())
            .field("num_cells", &(self.primary.bins.len() / self.primary.num_bins.max(1)))
            .field("secondary", &self.has_secondary())
            .finish()
    }
}

// ── MediumSystem phase operations ──────────────────────────────────

impl MediumSystem {
    /// Zero the primary or accumulating secondary radiation field.
    ///
    /// Does nothing when radiation recording is disabled.
    pub fn clear_radiation_field(&mut self, primary: bool) {
        if let Some(rf) = &mut self.radiation {
            debug!("clearing {} radiation field", field_name(primary));
            rf.clear(primary);
        }
    }

    /// Record `lds` for bin `ell` of cell `m`; safe to call concurrently.
    pub fn store_radiation_field(&self, primary: bool, m: usize, ell: usize, lds: f64) {
        if let Some(rf) = &self.radiation {
            rf.store(primary, m, ell, lds);
        }
    }

    /// Merge the primary or secondary radiation field across ranks.
    ///
    /// Collective: every rank must call this between the same phases.
    pub fn communicate_radiation_field(&mut self, primary: bool) -> Result<(), CommError> {
        let Some(rf) = &mut self.radiation else {
            return Ok(());
        };
        debug!(
            "communicating {} radiation field over {} ranks",
            field_name(primary),
            self.communicator.size()
        );
        rf.communicate(primary, &*self.communicator)
    }
}

fn field_name(primary: bool) -> &'static str {
    if primary {
        "primary"
    } else {
        "secondary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haze_core::{ChannelCommunicator, SingleProcess};
    use std::thread;

    fn grid() -> WavelengthGrid {
        WavelengthGrid::logarithmic(1e-7, 1e-3, 10).unwrap()
    }

    #[test]
    fn concurrent_stores_sum_exactly() {
        let rf = RadiationField::new(3, grid(), false);
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        rf.store(true, 2, 5, 0.5);
                    }
                });
            }
        });
        assert_eq!(rf.primary(2, 5), 4000.0);
        assert_eq!(rf.primary(2, 4), 0.0);
    }

    #[test]
    fn secondary_store_without_tables_is_dropped() {
        let rf = RadiationField::new(2, grid(), false);
        rf.store(false, 0, 0, 1.0);
        assert_eq!(rf.secondary(0, 0), 0.0);
        assert_eq!(rf.total(0, 0), 0.0);
    }

    #[test]
    fn secondary_becomes_stable_after_communicate() {
        let mut rf = RadiationField::new(2, grid(), true);
        rf.store(false, 1, 3, 2.0);
        assert_eq!(rf.secondary(1, 3), 0.0);
        rf.communicate(false, &SingleProcess).unwrap();
        assert_eq!(rf.secondary(1, 3), 2.0);

        rf.clear(false);
        assert_eq!(rf.secondary(1, 3), 2.0);
        rf.store(true, 1, 3, 1.0);
        assert_eq!(rf.total(1, 3), 3.0);
        assert_eq!(rf.table(true, 1, 3), 1.0);
    }

    #[test]
    fn clear_primary_drops_stable_secondary() {
        let mut rf = RadiationField::new(1, grid(), true);
        rf.store(true, 0, 0, 1.0);
        rf.store(false, 0, 0, 1.0);
        rf.communicate(false, &SingleProcess).unwrap();
        rf.clear(true);
        assert_eq!(rf.primary(0, 0), 0.0);
        assert_eq!(rf.secondary(0, 0), 0.0);
    }

    #[test]
    fn communicate_sums_across_ranks() {
        let comms = ChannelCommunicator::group(3);
        let results: Vec<f64> = thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let mut rf = RadiationField::new(2, grid(), false);
                        rf.store(true, 1, 2, (comm.rank() + 1) as f64);
                        rf.communicate(true, &comm).unwrap();
                        rf.primary(1, 2)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results, vec![6.0, 6.0, 6.0]);
    }
}
