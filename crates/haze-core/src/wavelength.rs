//! Binned wavelength grid used to index the radiation field tables.

use crate::error::WavelengthGridError;

/// A fixed set of contiguous wavelength bins.
///
/// Each bin `ell` spans `[left(ell), right(ell)]` and has a characteristic
/// wavelength at the geometric mean of its borders. The bin count and
/// ordering never change after construction, so every table indexed on
/// `ell` agrees on the layout for the lifetime of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct WavelengthGrid {
    borders: Vec<f64>,
    characteristic: Vec<f64>,
}

impl WavelengthGrid {
    /// Build a grid from strictly increasing, positive bin borders (meters).
    pub fn from_borders(borders: Vec<f64>) -> Result<Self, WavelengthGridError> {
        if borders.len() < 2 {
            return Err(WavelengthGridError::TooFewBorders {
                count: borders.len(),
            });
        }
        for (index, &value) in borders.iter().enumerate() {
            if !(value.is_finite() && value > 0.0) {
                return Err(WavelengthGridError::InvalidBorder { index, value });
            }
            if index > 0 && value <= borders[index - 1] {
                return Err(WavelengthGridError::NotIncreasing { index });
            }
        }
        let characteristic = borders.windows(2).map(|w| (w[0] * w[1]).sqrt()).collect();
        Ok(Self {
            borders,
            characteristic,
        })
    }

    /// Build `num_bins` logarithmically spaced bins between `min` and `max`.
    pub fn logarithmic(min: f64, max: f64, num_bins: usize) -> Result<Self, WavelengthGridError> {
        if num_bins == 0 {
            return Err(WavelengthGridError::TooFewBorders { count: 1 });
        }
        if !(min.is_finite() && min > 0.0) {
            return Err(WavelengthGridError::InvalidBorder {
                index: 0,
                value: min,
            });
        }
        let log_min = min.ln();
        let step = (max.ln() - log_min) / num_bins as f64;
        let borders = (0..=num_bins)
            .map(|i| (log_min + step * i as f64).exp())
            .collect();
        Self::from_borders(borders)
    }

    /// Number of bins.
    pub fn num_bins(&self) -> usize {
        self.characteristic.len()
    }

    /// Characteristic wavelength of bin `ell`.
    pub fn wavelength(&self, ell: usize) -> f64 {
        self.characteristic[ell]
    }

    /// Left (shortest) border of bin `ell`.
    pub fn left_border(&self, ell: usize) -> f64 {
        self.borders[ell]
    }

    /// Right (longest) border of bin `ell`.
    pub fn right_border(&self, ell: usize) -> f64 {
        self.borders[ell + 1]
    }

    /// Width `Δλ` of bin `ell`.
    pub fn bin_width(&self, ell: usize) -> f64 {
        self.borders[ell + 1] - self.borders[ell]
    }

    /// Index of the bin containing `lambda`, or `None` outside the grid.
    ///
    /// A wavelength on an interior border belongs to the bin on its right;
    /// the outermost right border belongs to the last bin.
    pub fn bin(&self, lambda: f64) -> Option<usize> {
        let n = self.num_bins();
        if !(lambda >= self.borders[0] && lambda <= self.borders[n]) {
            return None;
        }
        let idx = self.borders.partition_point(|&b| b <= lambda);
        Some(idx.saturating_sub(1).min(n - 1))
    }

    /// Iterator over the characteristic wavelengths.
    pub fn wavelengths(&self) -> impl Iterator<Item = f64> + '_ {
        self.characteristic.iter().copied()
    }
}
