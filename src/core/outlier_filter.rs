//! Artifact filtering over decoded height fields.
//!
//! Terrain-RGB tiles occasionally carry single-pixel spikes from sensor
//! noise or lossy compression. Three interchangeable strategies clean them
//! up: a no-op, a global elevation cap, and a Hampel filter that flags a
//! pixel as a spike when it deviates from its 5x5 neighborhood median by
//! more than k times the median absolute deviation.

use crate::types::{FilterMethod, HeightField, TerrainResult};
use ndarray::Array2;

/// Outlier filter parameters
#[derive(Debug, Clone)]
pub struct OutlierFilterParams {
    /// Neighborhood edge length (must be odd)
    pub window_size: usize,
    /// Spike threshold multiplier on the MAD
    pub k: f32,
    /// Guard added to the MAD so perfectly flat neighborhoods (MAD = 0)
    /// do not flag benign pixels
    pub epsilon: f32,
    /// Minimum neighborhood samples required before the MAD is trusted;
    /// pixels with fewer samples are left unmodified
    pub min_samples: usize,
    /// Ceiling used by the capping strategy
    pub elevation_cap: f32,
}

impl Default for OutlierFilterParams {
    fn default() -> Self {
        Self {
            window_size: 5,        // 5x5 neighborhood
            k: 3.0,                // standard robust threshold constant
            epsilon: 0.01,         // flat-neighborhood guard
            min_samples: 9,        // below this the MAD is unreliable
            elevation_cap: 3500.0, // meters
        }
    }
}

/// Height field artifact filter
pub struct OutlierFilter {
    params: OutlierFilterParams,
}

impl OutlierFilter {
    /// Create a filter with default parameters
    pub fn new() -> Self {
        Self {
            params: OutlierFilterParams::default(),
        }
    }

    /// Create a filter with custom parameters
    pub fn with_params(params: OutlierFilterParams) -> Self {
        Self { params }
    }

    /// Apply the selected strategy to a height field
    pub fn apply(&self, field: &HeightField, method: FilterMethod) -> TerrainResult<HeightField> {
        log::info!("Applying {} artifact filter", method);
        log::debug!("Filter parameters: {:?}", self.params);

        let filtered = match method {
            FilterMethod::None => field.clone(),
            FilterMethod::Capping => self.apply_capping(field),
            FilterMethod::Hampel => self.apply_hampel(field),
        };

        Ok(filtered)
    }

    /// Clamp every value to the configured ceiling
    fn apply_capping(&self, field: &HeightField) -> HeightField {
        let cap = self.params.elevation_cap;
        field.mapv(|v| v.min(cap))
    }

    /// Hampel filter: replace pixels deviating from the local median by more
    /// than `k * (MAD + epsilon)` with that median
    fn apply_hampel(&self, field: &HeightField) -> HeightField {
        let (height, width) = field.dim();
        let mut filtered = Array2::zeros((height, width));
        let half_window = self.params.window_size / 2;
        let mut replaced = 0usize;

        let mut window_values = Vec::with_capacity(self.params.window_size * self.params.window_size);

        for i in 0..height {
            for j in 0..width {
                let center = field[[i, j]];
                window_values.clear();

                // Gather the neighborhood, truncated at raster edges
                for wi in 0..self.params.window_size {
                    for wj in 0..self.params.window_size {
                        let ii = i as i32 + wi as i32 - half_window as i32;
                        let jj = j as i32 + wj as i32 - half_window as i32;

                        if ii >= 0 && ii < height as i32 && jj >= 0 && jj < width as i32 {
                            let v = field[[ii as usize, jj as usize]];
                            if v.is_finite() {
                                window_values.push(v);
                            }
                        }
                    }
                }

                // Too few samples for a trustworthy MAD; keep the pixel
                if window_values.len() < self.params.min_samples {
                    filtered[[i, j]] = center;
                    continue;
                }

                let median = Self::median_of(&mut window_values);
                let mut deviations: Vec<f32> =
                    window_values.iter().map(|v| (v - median).abs()).collect();
                let mad = Self::median_of(&mut deviations);

                let threshold = self.params.k * (mad + self.params.epsilon);
                if (center - median).abs() > threshold {
                    filtered[[i, j]] = median;
                    replaced += 1;
                } else {
                    filtered[[i, j]] = center;
                }
            }
        }

        if replaced > 0 {
            log::info!(
                "Hampel filter replaced {} of {} pixels ({:.2}%)",
                replaced,
                height * width,
                replaced as f64 / (height * width) as f64 * 100.0
            );
        }

        filtered
    }

    /// Median by sorting; reorders the slice
    fn median_of(values: &mut [f32]) -> f32 {
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values[values.len() / 2]
    }
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self::new()
    }
}
