//! Local Shannon entropy.
//!
//! For every pixel, the base-2 entropy of the intensity distribution inside a
//! disk footprint centred on it. Only pixels inside the image are counted, so
//! border pixels see a smaller population.

use ndarray::Array2;

use super::cv::to_intensity;
use super::{ensure_extractable, FeatureExtractor};
use crate::config::EntropyConfig;
use crate::error::ExtractError;
use crate::types::{Dataset, FeatureData, RawImage};

/// Produces an H × W `f64` entropy map.
pub struct EntropyMapExtractor {
    config: EntropyConfig,
}

impl EntropyMapExtractor {
    pub fn new(config: EntropyConfig) -> Self {
        Self { config }
    }
}

impl FeatureExtractor for EntropyMapExtractor {
    fn dataset(&self) -> Dataset {
        Dataset::EntropyMap
    }

    fn extract(&self, image: &RawImage) -> Result<FeatureData, ExtractError> {
        ensure_extractable(image)?;
        let gray = to_intensity(image)?;
        Ok(FeatureData::F64x2(local_entropy(&gray, self.config.radius)))
    }
}

/// Offsets `(dy, dx)` with `dy² + dx² <= radius²`.
///
/// Radius 1 is the centre plus its four edge neighbours.
pub fn disk_footprint(radius: usize) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dy * dy + dx * dx <= r * r {
                offsets.push((dy, dx));
            }
        }
    }
    offsets
}

pub fn local_entropy(gray: &Array2<u8>, radius: usize) -> Array2<f64> {
    let (h, w) = gray.dim();
    let footprint = disk_footprint(radius);
    let mut window: Vec<u8> = Vec::with_capacity(footprint.len());
    let mut out = Array2::<f64>::zeros((h, w));

    for y in 0..h {
        for x in 0..w {
            window.clear();
            for &(dy, dx) in &footprint {
                let (ny, nx) = (y as isize + dy, x as isize + dx);
                if ny >= 0 && nx >= 0 && (ny as usize) < h && (nx as usize) < w {
                    window.push(gray[[ny as usize, nx as usize]]);
                }
            }
            out[[y, x]] = shannon_entropy(&mut window);
        }
    }
    out
}

/// Base-2 entropy of a small sample; sorts `values` in place.
fn shannon_entropy(values: &mut [u8]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable();
    let total = values.len() as f64;
    let mut entropy = 0.0;
    for run in values.chunk_by(|a, b| a == b) {
        let p = run.len() as f64 / total;
        entropy -= p * p.log2();
    }
    // A single-valued window yields -0.0.
    entropy.max(0.0)
}
