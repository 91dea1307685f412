//! Core data types for the Prism feature-extraction pipeline.
//!
//! Pixel data is always stored height × width × channel in **RGB** order.
//! The loader produces that order and every extractor and the feature store
//! consume and produce it unchanged.

use image::RgbImage;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Number of channels in the canonical pixel layout.
pub const CHANNELS: usize = 3;

/// Identifier of one image, derived once from its filename stem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the identifier from a path: the file name without its final extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Portrait iff height exceeds width; squares are landscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn from_dimensions(height: usize, width: usize) -> Self {
        if height > width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

/// One row of the metadata index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Unique identifier (filename stem)
    pub identifier: ImageId,

    /// Path of the source file as found under the source directory
    pub relative_path: PathBuf,

    /// Image height in pixels
    pub height: usize,

    /// Image width in pixels
    pub width: usize,

    /// Channel count of the decoded buffer
    pub channel_count: usize,

    /// Portrait or landscape
    pub orientation: Orientation,

    /// Container holding this image's feature bundle, set at index finalization
    pub feature_store_path: Option<PathBuf>,
}

/// Decoded pixel buffer, H × W × 3 in RGB order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pixels: Array3<u8>,
}

impl RawImage {
    /// Wrap an RGB8 image buffer without copying.
    pub fn from_rgb(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let shape = (height as usize, width as usize, CHANNELS);
        // RgbImage is row-major interleaved RGB, which is exactly this shape.
        let pixels = Array3::from_shape_vec(shape, image.into_raw())
            .expect("RgbImage buffer length matches its dimensions");
        Self { pixels }
    }

    pub fn from_array(pixels: Array3<u8>) -> Self {
        Self { pixels }
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn channels(&self) -> usize {
        self.pixels.dim().2
    }

    pub fn pixel_count(&self) -> usize {
        self.height() * self.width()
    }

    pub fn pixels(&self) -> &Array3<u8> {
        &self.pixels
    }

    pub fn into_array(self) -> Array3<u8> {
        self.pixels
    }
}

/// Named dataset inside a feature bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dataset {
    Image,
    ColorSpace,
    ColorHistogram,
    EdgeMap,
    EntropyMap,
    KeypointOverlay,
}

impl Dataset {
    /// Every dataset a complete bundle contains, in write order.
    pub const ALL: [Dataset; 6] = [
        Dataset::Image,
        Dataset::ColorSpace,
        Dataset::ColorHistogram,
        Dataset::EdgeMap,
        Dataset::EntropyMap,
        Dataset::KeypointOverlay,
    ];

    /// Key under which the dataset is stored.
    pub fn key(&self) -> &'static str {
        match self {
            Dataset::Image => "Image",
            Dataset::ColorSpace => "ColorSpace",
            Dataset::ColorHistogram => "ColorHistogram",
            Dataset::EdgeMap => "EdgeMap",
            Dataset::EntropyMap => "EntropyMap",
            Dataset::KeypointOverlay => "KeypointOverlay",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Array payload of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureData {
    /// 2-D bytes (color space, edge mask)
    U8x2(Array2<u8>),
    /// 3-D bytes (raw image, keypoint overlay)
    U8x3(Array3<u8>),
    /// 2-D counts (color histogram)
    U64x2(Array2<u64>),
    /// 2-D floats (entropy map)
    F64x2(Array2<f64>),
}

impl FeatureData {
    pub fn shape(&self) -> &[usize] {
        match self {
            FeatureData::U8x2(a) => a.shape(),
            FeatureData::U8x3(a) => a.shape(),
            FeatureData::U64x2(a) => a.shape(),
            FeatureData::F64x2(a) => a.shape(),
        }
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            FeatureData::U8x2(_) | FeatureData::U8x3(_) => "u8",
            FeatureData::U64x2(_) => "u64",
            FeatureData::F64x2(_) => "f64",
        }
    }

    /// Serialize as a `.npy` payload.
    pub fn write_npy<W: std::io::Write>(
        &self,
        writer: W,
    ) -> std::result::Result<(), ndarray_npy::WriteNpyError> {
        use ndarray_npy::WriteNpyExt;
        match self {
            FeatureData::U8x2(a) => a.write_npy(writer),
            FeatureData::U8x3(a) => a.write_npy(writer),
            FeatureData::U64x2(a) => a.write_npy(writer),
            FeatureData::F64x2(a) => a.write_npy(writer),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Images processed
    pub images: usize,

    /// Datasets written across all containers
    pub datasets_written: usize,

    /// Directory holding the containers
    pub feature_dir: PathBuf,

    /// Index file written at the end of the run
    pub index_path: PathBuf,

    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_image_id_from_path_strips_final_extension() {
        assert_eq!(
            ImageId::from_path(Path::new("dir/a.png")),
            Some(ImageId::new("a"))
        );
        assert_eq!(
            ImageId::from_path(Path::new("holiday.2023.jpg")),
            Some(ImageId::new("holiday.2023"))
        );
    }

    #[test]
    fn test_orientation_ties_are_landscape() {
        assert_eq!(Orientation::from_dimensions(10, 5), Orientation::Portrait);
        assert_eq!(Orientation::from_dimensions(5, 10), Orientation::Landscape);
        assert_eq!(Orientation::from_dimensions(7, 7), Orientation::Landscape);
    }

    #[test]
    fn test_raw_image_shape_matches_rgb_buffer() {
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(3, 1, image::Rgb([1, 2, 3]));
        let raw = RawImage::from_rgb(img);
        assert_eq!(raw.height(), 2);
        assert_eq!(raw.width(), 4);
        assert_eq!(raw.channels(), 3);
        assert_eq!(raw.pixels()[[1, 3, 0]], 1);
        assert_eq!(raw.pixels()[[1, 3, 2]], 3);
    }

    #[test]
    fn test_dataset_keys_round_trip() {
        for dataset in Dataset::ALL {
            assert_eq!(Dataset::from_key(dataset.key()), Some(dataset));
        }
        assert_eq!(Dataset::from_key("Keypoints"), None);
    }

    #[test]
    fn test_orientation_serializes_lowercase() {
        let json = serde_json::to_string(&Orientation::Portrait).unwrap();
        assert_eq!(json, "\"portrait\"");
    }
}
