//! Scale-invariant keypoints and their overlay visualization.
//!
//! Keypoints come from OpenCV's SIFT on the intensity image and are drawn as
//! rich markers (circle sized by scale plus an orientation tick). Descriptors
//! are computed alongside but are not part of the persisted bundle.

use opencv::core::{KeyPoint, Mat, Ptr, Scalar, Vector};
use opencv::features2d::{self, DrawMatchesFlags, SIFT};
use opencv::imgproc;
use opencv::prelude::*;

use super::cv;
use super::{ensure_extractable, FeatureExtractor};
use crate::config::KeypointConfig;
use crate::error::ExtractError;
use crate::types::{Dataset, FeatureData, RawImage};

/// Length of one SIFT descriptor row.
pub const DESCRIPTOR_SIZE: i32 = 128;

/// Marker colours, cycled in detection order so reruns draw identical overlays.
pub const PALETTE: [[u8; 3]; 8] = [
    [255, 0, 0],
    [0, 200, 0],
    [0, 90, 255],
    [255, 200, 0],
    [255, 0, 255],
    [0, 220, 220],
    [255, 128, 0],
    [150, 60, 255],
];

/// SIFT detector built from [`KeypointConfig`].
#[derive(Debug, Clone)]
pub struct SiftDetector {
    config: KeypointConfig,
}

impl SiftDetector {
    pub fn new(config: &KeypointConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn create(&self) -> opencv::Result<Ptr<SIFT>> {
        // 0 keeps every keypoint.
        let nfeatures = i32::try_from(self.config.max_keypoints).unwrap_or(i32::MAX);
        SIFT::create(
            nfeatures,
            self.config.octave_layers as i32,
            self.config.contrast_threshold as f64,
            self.config.edge_threshold as f64,
            self.config.sigma as f64,
            false,
        )
    }

    /// Keypoints of a `CV_8UC1` image and their descriptors (one row each).
    pub fn detect_and_compute(
        &self,
        gray: &Mat,
    ) -> Result<(Vector<KeyPoint>, Mat), ExtractError> {
        let mut sift = self.create()?;
        let mask = Mat::default();
        let mut keypoints = Vector::<KeyPoint>::new();
        let mut descriptors = Mat::default();
        sift.detect_and_compute(gray, &mask, &mut keypoints, &mut descriptors, false)?;
        Ok((keypoints, descriptors))
    }
}

/// Renders detected keypoints as colored markers on an H × W × 3 canvas.
pub struct KeypointOverlayExtractor {
    detector: SiftDetector,
    draw_on_intensity: bool,
}

impl KeypointOverlayExtractor {
    pub fn new(config: KeypointConfig) -> Self {
        Self {
            detector: SiftDetector::new(&config),
            draw_on_intensity: config.draw_on_intensity,
        }
    }
}

impl FeatureExtractor for KeypointOverlayExtractor {
    fn dataset(&self) -> Dataset {
        Dataset::KeypointOverlay
    }

    fn extract(&self, image: &RawImage) -> Result<FeatureData, ExtractError> {
        ensure_extractable(image)?;
        let gray = cv::gray_mat(image)?;
        let (keypoints, descriptors) = self.detector.detect_and_compute(&gray)?;
        tracing::trace!(
            keypoints = keypoints.len(),
            descriptors = descriptors.rows(),
            "Detected keypoints"
        );

        let canvas = if self.draw_on_intensity {
            let mut canvas = Mat::default();
            imgproc::cvt_color_def(&gray, &mut canvas, imgproc::COLOR_GRAY2RGB)?;
            canvas
        } else {
            cv::rgb_mat(image)?
        };
        let overlay = render_keypoints(canvas, &keypoints)?;
        Ok(FeatureData::U8x3(cv::to_array3(&overlay)?))
    }
}

/// Draw `keypoints` onto a 3-channel canvas, one palette colour per keypoint.
pub fn render_keypoints(canvas: Mat, keypoints: &Vector<KeyPoint>) -> Result<Mat, ExtractError> {
    // `draw_keypoints` takes a single colour, so each palette slot is one layer.
    let mut layers: Vec<Vector<KeyPoint>> = PALETTE.iter().map(|_| Vector::new()).collect();
    for (i, keypoint) in keypoints.iter().enumerate() {
        layers[i % PALETTE.len()].push(keypoint);
    }

    let mut out = canvas;
    for (color, layer) in PALETTE.iter().zip(&layers) {
        if layer.is_empty() {
            continue;
        }
        let mut next = Mat::default();
        features2d::draw_keypoints(
            &out,
            layer,
            &mut next,
            marker_color(*color),
            DrawMatchesFlags::DRAW_RICH_KEYPOINTS,
        )?;
        out = next;
    }
    Ok(out)
}

/// Canvas channels are R, G, B, so the scalar follows the same order.
fn marker_color([r, g, b]: [u8; 3]) -> Scalar {
    Scalar::new(r as f64, g as f64, b as f64, 0.0)
}
