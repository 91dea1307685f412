//! Conversions between ndarray buffers and OpenCV matrices.
//!
//! Pixel data keeps the canonical RGB order inside every `Mat`; colour
//! conversions use the `RGB` codes so no channel swap ever happens.

use ndarray::{Array2, Array3};
use opencv::core::{self, Mat, Scalar};
use opencv::imgproc;
use opencv::prelude::*;

use crate::error::ExtractError;
use crate::types::RawImage;

/// Copy an RGB image into a `CV_8UC3` matrix.
pub fn rgb_mat(image: &RawImage) -> Result<Mat, ExtractError> {
    let pixels = image.pixels().as_standard_layout();
    let mut mat = Mat::new_rows_cols_with_default(
        image.height() as i32,
        image.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    if let Some(src) = pixels.as_slice() {
        mat.data_bytes_mut()?.copy_from_slice(src);
    }
    Ok(mat)
}

/// Single-channel intensity (`COLOR_RGB2GRAY`, BT.601 weights).
pub fn gray_mat(image: &RawImage) -> Result<Mat, ExtractError> {
    let rgb = rgb_mat(image)?;
    let mut gray = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut gray, imgproc::COLOR_RGB2GRAY)?;
    Ok(gray)
}

/// Intensity of `image` as an H × W array.
pub fn to_intensity(image: &RawImage) -> Result<Array2<u8>, ExtractError> {
    to_array2(&gray_mat(image)?)
}

/// Copy a `CV_8UC1` matrix out into an H × W array.
pub fn to_array2(mat: &Mat) -> Result<Array2<u8>, ExtractError> {
    expect_type(mat, core::CV_8UC1)?;
    let shape = (mat.rows() as usize, mat.cols() as usize);
    Array2::from_shape_vec(shape, continuous_bytes(mat)?)
        .map_err(|e| ExtractError::OpenCv(e.to_string()))
}

/// Copy a `CV_8UC3` matrix out into an H × W × 3 array.
pub fn to_array3(mat: &Mat) -> Result<Array3<u8>, ExtractError> {
    expect_type(mat, core::CV_8UC3)?;
    let shape = (mat.rows() as usize, mat.cols() as usize, 3);
    Array3::from_shape_vec(shape, continuous_bytes(mat)?)
        .map_err(|e| ExtractError::OpenCv(e.to_string()))
}

fn expect_type(mat: &Mat, typ: i32) -> Result<(), ExtractError> {
    if mat.typ() != typ {
        return Err(ExtractError::OpenCv(format!(
            "unexpected matrix type {} (wanted {typ})",
            mat.typ()
        )));
    }
    Ok(())
}

fn continuous_bytes(mat: &Mat) -> Result<Vec<u8>, ExtractError> {
    if mat.is_continuous() {
        Ok(mat.data_bytes()?.to_vec())
    } else {
        Ok(mat.try_clone()?.data_bytes()?.to_vec())
    }
}
