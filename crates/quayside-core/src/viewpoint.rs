//! Conversions between panorama columns and compass headings.
//!
//! A panorama spans a full 360° horizontally, so column `p` of an image
//! `w` pixels wide looks towards `360 * p / w` degrees relative to the
//! left edge. Both directions round to the nearest integer.

/// Convert a horizontal pixel position to a viewpoint in degrees.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn pixel_to_viewpoint(pixel: i64, image_width: usize) -> i64 {
    (360.0 * pixel as f64 / image_width as f64).round() as i64
}

/// Convert a viewpoint in degrees to a horizontal pixel position.
///
/// The result is not wrapped into `0..image_width`; negative or
/// over-wide viewpoints map to columns outside the image.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn viewpoint_to_pixel(viewpoint: f64, image_width: usize) -> i64 {
    (viewpoint / 360.0 * image_width as f64).round() as i64
}
