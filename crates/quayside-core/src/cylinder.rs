//! Cylindrical addressing over a 360° panorama.
//!
//! The left and right edges of a panorama are the same place, so the
//! column axis is circular: a column range whose corrected start lies
//! past its stop is read as the right-edge segment followed by the
//! left-edge segment, and written by filling both segments.
//!
//! Reads never touch the source; they copy into a new
//! [`CylindricalImage`] that shares the source's metadata and viewer.
//! [`CylindricalImage::set`] is the only in-place mutation.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::axis::{AxisSpec, Resolved, resolve, resolve_linear};
use crate::buffer::PixelBuffer;
use crate::hooks::ImageViewer;
use crate::metadata::PanoramaMetadata;
use crate::types::{Axis, PanoramaError};
use crate::viewpoint::viewpoint_to_pixel;

/// Band color marking the front viewpoint in [`CylindricalImage::marked`].
pub const FRONT_BAND: [u8; 3] = [0, 255, 0];

/// Band color marking the back viewpoint in [`CylindricalImage::marked`].
pub const BACK_BAND: [u8; 3] = [255, 0, 0];

/// A panorama pixel buffer with circular column addressing.
#[derive(Clone)]
pub struct CylindricalImage {
    pixels: PixelBuffer,
    metadata: Arc<PanoramaMetadata>,
    viewer: Option<Arc<dyn ImageViewer>>,
}

impl CylindricalImage {
    /// Wrap a loaded buffer and its metadata.
    #[must_use]
    pub fn new(pixels: PixelBuffer, metadata: PanoramaMetadata) -> Self {
        Self::from_shared(pixels, Arc::new(metadata), None)
    }

    /// Wrap a buffer with metadata and viewer shared with other images.
    #[must_use]
    pub fn from_shared(
        pixels: PixelBuffer,
        metadata: Arc<PanoramaMetadata>,
        viewer: Option<Arc<dyn ImageViewer>>,
    ) -> Self {
        Self {
            pixels,
            metadata,
            viewer,
        }
    }

    /// Attach a viewer used by [`show`](Self::show).
    #[must_use]
    pub fn with_viewer(mut self, viewer: Arc<dyn ImageViewer>) -> Self {
        self.viewer = Some(viewer);
        self
    }

    /// The underlying pixels.
    #[must_use]
    pub const fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Consume the image and return its pixels.
    #[must_use]
    pub fn into_pixels(self) -> PixelBuffer {
        self.pixels
    }

    /// Metadata shared by this image and its slices.
    #[must_use]
    pub fn metadata(&self) -> &PanoramaMetadata {
        &self.metadata
    }

    /// Shared handle to the metadata.
    #[must_use]
    pub fn metadata_handle(&self) -> &Arc<PanoramaMetadata> {
        &self.metadata
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    /// Number of samples per pixel.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.pixels.channels()
    }

    /// Camera heading in degrees.
    #[must_use]
    pub fn heading(&self) -> f64 {
        self.metadata.heading
    }

    /// Forward viewpoint in degrees (the heading).
    #[must_use]
    pub fn viewpoint_front(&self) -> f64 {
        self.metadata.heading
    }

    /// Backward viewpoint in degrees (`heading - 180`, not normalized).
    #[must_use]
    pub fn viewpoint_back(&self) -> f64 {
        self.metadata.heading - 180.0
    }

    /// Read a sub-image.
    ///
    /// Every index and range bound is corrected once by
    /// [`reindex`](crate::axis::reindex) against its own axis. A column
    /// range whose corrected start exceeds its stop wraps around the seam
    /// and yields `start..width` followed by `0..stop`.
    ///
    /// # Errors
    ///
    /// Returns [`PanoramaError::UnsupportedOperation`] for a wrapping
    /// range on the row or channel axis and
    /// [`PanoramaError::IndexOutOfBounds`] for indices still outside
    /// their axis after correction.
    pub fn get(
        &self,
        rows: AxisSpec,
        cols: AxisSpec,
        chans: AxisSpec,
    ) -> Result<Self, PanoramaError> {
        let (rows, cols, chans) = self.resolve_all(rows, cols, chans)?;

        let pixels = match cols {
            Resolved::Span(cols) => self.pixels.crop(rows, cols, chans),
            Resolved::Wrap { start, stop } => {
                let width = self.width();
                let right_edge = self.pixels.crop(rows.clone(), start..width, chans.clone());
                let left_edge = self.pixels.crop(rows, 0..stop, chans);
                PixelBuffer::concat_columns(&right_edge, &left_edge)
            }
        };

        Ok(self.derive(pixels))
    }

    /// Write `value` into a region, in place.
    ///
    /// Selection follows [`get`](Self::get). `value` holds either one
    /// sample, broadcast to every selected channel, or one sample per
    /// selected channel. A wrapping column range writes the same value to
    /// both the `start..width` and the `0..stop` segments.
    ///
    /// # Errors
    ///
    /// As [`get`](Self::get), plus [`PanoramaError::ValueShape`] when
    /// `value` does not match the selected channels.
    pub fn set(
        &mut self,
        rows: AxisSpec,
        cols: AxisSpec,
        chans: AxisSpec,
        value: &[u8],
    ) -> Result<(), PanoramaError> {
        let (rows, cols, chans) = self.resolve_all(rows, cols, chans)?;

        if value.len() != 1 && value.len() != chans.len() {
            return Err(PanoramaError::ValueShape {
                expected: chans.len(),
                actual: value.len(),
            });
        }

        match cols {
            Resolved::Span(cols) => self.pixels.fill(rows, cols, chans, value),
            Resolved::Wrap { start, stop } => {
                let width = self.width();
                self.pixels.fill(rows.clone(), start..width, chans.clone(), value);
                self.pixels.fill(rows, 0..stop, chans, value);
            }
        }
        Ok(())
    }

    /// A copy of the pixels with the front and back viewpoints marked.
    ///
    /// Paints a band of `2 * viewpoint_width` columns in [`FRONT_BAND`]
    /// around the front viewpoint and in [`BACK_BAND`] around the back
    /// one. Bands crossing the seam cover both edges. A width of zero
    /// returns an unmarked copy.
    ///
    /// # Errors
    ///
    /// Returns [`PanoramaError::UnsupportedOperation`] if the image has
    /// neither 3 nor 4 channels.
    pub fn marked(&self, viewpoint_width: usize) -> Result<PixelBuffer, PanoramaError> {
        let mut copy = self.derive(self.pixels.clone());
        if viewpoint_width == 0 || self.width() == 0 {
            return Ok(copy.pixels);
        }

        for (viewpoint, color) in [
            (self.viewpoint_front(), FRONT_BAND),
            (self.viewpoint_back(), BACK_BAND),
        ] {
            let value = band_value(color, self.channels())?;
            let cols = self.band_columns(viewpoint, viewpoint_width);
            copy.set(AxisSpec::All, cols, AxisSpec::All, &value)?;
        }
        Ok(copy.pixels)
    }

    /// Hand the image, optionally marked, to the attached viewer.
    ///
    /// # Errors
    ///
    /// Returns [`PanoramaError::UnsupportedOperation`] if no viewer is
    /// attached, any error of [`marked`](Self::marked), and
    /// [`PanoramaError::View`] if the viewer fails.
    pub fn show(&self, viewpoint_width: usize) -> Result<(), PanoramaError> {
        let viewer = self.viewer.as_ref().ok_or_else(|| {
            PanoramaError::UnsupportedOperation("no image viewer attached".to_owned())
        })?;
        let pixels = self.marked(viewpoint_width)?;
        viewer.show(&pixels)?;
        Ok(())
    }

    fn derive(&self, pixels: PixelBuffer) -> Self {
        Self {
            pixels,
            metadata: Arc::clone(&self.metadata),
            viewer: self.viewer.clone(),
        }
    }

    fn resolve_all(
        &self,
        rows: AxisSpec,
        cols: AxisSpec,
        chans: AxisSpec,
    ) -> Result<(Range<usize>, Resolved, Range<usize>), PanoramaError> {
        let rows = resolve_linear(rows, Axis::Row, self.height())?;
        let cols = resolve(cols, Axis::Column, self.width())?;
        let chans = resolve_linear(chans, Axis::Channel, self.channels())?;
        Ok((rows, cols, chans))
    }

    /// Columns `center - half..center + half` around a viewpoint, with the
    /// center folded into the image first.
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    fn band_columns(&self, viewpoint: f64, half: usize) -> AxisSpec {
        let width = self.width();
        if half.saturating_mul(2) >= width {
            return AxisSpec::All;
        }
        let center = viewpoint_to_pixel(viewpoint, width).rem_euclid(width as i64) as isize;
        let half = half as isize;
        AxisSpec::span(center - half, center + half)
    }
}

fn band_value(color: [u8; 3], channels: usize) -> Result<Vec<u8>, PanoramaError> {
    match channels {
        3 => Ok(color.to_vec()),
        4 => Ok(vec![color[0], color[1], color[2], u8::MAX]),
        other => Err(PanoramaError::UnsupportedOperation(format!(
            "viewpoint bands need 3 or 4 channels, image has {other}"
        ))),
    }
}

impl fmt::Debug for CylindricalImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CylindricalImage")
            .field("shape", &self.pixels.shape())
            .field("metadata", &self.metadata)
            .field("viewer", &self.viewer.is_some())
            .finish()
    }
}
