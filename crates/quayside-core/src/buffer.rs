//! Row-major `height × width × channels` sample buffer.
//!
//! The `image` crate fixes the channel layout in the pixel type, which
//! rules out channel slicing. `PixelBuffer` stores samples in an
//! [`Array3`] so the layout stays dynamic, and converts to and from
//! [`DynamicImage`] at the decode/encode boundary.

use std::ops::Range;

use image::{DynamicImage, ImageBuffer};
use ndarray::{Array3, ArrayView1, ArrayView3, concatenate, s};

use crate::types::PanoramaError;

/// An owned 8-bit pixel buffer in `height × width × channels` order.
///
/// The backing array is always kept in standard (C) layout, so the raw
/// samples are one contiguous row-major slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Array3<u8>,
}

impl PixelBuffer {
    /// Create a zero-filled buffer.
    #[must_use]
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            data: Array3::zeros((height, width, channels)),
        }
    }

    /// Wrap existing row-major sample data.
    ///
    /// # Errors
    ///
    /// Returns [`PanoramaError::InvalidBuffer`] if `data.len()` is not
    /// `height * width * channels`.
    pub fn from_raw(
        height: usize,
        width: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, PanoramaError> {
        let actual = data.len();
        let data = Array3::from_shape_vec((height, width, channels), data).map_err(|_| {
            PanoramaError::InvalidBuffer {
                height,
                width,
                channels,
                actual,
            }
        })?;
        Ok(Self { data })
    }

    /// Build a buffer by evaluating `f(row, column, channel)` for every sample.
    #[must_use]
    pub fn from_fn(
        height: usize,
        width: usize,
        channels: usize,
        mut f: impl FnMut(usize, usize, usize) -> u8,
    ) -> Self {
        Self {
            data: Array3::from_shape_fn((height, width, channels), |(row, col, chan)| {
                f(row, col, chan)
            }),
        }
    }

    fn from_array(data: Array3<u8>) -> Self {
        if data.is_standard_layout() {
            Self { data }
        } else {
            Self {
                data: data.as_standard_layout().into_owned(),
            }
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    /// Number of samples per pixel.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// `(height, width, channels)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// The samples as a read-only `height × width × channels` view.
    #[must_use]
    pub fn as_array(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// Raw row-major samples.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.data.as_slice().unwrap_or_default()
    }

    /// Consume the buffer and return its raw samples.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        let (data, offset) = self.data.into_raw_vec_and_offset();
        debug_assert_eq!(offset.unwrap_or(0), 0);
        data
    }

    /// The samples of the pixel at `(row, col)`, or `None` when outside
    /// the buffer.
    #[must_use]
    pub fn pixel(&self, row: usize, col: usize) -> Option<&[u8]> {
        let (height, width, channels) = self.shape();
        if row >= height || col >= width {
            return None;
        }
        let start = (row * width + col) * channels;
        self.as_raw().get(start..start + channels)
    }

    /// All samples of one column, top to bottom.
    #[must_use]
    pub fn column(&self, col: usize) -> Option<Vec<u8>> {
        if col >= self.width() {
            return None;
        }
        Some(self.data.slice(s![.., col, ..]).iter().copied().collect())
    }

    /// Copy out a sub-buffer. Ranges must already lie within the buffer.
    pub(crate) fn crop(
        &self,
        rows: Range<usize>,
        cols: Range<usize>,
        chans: Range<usize>,
    ) -> Self {
        debug_assert!(rows.end <= self.height() && cols.end <= self.width());
        debug_assert!(chans.end <= self.channels());

        Self::from_array(self.data.slice(s![rows, cols, chans]).to_owned())
    }

    /// Join two buffers of equal height and channel count side by side.
    pub(crate) fn concat_columns(left: &Self, right: &Self) -> Self {
        debug_assert_eq!(left.height(), right.height());
        debug_assert_eq!(left.channels(), right.channels());

        match concatenate(ndarray::Axis(1), &[left.data.view(), right.data.view()]) {
            Ok(joined) => Self::from_array(joined),
            // Shapes are checked by the caller; an empty side leaves the other.
            Err(_) if right.width() == 0 => left.clone(),
            Err(_) => right.clone(),
        }
    }

    /// Write `value` into every selected sample. A one-sample value is
    /// broadcast to all selected channels; otherwise sample `k` goes to
    /// the `k`-th selected channel. Shape checks happen in the caller.
    pub(crate) fn fill(
        &mut self,
        rows: Range<usize>,
        cols: Range<usize>,
        chans: Range<usize>,
        value: &[u8],
    ) {
        let mut region = self.data.slice_mut(s![rows, cols, chans]);
        match value {
            [sample] => region.fill(*sample),
            samples => region.assign(&ArrayView1::from(samples)),
        }
    }

    /// Convert a decoded image, keeping its channel count.
    ///
    /// Higher bit depths are reduced to 8 bits per sample.
    #[must_use]
    pub fn from_dynamic_image(image: &DynamicImage) -> Self {
        let height = image.height() as usize;
        let width = image.width() as usize;
        let (channels, raw) = match image.color().channel_count() {
            1 => (1, image.to_luma8().into_raw()),
            2 => (2, image.to_luma_alpha8().into_raw()),
            3 => (3, image.to_rgb8().into_raw()),
            _ => (4, image.to_rgba8().into_raw()),
        };
        // `image` hands back exactly `width * height * channels` samples.
        let data = Array3::from_shape_vec((height, width, channels), raw)
            .unwrap_or_else(|_| Array3::zeros((height, width, channels)));
        Self { data }
    }

    /// Convert to a [`DynamicImage`] for encoding.
    ///
    /// # Errors
    ///
    /// Returns [`PanoramaError::UnsupportedChannels`] unless the buffer has
    /// 1 (gray), 2 (gray + alpha), 3 (RGB) or 4 (RGBA) channels, and
    /// [`PanoramaError::DimensionOverflow`] if a side exceeds `u32`.
    pub fn to_dynamic_image(&self) -> Result<DynamicImage, PanoramaError> {
        let (height, width, channels) = self.shape();
        let overflow = || PanoramaError::DimensionOverflow { height, width };
        let w = u32::try_from(width).map_err(|_| overflow())?;
        let h = u32::try_from(height).map_err(|_| overflow())?;
        let data = self.as_raw().to_vec();

        let image = match channels {
            1 => ImageBuffer::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
            2 => ImageBuffer::from_raw(w, h, data).map(DynamicImage::ImageLumaA8),
            3 => ImageBuffer::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
            4 => ImageBuffer::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
            other => return Err(PanoramaError::UnsupportedChannels(other)),
        };
        image.ok_or(PanoramaError::InvalidBuffer {
            height,
            width,
            channels,
            actual: self.data.len(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_rejects_wrong_length() {
        let result = PixelBuffer::from_raw(2, 2, 3, vec![0; 11]);
        assert!(matches!(
            result,
            Err(PanoramaError::InvalidBuffer { actual: 11, .. })
        ));
    }

    #[test]
    fn from_fn_is_row_major() {
        let buf = PixelBuffer::from_fn(2, 3, 2, |r, c, ch| (r * 100 + c * 10 + ch) as u8);
        assert_eq!(buf.shape(), (2, 3, 2));
        assert_eq!(buf.pixel(1, 2), Some(&[120, 121][..]));
        assert_eq!(buf.as_raw()[..4], [0, 1, 10, 11]);
    }

    #[test]
    fn pixel_outside_is_none() {
        let buf = PixelBuffer::new(2, 2, 1);
        assert!(buf.pixel(2, 0).is_none());
        assert!(buf.pixel(0, 2).is_none());
    }

    #[test]
    fn crop_selects_channels() {
        let buf = PixelBuffer::from_fn(3, 4, 3, |r, c, ch| (r * 100 + c * 10 + ch) as u8);
        let cropped = buf.crop(1..3, 2..4, 1..3);
        assert_eq!(cropped.shape(), (2, 2, 2));
        assert_eq!(cropped.as_raw(), &[121, 122, 131, 132, 221, 222, 231, 232]);
    }

    #[test]
    fn concat_columns_interleaves_rows() {
        let left = PixelBuffer::from_raw(2, 1, 1, vec![1, 2]).unwrap();
        let right = PixelBuffer::from_raw(2, 2, 1, vec![3, 4, 5, 6]).unwrap();
        let joined = PixelBuffer::concat_columns(&left, &right);
        assert_eq!(joined.shape(), (2, 3, 1));
        assert_eq!(joined.as_raw(), &[1, 3, 4, 2, 5, 6]);
    }

    #[test]
    fn fill_broadcasts_scalar() {
        let mut buf = PixelBuffer::new(2, 2, 3);
        buf.fill(0..1, 0..2, 0..3, &[7]);
        assert_eq!(buf.pixel(0, 1), Some(&[7, 7, 7][..]));
        assert_eq!(buf.pixel(1, 0), Some(&[0, 0, 0][..]));
    }

    #[test]
    fn fill_spreads_samples_over_channels() {
        let mut buf = PixelBuffer::new(2, 3, 3);
        buf.fill(0..2, 1..3, 1..3, &[4, 5]);
        assert_eq!(buf.pixel(1, 2), Some(&[0, 4, 5][..]));
        assert_eq!(buf.pixel(0, 0), Some(&[0, 0, 0][..]));
        assert_eq!(buf.as_array()[[0, 1, 2]], 5);
    }

    #[test]
    fn column_reads_top_to_bottom() {
        let buf = PixelBuffer::from_fn(3, 2, 2, |r, c, ch| (r * 100 + c * 10 + ch) as u8);
        assert_eq!(buf.column(1), Some(vec![10, 11, 110, 111, 210, 211]));
        assert_eq!(buf.column(2), None);
    }

    #[test]
    fn concatenated_buffer_is_row_major() {
        let left = PixelBuffer::from_fn(2, 2, 2, |r, c, ch| (r * 100 + c * 10 + ch) as u8);
        let right = left.crop(0..2, 0..1, 0..2);
        let joined = PixelBuffer::concat_columns(&left, &right);
        assert_eq!(joined.shape(), (2, 3, 2));
        assert_eq!(
            joined.clone().into_raw(),
            vec![0, 1, 10, 11, 0, 1, 100, 101, 110, 111, 100, 101]
        );
        assert_eq!(joined.as_raw().len(), 12);
    }

    #[test]
    fn concat_with_empty_side_keeps_other() {
        let left = PixelBuffer::from_raw(2, 1, 1, vec![1, 2]).unwrap();
        let empty = left.crop(0..2, 1..1, 0..1);
        assert_eq!(PixelBuffer::concat_columns(&left, &empty), left);
        assert_eq!(PixelBuffer::concat_columns(&empty, &left), left);
    }

    #[test]
    fn dynamic_image_keeps_channel_count() {
        let rgb = image::RgbImage::from_fn(3, 2, |x, y| image::Rgb([x as u8, y as u8, 9]));
        let buf = PixelBuffer::from_dynamic_image(&DynamicImage::ImageRgb8(rgb.clone()));
        assert_eq!(buf.shape(), (2, 3, 3));
        assert_eq!(buf.pixel(1, 2), Some(&[2, 1, 9][..]));

        let back = buf.to_dynamic_image().unwrap();
        assert_eq!(back.to_rgb8(), rgb);
    }

    #[test]
    fn gray_alpha_maps_to_two_channels() {
        let la = image::GrayAlphaImage::from_pixel(2, 2, image::LumaA([5, 200]));
        let buf = PixelBuffer::from_dynamic_image(&DynamicImage::ImageLumaA8(la));
        assert_eq!(buf.channels(), 2);
        assert!(matches!(
            buf.to_dynamic_image().unwrap(),
            DynamicImage::ImageLumaA8(_)
        ));
    }

    #[test]
    fn five_channels_cannot_be_encoded() {
        let buf = PixelBuffer::new(1, 1, 5);
        assert!(matches!(
            buf.to_dynamic_image(),
            Err(PanoramaError::UnsupportedChannels(5))
        ));
    }
}
