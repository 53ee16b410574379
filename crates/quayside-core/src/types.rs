//! Shared types for quayside: axes, label masks, and errors.

use std::fmt;

use crate::hooks::{ReadError, ViewError};

/// Re-export `GrayImage` so downstream crates can handle binary
/// annotation masks without depending on `image` directly.
pub use image::GrayImage;

/// Single-channel mask whose pixel value is a category id (0 = background).
pub type LabelMask = image::ImageBuffer<image::Luma<u16>, Vec<u16>>;

/// One of the three axes of a `height × width × channels` pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Vertical axis (image rows).
    Row,
    /// Horizontal axis (image columns). The only circular axis.
    Column,
    /// Sample axis within a pixel.
    Channel,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => f.write_str("row"),
            Self::Column => f.write_str("column"),
            Self::Channel => f.write_str("channel"),
        }
    }
}

/// Errors raised by panorama buffers and cylindrical addressing.
#[derive(Debug, thiserror::Error)]
pub enum PanoramaError {
    /// The requested access pattern is not supported (for example a
    /// wraparound range on a non-circular axis, or a missing viewer).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// An index is still outside the axis after single-wrap correction.
    #[error("index {index} is out of bounds for {axis} axis of length {len}")]
    IndexOutOfBounds {
        /// Axis the index was applied to.
        axis: Axis,
        /// The index as requested by the caller.
        index: isize,
        /// Length of the axis.
        len: usize,
    },

    /// A value written with `set` has the wrong number of samples.
    #[error("value has {actual} samples, expected 1 or {expected}")]
    ValueShape {
        /// Number of selected channels.
        expected: usize,
        /// Number of samples supplied.
        actual: usize,
    },

    /// Raw sample data does not match the declared shape.
    #[error("pixel data has {actual} samples, expected {height}x{width}x{channels}")]
    InvalidBuffer {
        /// Declared height.
        height: usize,
        /// Declared width.
        width: usize,
        /// Declared channel count.
        channels: usize,
        /// Number of samples actually supplied.
        actual: usize,
    },

    /// The buffer is too large to be handed to the image encoder.
    #[error("buffer of {height}x{width} pixels exceeds encoder limits")]
    DimensionOverflow {
        /// Buffer height.
        height: usize,
        /// Buffer width.
        width: usize,
    },

    /// The buffer's channel count has no matching image color type.
    #[error("cannot convert a buffer with {0} channels to an image")]
    UnsupportedChannels(usize),

    /// Metadata did not contain a heading.
    #[error("panorama metadata has no heading")]
    MissingHeading,

    /// Metadata heading was present but not numeric.
    #[error("panorama heading is not numeric: {0:?}")]
    InvalidHeading(String),

    /// The image reader failed.
    #[error(transparent)]
    Read(#[from] ReadError),

    /// The image viewer failed.
    #[error(transparent)]
    View(#[from] ViewError),
}
