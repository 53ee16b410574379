//! Axis selections and single-wrap index correction.
//!
//! Each axis of a panorama is addressed with an [`AxisSpec`]: the whole
//! axis, one index, or a half-open range with optional bounds. Indices are
//! corrected by [`reindex`] before use, which shifts an index by exactly
//! one axis length when it falls below zero or beyond the end. It is a
//! single step, not a modulo: `reindex(Some(25), 10)` is `Some(15)`, which
//! then fails the bounds check.
//!
//! After correction a range whose start exceeds its stop crosses the
//! 0/width seam. Only the column axis is circular, so such a range is
//! resolved to [`Resolved::Wrap`] there and rejected everywhere else.

use std::ops::Range;

use crate::types::{Axis, PanoramaError};

/// Selection along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisSpec {
    /// The whole axis.
    #[default]
    All,
    /// A single index. The axis is kept with length 1.
    Index(isize),
    /// A half-open range; a missing bound means the axis start or end.
    Range {
        /// First index, inclusive.
        start: Option<isize>,
        /// Last index, exclusive.
        stop: Option<isize>,
    },
}

impl AxisSpec {
    /// A range with optional bounds.
    #[must_use]
    pub const fn range(start: Option<isize>, stop: Option<isize>) -> Self {
        Self::Range { start, stop }
    }

    /// A range with both bounds present.
    #[must_use]
    pub const fn span(start: isize, stop: isize) -> Self {
        Self::Range {
            start: Some(start),
            stop: Some(stop),
        }
    }

    /// A range from `start` to the end of the axis.
    #[must_use]
    pub const fn from_start(start: isize) -> Self {
        Self::Range {
            start: Some(start),
            stop: None,
        }
    }

    /// A range from the start of the axis up to `stop`.
    #[must_use]
    pub const fn to_stop(stop: isize) -> Self {
        Self::Range {
            start: None,
            stop: Some(stop),
        }
    }
}

impl From<isize> for AxisSpec {
    fn from(index: isize) -> Self {
        Self::Index(index)
    }
}

/// Correct an out-of-bounds index by one axis length.
///
/// `None` passes through unchanged. Negative indices have `max` added,
/// indices greater than `max` have `max` subtracted, and everything else
/// (including `max` itself, a valid range stop) is returned as is.
#[must_use]
pub fn reindex(index: Option<isize>, max: usize) -> Option<isize> {
    let max = isize::try_from(max).unwrap_or(isize::MAX);
    index.map(|i| {
        if i < 0 {
            i + max
        } else if i > max {
            i - max
        } else {
            i
        }
    })
}

/// An axis selection after reindexing and bounds checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A contiguous, in-bounds range (possibly empty).
    Span(Range<usize>),
    /// A column range crossing the seam: `start..width` then `0..stop`.
    Wrap {
        /// First column of the right-edge segment.
        start: usize,
        /// End (exclusive) of the left-edge segment.
        stop: usize,
    },
}

/// Resolve `spec` against an axis of length `len`.
///
/// A present stop of `0` is a real bound, so `8:0` on a width-10 axis
/// wraps to columns 8 and 9 rather than selecting nothing as a plain
/// slice with a falsy stop would.
///
/// # Errors
///
/// Returns [`PanoramaError::IndexOutOfBounds`] if a corrected index or
/// bound still lies outside the axis, and
/// [`PanoramaError::UnsupportedOperation`] for a seam-crossing range on
/// the row or channel axis.
pub fn resolve(spec: AxisSpec, axis: Axis, len: usize) -> Result<Resolved, PanoramaError> {
    match spec {
        AxisSpec::All => Ok(Resolved::Span(0..len)),
        AxisSpec::Index(index) => {
            let i = checked(index, reindex(Some(index), len), axis, len)?;
            if i == len {
                return Err(out_of_bounds(index, axis, len));
            }
            Ok(Resolved::Span(i..i + 1))
        }
        AxisSpec::Range { start, stop } => {
            let lo = start
                .map(|s| checked(s, reindex(Some(s), len), axis, len))
                .transpose()?;
            let hi = stop
                .map(|s| checked(s, reindex(Some(s), len), axis, len))
                .transpose()?;

            match (lo, hi) {
                (Some(lo), Some(hi)) if lo > hi => {
                    if axis == Axis::Column {
                        Ok(Resolved::Wrap {
                            start: lo,
                            stop: hi,
                        })
                    } else {
                        Err(PanoramaError::UnsupportedOperation(format!(
                            "wraparound range {lo}..{hi} on the {axis} axis"
                        )))
                    }
                }
                (lo, hi) => {
                    let lo = lo.unwrap_or(0);
                    let hi = hi.unwrap_or(len).max(lo);
                    Ok(Resolved::Span(lo..hi))
                }
            }
        }
    }
}

/// Resolve `spec` on an axis where wraparound is never valid.
pub(crate) fn resolve_linear(
    spec: AxisSpec,
    axis: Axis,
    len: usize,
) -> Result<Range<usize>, PanoramaError> {
    match resolve(spec, axis, len)? {
        Resolved::Span(range) => Ok(range),
        Resolved::Wrap { start, stop } => Err(PanoramaError::UnsupportedOperation(format!(
            "wraparound range {start}..{stop} on the {axis} axis"
        ))),
    }
}

/// Accept a corrected index in `0..=len`.
fn checked(
    original: isize,
    corrected: Option<isize>,
    axis: Axis,
    len: usize,
) -> Result<usize, PanoramaError> {
    corrected
        .and_then(|i| usize::try_from(i).ok())
        .filter(|&i| i <= len)
        .ok_or_else(|| out_of_bounds(original, axis, len))
}

const fn out_of_bounds(index: isize, axis: Axis, len: usize) -> PanoramaError {
    PanoramaError::IndexOutOfBounds { axis, index, len }
}
