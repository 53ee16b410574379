//! Collaborator seams: image reading and image display.
//!
//! quayside never decodes, encodes, or renders images itself. Callers
//! inject an [`ImageReader`] (and optionally an [`ImageViewer`]) at
//! construction time; `quayside-io` provides a filesystem reader backed
//! by the `image` crate.
//!
//! Both traits are implemented for plain closures so tests and small
//! tools can pass a function directly.

use std::path::{Path, PathBuf};

use crate::buffer::PixelBuffer;

/// Errors returned by an [`ImageReader`].
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The file could not be opened or read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file was read but could not be decoded as an image.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        /// Path that was being decoded.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },
}

/// Error reported by an [`ImageViewer`].
#[derive(Debug, thiserror::Error)]
#[error("image viewer failed: {0}")]
pub struct ViewError(pub String);

/// Loads a pixel buffer from a path.
pub trait ImageReader {
    /// Read and decode the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] if the file is unreadable or undecodable.
    fn read(&self, path: &Path) -> Result<PixelBuffer, ReadError>;
}

impl<F> ImageReader for F
where
    F: Fn(&Path) -> Result<PixelBuffer, ReadError>,
{
    fn read(&self, path: &Path) -> Result<PixelBuffer, ReadError> {
        self(path)
    }
}

/// Displays a pixel buffer.
///
/// Shared between an image and every slice taken from it, hence the
/// `Send + Sync` bound.
pub trait ImageViewer: Send + Sync {
    /// Present `pixels` to the user.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError`] if the display backend fails.
    fn show(&self, pixels: &PixelBuffer) -> Result<(), ViewError>;
}

impl<F> ImageViewer for F
where
    F: Fn(&PixelBuffer) -> Result<(), ViewError> + Send + Sync,
{
    fn show(&self, pixels: &PixelBuffer) -> Result<(), ViewError> {
        self(pixels)
    }
}
