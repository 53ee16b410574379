//! Image decoding and encoding on the local filesystem.
//!
//! [`FsImageReader`] is the default [`ImageReader`] for the loaders in
//! this crate. [`save`] writes a panorama back out, choosing the format
//! from the file extension.

use std::path::Path;

use quayside_core::{CylindricalImage, ImageReader, PanoramaError, PixelBuffer, ReadError};

/// Errors that can occur while saving a panorama.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The pixels have no matching image color type.
    #[error(transparent)]
    Panorama(#[from] PanoramaError),

    /// Encoding or writing the file failed.
    #[error("failed to save {}: {source}", path.display())]
    Encode {
        /// Destination path.
        path: std::path::PathBuf,
        /// Underlying encoder error.
        #[source]
        source: image::ImageError,
    },
}

/// Reads images from disk with the `image` crate.
///
/// The format is guessed from the file contents, not the extension.
/// Gray, gray + alpha and RGB images keep their channel count (1, 2 and 3);
/// everything else is converted to 8-bit RGBA.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageReader;

impl ImageReader for FsImageReader {
    fn read(&self, path: &Path) -> Result<PixelBuffer, ReadError> {
        let io_err = |source: std::io::Error| ReadError::Io {
            path: path.to_path_buf(),
            source,
        };
        let image = image::ImageReader::open(path)
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)?
            .decode()
            .map_err(|source| match source {
                image::ImageError::IoError(source) => io_err(source),
                source => ReadError::Decode {
                    path: path.to_path_buf(),
                    source,
                },
            })?;
        Ok(PixelBuffer::from_dynamic_image(&image))
    }
}

/// Encode `image` to `path`; the extension selects the format.
///
/// # Errors
///
/// Returns [`SaveError::Panorama`] if the channel count has no color type
/// and [`SaveError::Encode`] if encoding or writing fails.
pub fn save(image: &CylindricalImage, path: impl AsRef<Path>) -> Result<(), SaveError> {
    let path = path.as_ref();
    let dynamic = image.pixels().to_dynamic_image()?;
    dynamic.save(path).map_err(|source| SaveError::Encode {
        path: path.to_path_buf(),
        source,
    })
}
