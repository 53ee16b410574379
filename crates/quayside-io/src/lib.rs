//! quayside-io: Filesystem loading for quayside.
//!
//! Decodes and encodes panoramas with the `image` crate, opens survey
//! directories as a [`PanoramaLoader`], and locates the parts of a COCO
//! release for the datasets in `quayside-core`.
//!
//! Progress and skipped files are reported through the `log` facade;
//! installing a logger is up to the application.

pub mod codec;
pub mod coco;
pub mod loader;

pub use codec::{FsImageReader, SaveError, save};
pub use coco::{CocoError, CocoLayout, CocoSplit, discover_layout};
pub use loader::{LoaderConfig, LoaderError, PanoramaLoader, SurfaceFilter};
