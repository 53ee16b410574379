//! quayside-core: Cylindrical panorama addressing (sans-IO).
//!
//! Wraps 360° street-level panoramas in a [`CylindricalImage`] whose
//! column axis wraps around, converts between pixel columns and compass
//! viewpoints, and assembles segmentation dataset items from COCO-style
//! annotations.
//!
//! This crate has **no I/O dependencies** -- images come in through an
//! injected [`ImageReader`], go out through an optional [`ImageViewer`],
//! and annotation files are parsed by an [`AnnotationIndex`] supplied by
//! the caller. Filesystem loading lives in `quayside-io`.

pub mod annotation;
pub mod axis;
pub mod buffer;
pub mod cylinder;
pub mod dataset;
pub mod hooks;
pub mod metadata;
pub mod types;
pub mod viewpoint;

pub use annotation::{
    Annotation, AnnotationId, AnnotationIndex, AnnotationQuery, CategoryId, ImageId, ImageRecord,
    Rle, RleCounts, Segmentation,
};
pub use axis::{AxisSpec, reindex};
pub use buffer::PixelBuffer;
pub use cylinder::CylindricalImage;
pub use dataset::{AmsterdamDataset, CocoDataset, CocoLabel, CocoTask, DatasetError};
pub use hooks::{ImageReader, ImageViewer, ReadError, ViewError};
pub use metadata::{MetadataValue, PanoramaMetadata};
pub use types::{Axis, GrayImage, LabelMask, PanoramaError};
pub use viewpoint::{pixel_to_viewpoint, viewpoint_to_pixel};
