//! Segmentation datasets over an [`AnnotationIndex`].
//!
//! [`CocoDataset`] yields one item per annotation with a label chosen by
//! [`CocoTask`]. [`AmsterdamDataset`] yields one item per image with a
//! [`LabelMask`] combining every annotation of the image: each pixel
//! holds the largest `category_id` whose mask covers it.
//!
//! Images are loaded through the injected [`ImageReader`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::annotation::{
    Annotation, AnnotationId, AnnotationIndex, AnnotationQuery, CategoryId, ImageId, ImageRecord,
};
use crate::buffer::PixelBuffer;
use crate::hooks::{ImageReader, ReadError};
use crate::types::{GrayImage, LabelMask};

/// Errors raised while assembling dataset items.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// Item index past the end of the dataset.
    #[error("index {index} out of range for dataset of length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Dataset length.
        len: usize,
    },

    /// The index returned no record for an image id.
    #[error("no image record for image id {0}")]
    MissingImage(ImageId),

    /// A category id does not fit a [`LabelMask`] pixel.
    #[error("category id {0} does not fit a 16-bit label mask")]
    CategoryOverflow(CategoryId),

    /// An annotation mask has a different size than its image.
    #[error("annotation {annotation} mask is {actual:?}, image is {expected:?} (width, height)")]
    MaskSizeMismatch {
        /// Offending annotation.
        annotation: AnnotationId,
        /// `(width, height)` of the image record.
        expected: (u32, u32),
        /// `(width, height)` of the annotation mask.
        actual: (u32, u32),
    },

    /// An inline mask has rows of different lengths.
    #[error("annotation {0} has an inline mask with ragged rows")]
    RaggedMask(AnnotationId),

    /// Run-length decoding failed.
    #[error("failed to decode RLE mask: {0}")]
    Rle(String),

    /// Reading the image failed.
    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Which annotation field a [`CocoDataset`] yields as its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CocoTask {
    /// Binary mask of the annotation.
    #[default]
    Segmentation,
    /// `[x, y, width, height]` box.
    BoundingBox,
    /// Region area.
    Area,
    /// Category id.
    Category,
}

/// Label produced by a [`CocoDataset`] item.
#[derive(Debug, Clone, PartialEq)]
pub enum CocoLabel {
    /// Binary (0/1) mask at the image's size.
    Mask(GrayImage),
    /// `[x, y, width, height]` box.
    BoundingBox([f64; 4]),
    /// Region area.
    Area(f64),
    /// Category id.
    Category(CategoryId),
}

/// File name of a COCO image: the id zero-padded to 12 digits.
#[must_use]
pub fn coco_file_name(image_id: ImageId) -> String {
    format!("{image_id:012}.jpg")
}

/// COCO-style dataset: one item per annotation of the selected categories.
pub struct CocoDataset<I, R> {
    index: I,
    reader: R,
    image_dir: PathBuf,
    task: CocoTask,
    annotations: Vec<Annotation>,
}

impl<I: AnnotationIndex, R: ImageReader> CocoDataset<I, R> {
    /// Collect the annotations of the named categories (all when empty).
    pub fn new(
        index: I,
        reader: R,
        image_dir: impl Into<PathBuf>,
        task: CocoTask,
        categories: &[&str],
    ) -> Self {
        let category_ids = index.category_ids(categories);
        let annotation_ids = index.annotation_ids(&AnnotationQuery {
            category_ids,
            ..AnnotationQuery::default()
        });
        let annotations = index.load_annotations(&annotation_ids);
        Self {
            index,
            reader,
            image_dir: image_dir.into(),
            task,
            annotations,
        }
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// Returns `true` if there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Directory the images are read from.
    #[must_use]
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// The image and label of item `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::IndexOutOfRange`] past the end, read
    /// failures, and for segmentation labels
    /// [`DatasetError::MissingImage`] and mask decoding failures.
    pub fn get(&self, idx: usize) -> Result<(PixelBuffer, CocoLabel), DatasetError> {
        let annotation = self
            .annotations
            .get(idx)
            .ok_or_else(|| DatasetError::IndexOutOfRange {
                index: idx,
                len: self.len(),
            })?;

        let path = self.image_dir.join(coco_file_name(annotation.image_id));
        let image = self.reader.read(&path)?;

        let label = match self.task {
            CocoTask::Segmentation => {
                let record = self
                    .index
                    .load_images(&[annotation.image_id])
                    .into_iter()
                    .next()
                    .ok_or(DatasetError::MissingImage(annotation.image_id))?;
                CocoLabel::Mask(self.index.annotation_to_mask(
                    annotation,
                    record.height,
                    record.width,
                )?)
            }
            CocoTask::BoundingBox => CocoLabel::BoundingBox(annotation.bbox),
            CocoTask::Area => CocoLabel::Area(annotation.area),
            CocoTask::Category => CocoLabel::Category(annotation.category_id),
        };

        Ok((image, label))
    }
}

/// Amsterdam fence/quay dataset: one item per annotated image.
pub struct AmsterdamDataset<I, R> {
    index: I,
    reader: R,
    image_dir: PathBuf,
    category_ids: Vec<CategoryId>,
    images: Vec<ImageRecord>,
}

impl<I: AnnotationIndex, R: ImageReader> AmsterdamDataset<I, R> {
    /// Collect the images annotated with the index's categories.
    pub fn new(index: I, reader: R, image_dir: impl Into<PathBuf>) -> Self {
        let category_ids = index.category_ids(&[]);
        let image_ids = index.image_ids(&category_ids);
        let images = index.load_images(&image_ids);
        Self {
            index,
            reader,
            image_dir: image_dir.into(),
            category_ids,
            images,
        }
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns `true` if there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Image records in item order.
    #[must_use]
    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    /// The image and composited label mask of item `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::IndexOutOfRange`] past the end, read
    /// failures, and any error of [`composite_label_mask`].
    pub fn get(&self, idx: usize) -> Result<(PixelBuffer, LabelMask), DatasetError> {
        let record = self
            .images
            .get(idx)
            .ok_or_else(|| DatasetError::IndexOutOfRange {
                index: idx,
                len: self.len(),
            })?;

        let image = self.reader.read(&self.image_dir.join(&record.file_name))?;

        let annotation_ids = self.index.annotation_ids(&AnnotationQuery {
            image_ids: vec![record.id],
            category_ids: self.category_ids.clone(),
            iscrowd: None,
        });
        let annotations = self.index.load_annotations(&annotation_ids);
        let mask = composite_label_mask(&self.index, &annotations, record.height, record.width)?;

        Ok((image, mask))
    }
}

/// Combine annotations into one label mask of `width × height`.
///
/// Starting from zero, each annotation contributes its binary mask
/// multiplied by its category id, and every pixel keeps the maximum. An
/// annotation's non-empty inline `mask` is used as is; otherwise the
/// index rasterises or decodes its segmentation.
///
/// # Errors
///
/// Returns [`DatasetError::CategoryOverflow`] for category ids above
/// `u16::MAX`, [`DatasetError::RaggedMask`] or
/// [`DatasetError::MaskSizeMismatch`] for malformed masks, and any
/// decoding error from the index.
pub fn composite_label_mask<I: AnnotationIndex + ?Sized>(
    index: &I,
    annotations: &[Annotation],
    height: u32,
    width: u32,
) -> Result<LabelMask, DatasetError> {
    let mut label = LabelMask::new(width, height);
    for annotation in annotations {
        let binary = match annotation.mask.as_deref() {
            Some(rows) if !rows.is_empty() => inline_mask(annotation.id, rows)?,
            _ => index.annotation_to_mask(annotation, height, width)?,
        };
        merge_max(&mut label, &binary, annotation)?;
    }
    Ok(label)
}

fn inline_mask(annotation: AnnotationId, rows: &[Vec<u8>]) -> Result<GrayImage, DatasetError> {
    let width = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != width) {
        return Err(DatasetError::RaggedMask(annotation));
    }
    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(rows.len())) else {
        return Err(DatasetError::RaggedMask(annotation));
    };
    let data = rows.concat();
    GrayImage::from_raw(w, h, data).ok_or(DatasetError::RaggedMask(annotation))
}

fn merge_max(
    label: &mut LabelMask,
    binary: &GrayImage,
    annotation: &Annotation,
) -> Result<(), DatasetError> {
    if binary.dimensions() != label.dimensions() {
        return Err(DatasetError::MaskSizeMismatch {
            annotation: annotation.id,
            expected: label.dimensions(),
            actual: binary.dimensions(),
        });
    }
    let category = u16::try_from(annotation.category_id)
        .map_err(|_| DatasetError::CategoryOverflow(annotation.category_id))?;

    for (dst, src) in label.pixels_mut().zip(binary.pixels()) {
        let value = u16::from(src.0[0]).saturating_mul(category);
        dst.0[0] = dst.0[0].max(value);
    }
    Ok(())
}
