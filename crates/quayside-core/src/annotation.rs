//! COCO-style annotation records and the annotation-index seam.
//!
//! Parsing annotation files is left to an [`AnnotationIndex`]
//! implementation supplied by the caller. The index hands out plain
//! records and decodes run-length encoded masks; polygon segmentations
//! are rasterised here.

use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::dataset::DatasetError;
use crate::types::GrayImage;

/// Category identifier.
pub type CategoryId = u32;

/// Image identifier.
pub type ImageId = u64;

/// Annotation identifier.
pub type AnnotationId = u64;

/// Run-length counts, either as a plain list or in compressed string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RleCounts {
    /// Alternating background/foreground run lengths, column-major.
    Uncompressed(Vec<u32>),
    /// The compact string encoding.
    Compressed(String),
}

/// A run-length encoded mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rle {
    /// `[height, width]` of the encoded mask.
    pub size: [u32; 2],
    /// The runs.
    pub counts: RleCounts,
}

/// Segmentation of one annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    /// One or more polygons, each a flat `[x0, y0, x1, y1, ...]` list.
    Polygons(Vec<Vec<f64>>),
    /// A run-length encoded mask.
    Rle(Rle),
}

/// One annotation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation id.
    pub id: AnnotationId,
    /// Image the annotation belongs to.
    pub image_id: ImageId,
    /// Annotated category.
    pub category_id: CategoryId,
    /// Shape of the annotated region.
    #[serde(default)]
    pub segmentation: Option<Segmentation>,
    /// `[x, y, width, height]` bounding box.
    #[serde(default)]
    pub bbox: [f64; 4],
    /// Area of the region in pixels.
    #[serde(default)]
    pub area: f64,
    /// 1 for crowd regions.
    #[serde(default)]
    pub iscrowd: u8,
    /// Inline binary mask (rows of 0/1) carried by the Amsterdam
    /// annotations. Takes precedence over `segmentation` when non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<Vec<u8>>>,
}

/// One image record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Image id.
    pub id: ImageId,
    /// File name relative to the dataset's image directory.
    pub file_name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Filter for [`AnnotationIndex::annotation_ids`]. Empty lists do not
/// filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationQuery {
    /// Keep annotations of these images.
    pub image_ids: Vec<ImageId>,
    /// Keep annotations of these categories.
    pub category_ids: Vec<CategoryId>,
    /// Keep only crowd (`Some(true)`) or non-crowd (`Some(false)`) regions.
    pub iscrowd: Option<bool>,
}

/// Lookup service over a parsed annotation file.
pub trait AnnotationIndex {
    /// Ids of the named categories; all categories when `names` is empty.
    fn category_ids(&self, names: &[&str]) -> Vec<CategoryId>;

    /// Ids of the annotations matching `query`.
    fn annotation_ids(&self, query: &AnnotationQuery) -> Vec<AnnotationId>;

    /// Ids of the images carrying annotations of every listed category;
    /// all images when `category_ids` is empty.
    fn image_ids(&self, category_ids: &[CategoryId]) -> Vec<ImageId>;

    /// Records for the given annotation ids, in order.
    fn load_annotations(&self, ids: &[AnnotationId]) -> Vec<Annotation>;

    /// Records for the given image ids, in order.
    fn load_images(&self, ids: &[ImageId]) -> Vec<ImageRecord>;

    /// Decode a run-length encoded mask into a 0/1 image.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Rle`] if the encoding is malformed.
    fn decode_rle(&self, rle: &Rle) -> Result<GrayImage, DatasetError>;

    /// Binary (0/1) mask of an annotation on a `width × height` canvas.
    ///
    /// Polygons are filled and unioned; RLE goes through
    /// [`decode_rle`](Self::decode_rle). An annotation without a
    /// segmentation yields an empty mask.
    ///
    /// # Errors
    ///
    /// Propagates [`decode_rle`](Self::decode_rle) failures.
    fn annotation_to_mask(
        &self,
        annotation: &Annotation,
        height: u32,
        width: u32,
    ) -> Result<GrayImage, DatasetError> {
        match &annotation.segmentation {
            Some(Segmentation::Rle(rle)) => self.decode_rle(rle),
            Some(Segmentation::Polygons(polygons)) => {
                Ok(rasterize_polygons(polygons, height, width))
            }
            None => Ok(GrayImage::new(width, height)),
        }
    }
}

/// Fill every polygon onto a zeroed `width × height` canvas with 1.
///
/// Coordinates are rounded to the nearest pixel. A repeated closing
/// vertex is dropped and polygons with fewer than three vertices are
/// skipped.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn rasterize_polygons(polygons: &[Vec<f64>], height: u32, width: u32) -> GrayImage {
    let mut canvas = GrayImage::new(width, height);
    for flat in polygons {
        let mut points: Vec<Point<i32>> = flat
            .chunks_exact(2)
            .map(|xy| Point::new(xy[0].round() as i32, xy[1].round() as i32))
            .collect();
        points.dedup();
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            continue;
        }
        draw_polygon_mut(&mut canvas, &points, image::Luma([1]));
    }
    canvas
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct RleOnly;

    impl AnnotationIndex for RleOnly {
        fn category_ids(&self, _: &[&str]) -> Vec<CategoryId> {
            Vec::new()
        }
        fn annotation_ids(&self, _: &AnnotationQuery) -> Vec<AnnotationId> {
            Vec::new()
        }
        fn image_ids(&self, _: &[CategoryId]) -> Vec<ImageId> {
            Vec::new()
        }
        fn load_annotations(&self, _: &[AnnotationId]) -> Vec<Annotation> {
            Vec::new()
        }
        fn load_images(&self, _: &[ImageId]) -> Vec<ImageRecord> {
            Vec::new()
        }
        fn decode_rle(&self, rle: &Rle) -> Result<GrayImage, DatasetError> {
            Ok(GrayImage::from_pixel(rle.size[1], rle.size[0], image::Luma([1])))
        }
    }

    fn annotation(segmentation: Option<Segmentation>) -> Annotation {
        Annotation {
            id: 1,
            image_id: 1,
            category_id: 1,
            segmentation,
            bbox: [0.0; 4],
            area: 0.0,
            iscrowd: 0,
            mask: None,
        }
    }

    fn ones(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] == 1).count()
    }

    #[test]
    fn square_polygon_fills_interior() {
        let square = vec![vec![2.0, 2.0, 6.0, 2.0, 6.0, 6.0, 2.0, 6.0]];
        let mask = rasterize_polygons(&square, 10, 10);
        assert_eq!(mask.get_pixel(4, 4).0[0], 1);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(8, 8).0[0], 0);
        assert!(mask.pixels().all(|p| p.0[0] <= 1));
    }

    #[test]
    fn closing_vertex_is_tolerated() {
        let closed = vec![vec![1.0, 1.0, 5.0, 1.0, 5.0, 5.0, 1.0, 1.0]];
        let mask = rasterize_polygons(&closed, 8, 8);
        assert!(ones(&mask) > 0);
    }

    #[test]
    fn degenerate_polygons_are_skipped() {
        let polys = vec![vec![], vec![3.0, 3.0], vec![1.0, 1.0, 4.0, 4.0]];
        let mask = rasterize_polygons(&polys, 8, 8);
        assert_eq!(ones(&mask), 0);
    }

    #[test]
    fn multiple_polygons_union() {
        let polys = vec![
            vec![0.0, 0.0, 3.0, 0.0, 3.0, 3.0, 0.0, 3.0],
            vec![6.0, 6.0, 9.0, 6.0, 9.0, 9.0, 6.0, 9.0],
        ];
        let mask = rasterize_polygons(&polys, 10, 10);
        assert_eq!(mask.get_pixel(1, 1).0[0], 1);
        assert_eq!(mask.get_pixel(7, 7).0[0], 1);
        assert_eq!(mask.get_pixel(5, 5).0[0], 0);
    }

    #[test]
    fn rle_goes_to_index() {
        let rle = Rle {
            size: [3, 5],
            counts: RleCounts::Compressed("abc".to_owned()),
        };
        let mask = RleOnly
            .annotation_to_mask(&annotation(Some(Segmentation::Rle(rle))), 3, 5)
            .unwrap();
        assert_eq!(mask.dimensions(), (5, 3));
        assert_eq!(ones(&mask), 15);
    }

    #[test]
    fn missing_segmentation_is_empty_mask() {
        let mask = RleOnly.annotation_to_mask(&annotation(None), 4, 6).unwrap();
        assert_eq!(mask.dimensions(), (6, 4));
        assert_eq!(ones(&mask), 0);
    }

    #[test]
    fn deserializes_polygon_and_rle_annotations() {
        let polygon: Annotation = serde_json::from_str(
            r#"{"id": 7, "image_id": 3, "category_id": 2,
                "segmentation": [[0, 0, 4, 0, 4, 4]],
                "bbox": [0, 0, 4, 4], "area": 8.0, "iscrowd": 0}"#,
        )
        .unwrap();
        assert!(matches!(
            polygon.segmentation,
            Some(Segmentation::Polygons(ref p)) if p[0].len() == 6
        ));
        assert_eq!(polygon.mask, None);

        let crowd: Annotation = serde_json::from_str(
            r#"{"id": 8, "image_id": 3, "category_id": 1,
                "segmentation": {"size": [2, 2], "counts": [1, 2, 1]},
                "iscrowd": 1}"#,
        )
        .unwrap();
        assert!(matches!(
            crowd.segmentation,
            Some(Segmentation::Rle(Rle {
                counts: RleCounts::Uncompressed(_),
                ..
            }))
        ));
        assert_eq!(crowd.iscrowd, 1);
    }

    #[test]
    fn deserializes_inline_mask() {
        let ann: Annotation = serde_json::from_str(
            r#"{"id": 1, "image_id": 1, "category_id": 4, "mask": [[0, 1], [1, 1]]}"#,
        )
        .unwrap();
        assert_eq!(ann.mask, Some(vec![vec![0, 1], vec![1, 1]]));
        assert_eq!(ann.segmentation, None);
    }
}
