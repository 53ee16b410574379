//! COCO release layout on disk.
//!
//! [`discover_layout`] finds the image directory and annotation file of a
//! COCO release unpacked under a root directory. Parsing the annotation
//! file is the job of the caller's [`AnnotationIndex`]; the layout then
//! turns that index into a [`CocoDataset`] reading from the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use quayside_core::{AnnotationIndex, CocoDataset, CocoTask};
use serde::{Deserialize, Serialize};

use crate::codec::FsImageReader;

/// Errors raised while locating a COCO release.
#[derive(Debug, thiserror::Error)]
pub enum CocoError {
    /// The root directory could not be listed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Which part of a COCO release to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CocoSplit {
    /// Subset name, e.g. `train` or `val`.
    pub subset: String,
    /// Annotation family, e.g. `instances` or `stuff`.
    pub challenge: String,
    /// Release year.
    pub year: u16,
}

impl CocoSplit {
    /// Default subset.
    pub const DEFAULT_SUBSET: &'static str = "train";
    /// Default annotation family.
    pub const DEFAULT_CHALLENGE: &'static str = "instances";
    /// Default release year.
    pub const DEFAULT_YEAR: u16 = 2017;
}

impl Default for CocoSplit {
    fn default() -> Self {
        Self {
            subset: Self::DEFAULT_SUBSET.to_owned(),
            challenge: Self::DEFAULT_CHALLENGE.to_owned(),
            year: Self::DEFAULT_YEAR,
        }
    }
}

/// Where a split's images and annotations live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CocoLayout {
    /// Directory of `{image_id:012}.jpg` files.
    pub image_dir: PathBuf,
    /// The split's annotation JSON.
    pub annotation_file: PathBuf,
}

impl CocoLayout {
    /// A dataset over `index` that reads images from
    /// [`image_dir`](Self::image_dir) with [`FsImageReader`].
    ///
    /// `index` is expected to have been built from
    /// [`annotation_file`](Self::annotation_file).
    #[must_use]
    pub fn dataset<I: AnnotationIndex>(
        &self,
        index: I,
        task: CocoTask,
        categories: &[&str],
    ) -> CocoDataset<I, FsImageReader> {
        CocoDataset::new(index, FsImageReader, &self.image_dir, task, categories)
    }
}

/// Locate a split under `root`.
///
/// Images are expected in `root/{subset}{year}`. The annotation directory
/// is the first entry of `root`, in name order, whose name contains the
/// challenge; `annotations_trainval{year}` when none does. The file is
/// `annotations/{challenge}_{subset}{year}.json` below it. Nothing is
/// checked for existence beyond listing `root`.
///
/// # Errors
///
/// Returns [`CocoError::Io`] if `root` cannot be listed.
pub fn discover_layout(root: &Path, split: &CocoSplit) -> Result<CocoLayout, CocoError> {
    let io_err = |source| CocoError::Io {
        path: root.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(root).map_err(io_err)? {
        names.push(entry.map_err(io_err)?.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let CocoSplit {
        subset,
        challenge,
        year,
    } = split;
    let annotation_dir = names
        .into_iter()
        .find(|name| name.contains(challenge.as_str()))
        .unwrap_or_else(|| format!("annotations_trainval{year}"));

    let layout = CocoLayout {
        image_dir: root.join(format!("{subset}{year}")),
        annotation_file: root
            .join(annotation_dir)
            .join("annotations")
            .join(format!("{challenge}_{subset}{year}.json")),
    };
    debug!("COCO layout for {split:?}: {layout:?}");
    Ok(layout)
}
