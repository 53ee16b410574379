//! Panorama survey loader.
//!
//! A survey directory holds a metadata table (one CSV row per panorama)
//! and a directory of panorama images named by one of its columns:
//!
//! ```text
//! root/
//!   metadata_with_new_filenames.csv
//!   water_images_2/
//!     pano_0001.jpg
//!     ...
//!   .notcorrupt
//! ```
//!
//! Rows whose image is missing or empty are skipped. The surviving row
//! indices are cached as a JSON list in `.notcorrupt`; a present cache is
//! trusted as is and never rewritten.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use quayside_core::{
    CylindricalImage, ImageReader, ImageViewer, MetadataValue, PanoramaError, PanoramaMetadata,
    ReadError,
};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Errors raised while opening a survey or loading a panorama.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// A file could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The metadata table could not be parsed.
    #[error("failed to parse metadata table {}: {source}", path.display())]
    Metadata {
        /// Path of the table.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// The metadata table lacks a required column.
    #[error("metadata table has no column {0:?}")]
    MissingColumn(String),

    /// The index cache exists but is not a JSON list of row indices.
    #[error("malformed index cache {}: {source}", path.display())]
    CacheFormat {
        /// Path of the cache.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Item index past the end of the loader.
    #[error("index {index} out of range for loader of length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of active items.
        len: usize,
    },

    /// The image reader failed.
    #[error(transparent)]
    Read(#[from] ReadError),

    /// The metadata row could not be turned into a panorama.
    #[error(transparent)]
    Panorama(#[from] PanoramaError),
}

/// Where a survey lives and how to open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Survey root directory.
    pub root: PathBuf,

    /// Image directory, relative to `root`.
    pub images_dir: String,

    /// Metadata table, relative to `root`.
    pub metadata_file: String,

    /// Column holding each panorama's image file name.
    pub filename_column: String,

    /// Index cache file, relative to `root`.
    pub cache_file: String,

    /// Skip rows whose image is missing or empty.
    pub filter_corrupt: bool,

    /// Shuffle the item order once at load time.
    pub shuffle: bool,

    /// Seed for `shuffle`; a fresh random seed is drawn when absent.
    pub seed: Option<u64>,
}

impl LoaderConfig {
    /// Default image directory.
    pub const DEFAULT_IMAGES_DIR: &'static str = "water_images_2";
    /// Default metadata table.
    pub const DEFAULT_METADATA_FILE: &'static str = "metadata_with_new_filenames.csv";
    /// Default file name column.
    pub const DEFAULT_FILENAME_COLUMN: &'static str = "filename_dump";
    /// Default index cache.
    pub const DEFAULT_CACHE_FILE: &'static str = ".notcorrupt";

    /// Default configuration for the survey at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Full path of the image directory.
    #[must_use]
    pub fn images_path(&self) -> PathBuf {
        self.root.join(&self.images_dir)
    }

    /// Full path of the metadata table.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(&self.metadata_file)
    }

    /// Full path of the index cache.
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.root.join(&self.cache_file)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            images_dir: Self::DEFAULT_IMAGES_DIR.to_owned(),
            metadata_file: Self::DEFAULT_METADATA_FILE.to_owned(),
            filename_column: Self::DEFAULT_FILENAME_COLUMN.to_owned(),
            cache_file: Self::DEFAULT_CACHE_FILE.to_owned(),
            filter_corrupt: true,
            shuffle: false,
            seed: None,
        }
    }
}

/// Which surface types a loader yields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceFilter {
    /// Every surface type.
    #[default]
    All,
    /// Only panoramas of this surface type.
    Only(String),
}

impl SurfaceFilter {
    fn accepts(&self, surface_type: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => surface_type == Some(wanted.as_str()),
        }
    }
}

struct Entry {
    image: PathBuf,
    record: csv::StringRecord,
    surface_type: Option<String>,
}

/// Indexed access to the panoramas of a survey.
pub struct PanoramaLoader<R> {
    config: LoaderConfig,
    reader: R,
    viewer: Option<Arc<dyn ImageViewer>>,
    headers: csv::StringRecord,
    entries: Vec<Entry>,
    /// Rows that passed the corruption filter, in (possibly shuffled) order.
    intact: Vec<usize>,
    /// `intact` restricted by the surface filter.
    active: Vec<usize>,
}

impl<R: ImageReader> PanoramaLoader<R> {
    /// Open the survey described by `config`.
    ///
    /// Reads the metadata table, settles which rows have usable images
    /// (from the cache when present) and applies the optional shuffle.
    /// Images themselves are read lazily by [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Metadata`] if the table cannot be parsed,
    /// [`LoaderError::MissingColumn`] if it lacks the file name column,
    /// [`LoaderError::CacheFormat`] for an unreadable cache and
    /// [`LoaderError::Io`] if the cache cannot be read or written.
    pub fn new(
        config: LoaderConfig,
        reader: R,
        viewer: Option<Arc<dyn ImageViewer>>,
    ) -> Result<Self, LoaderError> {
        let (headers, entries) = read_table(&config)?;
        info!(
            "metadata table {} lists {} panoramas",
            config.metadata_path().display(),
            entries.len()
        );

        let mut intact = intact_rows(&config, &entries)?;

        if config.shuffle {
            let mut rng = match config.seed {
                Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
                None => rand::rngs::StdRng::from_rng(&mut rand::rng()),
            };
            intact.shuffle(&mut rng);
        }

        let active = intact.clone();
        Ok(Self {
            config,
            reader,
            viewer,
            headers,
            entries,
            intact,
            active,
        })
    }

    /// Number of active panoramas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Returns `true` if no panorama is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// The configuration the loader was opened with.
    #[must_use]
    pub const fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Metadata rows behind the active items, in item order.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.active
    }

    /// Image path of item `idx`.
    #[must_use]
    pub fn image_path(&self, idx: usize) -> Option<&Path> {
        let row = *self.active.get(idx)?;
        Some(&self.entries[row].image)
    }

    /// Load item `idx`: its pixels, metadata row, and the loader's viewer.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::IndexOutOfRange`] past the end,
    /// [`LoaderError::Read`] if the image cannot be read and
    /// [`LoaderError::Panorama`] if the row has no usable heading.
    pub fn get(&self, idx: usize) -> Result<CylindricalImage, LoaderError> {
        let row = *self
            .active
            .get(idx)
            .ok_or_else(|| LoaderError::IndexOutOfRange {
                index: idx,
                len: self.len(),
            })?;
        let entry = &self.entries[row];
        debug!("reading panorama row {row} from {}", entry.image.display());

        let fields = self.headers.iter().zip(entry.record.iter());
        let metadata = PanoramaMetadata::from_record(fields)?;
        let pixels = self.reader.read(&entry.image)?;

        let image = CylindricalImage::new(pixels, metadata);
        Ok(match &self.viewer {
            Some(viewer) => image.with_viewer(Arc::clone(viewer)),
            None => image,
        })
    }

    /// Load every active item in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<CylindricalImage, LoaderError>> + '_ {
        (0..self.len()).map(|idx| self.get(idx))
    }

    /// Restrict the loader to one surface type, or lift the restriction.
    ///
    /// Filters always start from the full set of intact rows, so
    /// successive calls do not compound.
    pub fn filter_surface_type(&mut self, filter: &SurfaceFilter) {
        self.active = self
            .intact
            .iter()
            .copied()
            .filter(|&row| filter.accepts(self.entries[row].surface_type.as_deref()))
            .collect();
        info!(
            "surface filter {filter:?} keeps {} of {} panoramas",
            self.active.len(),
            self.intact.len()
        );
    }

    /// Distinct surface types in the metadata table, sorted.
    #[must_use]
    pub fn surface_types(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|entry| entry.surface_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn read_table(config: &LoaderConfig) -> Result<(csv::StringRecord, Vec<Entry>), LoaderError> {
    let path = config.metadata_path();
    let table_err = |source| LoaderError::Metadata {
        path: path.clone(),
        source,
    };

    let mut table = csv::Reader::from_path(&path).map_err(table_err)?;
    let headers = table.headers().map_err(table_err)?.clone();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let filename_col = column(&config.filename_column)
        .ok_or_else(|| LoaderError::MissingColumn(config.filename_column.clone()))?;
    let surface_col = column(PanoramaMetadata::SURFACE_TYPE);

    let images = config.images_path();
    let mut entries = Vec::new();
    for record in table.records() {
        let record = record.map_err(table_err)?;
        let image = images.join(record.get(filename_col).unwrap_or_default());
        let surface_type = surface_col
            .and_then(|col| record.get(col))
            .map(MetadataValue::parse)
            .filter(|value| !value.is_null())
            .map(|value| value.to_string());
        entries.push(Entry {
            image,
            record,
            surface_type,
        });
    }
    Ok((headers, entries))
}

fn intact_rows(config: &LoaderConfig, entries: &[Entry]) -> Result<Vec<usize>, LoaderError> {
    let cache = config.cache_path();

    if cache.is_file() {
        let bytes = fs::read(&cache).map_err(|source| LoaderError::Io {
            path: cache.clone(),
            source,
        })?;
        let cached: Vec<usize> =
            serde_json::from_slice(&bytes).map_err(|source| LoaderError::CacheFormat {
                path: cache.clone(),
                source,
            })?;
        let total = cached.len();
        let rows: Vec<usize> = cached.into_iter().filter(|&row| row < entries.len()).collect();
        if rows.len() < total {
            warn!(
                "index cache {} names {} rows past the end of the table; ignoring them",
                cache.display(),
                total - rows.len()
            );
        }
        info!("using {} cached intact rows from {}", rows.len(), cache.display());
        return Ok(rows);
    }

    if !config.filter_corrupt {
        return Ok((0..entries.len()).collect());
    }

    let mut rows = Vec::with_capacity(entries.len());
    for (row, entry) in entries.iter().enumerate() {
        match fs::metadata(&entry.image) {
            Ok(meta) if !meta.is_file() => {
                warn!("skipping row {row}: {} is not a file", entry.image.display());
            }
            Ok(meta) if meta.len() > 0 => rows.push(row),
            Ok(_) => warn!("skipping row {row}: {} is empty", entry.image.display()),
            Err(err) => warn!("skipping row {row}: {}: {err}", entry.image.display()),
        }
    }

    let json = serde_json::to_vec(&rows).map_err(|source| LoaderError::CacheFormat {
        path: cache.clone(),
        source,
    })?;
    fs::write(&cache, json).map_err(|source| LoaderError::Io {
        path: cache.clone(),
        source,
    })?;
    info!(
        "{} of {} rows have intact images; cached in {}",
        rows.len(),
        entries.len(),
        cache.display()
    );
    Ok(rows)
}
