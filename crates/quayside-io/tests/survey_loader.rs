//! Integration test: open generated survey directories with `PanoramaLoader`.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use quayside_core::{AxisSpec, ImageViewer, PanoramaError, PixelBuffer, ViewError};
use quayside_io::{FsImageReader, LoaderConfig, LoaderError, PanoramaLoader, SurfaceFilter};

/// Rows: (file name, heading, surface type, write a real image?).
const ROWS: &[(&str, &str, &str, bool)] = &[
    ("pano_0.png", "10.0", "quay_wall", true),
    ("pano_1.png", "95.5", "fence", true),
    ("pano_2.png", "180", "quay_wall", false),
    ("pano_3.png", "270.25", "", true),
    ("pano_4.png", "45", "fence", true),
];

fn write_survey(root: &Path) {
    let images = root.join(LoaderConfig::DEFAULT_IMAGES_DIR);
    fs::create_dir_all(&images).unwrap();

    let mut csv = String::from("filename_dump,heading,surface_type,lat,lng\n");
    for (i, &(name, heading, surface, intact)) in ROWS.iter().enumerate() {
        csv.push_str(&format!("{name},{heading},{surface},52.3{i},4.9{i}\n"));
        if intact {
            let width = 16 + u32::try_from(i).unwrap();
            image::RgbImage::from_pixel(width, 4, image::Rgb([i as u8 * 10, 0, 0]))
                .save(images.join(name))
                .unwrap();
        } else {
            fs::write(images.join(name), b"").unwrap();
        }
    }
    fs::write(root.join(LoaderConfig::DEFAULT_METADATA_FILE), csv).unwrap();
}

fn open(root: &Path) -> PanoramaLoader<FsImageReader> {
    PanoramaLoader::new(LoaderConfig::new(root), FsImageReader, None).unwrap()
}

#[test]
fn empty_images_are_filtered_and_cached() {
    let root = tempfile::tempdir().unwrap();
    write_survey(root.path());

    let loader = open(root.path());
    assert_eq!(loader.len(), 4);
    assert_eq!(loader.indices(), &[0, 1, 3, 4]);

    let cache = fs::read(root.path().join(LoaderConfig::DEFAULT_CACHE_FILE)).unwrap();
    let cached: Vec<usize> = serde_json::from_slice(&cache).unwrap();
    assert_eq!(cached, vec![0, 1, 3, 4]);
}

#[test]
fn existing_cache_is_trusted() {
    let root = tempfile::tempdir().unwrap();
    write_survey(root.path());
    fs::write(root.path().join(".notcorrupt"), "[4, 1, 99]").unwrap();

    let loader = open(root.path());

    // Row 99 does not exist and is dropped; order is kept.
    assert_eq!(loader.indices(), &[4, 1]);
    let cache = fs::read_to_string(root.path().join(".notcorrupt")).unwrap();
    assert_eq!(cache, "[4, 1, 99]");
}

#[test]
fn malformed_cache_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    write_survey(root.path());
    fs::write(root.path().join(".notcorrupt"), "not json").unwrap();

    let result = PanoramaLoader::new(LoaderConfig::new(root.path()), FsImageReader, None);
    assert!(matches!(result, Err(LoaderError::CacheFormat { .. })));
}

#[test]
fn unfiltered_loader_keeps_every_row() {
    let root = tempfile::tempdir().unwrap();
    write_survey(root.path());
    let config = LoaderConfig {
        filter_corrupt: false,
        ..LoaderConfig::new(root.path())
    };

    let loader = PanoramaLoader::new(config, FsImageReader, None).unwrap();

    assert_eq!(loader.len(), ROWS.len());
    assert!(!root.path().join(".notcorrupt").exists());
    assert!(matches!(loader.get(2), Err(LoaderError::Read(_))));
}

#[test]
fn get_reads_pixels_and_metadata() {
    let root = tempfile::tempdir().unwrap();
    write_survey(root.path());
    let loader = open(root.path());

    // Item 2 is row 3 once row 2 is filtered out.
    let pano = loader.get(2).unwrap();
    assert_eq!(pano.pixels().shape(), (4, 19, 3));
    assert!((pano.heading() - 270.25).abs() < f64::EPSILON);
    assert!((pano.viewpoint_back() - 90.25).abs() < f64::EPSILON);
    assert_eq!(pano.metadata().surface_type, None);
    assert_eq!(pano.metadata().lat, Some(52.33));
    assert_eq!(
        pano.metadata().get("filename_dump").unwrap().to_string(),
        "pano_3.png"
    );
    assert_eq!(pano.pixels().pixel(0, 0), Some(&[30, 0, 0][..]));
    assert_eq!(
        loader.image_path(2),
        Some(root.path().join("water_images_2").join("pano_3.png").as_path())
    );
    assert_eq!(loader.image_path(4), None);

    assert!(matches!(
        loader.get(4),
        Err(LoaderError::IndexOutOfRange { index: 4, len: 4 })
    ));
}

#[test]
fn iter_yields_every_active_item() {
    let root = tempfile::tempdir().unwrap();
    write_survey(root.path());
    let loader = open(root.path());

    let widths: Vec<usize> = loader.iter().map(|pano| pano.unwrap().width()).collect();
    assert_eq!(widths, vec![16, 17, 19, 20]);
}

#[test]
fn seeded_shuffle_is_deterministic() {
    let root = tempfile::tempdir().unwrap();
    write_survey(root.path());
    let config = LoaderConfig {
        shuffle: true,
        seed: Some(7),
        ..LoaderConfig::new(root.path())
    };

    let first = PanoramaLoader::new(config.clone(), FsImageReader, None).unwrap();
    let second = PanoramaLoader::new(config, FsImageReader, None).unwrap();

    assert_eq!(first.indices(), second.indices());
    let mut sorted = first.indices().to_vec();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 3, 4]);
}

#[test]
fn surface_filter_restricts_and_restores() {
    let root = tempfile::tempdir().unwrap();
    write_survey(root.path());
    let mut loader = open(root.path());

    assert_eq!(loader.surface_types(), vec!["fence", "quay_wall"]);

    loader.filter_surface_type(&SurfaceFilter::Only("fence".to_owned()));
    assert_eq!(loader.indices(), &[1, 4]);
    let pano = loader.get(1).unwrap();
    assert_eq!(pano.metadata().surface_type.as_deref(), Some("fence"));

    // Row 2 is a quay wall but its image is empty.
    loader.filter_surface_type(&SurfaceFilter::Only("quay_wall".to_owned()));
    assert_eq!(loader.indices(), &[0]);

    loader.filter_surface_type(&SurfaceFilter::All);
    assert_eq!(loader.indices(), &[0, 1, 3, 4]);
}

#[test]
fn missing_filename_column_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    write_survey(root.path());
    let config = LoaderConfig {
        filename_column: "file".to_owned(),
        ..LoaderConfig::new(root.path())
    };

    let result = PanoramaLoader::new(config, FsImageReader, None);
    assert!(matches!(result, Err(LoaderError::MissingColumn(c)) if c == "file"));
}

#[test]
fn missing_heading_surfaces_on_get() {
    let root = tempfile::tempdir().unwrap();
    let images = root.path().join("imgs");
    fs::create_dir_all(&images).unwrap();
    image::RgbImage::new(8, 2).save(images.join("a.png")).unwrap();
    fs::write(root.path().join("meta.csv"), "name,heading\na.png,\n").unwrap();
    let config = LoaderConfig {
        images_dir: "imgs".to_owned(),
        metadata_file: "meta.csv".to_owned(),
        filename_column: "name".to_owned(),
        ..LoaderConfig::new(root.path())
    };

    let loader = PanoramaLoader::new(config, FsImageReader, None).unwrap();

    assert_eq!(loader.len(), 1);
    assert!(matches!(
        loader.get(0),
        Err(LoaderError::Panorama(PanoramaError::MissingHeading))
    ));
}

#[test]
fn empty_filename_cell_is_filtered() {
    let root = tempfile::tempdir().unwrap();
    let images = root.path().join("imgs");
    fs::create_dir_all(&images).unwrap();
    image::RgbImage::new(8, 2).save(images.join("a.png")).unwrap();
    fs::write(root.path().join("meta.csv"), "name,heading\na.png,10\n,20\n").unwrap();
    let config = LoaderConfig {
        images_dir: "imgs".to_owned(),
        metadata_file: "meta.csv".to_owned(),
        filename_column: "name".to_owned(),
        ..LoaderConfig::new(root.path())
    };

    // The empty cell resolves to the image directory itself.
    let loader = PanoramaLoader::new(config, FsImageReader, None).unwrap();

    assert_eq!(loader.indices(), &[0]);
    let cache = fs::read(root.path().join(LoaderConfig::DEFAULT_CACHE_FILE)).unwrap();
    let cached: Vec<usize> = serde_json::from_slice(&cache).unwrap();
    assert_eq!(cached, vec![0]);
}

#[test]
fn loaded_panoramas_share_the_viewer() {
    let root = tempfile::tempdir().unwrap();
    write_survey(root.path());
    let shown = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&shown);
    let viewer: Arc<dyn ImageViewer> = Arc::new(move |pixels: &PixelBuffer| {
        sink.lock().unwrap().push(pixels.shape());
        Ok::<(), ViewError>(())
    });

    let loader = PanoramaLoader::new(LoaderConfig::new(root.path()), FsImageReader, Some(viewer))
        .unwrap();
    let pano = loader.get(0).unwrap();
    pano.show(2).unwrap();
    pano.get(AxisSpec::All, AxisSpec::span(12, 4), AxisSpec::All)
        .unwrap()
        .show(0)
        .unwrap();

    assert_eq!(*shown.lock().unwrap(), vec![(4, 16, 3), (4, 8, 3)]);
}
