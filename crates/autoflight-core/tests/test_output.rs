mod common;

use autoflight_core::error::OutputError;
use autoflight_core::io::output::{save_html, save_image, write_atomic, OutputSettings};
use image::RgbImage;

use common::{noise_image, solid_image};

#[test]
fn test_save_png_is_lossless() {
    let img = noise_image(32, 20, 7);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mosaic.png");

    save_image(&img, &path, &OutputSettings::default()).unwrap();

    let loaded = image::open(&path).unwrap().into_rgb8();
    assert_eq!(loaded, img);
}

#[test]
fn test_save_tiff_is_lossless() {
    let img = noise_image(16, 16, 3);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mosaic.TIFF");

    save_image(&img, &path, &OutputSettings::default()).unwrap();

    let loaded = image::open(&path).unwrap().into_rgb8();
    assert_eq!(loaded, img);
}

#[test]
fn test_jpeg_quality_changes_file_size() {
    let img = noise_image(64, 64, 11);
    let dir = tempfile::tempdir().unwrap();
    let low = dir.path().join("low.jpg");
    let high = dir.path().join("high.jpeg");

    let settings = |q| OutputSettings {
        jpeg_quality: q,
        ..Default::default()
    };
    save_image(&img, &low, &settings(10)).unwrap();
    save_image(&img, &high, &settings(95)).unwrap();

    let low_size = std::fs::metadata(&low).unwrap().len();
    let high_size = std::fs::metadata(&high).unwrap().len();
    assert!(low_size < high_size);
    assert_eq!(image::open(&high).unwrap().into_rgb8().dimensions(), (64, 64));
}

#[test]
fn test_missing_parent_directories_are_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey").join("2024").join("mosaic.png");

    save_image(&solid_image(4, 4, 9), &path, &OutputSettings::default()).unwrap();
    assert!(path.is_file());

    // Second write into the now-existing directory.
    save_image(&solid_image(4, 4, 10), &path, &OutputSettings::default()).unwrap();
    assert_eq!(image::open(&path).unwrap().into_rgb8().get_pixel(0, 0)[0], 10);
}

#[test]
fn test_unsupported_extension_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("mosaic.bmp");

    let err = save_image(&solid_image(4, 4, 1), &path, &OutputSettings::default()).unwrap_err();
    assert!(matches!(err, OutputError::UnsupportedFormat { ref extension, .. } if extension == "bmp"));
    assert!(!dir.path().join("nested").exists());
}

#[test]
fn test_empty_image_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mosaic.png");

    let err = save_image(&RgbImage::new(0, 0), &path, &OutputSettings::default()).unwrap_err();
    assert!(matches!(err, OutputError::EmptyImage));
    assert!(!path.exists());
}

#[test]
fn test_failed_write_leaves_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mosaic.png");
    std::fs::write(&path, b"previous result").unwrap();

    let err = write_atomic(&path, |w| {
        use std::io::Write;
        w.write_all(b"partial").unwrap();
        Err(OutputError::EmptyImage)
    })
    .unwrap_err();
    assert!(matches!(err, OutputError::EmptyImage));

    assert_eq!(std::fs::read(&path).unwrap(), b"previous result");
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1, "temporary file left behind: {leftovers:?}");
}

#[test]
fn test_failed_write_creates_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mosaic.jpg");

    let _ = write_atomic(&path, |_| Err(OutputError::EmptyImage));
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_html_embeds_png_data_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mosaic.html");

    save_image(&noise_image(12, 8, 2), &path, &OutputSettings::default()).unwrap();

    let page = std::fs::read_to_string(&path).unwrap();
    assert!(page.starts_with("<!DOCTYPE html>"));
    assert!(page.contains("data:image/png;base64,"));
    assert!(page.contains("12 x 8 pixels"));
    assert!(page.contains("UTC"));
}

#[test]
fn test_save_html_ignores_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preview.txt");

    save_html(&solid_image(3, 3, 200), &path, &OutputSettings::default()).unwrap();
    let page = std::fs::read_to_string(&path).unwrap();
    assert!(page.contains("<img src=\"data:image/png;base64,"));
}
