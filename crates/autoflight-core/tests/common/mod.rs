#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use autoflight_core::pipeline::{ProgressEvent, ProgressReporter};
use autoflight_core::stitch::{StitchEngine, StitchMode, StitchOutcome, StitchStatus};
use image::{Rgb, RgbImage};

/// Deterministic xorshift noise tile. Distinct seeds give uncorrelated tiles.
pub fn noise_image(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let v = (state & 0xff) as u8;
        Rgb([v, v.wrapping_add(40), v.wrapping_add(90)])
    })
}

/// Flat single-colour image.
pub fn solid_image(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
}

/// Write a noise image to `dir/name`, encoded by extension.
pub fn write_image(dir: &Path, name: &str, width: u32, height: u32, seed: u32) -> PathBuf {
    let path = dir.join(name);
    noise_image(width, height, seed).save(&path).unwrap();
    path
}

/// Write a file that carries an image extension but no image data.
pub fn write_corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"definitely not an image").unwrap();
    path
}

/// One recorded engine invocation.
#[derive(Clone, Debug)]
pub struct EngineCall {
    pub dims: Vec<(u32, u32)>,
    /// Top-left red channel of each input, used to check ordering.
    pub markers: Vec<u8>,
    pub mode: StitchMode,
}

/// Engine double that records its inputs and returns a canned status.
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    status: StitchStatus,
}

impl RecordingEngine {
    /// Succeeds with a mosaic as wide as all inputs side by side.
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            status: StitchStatus::Ok,
        })
    }

    pub fn failing(status: StitchStatus) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            status,
        })
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl StitchEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn stitch(&self, images: &[&RgbImage], mode: StitchMode) -> StitchOutcome {
        self.calls.lock().unwrap().push(EngineCall {
            dims: images.iter().map(|img| img.dimensions()).collect(),
            markers: images.iter().map(|img| img.get_pixel(0, 0)[0]).collect(),
            mode,
        });
        match &self.status {
            StitchStatus::Ok => {
                let width = images.iter().map(|img| img.width()).sum();
                let height = images.iter().map(|img| img.height()).max().unwrap_or(0);
                // Inputs side by side, so the canvas carries their texture.
                let mut canvas = RgbImage::new(width, height);
                let mut x = 0i64;
                for img in images {
                    image::imageops::replace(&mut canvas, *img, x, 0);
                    x += i64::from(img.width());
                }
                StitchOutcome::success(canvas)
            }
            other => StitchOutcome::failure(other.clone()),
        }
    }
}

/// Progress sink that keeps every event.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<ProgressEvent>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressReporter for EventLog {
    fn report(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
