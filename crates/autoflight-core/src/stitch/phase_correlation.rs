use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array2;
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::{FftDirection, FftPlanner};
use tracing::debug;

use crate::consts::{
    ALIGN_MAX_SIDE, DEFAULT_MAX_IMAGE_PIXELS, EPSILON, LUMINANCE_B, LUMINANCE_G, LUMINANCE_R,
    MIN_PEAK_TO_RMS,
};
use crate::security::SecurityLimits;

use super::{StitchEngine, StitchMode, StitchOutcome, StitchStatus};

/// Translation-only stitcher built on FFT phase correlation.
///
/// Consecutive images are aligned pairwise and their offsets chained, so the
/// input order must follow the capture path. `Panorama` averages overlapping
/// pixels; `Scans` paints each image over the previous ones.
#[derive(Clone, Debug)]
pub struct PhaseCorrelationStitcher {
    /// Longest side of the luminance plane used for alignment.
    pub max_align_side: u32,
    /// Minimum correlation peak-to-RMS ratio for a pair to count as overlapping.
    pub min_peak_to_rms: f64,
    /// Largest mosaic the engine will allocate, in pixels.
    pub max_canvas_pixels: u64,
}

impl Default for PhaseCorrelationStitcher {
    fn default() -> Self {
        Self {
            max_align_side: ALIGN_MAX_SIDE,
            min_peak_to_rms: MIN_PEAK_TO_RMS,
            max_canvas_pixels: DEFAULT_MAX_IMAGE_PIXELS,
        }
    }
}

/// Integer placement of an image on the mosaic canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Placement {
    x: i64,
    y: i64,
}

impl StitchEngine for PhaseCorrelationStitcher {
    fn name(&self) -> &str {
        "phase-correlation"
    }

    fn stitch(&self, images: &[&RgbImage], mode: StitchMode) -> StitchOutcome {
        match self.try_stitch(images, mode) {
            Ok(mosaic) => StitchOutcome::success(mosaic),
            Err(status) => StitchOutcome::failure(status),
        }
    }
}

impl PhaseCorrelationStitcher {
    /// Engine whose canvas obeys the same pixel ceiling as the inputs.
    pub fn with_limits(limits: &SecurityLimits) -> Self {
        Self {
            max_canvas_pixels: limits.max_image_pixels,
            ..Self::default()
        }
    }

    fn try_stitch(&self, images: &[&RgbImage], mode: StitchMode) -> Result<RgbImage, StitchStatus> {
        if images.len() < 2 {
            return Err(StitchStatus::NeedMoreImages);
        }
        if images.iter().any(|img| img.width() == 0 || img.height() == 0) {
            return Err(StitchStatus::Failed("zero-sized input image".to_string()));
        }

        let max_side = images
            .iter()
            .map(|img| img.width().max(img.height()))
            .max()
            .unwrap_or(1);
        let scale = (f64::from(self.max_align_side) / f64::from(max_side)).min(1.0);

        let planes: Vec<Array2<f32>> = images
            .par_iter()
            .map(|img| luminance_plane(img, scale))
            .collect();
        let pad_h = 2 * planes.iter().map(|p| p.nrows()).max().unwrap_or(1);
        let pad_w = 2 * planes.iter().map(|p| p.ncols()).max().unwrap_or(1);

        let offsets: Vec<(f64, f64)> = (1..planes.len())
            .into_par_iter()
            .map(|i| self.pair_offset(&planes[i - 1], &planes[i], pad_h, pad_w, i))
            .collect::<Result<_, _>>()?;

        let placements = chain_offsets(&offsets, scale);
        let mosaic = self.composite(images, &placements, mode)?;
        debug!(
            width = mosaic.width(),
            height = mosaic.height(),
            "Composited mosaic"
        );
        Ok(mosaic)
    }

    /// Offset (dx, dy) of `target`'s origin in `reference` coordinates, in
    /// working-plane pixels.
    fn pair_offset(
        &self,
        reference: &Array2<f32>,
        target: &Array2<f32>,
        pad_h: usize,
        pad_w: usize,
        index: usize,
    ) -> Result<(f64, f64), StitchStatus> {
        let mut planner = FftPlanner::new();
        let ref_fft = fft2d(prepare_plane(reference, pad_h, pad_w), &mut planner, FftDirection::Forward);
        let tgt_fft = fft2d(prepare_plane(target, pad_h, pad_w), &mut planner, FftDirection::Forward);
        let cross = normalized_cross_power(&ref_fft, &tgt_fft);
        let surface = fft2d(cross, &mut planner, FftDirection::Inverse).mapv(|c| c.re);

        let (peak_row, peak_col, peak) = find_peak(&surface);
        let rms = (surface.iter().map(|v| v * v).sum::<f64>() / surface.len() as f64).sqrt();
        let ratio = if rms > EPSILON { peak / rms } else { 0.0 };
        debug!(pair = index, ratio, "Pairwise correlation peak");
        if ratio < self.min_peak_to_rms {
            return Err(StitchStatus::NeedMoreImages);
        }

        let dy = if peak_row > pad_h / 2 {
            peak_row as f64 - pad_h as f64
        } else {
            peak_row as f64
        };
        let dx = if peak_col > pad_w / 2 {
            peak_col as f64 - pad_w as f64
        } else {
            peak_col as f64
        };
        Ok((dx, dy))
    }

    fn composite(
        &self,
        images: &[&RgbImage],
        placements: &[Placement],
        mode: StitchMode,
    ) -> Result<RgbImage, StitchStatus> {
        let min_x = placements.iter().map(|p| p.x).min().unwrap_or(0);
        let min_y = placements.iter().map(|p| p.y).min().unwrap_or(0);
        let max_x = images
            .iter()
            .zip(placements)
            .map(|(img, p)| p.x + i64::from(img.width()))
            .max()
            .unwrap_or(0);
        let max_y = images
            .iter()
            .zip(placements)
            .map(|(img, p)| p.y + i64::from(img.height()))
            .max()
            .unwrap_or(0);

        let width = u32::try_from(max_x - min_x).unwrap_or(0);
        let height = u32::try_from(max_y - min_y).unwrap_or(0);
        let area = u64::from(width) * u64::from(height);
        if area == 0 || area > self.max_canvas_pixels {
            // A runaway canvas means the chained offsets are implausible.
            return Err(StitchStatus::HomographyEstimationFailed);
        }

        let origins: Vec<(u32, u32)> = placements
            .iter()
            .map(|p| ((p.x - min_x) as u32, (p.y - min_y) as u32))
            .collect();

        Ok(match mode {
            StitchMode::Panorama => blend_average(images, &origins, width, height),
            StitchMode::Scans => paint_over(images, &origins, width, height),
        })
    }
}

/// Downscale by `scale` and convert to luminance in [0, 1].
fn luminance_plane(img: &RgbImage, scale: f64) -> Array2<f32> {
    let scaled;
    let src = if scale < 1.0 {
        let w = ((f64::from(img.width()) * scale).round() as u32).max(1);
        let h = ((f64::from(img.height()) * scale).round() as u32).max(1);
        scaled = imageops::resize(img, w, h, FilterType::Triangle);
        &scaled
    } else {
        img
    };

    let (w, h) = src.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        let Rgb([r, g, b]) = *src.get_pixel(col as u32, row as u32);
        (LUMINANCE_R * f32::from(r) + LUMINANCE_G * f32::from(g) + LUMINANCE_B * f32::from(b))
            / 255.0
    })
}

/// Remove the mean, apply a Hann window and zero-pad to (pad_h, pad_w).
fn prepare_plane(plane: &Array2<f32>, pad_h: usize, pad_w: usize) -> Array2<Complex<f64>> {
    let (h, w) = plane.dim();
    let mean = plane.mean().map(f64::from).unwrap_or(0.0);
    let mut padded = Array2::<Complex<f64>>::zeros((pad_h, pad_w));
    for row in 0..h {
        let wy = 0.5 * (1.0 - (std::f64::consts::TAU * row as f64 / h as f64).cos());
        for col in 0..w {
            let wx = 0.5 * (1.0 - (std::f64::consts::TAU * col as f64 / w as f64).cos());
            let v = (f64::from(plane[[row, col]]) - mean) * wy * wx;
            padded[[row, col]] = Complex::new(v, 0.0);
        }
    }
    padded
}

/// 2D FFT: every row, then every column. The inverse is left unnormalized;
/// callers only compare values within one surface.
fn fft2d(
    data: Array2<Complex<f64>>,
    planner: &mut FftPlanner<f64>,
    direction: FftDirection,
) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let row_fft = planner.plan_fft(w, direction);
    let col_fft = planner.plan_fft(h, direction);

    // Rows are contiguous in standard layout; rustfft transforms each
    // `w`-sized chunk of the buffer.
    let mut rows = data.as_standard_layout().into_owned();
    if let Some(buffer) = rows.as_slice_mut() {
        row_fft.process(buffer);
    }

    let mut cols = rows.t().as_standard_layout().into_owned();
    if let Some(buffer) = cols.as_slice_mut() {
        col_fft.process(buffer);
    }

    cols.t().as_standard_layout().into_owned()
}

fn normalized_cross_power(
    ref_fft: &Array2<Complex<f64>>,
    tgt_fft: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    // T * conj(R) peaks at the displacement of the target within the reference.
    let mut result = tgt_fft * &ref_fft.mapv(|c| c.conj());
    result.mapv_inplace(|cross| {
        let mag = cross.norm();
        if mag > EPSILON {
            cross / mag
        } else {
            Complex::new(0.0, 0.0)
        }
    });
    result
}

fn find_peak(data: &Array2<f64>) -> (usize, usize, f64) {
    let mut best = (0, 0, f64::NEG_INFINITY);
    for ((row, col), &v) in data.indexed_iter() {
        if v > best.2 {
            best = (row, col, v);
        }
    }
    best
}

/// Turn pairwise working-plane offsets into absolute full-resolution placements.
fn chain_offsets(offsets: &[(f64, f64)], scale: f64) -> Vec<Placement> {
    let mut placements = Vec::with_capacity(offsets.len() + 1);
    let (mut x, mut y) = (0.0_f64, 0.0_f64);
    placements.push(Placement { x: 0, y: 0 });
    for &(dx, dy) in offsets {
        x += dx / scale;
        y += dy / scale;
        placements.push(Placement {
            x: x.round() as i64,
            y: y.round() as i64,
        });
    }
    placements
}

fn blend_average(images: &[&RgbImage], origins: &[(u32, u32)], width: u32, height: u32) -> RgbImage {
    let len = width as usize * height as usize;
    let mut sums = vec![[0u32; 3]; len];
    let mut counts = vec![0u32; len];

    for (img, &(ox, oy)) in images.iter().zip(origins) {
        for (x, y, Rgb(px)) in img.enumerate_pixels() {
            let idx = (oy + y) as usize * width as usize + (ox + x) as usize;
            for c in 0..3 {
                sums[idx][c] += u32::from(px[c]);
            }
            counts[idx] += 1;
        }
    }

    RgbImage::from_fn(width, height, |x, y| {
        let idx = y as usize * width as usize + x as usize;
        match counts[idx] {
            0 => Rgb([0, 0, 0]),
            n => {
                let s = sums[idx];
                Rgb([
                    ((s[0] + n / 2) / n) as u8,
                    ((s[1] + n / 2) / n) as u8,
                    ((s[2] + n / 2) / n) as u8,
                ])
            }
        }
    })
}

fn paint_over(images: &[&RgbImage], origins: &[(u32, u32)], width: u32, height: u32) -> RgbImage {
    let mut canvas = RgbImage::new(width, height);
    for (img, &(ox, oy)) in images.iter().zip(origins) {
        imageops::replace(&mut canvas, *img, i64::from(ox), i64::from(oy));
    }
    canvas
}
