/// Default maximum on-disk size of a single input file (500 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 500_000_000;

/// Default maximum decoded pixel count of a single image (100 megapixels).
pub const DEFAULT_MAX_IMAGE_PIXELS: u64 = 100_000_000;

/// Default maximum number of candidate files per run.
pub const DEFAULT_MAX_FILES: usize = 1000;

/// Recognized input extensions, lowercase.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tif", "tiff"];

/// Default JPEG output quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Default PNG compression level.
pub const DEFAULT_PNG_LEVEL: u8 = 3;

/// Upper bound on the default intake worker count. Explicit settings may exceed it.
pub const MAX_DEFAULT_WORKERS: usize = 8;

pub const ENV_PARALLEL: &str = "AUTOFLIGHT_PARALLEL";
pub const ENV_MAX_WORKERS: &str = "AUTOFLIGHT_MAX_WORKERS";
pub const ENV_JPEG_QUALITY: &str = "AUTOFLIGHT_JPEG_QUALITY";
pub const ENV_PNG_COMPRESSION: &str = "AUTOFLIGHT_PNG_COMPRESSION";
pub const ENV_MODE: &str = "AUTOFLIGHT_MODE";
pub const ENV_VERBOSE: &str = "AUTOFLIGHT_VERBOSE";

/// Longest side (in pixels) of the luminance plane used for offset estimation.
/// Larger inputs are downscaled before phase correlation.
pub const ALIGN_MAX_SIDE: u32 = 512;

/// Minimum ratio of the correlation peak to the RMS of the correlation surface
/// for a pairwise offset to be trusted. Noise peaks on the padded 1024x1024
/// surface sit around 5.
pub const MIN_PEAK_TO_RMS: f64 = 8.0;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-12;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;
