use std::fmt;
use std::fs;
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::RgbImage;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::consts::{DEFAULT_JPEG_QUALITY, DEFAULT_PNG_LEVEL};
use crate::error::OutputError;

/// Output encodings, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Tiff,
    /// Self-contained HTML page with the mosaic inlined as a PNG data URL.
    Html,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, OutputError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "tif" | "tiff" => Ok(Self::Tiff),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(OutputError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "JPEG"),
            Self::Png => write!(f, "PNG"),
            Self::Tiff => write!(f, "TIFF"),
            Self::Html => write!(f, "HTML"),
        }
    }
}

/// Encoder settings for [`save_image`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputSettings {
    /// 1-100.
    pub jpeg_quality: u8,
    /// 0-9, mapped onto the PNG encoder's compression presets.
    pub png_level: u8,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            png_level: DEFAULT_PNG_LEVEL,
        }
    }
}

fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Writer handed to [`write_atomic`] callbacks.
pub type AtomicWriter<'a> = BufWriter<&'a mut NamedTempFile>;

/// Write a file through a temporary sibling, renamed over `path` only once
/// `write` has succeeded. On failure the temporary is removed and any
/// existing file at `path` is left untouched.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), OutputError>
where
    F: FnOnce(&mut AtomicWriter<'_>) -> Result<(), OutputError>,
{
    let write_err = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".autoflight-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(write_err)?;

    {
        let mut writer = BufWriter::new(&mut tmp);
        write(&mut writer)?;
        writer.flush().map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Encode `image` to `path` in the format named by its extension.
///
/// Missing parent directories are created. The format is resolved before
/// anything touches the filesystem.
pub fn save_image(image: &RgbImage, path: &Path, settings: &OutputSettings) -> Result<(), OutputError> {
    let format = OutputFormat::from_path(path)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(OutputError::EmptyImage);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let encode_err = |source| OutputError::Encode {
        path: path.to_path_buf(),
        source,
    };
    debug!(path = %path.display(), %format, "Encoding output");

    match format {
        OutputFormat::Jpeg => write_atomic(path, |w| {
            image
                .write_with_encoder(JpegEncoder::new_with_quality(w, settings.jpeg_quality))
                .map_err(encode_err)
        })?,
        OutputFormat::Png => write_atomic(path, |w| {
            let encoder = PngEncoder::new_with_quality(
                w,
                png_compression(settings.png_level),
                FilterType::Adaptive,
            );
            image.write_with_encoder(encoder).map_err(encode_err)
        })?,
        OutputFormat::Tiff => write_atomic(path, |w| {
            image
                .write_with_encoder(TiffEncoder::new(w))
                .map_err(encode_err)
        })?,
        OutputFormat::Html => write_html(image, path, settings)?,
    }

    let (width, height) = image.dimensions();
    info!(path = %path.display(), %format, width, height, "Saved orthomosaic");
    Ok(())
}

/// Write a self-contained HTML page showing `image`, regardless of the
/// extension of `path`.
pub fn save_html(image: &RgbImage, path: &Path, settings: &OutputSettings) -> Result<(), OutputError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(OutputError::EmptyImage);
    }
    write_html(image, path, settings)?;
    info!(path = %path.display(), "Saved HTML page");
    Ok(())
}

fn write_html(image: &RgbImage, path: &Path, settings: &OutputSettings) -> Result<(), OutputError> {
    let page = render_html(image, path, settings)?;
    write_atomic(path, |w| {
        w.write_all(page.as_bytes()).map_err(|source| OutputError::Write {
            path: path.to_path_buf(),
            source,
        })
    })
}

fn render_html(image: &RgbImage, path: &Path, settings: &OutputSettings) -> Result<String, OutputError> {
    let mut png = Cursor::new(Vec::new());
    let encoder = PngEncoder::new_with_quality(
        &mut png,
        png_compression(settings.png_level),
        FilterType::Adaptive,
    );
    image
        .write_with_encoder(encoder)
        .map_err(|source| OutputError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    let data = base64::engine::general_purpose::STANDARD.encode(png.into_inner());

    let (width, height) = image.dimensions();
    let created = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Orthomosaic</title>
<style>
body {{ margin: 0; background: #1e1e1e; color: #ddd; font-family: sans-serif; }}
header {{ padding: 12px 16px; }}
img {{ display: block; max-width: 100%; height: auto; margin: 0 auto; }}
</style>
</head>
<body>
<header>
<h1>Orthomosaic</h1>
<p>{width} x {height} pixels, generated {created}</p>
</header>
<img src="data:image/png;base64,{data}" alt="Orthomosaic">
</body>
</html>
"#
    ))
}
