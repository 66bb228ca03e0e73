use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ImageLoadError, Result};
use crate::frame::{ImageCandidate, ImageFormatTag, SkipReason, SkippedFile};
use crate::security::{
    validate_file_count, validate_file_size, validate_input_dir, validate_path_security,
    SecurityLimits,
};

use super::ensure_enough_images;

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannedEntry {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub is_file: bool,
    /// Absolute path with symlinks resolved.
    pub resolved: PathBuf,
}

/// Lists the entries of a directory. The gate only ever sees the listing,
/// never the file contents.
pub trait DirectoryScanner: Send + Sync {
    fn scan(&self, dir: &Path) -> std::io::Result<Vec<ScannedEntry>>;
}

/// `std::fs` backed scanner. Entries that cannot be resolved (dangling
/// symlinks, races with deletion) are left out of the listing.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsScanner;

impl DirectoryScanner for FsScanner {
    fn scan(&self, dir: &Path) -> std::io::Result<Vec<ScannedEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let (meta, resolved) = match (std::fs::metadata(&path), path.canonicalize()) {
                (Ok(meta), Ok(resolved)) => (meta, resolved),
                (Err(e), _) | (_, Err(e)) => {
                    debug!(path = %path.display(), error = %e, "Skipping unresolvable entry");
                    continue;
                }
            };
            entries.push(ScannedEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
                is_file: meta.is_file(),
                resolved,
                path,
            });
        }
        Ok(entries)
    }
}

/// Output of the validation gate.
#[derive(Clone, Debug)]
pub struct GateReport {
    /// Canonical input directory.
    pub base: PathBuf,
    /// Accepted candidates in lexical filename order.
    pub candidates: Vec<ImageCandidate>,
    /// Candidates dropped by the per-file size check.
    pub skipped: Vec<SkippedFile>,
    /// Number of supported files found before per-file checks.
    pub discovered: usize,
}

impl GateReport {
    pub fn total_bytes(&self) -> u64 {
        self.candidates.iter().map(|c| c.size_bytes).sum()
    }
}

/// Run the validation gate over `dir` with the filesystem scanner.
pub fn scan_directory(dir: &Path, limits: &SecurityLimits, strict: bool) -> Result<GateReport> {
    scan_candidates(dir, limits, strict, &FsScanner)
}

/// Run the validation gate over `dir`.
///
/// Order of checks: extension filter, count limit, path containment, per-file
/// size. The count limit is enforced from the listing alone, before any
/// candidate is inspected further.
pub fn scan_candidates(
    dir: &Path,
    limits: &SecurityLimits,
    strict: bool,
    scanner: &dyn DirectoryScanner,
) -> Result<GateReport> {
    let base = validate_input_dir(dir)?;

    let listing = scanner.scan(&base).map_err(|source| ImageLoadError::Io {
        path: base.clone(),
        source,
    })?;

    let mut supported: Vec<(ScannedEntry, ImageFormatTag)> = listing
        .into_iter()
        .filter(|e| e.is_file)
        .filter_map(|e| ImageFormatTag::from_path(Path::new(&e.name)).map(|tag| (e, tag)))
        .collect();
    supported.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));

    let discovered = supported.len();
    validate_file_count(discovered, limits)?;
    info!(count = discovered, dir = %base.display(), "Found candidate images");

    for (entry, _) in &supported {
        validate_path_security(&entry.path, &entry.resolved, &base)?;
    }

    let mut candidates = Vec::with_capacity(discovered);
    let mut skipped = Vec::new();
    for (entry, format) in supported {
        if let Err(err) = validate_file_size(&entry.path, entry.size, limits) {
            if strict {
                return Err(err.into());
            }
            warn!("Skipping {}", err);
            skipped.push(SkippedFile {
                path: entry.path,
                reason: SkipReason::FileTooLarge {
                    size: entry.size,
                    limit: limits.max_file_size_bytes,
                },
            });
            continue;
        }
        candidates.push(ImageCandidate {
            path: entry.path,
            resolved: entry.resolved,
            format,
            size_bytes: entry.size,
        });
    }

    ensure_enough_images(candidates.len(), discovered)?;

    Ok(GateReport {
        base,
        candidates,
        skipped,
        discovered,
    })
}
