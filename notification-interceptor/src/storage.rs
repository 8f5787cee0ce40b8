//! Temporary image store for extracted notification images.
//!
//! Images are written as JPEG files into a dedicated cache subdirectory and
//! removed again by age-based or full sweeps. Every operation here is
//! non-fatal: failures are logged and surface as `None` or as counts in a
//! [`CleanupSummary`].

use crate::config::StorageConfig;
use crate::types::DecodedImage;
use chrono::{Local, NaiveDateTime};
use image::codecs::jpeg::JpegEncoder;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Default free-space threshold for [`TempImageStore::has_enough_space`]
pub const DEFAULT_REQUIRED_SPACE: u64 = 10 * 1024 * 1024;

const FILE_EXTENSION: &str = "jpg";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";
/// Suffixes tried when a file name is already taken within the same millisecond
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Encode error: {0}")]
    Encode(#[from] image::ImageError),
}

/// An image persisted by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImageFile {
    pub path: PathBuf,
    /// Sanitized owner app id as embedded in the file name
    pub owner: String,
    pub created_at: NaiveDateTime,
    pub size_bytes: u64,
}

/// Outcome of a cleanup sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSummary {
    pub deleted: usize,
    pub freed_bytes: u64,
    pub failed: usize,
}

/// Snapshot of the store directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryInfo {
    pub exists: bool,
    pub file_count: usize,
    pub total_bytes: u64,
}

impl fmt::Display for DirectoryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.exists {
            write!(f, "Temp directory doesn't exist")
        } else if self.file_count == 0 {
            write!(f, "Temp directory is empty")
        } else {
            write!(
                f,
                "Temp directory: {} files, {}",
                self.file_count,
                format_file_size(self.total_bytes)
            )
        }
    }
}

/// Owner ids are reverse-DNS package names; dots become underscores so the
/// file name has a single extension.
pub fn sanitize_owner(owner: &str) -> String {
    owner
        .chars()
        .map(|c| match c {
            '.' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// File name stem `<prefix>_<owner>_<yyyyMMdd_HHmmss_SSS>`
pub fn image_file_stem(prefix: &str, owner: &str, timestamp: &NaiveDateTime) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        sanitize_owner(owner),
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// Human readable byte count (integer units)
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b < KB => format!("{} B", b),
        b if b < MB => format!("{} KB", b / KB),
        b if b < GB => format!("{} MB", b / MB),
        b => format!("{} GB", b / GB),
    }
}

/// Directory of extracted notification images
pub struct TempImageStore {
    directory: PathBuf,
    file_prefix: String,
    jpeg_quality: u8,
    max_age: Duration,
}

impl TempImageStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            directory: absolutize(config.cache_root().join(&config.directory_name)),
            file_prefix: config.file_prefix.clone(),
            jpeg_quality: config.jpeg_quality.clamp(1, 100),
            max_age: Duration::from_secs(config.max_age_hours.saturating_mul(60 * 60)),
        }
    }

    /// Store rooted at an explicit directory, other settings at defaults
    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        let defaults = StorageConfig::default();
        Self {
            directory: absolutize(directory.into()),
            ..Self::new(&defaults)
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the directory if it is missing (also after it was removed)
    fn ensure_directory(&self) -> io::Result<()> {
        if !self.directory.is_dir() {
            fs::create_dir_all(&self.directory)?;
            debug!("Created temp directory: {}", self.directory.display());
        }
        Ok(())
    }

    /// Encode `image` as JPEG into a new file owned by `owner`.
    ///
    /// Returns `None` (after logging) when the directory cannot be created,
    /// the file cannot be written or the encoder fails.
    pub fn save_image_to_temp(&self, image: &DecodedImage, owner: &str) -> Option<StoredImageFile> {
        match self.write_image(image, owner, Local::now().naive_local()) {
            Ok(stored) => {
                debug!(
                    "Image saved successfully to: {} ({} bytes)",
                    stored.path.display(),
                    stored.size_bytes
                );
                Some(stored)
            }
            Err(e) => {
                error!("Error saving image to temp file: {}", e);
                None
            }
        }
    }

    fn write_image(
        &self,
        image: &DecodedImage,
        owner: &str,
        now: NaiveDateTime,
    ) -> Result<StoredImageFile, StorageError> {
        self.ensure_directory()?;

        let (path, file) = self.create_unique_file(owner, &now)?;
        let size_bytes = match encode_jpeg(image, file, self.jpeg_quality) {
            Ok(size) => size,
            Err(e) => {
                // Never leave a half-written image behind
                if let Err(remove_err) = fs::remove_file(&path) {
                    warn!("Failed to remove partial file {}: {}", path.display(), remove_err);
                }
                return Err(e);
            }
        };

        Ok(StoredImageFile {
            path,
            owner: sanitize_owner(owner),
            created_at: now,
            size_bytes,
        })
    }

    /// Open a fresh file, appending `_<n>` when the timestamped name is taken
    fn create_unique_file(&self, owner: &str, now: &NaiveDateTime) -> io::Result<(PathBuf, File)> {
        let stem = image_file_stem(&self.file_prefix, owner, now);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{}.{}", stem, FILE_EXTENSION)
            } else {
                format!("{}_{}.{}", stem, attempt, FILE_EXTENSION)
            };
            let path = self.directory.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free file name for {}", stem),
        ))
    }

    /// Delete files older than the configured maximum age
    pub fn cleanup_old_files(&self) -> CleanupSummary {
        let cutoff = SystemTime::now().checked_sub(self.max_age);
        self.sweep("Cleanup", false, |modified| match (cutoff, modified) {
            (Some(cutoff), Some(modified)) => modified < cutoff,
            _ => false,
        })
    }

    /// Delete every file regardless of age
    pub fn cleanup_all_files(&self) -> CleanupSummary {
        self.sweep("Force cleanup", true, |_| true)
    }

    fn sweep(
        &self,
        label: &str,
        always_report: bool,
        should_delete: impl Fn(Option<SystemTime>) -> bool,
    ) -> CleanupSummary {
        let mut summary = CleanupSummary::default();

        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Temp directory doesn't exist, nothing to clean up");
                return summary;
            }
            Err(e) => {
                warn!("Cannot read temp directory {}: {}", self.directory.display(), e);
                return summary;
            }
        };

        let mut files_seen = 0usize;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error listing temp directory: {}", e);
                    continue;
                }
            };

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("{} vanished during cleanup: {}", entry.path().display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            files_seen += 1;

            if !should_delete(metadata.modified().ok()) {
                continue;
            }

            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => {
                    summary.deleted += 1;
                    summary.freed_bytes += metadata.len();
                    debug!("Deleted file: {}", path.display());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("{} already removed", path.display());
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("Failed to delete file {}: {}", path.display(), e);
                }
            }
        }

        if files_seen == 0 {
            debug!("No files to clean up");
        } else if summary.deleted > 0 || always_report {
            info!(
                "{} completed: deleted {} files, freed {}",
                label,
                summary.deleted,
                format_file_size(summary.freed_bytes)
            );
        } else {
            debug!("No old files to clean up");
        }

        summary
    }

    /// Whether the store's filesystem has more than `required_bytes` usable.
    /// Any error answers `false`.
    pub fn has_enough_space(&self, required_bytes: u64) -> bool {
        match self
            .ensure_directory()
            .and_then(|_| available_space(&self.directory))
        {
            Ok(available) => available > required_bytes,
            Err(e) => {
                error!("Error checking available space: {}", e);
                false
            }
        }
    }

    /// File count and total size of the store directory
    pub fn directory_info(&self) -> DirectoryInfo {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(_) => {
                return DirectoryInfo {
                    exists: false,
                    file_count: 0,
                    total_bytes: 0,
                }
            }
        };

        let (file_count, total_bytes) = entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.metadata().ok())
            .filter(|metadata| metadata.is_file())
            .fold((0usize, 0u64), |(count, total), metadata| {
                (count + 1, total + metadata.len())
            });

        DirectoryInfo {
            exists: true,
            file_count,
            total_bytes,
        }
    }
}

/// Paths handed downstream must be absolute
fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(e) => {
            warn!("Cannot resolve {} against working directory: {}", path.display(), e);
            path
        }
    }
}

/// Write `image` as JPEG and return the number of bytes on disk
fn encode_jpeg(image: &DecodedImage, file: File, quality: u8) -> Result<u64, StorageError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(StorageError::Encode(image::ImageError::Parameter(
            image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            ),
        )));
    }

    // JPEG has no alpha channel
    let rgb = image.to_rgb8();

    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality).encode_image(&rgb)?;
    writer.flush()?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(file.metadata()?.len())
}

#[cfg(unix)]
fn available_space(path: &Path) -> io::Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64))
}

#[cfg(not(unix))]
fn available_space(_path: &Path) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "free space query not supported on this platform",
    ))
}
