//! Host platform capabilities.
//!
//! Everything the interceptor needs from the surrounding platform sits
//! behind [`HostPlatform`]: materializing icon references, reading content
//! URIs, looking up application labels and cancelling notifications.
//! [`LocalHost`] is a filesystem-backed implementation used by the driver
//! binary and integration tests.

use crate::config::HostConfig;
use crate::types::{DecodedImage, IconRef};
use image::RgbaImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use url::Url;

/// Errors reported by the host platform
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid path component: {0:?}")]
    InvalidPath(String),

    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can paint itself onto a canvas (vector drawables,
/// shape drawables, adaptive icons, ...).
pub trait Paint {
    /// Natural width in pixels; non-positive when the drawable has none
    fn intrinsic_width(&self) -> i32;

    /// Natural height in pixels; non-positive when the drawable has none
    fn intrinsic_height(&self) -> i32;

    /// Draw onto the whole canvas
    fn draw(&self, canvas: &mut RgbaImage);
}

/// A materialized icon
pub enum Drawable {
    /// Drawable that already wraps a pixel buffer
    Bitmap(DecodedImage),
    /// Drawable that must be rasterized
    Painted(Box<dyn Paint>),
}

impl std::fmt::Debug for Drawable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Drawable::Bitmap(image) => {
                write!(f, "Drawable::Bitmap({}x{})", image.width(), image.height())
            }
            Drawable::Painted(paint) => write!(
                f,
                "Drawable::Painted({}x{})",
                paint.intrinsic_width(),
                paint.intrinsic_height()
            ),
        }
    }
}

/// Capabilities provided by the platform hosting the listener
pub trait HostPlatform {
    /// Materialize an icon reference. `Ok(None)` when the host has nothing
    /// to show for it.
    fn load_drawable(&self, icon: &IconRef) -> Result<Option<Drawable>, HostError>;

    /// Read the bytes behind a `content:` URI
    fn open_content(&self, uri: &Url) -> Result<Vec<u8>, HostError>;

    /// Human readable label of an installed application
    fn app_label(&self, package: &str) -> Option<String>;

    /// Cancel a posted notification by key. `Ok(false)` when the host no
    /// longer knows about it.
    fn cancel_notification(&self, key: &str) -> Result<bool, HostError>;
}

/// Filesystem-backed host
pub struct LocalHost {
    /// Root for resource icons: `<root>/<package>/<name>.png`
    resources_dir: Option<PathBuf>,
    /// Root for content URIs: `<root>/<authority>/<path>`
    content_root: Option<PathBuf>,
    /// Package id -> display label
    app_labels: HashMap<String, String>,
}

impl LocalHost {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            resources_dir: config.resources_dir.as_ref().map(PathBuf::from),
            content_root: config.content_root.as_ref().map(PathBuf::from),
            app_labels: config.app_labels.clone(),
        }
    }

    fn resource_path(&self, package: &str, name: &str) -> Result<PathBuf, HostError> {
        let root = self.resources_dir.as_ref().ok_or_else(|| {
            HostError::Unsupported("no resources directory configured".to_string())
        })?;
        Ok(root
            .join(path_component(package)?)
            .join(format!("{}.png", path_component(name)?)))
    }

    fn content_path(&self, uri: &Url) -> Result<PathBuf, HostError> {
        let root = self.content_root.as_ref().ok_or_else(|| {
            HostError::Unsupported("no content root configured".to_string())
        })?;
        let authority = uri
            .host_str()
            .ok_or_else(|| HostError::NotFound(format!("content URI without authority: {}", uri)))?;
        let mut path = root.join(path_component(authority)?);
        for segment in uri.path().split('/').filter(|s| !s.is_empty()) {
            path.push(path_component(segment)?);
        }
        Ok(path)
    }

    fn read_existing(path: &Path) -> Result<Vec<u8>, HostError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HostError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// A single name that stays inside the directory it is joined onto
fn path_component(value: &str) -> Result<&str, HostError> {
    let escapes = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if escapes {
        return Err(HostError::InvalidPath(value.to_string()));
    }
    Ok(value)
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new(&HostConfig::default())
    }
}

impl HostPlatform for LocalHost {
    fn load_drawable(&self, icon: &IconRef) -> Result<Option<Drawable>, HostError> {
        match icon {
            IconRef::Bitmap(image) => Ok(Some(Drawable::Bitmap(image.clone()))),
            IconRef::Data(bytes) => {
                let image = image::load_from_memory(bytes)?;
                Ok(Some(Drawable::Bitmap(image)))
            }
            IconRef::Resource { package, name } => {
                let path = self.resource_path(package, name)?;
                trace!("Loading resource icon from {}", path.display());
                let bytes = Self::read_existing(&path)?;
                Ok(Some(Drawable::Bitmap(image::load_from_memory(&bytes)?)))
            }
            IconRef::Uri(raw) => {
                let uri = Url::parse(raw)
                    .map_err(|e| HostError::NotFound(format!("{}: {}", raw, e)))?;
                let bytes = match uri.scheme() {
                    "content" => self.open_content(&uri)?,
                    "file" => {
                        let path = uri.to_file_path().map_err(|_| {
                            HostError::NotFound(format!("not a local file URI: {}", raw))
                        })?;
                        Self::read_existing(&path)?
                    }
                    other => {
                        return Err(HostError::Unsupported(format!(
                            "icon URI scheme '{}'",
                            other
                        )))
                    }
                };
                Ok(Some(Drawable::Bitmap(image::load_from_memory(&bytes)?)))
            }
        }
    }

    fn open_content(&self, uri: &Url) -> Result<Vec<u8>, HostError> {
        let path = self.content_path(uri)?;
        debug!("Resolving {} via {}", uri, path.display());
        Self::read_existing(&path)
    }

    fn app_label(&self, package: &str) -> Option<String> {
        self.app_labels.get(package).cloned()
    }

    fn cancel_notification(&self, key: &str) -> Result<bool, HostError> {
        // Nothing is displayed locally; cancelling only has to be acknowledged.
        debug!("Cancel requested for notification {}", key);
        Ok(true)
    }
}
