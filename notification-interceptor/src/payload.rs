//! JSON wire format for notifications fed to the driver binary.
//!
//! Each input line is a [`ListenerMessage`]. Raster extras reference image
//! files on disk; they are decoded while the record is built, the way the
//! host would unmarshal a parcel. A raster that cannot be read is logged
//! and kept as an opaque value so the rest of the notification survives.

use crate::types::{ExtraValue, Extras, IconRef, NotificationRecord};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

/// One line of listener input
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerMessage {
    Posted(NotificationPayload),
    Removed { key: String },
    Cancel {
        #[serde(default)]
        key: Option<String>,
    },
}

impl ListenerMessage {
    pub fn parse(line: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// A posted notification
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPayload {
    pub key: String,
    pub package: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub extras: HashMap<String, ExtraField>,
    #[serde(default)]
    pub large_icon: Option<ExtraField>,
    #[serde(default)]
    pub expanded_icon: Option<ExtraField>,
}

/// An extras value: a bare string is text, anything else is typed
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExtraField {
    Text(String),
    Typed(ExtraPayload),
    /// Numbers, booleans, nested objects without a known tag
    Unknown(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtraPayload {
    /// Raster stored in an image file
    Raster { path: PathBuf },
    /// Icon wrapping a raster stored in an image file
    IconBitmap { path: PathBuf },
    /// Icon naming a drawable resource of a package
    IconResource { package: String, name: String },
    /// Icon holding encoded image bytes read from a file
    IconData { path: PathBuf },
    /// Icon backed by a URI
    IconUri { uri: String },
    Text { value: String },
    Uri { value: String },
    #[serde(other)]
    Other,
}

impl From<NotificationPayload> for NotificationRecord {
    fn from(payload: NotificationPayload) -> Self {
        let mut extras = Extras::new();
        for (key, field) in payload.extras {
            extras.insert(key, field.into_value());
        }

        NotificationRecord {
            key: payload.key,
            package: payload.package,
            title: payload.title,
            text: payload.text,
            extras,
            large_icon: payload.large_icon.map(ExtraField::into_value),
            expanded_icon: payload.expanded_icon.map(ExtraField::into_value),
        }
    }
}

impl ExtraField {
    fn into_value(self) -> ExtraValue {
        match self {
            ExtraField::Text(value) => ExtraValue::Text(value),
            ExtraField::Typed(typed) => typed.into_value(),
            ExtraField::Unknown(_) => ExtraValue::Other,
        }
    }
}

impl ExtraPayload {
    fn into_value(self) -> ExtraValue {
        match self {
            ExtraPayload::Raster { path } => match open_raster(&path) {
                Some(image) => ExtraValue::Raster(image),
                None => ExtraValue::Other,
            },
            ExtraPayload::IconBitmap { path } => match open_raster(&path) {
                Some(image) => ExtraValue::Icon(IconRef::Bitmap(image)),
                None => ExtraValue::Other,
            },
            ExtraPayload::IconResource { package, name } => {
                ExtraValue::Icon(IconRef::Resource { package, name })
            }
            ExtraPayload::IconData { path } => match std::fs::read(&path) {
                Ok(bytes) => ExtraValue::Icon(IconRef::Data(bytes)),
                Err(e) => {
                    warn!("Failed to read icon data {}: {}", path.display(), e);
                    ExtraValue::Other
                }
            },
            ExtraPayload::IconUri { uri } => ExtraValue::Icon(IconRef::Uri(uri)),
            ExtraPayload::Text { value } => ExtraValue::Text(value),
            ExtraPayload::Uri { value } => ExtraValue::Uri(value),
            ExtraPayload::Other => ExtraValue::Other,
        }
    }
}

fn open_raster(path: &Path) -> Option<crate::types::DecodedImage> {
    match image::open(path) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!("Failed to load raster {}: {}", path.display(), e);
            None
        }
    }
}
