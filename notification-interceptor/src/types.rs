//! Core types used throughout the notification interceptor.
//!
//! This module defines the typed extras bundle carried by a notification,
//! the notification record handed over by the host, and the flat event
//! tuple published downstream.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An in-memory raster decoded from a notification
pub type DecodedImage = DynamicImage;

/// Indirect handle to a drawable that must be materialized by the host
#[derive(Debug, Clone)]
pub enum IconRef {
    /// Icon already wrapping a raster
    Bitmap(DecodedImage),
    /// Drawable resource owned by an installed package
    Resource { package: String, name: String },
    /// Encoded image bytes (PNG, JPEG, ...)
    Data(Vec<u8>),
    /// Icon backed by a content/file URI
    Uri(String),
}

/// A single value in a notification's extras bundle
#[derive(Debug, Clone)]
pub enum ExtraValue {
    Raster(DecodedImage),
    Icon(IconRef),
    Text(String),
    Uri(String),
    /// Anything the interceptor does not understand (ints, nested bundles, ...)
    Other,
}

impl ExtraValue {
    /// Whether this value can yield an image without URI resolution
    pub fn is_image_bearing(&self) -> bool {
        matches!(self, ExtraValue::Raster(_) | ExtraValue::Icon(_))
    }
}

/// Typed view over a notification's extras bundle.
///
/// Lookups by key return `None` for absent keys and for values of a
/// different kind, so callers never have to guard individual accesses.
#[derive(Debug, Clone, Default)]
pub struct Extras {
    values: HashMap<String, ExtraValue>,
}

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ExtraValue) {
        self.values.insert(key.into(), value);
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: ExtraValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ExtraValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn raster(&self, key: &str) -> Option<&DecodedImage> {
        match self.values.get(key) {
            Some(ExtraValue::Raster(image)) => Some(image),
            _ => None,
        }
    }

    pub fn icon(&self, key: &str) -> Option<&IconRef> {
        match self.values.get(key) {
            Some(ExtraValue::Icon(icon)) => Some(icon),
            _ => None,
        }
    }

    /// String value stored either as plain text or as a URI
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ExtraValue::Text(s)) | Some(ExtraValue::Uri(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A notification as delivered by the host's notification subsystem
#[derive(Debug, Clone, Default)]
pub struct NotificationRecord {
    /// Host-assigned key, used for cancellation
    pub key: String,
    /// Reverse-DNS package id of the posting application
    pub package: String,
    pub title: String,
    pub text: String,
    pub extras: Extras,
    /// Primary large icon slot
    pub large_icon: Option<ExtraValue>,
    /// Expanded large icon slot (shown when the notification is expanded)
    pub expanded_icon: Option<ExtraValue>,
}

impl NotificationRecord {
    pub fn new(key: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            package: package.into(),
            ..Default::default()
        }
    }
}

/// Event tuple handed to the dispatcher for every intercepted notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptedNotification {
    #[serde(rename = "notification_title")]
    pub title: String,
    #[serde(rename = "notification_text")]
    pub text: String,
    /// Absolute path of the stored image, empty when none was attached
    pub image_path: String,
    pub app_package: String,
    pub app_name: String,
    pub notification_key: String,
}

impl InterceptedNotification {
    pub fn has_image(&self) -> bool {
        !self.image_path.is_empty()
    }
}

/// Errors raised by a single extraction strategy.
///
/// These never escape the locator: a failing strategy simply contributes
/// nothing to the search.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Host error: {0}")]
    Host(#[from] crate::host::HostError),

    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
