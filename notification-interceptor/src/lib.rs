//! Notification Interceptor - image extraction for posted notifications
//!
//! This crate listens to notifications handed over by a host platform and
//! turns each one into a flat event for automation rules. When a
//! notification carries an image, it is located through an ordered fallback
//! chain and written to a temp JPEG whose path travels with the event:
//!
//! - **Large icon**: the primary large icon slot
//! - **Expanded large icon**: the slot shown for expanded notifications
//! - **Big picture**: the big-picture style image
//! - **Other raster keys**: well-known extras used by media and push apps
//! - **URI keys**: `content:` and `file:` URIs pointing at artwork
//!
//! # Architecture
//!
//! Platform access (drawables, content URIs, app labels, cancellation) sits
//! behind [`HostPlatform`]. The [`NotificationInterceptor`] filters apps,
//! runs the [`ImageLocator`], persists the result through
//! [`TempImageStore`] and hands the event to an [`EventDispatcher`].

pub mod cancel;
pub mod config;
pub mod dispatcher;
pub mod filter;
pub mod host;
pub mod interceptor;
pub mod locator;
pub mod payload;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use cancel::{CancelOutcome, NotificationCanceller};
pub use config::Config;
pub use dispatcher::{ChannelDispatcher, DispatchError, EventDispatcher, JsonLinesDispatcher};
pub use filter::AppFilter;
pub use host::{Drawable, HostError, HostPlatform, LocalHost, Paint};
pub use interceptor::NotificationInterceptor;
pub use locator::{has_image, ImageLocator, Strategy};
pub use payload::{ListenerMessage, NotificationPayload, PayloadError};
pub use storage::{CleanupSummary, DirectoryInfo, StoredImageFile, TempImageStore};
pub use types::{
    DecodedImage, ExtraValue, Extras, ExtractionError, IconRef, InterceptedNotification,
    NotificationRecord,
};
