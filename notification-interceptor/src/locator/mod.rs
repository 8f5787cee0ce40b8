//! Image locator for notification records.
//!
//! A notification can carry its image in several places depending on the
//! posting app and the platform version. The locator walks an explicit,
//! ordered list of [`Strategy`] values and returns the first image found:
//!
//! 1. Large icon slot
//! 2. Expanded large icon
//! 3. Big picture style payload
//! 4. Other well-known raster keys
//! 5. URI-valued keys (`content:` and `file:` only)
//!
//! A strategy that fails is logged and skipped; it never aborts the search.

pub mod icon;
pub mod strategies;
pub mod uri;

use crate::config::ExtractionConfig;
use crate::host::HostPlatform;
use crate::types::{DecodedImage, ExtractionError, ExtraValue, NotificationRecord};
use tracing::{debug, trace, warn};

/// Well-known extras keys
pub mod keys {
    pub const TITLE: &str = "android.title";
    pub const TEXT: &str = "android.text";
    pub const TEMPLATE: &str = "android.template";

    pub const LARGE_ICON_BIG: &str = "android.largeIcon.big";
    pub const PICTURE: &str = "android.picture";
    pub const PICTURE_ICON: &str = "android.pictureIcon";

    /// Vendor/aggregator raster fields, highest priority first
    pub const OTHER_RASTER_KEYS: &[&str] = &[
        "android.rebuild.largeIcon",
        "android.icon",
        "android.bigLargeIcon",
        "android.media.metadata.ART",
        "fcm_image",
        "image_url",
        "large_icon_url",
    ];

    /// URI-valued fields, highest priority first
    pub const URI_KEYS: &[&str] = &[
        "android.media.metadata.ALBUM_ART_URI",
        "image_url",
        "large_icon_url",
        "fcm_image_url",
    ];

    /// Substring of `android.template` identifying big-picture notifications
    pub const BIG_PICTURE_TEMPLATE: &str = "bigpicture";
}

/// Signature shared by every extraction strategy
pub type StrategyFn =
    fn(&dyn HostPlatform, &NotificationRecord) -> Result<Option<DecodedImage>, ExtractionError>;

/// A named step in the fallback chain
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub extract: StrategyFn,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// Build the ordered strategy list for a configuration
pub fn default_strategies(config: &ExtractionConfig) -> Vec<Strategy> {
    let mut list = vec![
        Strategy {
            name: "large_icon",
            extract: strategies::large_icon,
        },
        Strategy {
            name: "expanded_large_icon",
            extract: strategies::expanded_large_icon,
        },
        Strategy {
            name: "big_picture",
            extract: strategies::big_picture,
        },
        Strategy {
            name: "other_raster_keys",
            extract: strategies::other_raster_keys,
        },
    ];

    if config.resolve_uris {
        list.push(Strategy {
            name: "uri_keys",
            extract: strategies::uri_keys,
        });
    }

    list
}

/// Locates images inside notification records
pub struct ImageLocator<H> {
    host: H,
    strategies: Vec<Strategy>,
    /// Whether URI-valued keys count as image-bearing
    resolve_uris: bool,
}

impl<H: HostPlatform> ImageLocator<H> {
    pub fn new(host: H, config: &ExtractionConfig) -> Self {
        Self {
            host,
            strategies: default_strategies(config),
            resolve_uris: config.resolve_uris,
        }
    }

    /// Create with a custom strategy chain
    pub fn with_strategies(host: H, strategies: Vec<Strategy>) -> Self {
        let resolve_uris = strategies.iter().any(|s| s.name == "uri_keys");
        Self {
            host,
            strategies,
            resolve_uris,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Return the first image any strategy yields, or `None`
    pub fn locate(&self, record: &NotificationRecord) -> Option<DecodedImage> {
        for strategy in &self.strategies {
            match (strategy.extract)(&self.host, record) {
                Ok(Some(image)) => {
                    debug!(
                        "Found {}x{} image in notification {} via {}",
                        image.width(),
                        image.height(),
                        record.key,
                        strategy.name
                    );
                    return Some(image);
                }
                Ok(None) => trace!("Strategy {} found nothing", strategy.name),
                Err(e) => warn!(
                    "Strategy {} failed for notification {}: {}",
                    strategy.name, record.key, e
                ),
            }
        }

        debug!("No image found in notification {}", record.key);
        None
    }

    /// Cheap existence check: presence tests only, no host calls, no decoding
    pub fn has_image(&self, record: &NotificationRecord) -> bool {
        has_image(record, self.resolve_uris)
    }
}

/// Presence check backing [`ImageLocator::has_image`]
pub fn has_image(record: &NotificationRecord, include_uris: bool) -> bool {
    let slot_populated = |slot: &Option<ExtraValue>| {
        slot.as_ref().is_some_and(ExtraValue::is_image_bearing)
    };
    if slot_populated(&record.large_icon) || slot_populated(&record.expanded_icon) {
        return true;
    }

    let extras = &record.extras;
    let image_keys = [keys::LARGE_ICON_BIG, keys::PICTURE, keys::PICTURE_ICON];
    if image_keys
        .iter()
        .chain(keys::OTHER_RASTER_KEYS)
        .any(|key| extras.get(key).is_some_and(ExtraValue::is_image_bearing))
    {
        return true;
    }

    if include_uris
        && keys::URI_KEYS
            .iter()
            .any(|key| extras.text(key).is_some_and(|s| !s.trim().is_empty()))
    {
        return true;
    }

    extras
        .text(keys::TEMPLATE)
        .is_some_and(|t| t.to_lowercase().contains(keys::BIG_PICTURE_TEMPLATE))
}
