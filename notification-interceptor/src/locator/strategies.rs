//! The individual steps of the image fallback chain.
//!
//! Every strategy has the same signature so the chain can be expressed as
//! plain data in [`super::default_strategies`].

use super::icon::resolve_icon;
use super::keys;
use super::uri::load_image_from_uri;
use crate::host::HostPlatform;
use crate::types::{DecodedImage, ExtractionError, ExtraValue, NotificationRecord};
use tracing::{debug, warn};

/// Image carried by an icon slot or an image-bearing extras value
fn value_image(
    host: &dyn HostPlatform,
    value: &ExtraValue,
) -> Result<Option<DecodedImage>, ExtractionError> {
    match value {
        ExtraValue::Raster(image) => Ok(Some(image.clone())),
        ExtraValue::Icon(icon) => resolve_icon(host, icon),
        ExtraValue::Text(_) | ExtraValue::Uri(_) | ExtraValue::Other => Ok(None),
    }
}

/// Primary large icon slot
pub fn large_icon(
    host: &dyn HostPlatform,
    record: &NotificationRecord,
) -> Result<Option<DecodedImage>, ExtractionError> {
    match &record.large_icon {
        Some(value) => value_image(host, value),
        None => Ok(None),
    }
}

/// Expanded large icon, either in its slot or under `android.largeIcon.big`
pub fn expanded_large_icon(
    host: &dyn HostPlatform,
    record: &NotificationRecord,
) -> Result<Option<DecodedImage>, ExtractionError> {
    if let Some(value) = &record.expanded_icon {
        if let Some(image) = value_image(host, value)? {
            return Ok(Some(image));
        }
    }

    match record.extras.get(keys::LARGE_ICON_BIG) {
        Some(value) => value_image(host, value),
        None => Ok(None),
    }
}

/// Big-picture style payload. Either key may hold a raster or an icon;
/// rasters are taken before any icon is materialized.
pub fn big_picture(
    host: &dyn HostPlatform,
    record: &NotificationRecord,
) -> Result<Option<DecodedImage>, ExtractionError> {
    const PICTURE_KEYS: [&str; 2] = [keys::PICTURE, keys::PICTURE_ICON];

    if let Some(picture) = PICTURE_KEYS.iter().find_map(|key| record.extras.raster(key)) {
        return Ok(Some(picture.clone()));
    }

    for key in PICTURE_KEYS {
        if let Some(value) = record.extras.get(key) {
            if let Some(image) = value_image(host, value)? {
                return Ok(Some(image));
            }
        }
    }
    Ok(None)
}

/// Vendor and aggregator raster fields, in priority order
pub fn other_raster_keys(
    host: &dyn HostPlatform,
    record: &NotificationRecord,
) -> Result<Option<DecodedImage>, ExtractionError> {
    for key in keys::OTHER_RASTER_KEYS {
        let Some(value) = record.extras.get(key) else {
            continue;
        };

        match value_image(host, value) {
            Ok(Some(image)) => {
                debug!("Found image in key: {}", key);
                return Ok(Some(image));
            }
            Ok(None) => {}
            Err(e) => warn!("Could not read image from key {}: {}", key, e),
        }
    }

    Ok(None)
}

/// URI-valued fields; only local schemes are resolved
pub fn uri_keys(
    host: &dyn HostPlatform,
    record: &NotificationRecord,
) -> Result<Option<DecodedImage>, ExtractionError> {
    for key in keys::URI_KEYS {
        let Some(uri) = record.extras.text(key) else {
            continue;
        };
        let uri = uri.trim();
        if uri.is_empty() {
            continue;
        }

        debug!("Found URI in key: {} = {}", key, uri);
        match load_image_from_uri(host, uri) {
            Ok(Some(image)) => return Ok(Some(image)),
            Ok(None) => {}
            Err(e) => warn!("Error loading image from URI {}: {}", uri, e),
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::test_support::{solid, tag_of, CountingHost};
    use crate::types::{Extras, IconRef};

    #[test]
    fn test_big_picture_prefers_raster_over_icon() {
        let host = CountingHost::default();
        let mut record = NotificationRecord::new("k", "com.example.app");
        record.extras = Extras::new()
            .with(keys::PICTURE, ExtraValue::Raster(solid(2, 2, 5)))
            .with(
                keys::PICTURE_ICON,
                ExtraValue::Icon(IconRef::Bitmap(solid(2, 2, 6))),
            );

        let image = big_picture(&host, &record).unwrap().unwrap();
        assert_eq!(tag_of(&image), 5);
        assert_eq!(host.drawable_calls.get(), 0);
    }

    #[test]
    fn test_big_picture_icon_fallback() {
        let host = CountingHost::default();
        let mut record = NotificationRecord::new("k", "com.example.app");
        record.extras = Extras::new().with(
            keys::PICTURE_ICON,
            ExtraValue::Icon(IconRef::Bitmap(solid(2, 2, 6))),
        );

        let image = big_picture(&host, &record).unwrap().unwrap();
        assert_eq!(tag_of(&image), 6);
        assert_eq!(host.drawable_calls.get(), 1);
    }

    #[test]
    fn test_big_picture_accepts_icon_under_picture_key() {
        let host = CountingHost::default();
        let mut record = NotificationRecord::new("k", "com.example.app");
        record.extras = Extras::new().with(
            keys::PICTURE,
            ExtraValue::Icon(IconRef::Bitmap(solid(2, 2, 11))),
        );

        assert!(crate::locator::has_image(&record, false));
        let image = big_picture(&host, &record).unwrap().unwrap();
        assert_eq!(tag_of(&image), 11);
    }

    #[test]
    fn test_big_picture_accepts_raster_under_picture_icon_key() {
        let host = CountingHost::default();
        let mut record = NotificationRecord::new("k", "com.example.app");
        record.extras = Extras::new()
            .with(keys::PICTURE, ExtraValue::Icon(IconRef::Bitmap(solid(2, 2, 12))))
            .with(keys::PICTURE_ICON, ExtraValue::Raster(solid(2, 2, 13)));

        assert!(crate::locator::has_image(&record, false));
        let image = big_picture(&host, &record).unwrap().unwrap();
        assert_eq!(tag_of(&image), 13);
        assert_eq!(host.drawable_calls.get(), 0);
    }

    #[test]
    fn test_expanded_icon_extras_key() {
        let host = CountingHost::default();
        let mut record = NotificationRecord::new("k", "com.example.app");
        record.extras = Extras::new().with(
            keys::LARGE_ICON_BIG,
            ExtraValue::Raster(solid(3, 3, 8)),
        );

        let image = expanded_large_icon(&host, &record).unwrap().unwrap();
        assert_eq!(tag_of(&image), 8);
    }

    #[test]
    fn test_other_keys_follow_priority() {
        let host = CountingHost::default();
        let mut record = NotificationRecord::new("k", "com.example.app");
        record.extras = Extras::new()
            .with("large_icon_url", ExtraValue::Raster(solid(1, 1, 30)))
            .with("android.media.metadata.ART", ExtraValue::Raster(solid(1, 1, 20)))
            .with("fcm_image", ExtraValue::Raster(solid(1, 1, 25)));

        let image = other_raster_keys(&host, &record).unwrap().unwrap();
        assert_eq!(tag_of(&image), 20);
    }

    #[test]
    fn test_other_keys_skip_failing_icon() {
        let host = CountingHost {
            fail_drawables: true,
            ..Default::default()
        };
        let mut record = NotificationRecord::new("k", "com.example.app");
        record.extras = Extras::new()
            .with("android.icon", ExtraValue::Icon(IconRef::Data(vec![0])))
            .with("fcm_image", ExtraValue::Raster(solid(1, 1, 25)));

        let image = other_raster_keys(&host, &record).unwrap().unwrap();
        assert_eq!(tag_of(&image), 25);
    }

    #[test]
    fn test_uri_keys_skip_unresolvable_entries() {
        let mut png = Vec::new();
        solid(2, 2, 40)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let host = CountingHost {
            content: Some(png),
            ..Default::default()
        };

        let mut record = NotificationRecord::new("k", "com.example.app");
        record.extras = Extras::new()
            .with(
                "android.media.metadata.ALBUM_ART_URI",
                ExtraValue::Text("https://example.com/art.png".to_string()),
            )
            .with("image_url", ExtraValue::Text("not a uri".to_string()))
            .with(
                "fcm_image_url",
                ExtraValue::Uri("content://media/external/images/1".to_string()),
            );

        let image = uri_keys(&host, &record).unwrap().unwrap();
        assert_eq!(tag_of(&image), 40);
        assert_eq!(host.content_calls.get(), 1);
    }
}
