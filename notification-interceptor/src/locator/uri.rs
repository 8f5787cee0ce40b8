//! URI-backed image loading.
//!
//! Only local schemes are resolved. Network URIs are reported and skipped:
//! the locator runs on the notification delivery callback and must not block
//! on network I/O.

use crate::host::HostPlatform;
use crate::types::{DecodedImage, ExtractionError};
use tracing::warn;
use url::Url;

/// Load an image from a `content:` or `file:` URI.
///
/// Returns `Ok(None)` for `http(s)` and unsupported schemes without
/// touching the host.
pub fn load_image_from_uri(
    host: &dyn HostPlatform,
    raw: &str,
) -> Result<Option<DecodedImage>, ExtractionError> {
    let uri = Url::parse(raw).map_err(|e| ExtractionError::InvalidUri {
        uri: raw.to_string(),
        reason: e.to_string(),
    })?;

    match uri.scheme() {
        "content" => {
            let bytes = host.open_content(&uri)?;
            Ok(Some(image::load_from_memory(&bytes)?))
        }
        "file" => {
            let path = uri.to_file_path().map_err(|_| ExtractionError::InvalidUri {
                uri: raw.to_string(),
                reason: "not a local file path".to_string(),
            })?;
            let bytes = std::fs::read(&path)?;
            Ok(Some(image::load_from_memory(&bytes)?))
        }
        "http" | "https" => {
            warn!("HTTP URI found but not loading synchronously: {}", raw);
            Ok(None)
        }
        other => {
            warn!("Unsupported URI scheme: {}", other);
            Ok(None)
        }
    }
}
