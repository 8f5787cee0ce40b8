//! Icon reference resolution.

use crate::host::{Drawable, HostPlatform, Paint};
use crate::types::{DecodedImage, ExtractionError, IconRef};
use image::{DynamicImage, RgbaImage};
use tracing::trace;

/// Materialize an icon reference through the host and return its pixels.
///
/// Drawables that already wrap a raster are returned as is; anything else is
/// rasterized at its intrinsic size.
pub fn resolve_icon(
    host: &dyn HostPlatform,
    icon: &IconRef,
) -> Result<Option<DecodedImage>, ExtractionError> {
    match host.load_drawable(icon)? {
        Some(Drawable::Bitmap(image)) => Ok(Some(image)),
        Some(Drawable::Painted(paint)) => Ok(Some(rasterize(paint.as_ref()))),
        None => Ok(None),
    }
}

/// Render a drawable into a fresh RGBA canvas.
///
/// Drawables without an intrinsic size (colors, shapes) report non-positive
/// dimensions; those are clamped to 1 so the canvas is never empty.
pub fn rasterize(paint: &dyn Paint) -> DecodedImage {
    let width = positive_or_one(paint.intrinsic_width());
    let height = positive_or_one(paint.intrinsic_height());
    trace!("Rasterizing drawable at {}x{}", width, height);

    let mut canvas = RgbaImage::new(width, height);
    paint.draw(&mut canvas);
    DynamicImage::ImageRgba8(canvas)
}

fn positive_or_one(dimension: i32) -> u32 {
    if dimension > 0 {
        dimension as u32
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostError;
    use image::Rgba;
    use url::Url;

    struct Fill {
        width: i32,
        height: i32,
        color: Rgba<u8>,
    }

    impl Paint for Fill {
        fn intrinsic_width(&self) -> i32 {
            self.width
        }

        fn intrinsic_height(&self) -> i32 {
            self.height
        }

        fn draw(&self, canvas: &mut RgbaImage) {
            for pixel in canvas.pixels_mut() {
                *pixel = self.color;
            }
        }
    }

    struct PaintingHost;

    impl HostPlatform for PaintingHost {
        fn load_drawable(&self, icon: &IconRef) -> Result<Option<Drawable>, HostError> {
            match icon {
                IconRef::Resource { .. } => Ok(Some(Drawable::Painted(Box::new(Fill {
                    width: 12,
                    height: 6,
                    color: Rgba([0, 200, 0, 255]),
                })))),
                _ => Ok(None),
            }
        }

        fn open_content(&self, uri: &Url) -> Result<Vec<u8>, HostError> {
            Err(HostError::NotFound(uri.to_string()))
        }

        fn app_label(&self, _package: &str) -> Option<String> {
            None
        }

        fn cancel_notification(&self, _key: &str) -> Result<bool, HostError> {
            Ok(false)
        }
    }

    #[test]
    fn test_rasterize_intrinsic_size() {
        let image = rasterize(&Fill {
            width: 16,
            height: 9,
            color: Rgba([1, 2, 3, 255]),
        });
        assert_eq!((image.width(), image.height()), (16, 9));
        assert_eq!(image.to_rgba8().get_pixel(15, 8), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn test_rasterize_clamps_missing_dimensions() {
        let image = rasterize(&Fill {
            width: -1,
            height: 0,
            color: Rgba([255, 0, 0, 255]),
        });
        assert_eq!((image.width(), image.height()), (1, 1));
    }

    #[test]
    fn test_resolve_painted_icon() {
        let icon = IconRef::Resource {
            package: "com.example.app".to_string(),
            name: "ic_avatar".to_string(),
        };
        let image = resolve_icon(&PaintingHost, &icon).unwrap().unwrap();
        assert_eq!((image.width(), image.height()), (12, 6));
    }

    #[test]
    fn test_resolve_unknown_icon_is_none() {
        let icon = IconRef::Data(vec![]);
        assert!(resolve_icon(&PaintingHost, &icon).unwrap().is_none());
    }
}
