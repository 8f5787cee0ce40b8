//! End-to-end tests: JSON input through the interceptor to stored images
//! and dispatched events, using the filesystem-backed host.

use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use notification_interceptor::config::HostConfig;
use notification_interceptor::{
    cancel, Config, InterceptedNotification, JsonLinesDispatcher, ListenerMessage, LocalHost,
    NotificationInterceptor, NotificationRecord,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["res", "content", "cache", "input"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        Self { dir }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.storage.cache_dir = Some(self.path("cache").display().to_string());
        config.storage.min_free_bytes = 0;
        config.host = HostConfig {
            resources_dir: Some(self.path("res").display().to_string()),
            content_root: Some(self.path("content").display().to_string()),
            app_labels: HashMap::from([
                ("com.example.camera".to_string(), "Camera".to_string()),
                ("com.example.music".to_string(), "Music".to_string()),
            ]),
        };
        config
    }

    fn interceptor(&self) -> NotificationInterceptor<LocalHost, Vec<InterceptedNotification>> {
        let config = self.config();
        let host = LocalHost::new(&config.host);
        NotificationInterceptor::new(config, host, Vec::new())
    }

    fn image_dir(&self) -> PathBuf {
        self.path("cache").join("notification_images")
    }
}

fn write_png(path: &Path, width: u32, height: u32, red: u8) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([red, 40, 40, 255])))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

fn record(line: &str) -> NotificationRecord {
    match ListenerMessage::parse(line).unwrap() {
        ListenerMessage::Posted(payload) => payload.into(),
        other => panic!("expected a posted message, got {:?}", other),
    }
}

#[test]
fn big_picture_notification_produces_jpeg_and_event() {
    let fx = Fixture::new();
    let picture = fx.path("input/picture.png");
    write_png(&picture, 64, 48, 220);

    let line = serde_json::json!({
        "posted": {
            "key": "0|com.example.camera|7|null|10123",
            "package": "com.example.camera",
            "title": "Front door",
            "text": "Person detected",
            "extras": {
                "android.template": "android.app.Notification$BigPictureStyle",
                "android.picture": { "type": "raster", "path": picture }
            }
        }
    })
    .to_string();

    let mut interceptor = fx.interceptor();
    interceptor.startup();
    let event = interceptor.on_notification_posted(&record(&line)).unwrap();

    assert_eq!(event.title, "Front door");
    assert_eq!(event.text, "Person detected");
    assert_eq!(event.app_name, "Camera");
    assert_eq!(event.notification_key, "0|com.example.camera|7|null|10123");

    let stored = Path::new(&event.image_path);
    assert_eq!(stored.parent().unwrap(), fx.image_dir());
    let decoded = image::open(stored).unwrap();
    assert_eq!(decoded.dimensions(), (64, 48));
    let pixel = decoded.to_rgb8().get_pixel(32, 24).0;
    assert!(pixel[0] > 200, "red channel survived encoding: {:?}", pixel);
}

#[test]
fn large_icon_wins_over_big_picture() {
    let fx = Fixture::new();
    write_png(&fx.path("input/icon.png"), 20, 20, 10);
    write_png(&fx.path("input/picture.png"), 80, 40, 250);

    let line = serde_json::json!({
        "posted": {
            "key": "k",
            "package": "com.example.camera",
            "large_icon": { "type": "icon_bitmap", "path": fx.path("input/icon.png") },
            "extras": {
                "android.picture": { "type": "raster", "path": fx.path("input/picture.png") }
            }
        }
    })
    .to_string();

    let mut interceptor = fx.interceptor();
    let event = interceptor.on_notification_posted(&record(&line)).unwrap();

    let decoded = image::open(&event.image_path).unwrap();
    assert_eq!(decoded.dimensions(), (20, 20));
}

#[test]
fn resource_icon_is_resolved_through_host() {
    let fx = Fixture::new();
    write_png(&fx.path("res/com.example.camera/ic_doorbell.png"), 24, 24, 128);

    let line = r#"{"posted": {
        "key": "k",
        "package": "com.example.camera",
        "large_icon": {"type": "icon_resource", "package": "com.example.camera", "name": "ic_doorbell"}
    }}"#;

    let mut interceptor = fx.interceptor();
    let event = interceptor.on_notification_posted(&record(line)).unwrap();
    assert_eq!(image::open(&event.image_path).unwrap().dimensions(), (24, 24));
}

#[test]
fn album_art_content_uri_is_last_resort() {
    let fx = Fixture::new();
    write_png(&fx.path("content/media/external/audio/albumart/9"), 32, 32, 90);

    let line = r#"{"posted": {
        "key": "k",
        "package": "com.example.music",
        "title": "Now playing",
        "extras": {
            "android.media.metadata.ALBUM_ART_URI": {"type": "uri", "value": "content://media/external/audio/albumart/9"},
            "image_url": "https://cdn.example.com/cover.jpg"
        }
    }}"#;

    let mut interceptor = fx.interceptor();
    let event = interceptor.on_notification_posted(&record(line)).unwrap();
    assert_eq!(event.app_name, "Music");
    assert_eq!(image::open(&event.image_path).unwrap().dimensions(), (32, 32));
}

#[test]
fn remote_only_image_is_not_fetched() {
    let fx = Fixture::new();
    let line = r#"{"posted": {
        "key": "k",
        "package": "com.example.news",
        "extras": {"image_url": "https://cdn.example.com/headline.jpg"}
    }}"#;

    let mut interceptor = fx.interceptor();
    assert!(interceptor.on_notification_posted(&record(line)).is_none());
    assert!(interceptor.dispatcher().is_empty());
}

#[test]
fn events_are_written_as_json_lines() {
    let fx = Fixture::new();
    write_png(&fx.path("input/icon.png"), 8, 8, 60);

    let config = fx.config();
    let host = LocalHost::new(&config.host);
    let mut interceptor =
        NotificationInterceptor::new(config, host, JsonLinesDispatcher::new(Vec::new()));

    let line = serde_json::json!({
        "posted": {
            "key": "k1",
            "package": "com.example.camera",
            "title": "Doorbell",
            "large_icon": { "type": "icon_bitmap", "path": fx.path("input/icon.png") }
        }
    })
    .to_string();
    let event = interceptor.on_notification_posted(&record(&line)).unwrap();

    let output = String::from_utf8(interceptor.into_dispatcher().into_inner()).unwrap();
    assert_eq!(output.lines().count(), 1);
    let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
    assert_eq!(parsed["notification_title"], "Doorbell");
    assert_eq!(parsed["app_name"], "Camera");
    assert_eq!(parsed["image_path"], event.image_path.as_str());
}

#[test]
fn cancel_and_cleanup_lifecycle() {
    let fx = Fixture::new();
    write_png(&fx.path("input/icon.png"), 8, 8, 60);

    let line = serde_json::json!({
        "posted": {
            "key": "k1",
            "package": "com.example.camera",
            "large_icon": { "type": "icon_bitmap", "path": fx.path("input/icon.png") }
        }
    })
    .to_string();

    let mut interceptor = fx.interceptor();
    interceptor.on_notification_posted(&record(&line)).unwrap();
    interceptor.on_notification_posted(&record(&line)).unwrap();
    assert_eq!(interceptor.store().directory_info().file_count, 2);

    let missing = cancel::run(&mut interceptor, None);
    assert!(!missing.success);

    let outcome = cancel::run(&mut interceptor, Some("k1"));
    assert!(outcome.success);
    assert_eq!(outcome.message, "Notification canceled successfully");
    assert_eq!(interceptor.active_keys().count(), 0);

    // Fresh files survive the age-based sweep, the purge removes them
    assert_eq!(interceptor.shutdown().deleted, 0);
    let purged = interceptor.store().cleanup_all_files();
    assert_eq!(purged.deleted, 2);
    assert_eq!(interceptor.store().directory_info().file_count, 0);
}
