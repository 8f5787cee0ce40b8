//! Notification listener service.
//!
//! Ties the pipeline together for every posted notification: app filtering,
//! image location, temp storage and event dispatch. Nothing here ever fails
//! the host callback; every problem is logged and the notification is
//! either dropped or published without an image.

use crate::cancel::NotificationCanceller;
use crate::config::Config;
use crate::dispatcher::EventDispatcher;
use crate::filter::AppFilter;
use crate::host::HostPlatform;
use crate::locator::{keys, ImageLocator};
use crate::storage::{CleanupSummary, TempImageStore};
use crate::types::{InterceptedNotification, NotificationRecord};
use std::collections::HashSet;
use tracing::{debug, error, info, trace, warn};

/// Notification listener
pub struct NotificationInterceptor<H, D> {
    /// Configuration
    config: Config,
    /// Image locator (owns the host)
    locator: ImageLocator<H>,
    /// Temp image store
    store: TempImageStore,
    /// App filter
    filter: AppFilter,
    /// Event sink
    dispatcher: D,
    /// Keys of notifications currently posted
    active_keys: HashSet<String>,
}

impl<H: HostPlatform, D: EventDispatcher> NotificationInterceptor<H, D> {
    /// Create a new interceptor with the given configuration
    pub fn new(config: Config, host: H, dispatcher: D) -> Self {
        let locator = ImageLocator::new(host, &config.extraction);
        let store = TempImageStore::new(&config.storage);
        let filter = AppFilter::new(config.filter.clone(), config.general.own_package.clone());

        Self {
            config,
            locator,
            store,
            filter,
            dispatcher,
            active_keys: HashSet::new(),
        }
    }

    /// Listener connected: sweep images left behind by earlier runs
    pub fn startup(&mut self) -> CleanupSummary {
        info!("Notification listener connected, {}", self.filter.describe());
        let summary = self.store.cleanup_old_files();
        if summary.deleted > 0 {
            info!("Removed {} stale images on startup", summary.deleted);
        }
        summary
    }

    /// Listener disconnected: sweep expired images
    pub fn shutdown(&mut self) -> CleanupSummary {
        info!("Notification listener disconnected");
        self.active_keys.clear();
        self.store.cleanup_old_files()
    }

    /// Handle a posted notification.
    ///
    /// Returns the event that was dispatched, or `None` when the
    /// notification was ignored or could not be delivered.
    pub fn on_notification_posted(
        &mut self,
        record: &NotificationRecord,
    ) -> Option<InterceptedNotification> {
        if !self.config.general.enabled {
            trace!("Interception disabled, ignoring {}", record.key);
            return None;
        }

        let app_name = self.app_name(&record.package);
        if !self.filter.allows(&record.package, &app_name) {
            return None;
        }

        debug!("Notification posted from {} ({})", app_name, record.package);
        self.active_keys.insert(record.key.clone());

        let image_path = self.extract_and_store(record);
        if image_path.is_none() && self.config.extraction.require_image {
            debug!("No image found in notification {}, ignoring", record.key);
            return None;
        }

        let event = InterceptedNotification {
            title: notification_title(record),
            text: notification_text(record),
            image_path: image_path.unwrap_or_default(),
            app_package: record.package.clone(),
            app_name,
            notification_key: record.key.clone(),
        };

        match self.dispatcher.dispatch(&event) {
            Ok(()) => {
                info!(
                    "Notification event triggered for {} (image: {})",
                    event.app_package,
                    if event.has_image() { event.image_path.as_str() } else { "none" }
                );
                Some(event)
            }
            Err(e) => {
                error!("Error triggering notification event: {}", e);
                None
            }
        }
    }

    /// Handle a removed notification
    pub fn on_notification_removed(&mut self, key: &str) {
        if self.active_keys.remove(key) {
            debug!("Notification removed: {}", key);
        }
    }

    /// Keys of notifications posted and not yet removed or cancelled
    pub fn active_keys(&self) -> impl Iterator<Item = &str> {
        self.active_keys.iter().map(String::as_str)
    }

    pub fn store(&self) -> &TempImageStore {
        &self.store
    }

    pub fn filter(&self) -> &AppFilter {
        &self.filter
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn into_dispatcher(self) -> D {
        self.dispatcher
    }

    pub fn host(&self) -> &H {
        self.locator.host()
    }

    fn app_name(&self, package: &str) -> String {
        self.locator.host().app_label(package).unwrap_or_else(|| {
            debug!("Could not get app name for package: {}", package);
            package.to_string()
        })
    }

    /// Locate and persist the notification image, returning its path
    fn extract_and_store(&self, record: &NotificationRecord) -> Option<String> {
        if !self.locator.has_image(record) {
            return None;
        }

        let image = self.locator.locate(record)?;

        let required = self.config.storage.min_free_bytes;
        if !self.store.has_enough_space(required) {
            warn!("Not enough storage space to save notification image");
            return None;
        }

        let stored = self.store.save_image_to_temp(&image, &record.package)?;
        Some(stored.path.display().to_string())
    }
}

impl<H: HostPlatform, D> NotificationCanceller for NotificationInterceptor<H, D> {
    fn cancel_notification(&mut self, key: &str) -> bool {
        match self.locator.host().cancel_notification(key) {
            Ok(true) => {
                self.active_keys.remove(key);
                true
            }
            Ok(false) => {
                debug!("Host does not know notification {}", key);
                false
            }
            Err(e) => {
                warn!("Failed to cancel notification {}: {}", key, e);
                false
            }
        }
    }
}

/// Record title, falling back to the title extra
fn notification_title(record: &NotificationRecord) -> String {
    non_empty_or_extra(&record.title, record, keys::TITLE)
}

/// Record text, falling back to the text extra
fn notification_text(record: &NotificationRecord) -> String {
    non_empty_or_extra(&record.text, record, keys::TEXT)
}

fn non_empty_or_extra(value: &str, record: &NotificationRecord, key: &str) -> String {
    if !value.is_empty() {
        return value.to_string();
    }
    record.extras.text(key).unwrap_or_default().to_string()
}
