//! Application filtering for intercepted notifications.
//!
//! Decides which posting applications are monitored:
//! - monitoring can be switched off entirely
//! - an optional name filter restricts monitoring to matching apps
//! - a configurable blocklist (glob patterns on package ids) excludes apps

use crate::config::FilterConfig;
use tracing::{debug, warn};

/// App filter for intercepted notifications
pub struct AppFilter {
    config: FilterConfig,
    /// Package id of this application, never monitored
    own_package: String,
    /// Compiled patterns for blocked apps
    blocked_patterns: Vec<glob::Pattern>,
}

impl AppFilter {
    /// Create a new filter with the given configuration
    pub fn new(config: FilterConfig, own_package: impl Into<String>) -> Self {
        let blocked_patterns = config
            .blocked_apps
            .iter()
            .filter_map(|pattern| {
                glob::Pattern::new(pattern)
                    .map_err(|e| {
                        warn!("Invalid blocked app pattern '{}': {}", pattern, e);
                        e
                    })
                    .ok()
            })
            .collect();

        Self {
            config,
            own_package: own_package.into(),
            blocked_patterns,
        }
    }

    /// Check whether notifications from this app should be processed
    pub fn allows(&self, package: &str, app_name: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        if self.is_blocked(package) {
            return false;
        }

        let needle = self.config.app_name_filter.trim();
        if needle.is_empty() {
            return true;
        }

        let needle = needle.to_lowercase();
        let matched = app_name.to_lowercase().contains(&needle)
            || package.to_lowercase().contains(&needle);
        if !matched {
            debug!("App '{}' ({}) does not match filter '{}'", app_name, package, needle);
        }
        matched
    }

    /// Check if a package is excluded by the blocklist or is our own
    pub fn is_blocked(&self, package: &str) -> bool {
        if package == self.own_package {
            debug!("Ignoring own notification from '{}'", package);
            return true;
        }

        for pattern in &self.blocked_patterns {
            if pattern.matches(package) {
                debug!("App '{}' blocked by pattern '{}'", package, pattern);
                return true;
            }
        }
        false
    }

    /// Short human readable summary of what is monitored
    pub fn describe(&self) -> String {
        if !self.config.enabled {
            "notification monitoring disabled".to_string()
        } else if self.config.app_name_filter.trim().is_empty() {
            "monitoring notifications with images from all apps".to_string()
        } else {
            format!(
                "monitoring notifications from apps containing '{}'",
                self.config.app_name_filter.trim()
            )
        }
    }
}
