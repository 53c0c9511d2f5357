//! Settings type definitions.
//!
//! All types use camelCase JSON field names and `#[serde(default)]`, so a
//! partial settings file only needs the keys it overrides.

use serde::{Deserialize, Serialize};

/// Root settings for one hub instance.
///
/// ```json
/// {
///   "logging": { "level": "debug" },
///   "session": { "reactivateOnDeactivate": false }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubSettings {
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Session lifecycle behavior.
    pub session: SessionSettings,
    /// Typed-message decoding behavior.
    pub decoding: DecodingSettings,
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Session lifecycle behavior.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Call `activate()` again after the session reports deactivation.
    pub reactivate_on_deactivate: bool,
    /// Distribute the session's last received application context once
    /// activation completes.
    pub pickup_pending_context: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reactivate_on_deactivate: true,
            pickup_pending_context: true,
        }
    }
}

/// Typed-message decoding behavior.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecodingSettings {
    /// Panic on decode failures in debug builds instead of only logging them.
    pub strict: bool,
}
