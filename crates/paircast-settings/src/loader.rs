//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`HubSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `PAIRCAST_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::HubSettings;

/// Resolve the path to the settings file (`~/.paircast/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".paircast").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<HubSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<HubSettings> {
    let mut settings = load_file_layer(path)?;
    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<HubSettings> {
    let defaults = serde_json::to_value(HubSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `PAIRCAST_*` overrides read through `lookup`.
///
/// Invalid values are logged and ignored (falling back to file/default).
pub fn apply_overrides(settings: &mut HubSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("PAIRCAST_LOG_LEVEL").filter(|v| !v.is_empty()) {
        settings.logging.level = v;
    }
    if let Some(v) = read_bool(&lookup, "PAIRCAST_REACTIVATE_ON_DEACTIVATE") {
        settings.session.reactivate_on_deactivate = v;
    }
    if let Some(v) = read_bool(&lookup, "PAIRCAST_PICKUP_PENDING_CONTEXT") {
        settings.session.pickup_pending_context = v;
    }
    if let Some(v) = read_bool(&lookup, "PAIRCAST_STRICT_DECODING") {
        settings.decoding.strict = v;
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_bool(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
    let val = lookup(name)?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"session": {"a": true, "b": true}});
        let source = serde_json::json!({"session": {"a": false}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["session"]["a"], false);
        assert_eq!(merged["session"]["b"], true);
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let merged = deep_merge(
            serde_json::json!({"items": [1, 2, 3]}),
            serde_json::json!({"items": [4]}),
        );
        assert_eq!(merged["items"], serde_json::json!([4]));
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_file_layer(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, HubSettings::default());
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"logging": {"level": "debug"}, "decoding": {"strict": true}}"#,
        )
        .unwrap();

        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.decoding.strict);
        assert!(settings.session.reactivate_on_deactivate);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_file_layer(&path), Err(SettingsError::Json(_))));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply() {
        let mut settings = HubSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("PAIRCAST_LOG_LEVEL", "trace"),
                ("PAIRCAST_REACTIVATE_ON_DEACTIVATE", "off"),
                ("PAIRCAST_PICKUP_PENDING_CONTEXT", "0"),
                ("PAIRCAST_STRICT_DECODING", "YES"),
            ]),
        );
        assert_eq!(settings.logging.level, "trace");
        assert!(!settings.session.reactivate_on_deactivate);
        assert!(!settings.session.pickup_pending_context);
        assert!(settings.decoding.strict);
    }

    #[test]
    fn invalid_override_is_ignored() {
        let mut settings = HubSettings::default();
        apply_overrides(
            &mut settings,
            env(&[("PAIRCAST_STRICT_DECODING", "maybe"), ("PAIRCAST_LOG_LEVEL", "")]),
        );
        assert!(!settings.decoding.strict);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("On"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
