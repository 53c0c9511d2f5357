//! # paircast-settings
//!
//! Configuration with layered sources for the paircast hub.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`HubSettings::default()`]
//! 2. **User file** — `~/.paircast/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `PAIRCAST_*` overrides (highest priority)
//!
//! Hosts that configure the hub programmatically can skip the loader and
//! build a [`HubSettings`] directly; the hub never reads settings globally.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
