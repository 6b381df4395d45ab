//! # strand-settings
//!
//! Layered configuration for the Strand search client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`StrandSettings::default()`]
//! 2. **User file** — `~/.strand/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `STRAND_*` overrides (highest priority)
//!
//! There is no global settings singleton: the binary loads settings once at
//! startup and passes the values down as constructor parameters.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{DEFAULT_DEBOUNCE_MS, DEFAULT_WS_URL, StrandSettings};
