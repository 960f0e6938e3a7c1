//! Test-session settings.
//!
//! Settings come from an optional `golden.toml` next to the crate's
//! `Cargo.toml`, overridden by the `--update-goldens` process argument and
//! the `UPDATE_GOLDENS` environment variable. The libtest harness rejects
//! unknown flags, so under plain `cargo test` the variable is the way in:
//!
//! ```text
//! UPDATE_GOLDENS=1 cargo test
//! ```

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{GoldenError, GoldenResult};

/// Command-line flag enabling update mode in custom test harnesses.
pub const UPDATE_FLAG: &str = "--update-goldens";

/// Environment variable enabling update mode.
pub const UPDATE_ENV: &str = "UPDATE_GOLDENS";

/// Optional settings file, relative to the crate root.
pub const SETTINGS_FILE: &str = "golden.toml";

/// Configuration shared by every golden fixture of a test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rewrite golden files from the values tests compare against.
    pub update_goldens: bool,
    /// Warn about golden keys no test looked at when rewriting a file.
    pub warn_unused_fields: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            update_goldens: false,
            warn_unused_fields: true,
        }
    }
}

static SESSION: OnceCell<Settings> = OnceCell::new();

impl Settings {
    /// Settings with update mode switched on or off.
    pub fn with_update(update_goldens: bool) -> Self {
        Self {
            update_goldens,
            ..Self::default()
        }
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> GoldenResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| GoldenError::Settings {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| GoldenError::Settings {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Settings file of `manifest_dir`, then process argument and
    /// environment overrides.
    pub fn discover(manifest_dir: &Path) -> GoldenResult<Self> {
        let mut settings = Self::load(&manifest_dir.join(SETTINGS_FILE))?;
        if std::env::args().any(|arg| arg == UPDATE_FLAG) {
            settings.update_goldens = true;
        }
        if let Ok(raw) = std::env::var(UPDATE_ENV) {
            settings.update_goldens = parse_flag(&raw)?;
        }
        Ok(settings)
    }

    /// Settings of the current test session, discovered on first use.
    pub fn session(manifest_dir: &Path) -> GoldenResult<&'static Settings> {
        SESSION.get_or_try_init(|| Self::discover(manifest_dir))
    }
}

fn parse_flag(raw: &str) -> GoldenResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(GoldenError::Settings {
            path: UPDATE_ENV.to_string(),
            message: format!("expected a boolean, found {:?}", other),
        }),
    }
}
