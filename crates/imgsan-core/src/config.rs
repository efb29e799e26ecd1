//! Configuration management for imgsan.
//!
//! Loads configuration from ${IMGSAN_HOME}/config.toml with sensible defaults.
//! The loaded value is passed down explicitly; nothing below this module reads
//! the process environment.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::images::backend::BackendKind;

/// Environment variable that forces a backend (`native` or `external-tool`).
pub const BACKEND_ENV_VAR: &str = "IMGSAN_IMAGE_BACKEND";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub images: ImagesConfig,
}

/// Image normalization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Forces a backend instead of the platform default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    /// Largest allowed width or height, in pixels.
    pub max_dimension_px: u32,
    /// Quality used when re-encoding to JPEG (1-100).
    pub jpeg_quality: u8,
    /// Largest allowed decoded size of a resized image.
    pub max_bytes: usize,
    pub external_tool: ExternalToolConfig,
}

impl ImagesConfig {
    pub const DEFAULT_MAX_DIMENSION_PX: u32 = 2000;
    pub const DEFAULT_JPEG_QUALITY: u8 = 85;
    pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            backend: None,
            max_dimension_px: Self::DEFAULT_MAX_DIMENSION_PX,
            jpeg_quality: Self::DEFAULT_JPEG_QUALITY,
            max_bytes: Self::DEFAULT_MAX_BYTES,
            external_tool: ExternalToolConfig::default(),
        }
    }
}

/// Settings for the external command-line image tool (`sips`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalToolConfig {
    pub program: String,
    pub metadata_timeout_ms: u64,
    pub resize_timeout_ms: u64,
    pub metadata_max_output_bytes: usize,
    pub resize_max_output_bytes: usize,
}

impl ExternalToolConfig {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn resize_timeout(&self) -> Duration {
        Duration::from_millis(self.resize_timeout_ms)
    }
}

impl Default for ExternalToolConfig {
    fn default() -> Self {
        Self {
            program: "sips".to_string(),
            metadata_timeout_ms: 10_000,
            resize_timeout_ms: 20_000,
            metadata_max_output_bytes: 512 * 1024,
            resize_max_output_bytes: 1024 * 1024,
        }
    }
}

pub mod paths {
    //! Path resolution for imgsan configuration.
    //!
    //! IMGSAN_HOME resolution order:
    //! 1. IMGSAN_HOME environment variable (if set)
    //! 2. ~/.config/imgsan (default)

    use std::ffi::OsString;
    use std::path::PathBuf;

    use anyhow::{Result, anyhow};

    /// Returns the imgsan home directory.
    pub fn imgsan_home() -> Result<PathBuf> {
        resolve_home(std::env::var_os("IMGSAN_HOME"), dirs::home_dir())
    }

    pub(super) fn resolve_home(
        imgsan_home: Option<OsString>,
        user_home: Option<PathBuf>,
    ) -> Result<PathBuf> {
        if let Some(home) = imgsan_home.filter(|h| !h.is_empty()) {
            return Ok(PathBuf::from(home));
        }

        user_home
            .map(|h| h.join(".config").join("imgsan"))
            .ok_or_else(|| anyhow!("Could not determine home directory"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> Result<PathBuf> {
        Ok(imgsan_home()?.join("config.toml"))
    }
}

impl Config {
    /// Loads configuration from the default location, then applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::config_path()?)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Applies environment-style overrides read through `lookup`.
    ///
    /// An empty value is treated as unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(BACKEND_ENV_VAR) {
            let raw = raw.trim();
            if !raw.is_empty() {
                let kind = raw
                    .parse::<BackendKind>()
                    .map_err(|e| anyhow!("invalid {BACKEND_ENV_VAR}: {e}"))?;
                self.images.backend = Some(kind);
            }
        }
        Ok(())
    }

    /// Renders the default configuration as TOML.
    pub fn generate() -> Result<String> {
        toml::to_string(&Config::default()).context("Failed to serialize default config to TOML")
    }
}
