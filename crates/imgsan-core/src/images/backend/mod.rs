//! Interchangeable image backends and the policy that picks one.
//!
//! - `native`: in-process decode/resize/encode (cargo feature `native`)
//! - `external`: macOS `sips`, driven as a subprocess

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ImageError;
use crate::images::ImageMetadata;
use crate::images::resize::ResizeRequest;

pub mod external;
pub mod native;

pub use external::ExternalToolBackend;
pub use native::NativeBackend;

/// Which backend handles image work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    Native,
    #[serde(alias = "sips")]
    ExternalTool,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::ExternalTool => "external-tool",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(BackendKind::Native),
            "external-tool" | "external" | "sips" => Ok(BackendKind::ExternalTool),
            other => Err(format!(
                "unknown image backend '{other}' (expected 'native' or 'external-tool')"
            )),
        }
    }
}

/// Facts about the running process that bias the default backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnv {
    /// Whether the in-process codec was compiled in.
    pub native_available: bool,
    /// Operating system identifier, as in `std::env::consts::OS`.
    pub os: String,
}

impl RuntimeEnv {
    pub fn detect() -> Self {
        Self {
            native_available: cfg!(feature = "native"),
            os: std::env::consts::OS.to_string(),
        }
    }
}

/// Picks the backend for this process.
///
/// An explicit override always wins. Otherwise the external tool is used only
/// when the native codec is missing and the OS ships `sips` (macOS).
pub fn select_backend(override_kind: Option<BackendKind>, runtime: &RuntimeEnv) -> BackendKind {
    if let Some(kind) = override_kind {
        return kind;
    }
    if !runtime.native_available && runtime.os == "macos" {
        BackendKind::ExternalTool
    } else {
        BackendKind::Native
    }
}

/// Decode/measure/resize capability.
pub trait ImageBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Reads pixel dimensions. `Ok(None)` means the image reports a zero size.
    fn metadata(
        &self,
        bytes: &[u8],
    ) -> impl Future<Output = Result<Option<ImageMetadata>, ImageError>> + Send;

    /// Downscales `bytes` per `request` and returns the encoded output.
    fn resize(
        &self,
        bytes: &[u8],
        mime_type: &str,
        request: &ResizeRequest,
    ) -> impl Future<Output = Result<Vec<u8>, ImageError>> + Send;
}
