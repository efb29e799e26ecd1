//! External-tool image backend (macOS `sips`).
//!
//! Each call writes the payload into its own temporary directory, runs the
//! tool with a timeout and an output cap, and removes the directory when the
//! guard drops, whichever way the call ends.

use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::debug;

use super::{BackendKind, ImageBackend};
use crate::config::ExternalToolConfig;
use crate::error::ImageError;
use crate::images::ImageMetadata;
use crate::images::resize::ResizeRequest;

static PIXEL_WIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pixelWidth:\s*(\d+)").expect("valid regex"));
static PIXEL_HEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pixelHeight:\s*(\d+)").expect("valid regex"));

/// Captured output of a finished tool run.
struct ToolOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ExternalToolBackend {
    config: ExternalToolConfig,
}

impl ExternalToolBackend {
    pub fn new(config: ExternalToolConfig) -> Self {
        Self { config }
    }

    pub fn program(&self) -> &str {
        &self.config.program
    }

    /// Creates the per-call scratch directory.
    fn scratch_dir() -> Result<TempDir, ImageError> {
        Ok(tempfile::Builder::new().prefix("imgsan-").tempdir()?)
    }

    /// Runs the tool, enforcing `timeout` and a cap of `max_output` bytes on
    /// each output stream. The child is killed if either limit trips.
    async fn run(
        &self,
        args: Vec<OsString>,
        timeout: Duration,
        max_output: usize,
    ) -> Result<Vec<u8>, ImageError> {
        let program = self.program();
        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ImageError::ToolSpawn {
                program: program.to_string(),
                source,
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ImageError::Io(std::io::Error::other(
                "child output pipes were not captured",
            )));
        };

        let collect = async {
            let (stdout, stderr) = tokio::try_join!(
                read_capped(stdout, program, max_output),
                read_capped(stderr, program, max_output),
            )?;
            let status = child.wait().await?;
            Ok::<_, ImageError>(ToolOutput {
                status,
                stdout,
                stderr,
            })
        };

        // On timeout or cap overflow `child` is dropped on return, which kills it.
        let output = match tokio::time::timeout(timeout, collect).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ImageError::ToolTimeout {
                    program: program.to_string(),
                    timeout,
                });
            }
        };

        if !output.status.success() {
            return Err(ImageError::ToolFailed {
                program: program.to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Reads `reader` to EOF, failing as soon as more than `max_output` bytes
/// arrive.
async fn read_capped<R>(
    mut reader: R,
    program: &str,
    max_output: usize,
) -> Result<Vec<u8>, ImageError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        if buf.len() + n > max_output {
            return Err(ImageError::ToolOutputTooLarge {
                program: program.to_string(),
                limit: max_output,
            });
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Parses `pixelWidth`/`pixelHeight` from `sips -g` output.
fn parse_dimensions(program: &str, output: &str) -> Result<Option<ImageMetadata>, ImageError> {
    let capture = |re: &Regex| {
        re.captures(output)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
    };

    match (capture(&PIXEL_WIDTH_RE), capture(&PIXEL_HEIGHT_RE)) {
        (Some(width), Some(height)) => Ok(ImageMetadata::new(width, height)),
        _ => Err(ImageError::MalformedToolOutput {
            program: program.to_string(),
            output: output.trim().chars().take(200).collect(),
        }),
    }
}

impl ImageBackend for ExternalToolBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ExternalTool
    }

    async fn metadata(&self, bytes: &[u8]) -> Result<Option<ImageMetadata>, ImageError> {
        let dir = Self::scratch_dir()?;
        let input = dir.path().join("input.img");
        tokio::fs::write(&input, bytes).await?;

        let args = vec![
            OsString::from("-g"),
            OsString::from("pixelWidth"),
            OsString::from("-g"),
            OsString::from("pixelHeight"),
            input.into_os_string(),
        ];
        let stdout = self
            .run(
                args,
                self.config.metadata_timeout(),
                self.config.metadata_max_output_bytes,
            )
            .await?;

        parse_dimensions(self.program(), &String::from_utf8_lossy(&stdout))
    }

    /// Always encodes JPEG. `sips -Z` has no "don't enlarge" switch, so the
    /// current size is probed first and used as the target when it already
    /// fits.
    async fn resize(
        &self,
        bytes: &[u8],
        _mime_type: &str,
        request: &ResizeRequest,
    ) -> Result<Vec<u8>, ImageError> {
        let mut side = request.max_side.max(1);
        if request.without_enlargement
            && let Ok(Some(meta)) = self.metadata(bytes).await
            && meta.fits_within(side)
        {
            side = meta.max_side();
        }

        let dir = Self::scratch_dir()?;
        let input = dir.path().join("input.img");
        let output = dir.path().join("output.jpg");
        tokio::fs::write(&input, bytes).await?;

        debug!(
            program = self.program(),
            side,
            quality = request.quality,
            "resizing with external tool"
        );
        let args = vec![
            OsString::from("-Z"),
            OsString::from(side.to_string()),
            OsString::from("-s"),
            OsString::from("format"),
            OsString::from("jpeg"),
            OsString::from("-s"),
            OsString::from("formatOptions"),
            OsString::from(request.quality.clamp(1, 100).to_string()),
            input.into_os_string(),
            OsString::from("--out"),
            output.clone().into_os_string(),
        ];
        self.run(
            args,
            self.config.resize_timeout(),
            self.config.resize_max_output_bytes,
        )
        .await?;

        Ok(tokio::fs::read(&output).await?)
    }
}
