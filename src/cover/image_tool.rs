//! JPEG inspection and conversion using ImageMagick.
//!
//! This module shells out to the `identify` and `convert` command-line tools
//! (part of ImageMagick) rather than decoding images itself.
//!
//! Install ImageMagick:
//! - Windows: `winget install ImageMagick.ImageMagick`
//! - macOS: `brew install imagemagick`
//! - Linux: `apt install imagemagick` or equivalent

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// Inspects and converts cover images.
#[cfg_attr(test, mockall::automock)]
pub trait ImageTool {
    /// Whether the JPEG at `path` is baseline (non-interlaced) encoded.
    fn is_baseline_jpeg(&self, path: &Path) -> Result<bool>;

    /// Convert `src` into `dst`, choosing the format from `dst`'s extension.
    /// Blocks until the conversion finished.
    fn convert(&self, src: &Path, dst: &Path) -> Result<()>;
}

/// ImageMagick command-line tools.
#[derive(Debug, Clone)]
pub struct ImageMagick {
    identify: String,
    convert: String,
}

impl Default for ImageMagick {
    fn default() -> Self {
        Self {
            identify: "identify".to_string(),
            convert: "convert".to_string(),
        }
    }
}

impl ImageMagick {
    /// Use explicit program paths instead of looking them up in `PATH`.
    pub fn with_programs(identify: impl Into<String>, convert: impl Into<String>) -> Self {
        Self {
            identify: identify.into(),
            convert: convert.into(),
        }
    }
}

impl ImageTool for ImageMagick {
    fn is_baseline_jpeg(&self, path: &Path) -> Result<bool> {
        let output = Command::new(&self.identify)
            .arg("-verbose")
            .arg(path)
            .output()
            .map_err(|e| Error::external_tool(&self.identify, format!("failed to run: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::external_tool(&self.identify, stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_is_baseline(&stdout))
    }

    fn convert(&self, src: &Path, dst: &Path) -> Result<()> {
        let mut command = Command::new(&self.convert);
        command.arg(src);
        if is_jpeg_path(dst) {
            command.args(["-interlace", "None"]);
        }
        command.arg(dst);

        let output = command
            .output()
            .map_err(|e| Error::external_tool(&self.convert, format!("failed to run: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::external_tool(
                &self.convert,
                format!("{} ({})", stderr.trim(), output.status),
            ));
        }

        tracing::info!(src = %src.display(), dst = %dst.display(), "Converted image");
        Ok(())
    }
}

/// Parse `identify -verbose` output.
///
/// A baseline JPEG reports `Interlace: None`; progressive files report
/// `JPEG` or `Plane`.
fn parse_is_baseline(verbose: &str) -> bool {
    verbose
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Interlace:"))
        .any(|value| value.contains("None"))
}

fn is_jpeg_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(super::is_jpeg_extension)
}
