//! Album cover files.
//!
//! Every album should hold exactly one cover file with the configured name.
//! The pipeline runs in three steps, each optional:
//!
//! 1. **Reconcile** - turn a legacy-named image (folder.jpg, front.png, ...)
//!    into the cover file, by renaming it or converting its format
//! 2. **Ensure it exists** - point the operator at albums without a cover
//! 3. **Process** - JPEG only: re-encode progressive files as baseline and
//!    push the cover into the songs' tags when it differs from what they carry

mod image_tool;
mod reconcile;

pub use image_tool::{ImageMagick, ImageTool};
#[cfg(test)]
pub use image_tool::MockImageTool;
pub use reconcile::{CoverSync, ensure_cover_exists, ensure_cover_processed, reconcile_cover};

use crate::scanner::extension;

/// Whether a file name has a JPEG extension.
pub fn is_jpeg(name: &str) -> bool {
    is_jpeg_extension(extension(name))
}

fn is_jpeg_extension(ext: &str) -> bool {
    ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg")
}
