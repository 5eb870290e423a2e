//! Build-time configuration
//!
//! Origin capture is controlled by cargo features so that release builds can drop
//! source paths from thrown instances:
//!
//! - `suppress-file-info`: omit the origin file (and therefore the line)
//! - `suppress-line-info`: omit the origin line only

/// Which origin fields are recorded when an instance is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginCapture {
    /// Record the origin file
    pub file: bool,
    /// Record the origin line
    pub line: bool,
}

impl OriginCapture {
    /// Capture settings derived from the enabled cargo features
    pub const fn from_features() -> Self {
        let file = !cfg!(feature = "suppress-file-info");
        Self {
            file,
            line: file && !cfg!(feature = "suppress-line-info"),
        }
    }
}

impl Default for OriginCapture {
    fn default() -> Self {
        Self::from_features()
    }
}

/// Origin capture used by [`throw`](crate::throw) and [`ExceptionInstance::new`](crate::ExceptionInstance::new)
pub const ORIGIN_CAPTURE: OriginCapture = OriginCapture::from_features();
