//! Error types for the handful of operations that return `Result` instead of
//! the boolean-only contract most of the API uses (§7).

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

/// Errors from parsing or applying an SDL-format gamepad mapping.
///
/// Most mapping problems (§4.2 parsing failure modes) are handled by
/// skipping the offending line or field and logging a warning; this type is
/// for the few cases the spec treats as a hard error when the caller hands
/// mapping data to us programmatically rather than through the bundled
/// database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingError {
    /// A mapping line's GUID field wasn't exactly 32 hex digits.
    InvalidGuid,
    /// A device name contained a comma, which would corrupt the SDL line
    /// format on export.
    InvalidName,
}

impl MappingError {
    fn message(self) -> &'static str {
        match self {
            MappingError::InvalidGuid => "GUID must be exactly 32 lowercase hex digits",
            MappingError::InvalidName => "device name must not contain a comma",
        }
    }
}

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl StdError for MappingError {}

/// A platform backend failed to initialize (§7: "tolerated" by the
/// container — enumeration simply finds no gamepads — but still worth
/// surfacing to the application for logging/diagnostics).
#[derive(Debug)]
pub struct PlatformError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        PlatformError {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        PlatformError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for PlatformError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}
