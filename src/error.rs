use thiserror::Error;

/// An optional asset could not be resolved. Never fatal on its own; each
/// caller decides what to substitute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetMissing {
    #[error("font not found: {0}")]
    Font(String),
    #[error("badge icon not found: {0}")]
    Badge(String),
    #[error("emoji glyph not found: {0}")]
    Emoji(String),
}

/// Avatar bytes could not be obtained.
#[derive(Debug, Clone, Error)]
#[error("avatar fetch failed for {uri}: {reason}")]
pub struct FetchError {
    pub uri: String,
    pub reason: String,
}

impl FetchError {
    pub fn new(uri: &str, reason: impl Into<String>) -> Self {
        Self {
            uri: uri.to_string(),
            reason: reason.into(),
        }
    }
}

/// Fatal render failure. No partial output is produced when one of these is
/// returned.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    AssetMissing(#[from] AssetMissing),

    #[error("invalid color {0:?}")]
    InvalidColor(String),

    #[error("invalid font {name}: {reason}")]
    InvalidFont { name: String, reason: String },

    #[error("no default font available")]
    NoDefaultFont,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("message {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("http client setup failed: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
