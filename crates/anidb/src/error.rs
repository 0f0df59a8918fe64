use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the AniDB client.
#[derive(Debug, Error)]
pub enum AnidbError {
    /// Cache directory missing or not writable.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Title index file absent and not downloaded.
    #[error("Title index not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Malformed or unexpected XML.
    #[error("Failed to decode XML: {0}")]
    Decode(String),

    #[error("Failed to fetch anime {aid}: {source}")]
    Fetch {
        aid: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnidbError {
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub(crate) fn fetch(aid: u32, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Fetch {
            aid,
            source: source.into(),
        }
    }
}

impl From<quick_xml::Error> for AnidbError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for AnidbError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Decode(err.to_string())
    }
}
