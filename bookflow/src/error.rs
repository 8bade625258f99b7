use alloc::string::String;

/// Failure reported by a [`crate::ContentSource`] while fetching raw chapter content.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SourceError {
    pub message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a chapter could not be loaded.
///
/// Load failures are never raised: they travel inside [`crate::LoadOutcome::Error`] and end up as
/// an error indicator in the display sequence.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// `ChapterLoader::load_chapter` was called before `configure`.
    #[error("no content source configured")]
    NotConfigured,

    /// The content source failed (network, disk, parse).
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: SourceError,
    },
}
