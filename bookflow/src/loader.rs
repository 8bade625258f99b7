use alloc::string::{String, ToString};
use alloc::sync::Arc;
use core::fmt;

use crate::{
    Chapter, ContentConverter, ContentSource, LoadError, LoadedChapter, PlainTextConverter,
};

/// The result of [`ChapterLoader::load_chapter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Success(LoadedChapter),
    Error {
        chapter_index: usize,
        chapter: Chapter,
        error: LoadError,
    },
}

impl LoadOutcome {
    pub fn chapter_index(&self) -> usize {
        match self {
            Self::Success(loaded) => loaded.chapter_index,
            Self::Error { chapter_index, .. } => *chapter_index,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn message(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::Error { error, .. } => Some(error.to_string()),
        }
    }

    /// Converts the outcome into the record stored in the session window.
    ///
    /// Failures keep their chapter index so a retry can reuse the same slot.
    pub fn into_loaded_chapter(self) -> LoadedChapter {
        match self {
            Self::Success(loaded) => loaded,
            Self::Error {
                chapter_index,
                chapter,
                error,
            } => LoadedChapter::failed(chapter, chapter_index, error.to_string()),
        }
    }
}

/// Fetches one chapter through the configured [`ContentSource`] and converts it into segments.
///
/// The loader is cheap to clone (collaborators are behind `Arc`s), so adapters can hand a clone
/// to a worker thread per fetch. It holds no session state.
#[derive(Clone)]
pub struct ChapterLoader {
    source: Option<Arc<dyn ContentSource>>,
    converter: Arc<dyn ContentConverter>,
}

impl ChapterLoader {
    pub fn new(converter: impl ContentConverter + 'static) -> Self {
        Self {
            source: None,
            converter: Arc::new(converter),
        }
    }

    /// Binds the content source used by subsequent loads.
    pub fn configure(&mut self, source: impl ContentSource + 'static) {
        self.source = Some(Arc::new(source));
    }

    pub fn configure_shared(&mut self, source: Arc<dyn ContentSource>) {
        self.source = Some(source);
    }

    pub fn with_source(mut self, source: impl ContentSource + 'static) -> Self {
        self.configure(source);
        self
    }

    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    /// Loads and converts a chapter. Never panics; failures come back as [`LoadOutcome::Error`].
    pub fn load_chapter(&self, chapter: &Chapter, chapter_index: usize) -> LoadOutcome {
        let Some(source) = &self.source else {
            bwarn!(chapter_index, "load_chapter: no content source configured");
            return LoadOutcome::Error {
                chapter_index,
                chapter: chapter.clone(),
                error: LoadError::NotConfigured,
            };
        };

        let is_from_cache = source.is_chapter_offline(&chapter.url);
        btrace!(chapter_index, url = %chapter.url, is_from_cache, "load_chapter");

        match source.load_chapter_content(&chapter.url) {
            Ok(raw) => {
                let segments = self.converter.convert(&raw);
                bdebug!(
                    chapter_index,
                    segments = segments.len(),
                    "load_chapter: converted"
                );
                LoadOutcome::Success(LoadedChapter::ready(
                    chapter.clone(),
                    chapter_index,
                    segments,
                    is_from_cache,
                ))
            }
            Err(source_error) => {
                bwarn!(chapter_index, error = %source_error, "load_chapter: fetch failed");
                LoadOutcome::Error {
                    chapter_index,
                    chapter: chapter.clone(),
                    error: LoadError::Fetch {
                        url: chapter.url.clone(),
                        source: source_error,
                    },
                }
            }
        }
    }

    /// A placeholder the UI can render while the fetch is in flight.
    pub fn create_loading_chapter(chapter: Chapter, chapter_index: usize) -> LoadedChapter {
        LoadedChapter::loading(chapter, chapter_index)
    }

    pub fn create_error_chapter(
        chapter: Chapter,
        chapter_index: usize,
        message: impl Into<String>,
    ) -> LoadedChapter {
        LoadedChapter::failed(chapter, chapter_index, message)
    }
}

impl Default for ChapterLoader {
    fn default() -> Self {
        Self::new(PlainTextConverter)
    }
}

impl fmt::Debug for ChapterLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChapterLoader")
            .field("configured", &self.source.is_some())
            .finish_non_exhaustive()
    }
}
