use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

/// A chapter as listed by the book's table of contents.
///
/// Chapters are supplied by the host and never mutated by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chapter {
    pub url: String,
    pub name: String,
    /// Static ordinal in the table of contents.
    pub index: usize,
}

impl Chapter {
    pub fn new(url: impl Into<String>, name: impl Into<String>, index: usize) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            index,
        }
    }
}

/// A byte range into [`ContentSegment::text`] covering one sentence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SentenceSpan {
    pub start: usize,
    pub end: usize, // exclusive
}

impl SentenceSpan {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// What kind of block a segment was converted from.
///
/// The conversion collaborator decides the kind; the engine only maps it to a display variant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SegmentKind {
    #[default]
    Paragraph,
    Image {
        src: String,
    },
    HorizontalRule,
    SceneBreak,
    AuthorNote {
        note_id: String,
    },
    Table,
    List,
}

/// A parsed paragraph-level unit of chapter content.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentSegment {
    /// Stable per-chapter key.
    pub id: String,
    pub html: String,
    pub text: String,
    pub sentences: Vec<SentenceSpan>,
    pub kind: SegmentKind,
}

impl ContentSegment {
    pub fn paragraph(id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let sentences = if text.is_empty() {
            Vec::new()
        } else {
            alloc::vec![SentenceSpan {
                start: 0,
                end: text.len(),
            }]
        };
        Self {
            id: id.into(),
            html: alloc::format!("<p>{text}</p>"),
            text,
            sentences,
            kind: SegmentKind::Paragraph,
        }
    }

    pub fn with_kind(mut self, kind: SegmentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    pub fn with_sentences(mut self, sentences: Vec<SentenceSpan>) -> Self {
        self.sentences = sentences;
        self
    }

    /// Returns the text of sentence `i`, or `None` when the span is out of range or not on a
    /// char boundary.
    pub fn sentence(&self, i: usize) -> Option<&str> {
        let span = self.sentences.get(i)?;
        self.text.get(span.start..span.end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChapterState {
    Loading,
    Ready,
    Failed,
}

/// One chapter slot in the session window.
///
/// A record starts out Loading and is replaced exactly once by a Ready or Failed record; it is
/// never turned back into Loading (a retry installs a fresh placeholder in the same slot).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedChapter {
    pub chapter: Chapter,
    pub chapter_index: usize,
    pub segments: Vec<Arc<ContentSegment>>,
    pub is_loading: bool,
    pub is_from_cache: bool,
    pub error: Option<String>,
}

impl LoadedChapter {
    pub fn loading(chapter: Chapter, chapter_index: usize) -> Self {
        Self {
            chapter,
            chapter_index,
            segments: Vec::new(),
            is_loading: true,
            is_from_cache: false,
            error: None,
        }
    }

    pub fn failed(chapter: Chapter, chapter_index: usize, message: impl Into<String>) -> Self {
        Self {
            chapter,
            chapter_index,
            segments: Vec::new(),
            is_loading: false,
            is_from_cache: false,
            error: Some(message.into()),
        }
    }

    pub fn ready(
        chapter: Chapter,
        chapter_index: usize,
        segments: impl IntoIterator<Item = ContentSegment>,
        is_from_cache: bool,
    ) -> Self {
        Self {
            chapter,
            chapter_index,
            segments: segments.into_iter().map(Arc::new).collect(),
            is_loading: false,
            is_from_cache,
            error: None,
        }
    }

    pub fn state(&self) -> ChapterState {
        if self.is_loading {
            ChapterState::Loading
        } else if self.error.is_some() {
            ChapterState::Failed
        } else {
            ChapterState::Ready
        }
    }

    pub fn content_count(&self) -> usize {
        self.segments.len()
    }

    pub fn url(&self) -> &str {
        &self.chapter.url
    }
}

/// An abstract, persistable reading position.
///
/// `segment_id` is either a real segment id or one of the synthetic keys `header`, `divider`,
/// `image_<n>`, `hrule_<n>`, `scenebreak_<n>`, `authornote_<id>`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadingPosition {
    pub chapter_url: String,
    pub chapter_index: usize,
    pub segment_id: String,
    /// `-1` for the chapter header.
    pub segment_index_in_chapter: i32,
    /// Chapter-relative, in `[0, 1]`.
    pub approximate_progress: f32,
    pub offset_pixels: u32,
    pub timestamp_ms: u64,
}

/// Resolution strategies, best first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResolutionMethod {
    ExactSegmentId,
    SegmentIndex,
    ProgressEstimate,
    ChapterStart,
    NotFound,
}

impl ResolutionMethod {
    pub fn is_found(self) -> bool {
        self != Self::NotFound
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedScrollPosition {
    pub display_index: usize,
    pub offset_pixels: u32,
    pub method: ResolutionMethod,
    /// In `[0, 1]`; `0` for [`ResolutionMethod::NotFound`].
    pub confidence: f32,
}

impl ResolvedScrollPosition {
    pub const NOT_FOUND: Self = Self {
        display_index: 0,
        offset_pixels: 0,
        method: ResolutionMethod::NotFound,
        confidence: 0.0,
    };

    pub fn is_found(&self) -> bool {
        self.method.is_found()
    }
}
