//! Collaborator seams: where raw content comes from, how it is split into segments, and where
//! reading positions are stored.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::{ContentSegment, SegmentKind, SentenceSpan, SourceError};

/// Fetches raw chapter content (network, disk, archive...).
///
/// Implementations are called off the session's owning thread, so they must be `Send + Sync`.
pub trait ContentSource: Send + Sync {
    fn load_chapter_content(&self, chapter_url: &str) -> Result<String, SourceError>;

    /// Whether `chapter_url` can be served without the network.
    fn is_chapter_offline(&self, _chapter_url: &str) -> bool {
        false
    }
}

impl<F> ContentSource for F
where
    F: Fn(&str) -> Result<String, SourceError> + Send + Sync,
{
    fn load_chapter_content(&self, chapter_url: &str) -> Result<String, SourceError> {
        self(chapter_url)
    }
}

/// Converts raw content into an ordered list of segments.
///
/// Must preserve document order.
pub trait ContentConverter: Send + Sync {
    fn convert(&self, raw: &str) -> Vec<ContentSegment>;
}

impl<F> ContentConverter for F
where
    F: Fn(&str) -> Vec<ContentSegment> + Send + Sync,
{
    fn convert(&self, raw: &str) -> Vec<ContentSegment> {
        self(raw)
    }
}

/// A plain-text converter: blank lines separate blocks.
///
/// Recognized block markers:
/// - `***`, `* * *`, `#` → scene break
/// - `---`, `___` → horizontal rule
/// - `![alt](src)` → image
/// - `[note:<id>] text` → author note
///
/// Everything else becomes a paragraph. Segment ids are `p<block index>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextConverter;

impl ContentConverter for PlainTextConverter {
    fn convert(&self, raw: &str) -> Vec<ContentSegment> {
        raw.split("\n\n")
            .map(str::trim)
            .filter(|block| !block.is_empty())
            .enumerate()
            .map(|(i, block)| plain_block(format!("p{i}"), block))
            .collect()
    }
}

fn plain_block(id: String, block: &str) -> ContentSegment {
    match block {
        "***" | "* * *" | "#" => {
            return ContentSegment::paragraph(id, "").with_kind(SegmentKind::SceneBreak);
        }
        "---" | "___" => {
            return ContentSegment::paragraph(id, "")
                .with_html("<hr/>")
                .with_kind(SegmentKind::HorizontalRule);
        }
        _ => {}
    }

    if let Some(rest) = block.strip_prefix("![")
        && let Some((alt, tail)) = rest.split_once("](")
        && let Some(src) = tail.strip_suffix(')')
    {
        return ContentSegment::paragraph(id, alt)
            .with_html(format!("<img src=\"{src}\" alt=\"{alt}\"/>"))
            .with_kind(SegmentKind::Image {
                src: src.to_string(),
            });
    }

    if let Some(rest) = block.strip_prefix("[note:")
        && let Some((note_id, text)) = rest.split_once(']')
    {
        let text = text.trim();
        return ContentSegment::paragraph(id, text)
            .with_sentences(split_sentences(text))
            .with_kind(SegmentKind::AuthorNote {
                note_id: note_id.trim().to_string(),
            });
    }

    ContentSegment::paragraph(id, block).with_sentences(split_sentences(block))
}

/// Splits on `.`, `!` or `?` followed by whitespace. Trailing text without a terminator is its
/// own sentence.
pub fn split_sentences(text: &str) -> Vec<SentenceSpan> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut prev_terminal = false;
    for (i, ch) in text.char_indices() {
        if prev_terminal && ch.is_whitespace() {
            push_trimmed(text, start, i, &mut out);
            start = i;
        }
        prev_terminal = matches!(ch, '.' | '!' | '?');
    }
    push_trimmed(text, start, text.len(), &mut out);
    out
}

fn push_trimmed(text: &str, start: usize, end: usize, out: &mut Vec<SentenceSpan>) {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    let span = SentenceSpan {
        start: start + lead,
        end: end - trail,
    };
    if !span.is_empty() {
        out.push(span);
    }
}

/// A persisted reading position, keyed externally by chapter url.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoredPosition {
    pub segment_id: String,
    pub segment_index: i32,
    pub progress: f32,
    pub offset_pixels: u32,
    pub timestamp_ms: u64,
}

/// Where reading positions live between sessions.
///
/// Writes are best-effort: an implementation may queue them and drop the queue on shutdown.
pub trait PreferencesStore {
    fn save_reading_position(
        &mut self,
        chapter_url: &str,
        segment_id: &str,
        segment_index: i32,
        progress: f32,
        offset_pixels: u32,
        timestamp_ms: u64,
    );

    fn reading_position(&self, chapter_url: &str) -> Option<StoredPosition>;
}

/// An in-memory [`PreferencesStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryPreferences {
    positions: BTreeMap<String, StoredPosition>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn remove(&mut self, chapter_url: &str) -> Option<StoredPosition> {
        self.positions.remove(chapter_url)
    }
}

impl PreferencesStore for MemoryPreferences {
    fn save_reading_position(
        &mut self,
        chapter_url: &str,
        segment_id: &str,
        segment_index: i32,
        progress: f32,
        offset_pixels: u32,
        timestamp_ms: u64,
    ) {
        self.positions.insert(
            chapter_url.to_string(),
            StoredPosition {
                segment_id: segment_id.to_string(),
                segment_index,
                progress,
                offset_pixels,
                timestamp_ms,
            },
        );
    }

    fn reading_position(&self, chapter_url: &str) -> Option<StoredPosition> {
        self.positions.get(chapter_url).cloned()
    }
}
