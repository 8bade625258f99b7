use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::{ChapterState, ContentSegment, LoadedChapter, SegmentKind};

/// The per-chapter slot an item occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemKey {
    Header,
    /// Segment index.
    Segment(usize),
    /// Image ordinal within the chapter.
    Image(usize),
    HorizontalRule(usize),
    SceneBreak(usize),
    /// Segment index (note ids from the converter are not guaranteed unique).
    AuthorNote(usize),
    Table(usize),
    List(usize),
    Divider,
    Loading,
    Error,
}

/// Identity of a display item, stable across rebuilds as long as the chapter content is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId {
    pub chapter_index: usize,
    pub key: ItemKey,
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.chapter_index;
        match self.key {
            ItemKey::Header => write!(f, "{c}_header"),
            ItemKey::Segment(i) => write!(f, "{c}_segment_{i}"),
            ItemKey::Image(n) => write!(f, "{c}_image_{n}"),
            ItemKey::HorizontalRule(n) => write!(f, "{c}_hrule_{n}"),
            ItemKey::SceneBreak(n) => write!(f, "{c}_scenebreak_{n}"),
            ItemKey::AuthorNote(i) => write!(f, "{c}_authornote_{i}"),
            ItemKey::Table(i) => write!(f, "{c}_table_{i}"),
            ItemKey::List(i) => write!(f, "{c}_list_{i}"),
            ItemKey::Divider => write!(f, "{c}_divider"),
            ItemKey::Loading => write!(f, "{c}_loading"),
            ItemKey::Error => write!(f, "{c}_error"),
        }
    }
}

/// Variant payloads. Adding a variant forces every `match` over this enum to be revisited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayItemKind {
    ChapterHeader {
        title: String,
    },
    Segment {
        segment: Arc<ContentSegment>,
        segment_index: usize,
    },
    Image {
        segment: Arc<ContentSegment>,
        segment_index: usize,
        image_index: usize,
        src: String,
    },
    HorizontalRule {
        segment_index: usize,
        rule_index: usize,
    },
    SceneBreak {
        segment_index: usize,
        break_index: usize,
    },
    AuthorNote {
        segment: Arc<ContentSegment>,
        segment_index: usize,
        note_id: String,
    },
    Table {
        segment: Arc<ContentSegment>,
        segment_index: usize,
    },
    List {
        segment: Arc<ContentSegment>,
        segment_index: usize,
    },
    ChapterDivider,
    LoadingIndicator,
    ErrorIndicator {
        message: String,
    },
}

/// One renderable row in the virtualized sequence.
///
/// Items refer to their chapter by index and url only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderDisplayItem {
    pub chapter_index: usize,
    pub chapter_url: Arc<str>,
    /// Position within the chapter's run of items; the header is `0`.
    pub order_in_chapter: usize,
    pub kind: DisplayItemKind,
}

impl ReaderDisplayItem {
    pub fn item_id(&self) -> ItemId {
        let key = match &self.kind {
            DisplayItemKind::ChapterHeader { .. } => ItemKey::Header,
            DisplayItemKind::Segment { segment_index, .. } => ItemKey::Segment(*segment_index),
            DisplayItemKind::Image { image_index, .. } => ItemKey::Image(*image_index),
            DisplayItemKind::HorizontalRule { rule_index, .. } => {
                ItemKey::HorizontalRule(*rule_index)
            }
            DisplayItemKind::SceneBreak { break_index, .. } => ItemKey::SceneBreak(*break_index),
            DisplayItemKind::AuthorNote { segment_index, .. } => {
                ItemKey::AuthorNote(*segment_index)
            }
            DisplayItemKind::Table { segment_index, .. } => ItemKey::Table(*segment_index),
            DisplayItemKind::List { segment_index, .. } => ItemKey::List(*segment_index),
            DisplayItemKind::ChapterDivider => ItemKey::Divider,
            DisplayItemKind::LoadingIndicator => ItemKey::Loading,
            DisplayItemKind::ErrorIndicator { .. } => ItemKey::Error,
        };
        ItemId {
            chapter_index: self.chapter_index,
            key,
        }
    }

    /// The id a [`crate::ReadingPosition`] records for this item.
    ///
    /// Real segment ids for text-bearing blocks, synthetic ids for structural ones, and `None` for
    /// placeholders.
    pub fn segment_id(&self) -> Option<String> {
        match &self.kind {
            DisplayItemKind::ChapterHeader { .. } => Some(String::from("header")),
            DisplayItemKind::Segment { segment, .. }
            | DisplayItemKind::Table { segment, .. }
            | DisplayItemKind::List { segment, .. } => Some(segment.id.clone()),
            DisplayItemKind::Image { image_index, .. } => Some(format!("image_{image_index}")),
            DisplayItemKind::HorizontalRule { rule_index, .. } => {
                Some(format!("hrule_{rule_index}"))
            }
            DisplayItemKind::SceneBreak { break_index, .. } => {
                Some(format!("scenebreak_{break_index}"))
            }
            DisplayItemKind::AuthorNote { note_id, .. } => Some(format!("authornote_{note_id}")),
            DisplayItemKind::ChapterDivider => Some(String::from("divider")),
            DisplayItemKind::LoadingIndicator | DisplayItemKind::ErrorIndicator { .. } => None,
        }
    }

    /// Equivalent to `self.segment_id().as_deref() == Some(id)` without allocating.
    pub fn has_segment_id(&self, id: &str) -> bool {
        fn ordinal(id: &str, prefix: &str) -> Option<usize> {
            id.strip_prefix(prefix)?.parse().ok()
        }

        match &self.kind {
            DisplayItemKind::ChapterHeader { .. } => id == "header",
            DisplayItemKind::Segment { segment, .. }
            | DisplayItemKind::Table { segment, .. }
            | DisplayItemKind::List { segment, .. } => segment.id == id,
            DisplayItemKind::Image { image_index, .. } => {
                ordinal(id, "image_") == Some(*image_index)
            }
            DisplayItemKind::HorizontalRule { rule_index, .. } => {
                ordinal(id, "hrule_") == Some(*rule_index)
            }
            DisplayItemKind::SceneBreak { break_index, .. } => {
                ordinal(id, "scenebreak_") == Some(*break_index)
            }
            DisplayItemKind::AuthorNote { note_id, .. } => {
                id.strip_prefix("authornote_") == Some(note_id.as_str())
            }
            DisplayItemKind::ChapterDivider => id == "divider",
            DisplayItemKind::LoadingIndicator | DisplayItemKind::ErrorIndicator { .. } => false,
        }
    }

    /// Index of the backing segment, if the item was produced from one.
    pub fn segment_index(&self) -> Option<usize> {
        match &self.kind {
            DisplayItemKind::Segment { segment_index, .. }
            | DisplayItemKind::Image { segment_index, .. }
            | DisplayItemKind::HorizontalRule { segment_index, .. }
            | DisplayItemKind::SceneBreak { segment_index, .. }
            | DisplayItemKind::AuthorNote { segment_index, .. }
            | DisplayItemKind::Table { segment_index, .. }
            | DisplayItemKind::List { segment_index, .. } => Some(*segment_index),
            DisplayItemKind::ChapterHeader { .. }
            | DisplayItemKind::ChapterDivider
            | DisplayItemKind::LoadingIndicator
            | DisplayItemKind::ErrorIndicator { .. } => None,
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self.kind, DisplayItemKind::ChapterHeader { .. })
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(
            self.kind,
            DisplayItemKind::LoadingIndicator | DisplayItemKind::ErrorIndicator { .. }
        )
    }
}

/// Number of display rows a chapter contributes.
///
/// Loading and failed chapters render as header + indicator; ready chapters as header + one row per
/// segment + trailing divider.
pub fn chapter_item_count(chapter: &LoadedChapter) -> usize {
    match chapter.state() {
        ChapterState::Loading | ChapterState::Failed => 2,
        ChapterState::Ready => 1 + chapter.content_count() + 1,
    }
}

/// Appends the rows for one chapter.
pub fn push_chapter_items(chapter: &LoadedChapter, out: &mut Vec<ReaderDisplayItem>) {
    let chapter_index = chapter.chapter_index;
    let chapter_url: Arc<str> = Arc::from(chapter.url());
    let mut order = 0usize;
    let mut push = |kind: DisplayItemKind, out: &mut Vec<ReaderDisplayItem>| {
        out.push(ReaderDisplayItem {
            chapter_index,
            chapter_url: Arc::clone(&chapter_url),
            order_in_chapter: order,
            kind,
        });
        order += 1;
    };

    push(
        DisplayItemKind::ChapterHeader {
            title: chapter.chapter.name.clone(),
        },
        out,
    );

    match chapter.state() {
        ChapterState::Loading => push(DisplayItemKind::LoadingIndicator, out),
        ChapterState::Failed => push(
            DisplayItemKind::ErrorIndicator {
                message: chapter.error.clone().unwrap_or_default(),
            },
            out,
        ),
        ChapterState::Ready => {
            let mut images = 0usize;
            let mut rules = 0usize;
            let mut breaks = 0usize;
            for (segment_index, segment) in chapter.segments.iter().enumerate() {
                let kind = match &segment.kind {
                    SegmentKind::Paragraph => DisplayItemKind::Segment {
                        segment: Arc::clone(segment),
                        segment_index,
                    },
                    SegmentKind::Image { src } => {
                        images += 1;
                        DisplayItemKind::Image {
                            segment: Arc::clone(segment),
                            segment_index,
                            image_index: images - 1,
                            src: src.clone(),
                        }
                    }
                    SegmentKind::HorizontalRule => {
                        rules += 1;
                        DisplayItemKind::HorizontalRule {
                            segment_index,
                            rule_index: rules - 1,
                        }
                    }
                    SegmentKind::SceneBreak => {
                        breaks += 1;
                        DisplayItemKind::SceneBreak {
                            segment_index,
                            break_index: breaks - 1,
                        }
                    }
                    SegmentKind::AuthorNote { note_id } => DisplayItemKind::AuthorNote {
                        segment: Arc::clone(segment),
                        segment_index,
                        note_id: note_id.clone(),
                    },
                    SegmentKind::Table => DisplayItemKind::Table {
                        segment: Arc::clone(segment),
                        segment_index,
                    },
                    SegmentKind::List => DisplayItemKind::List {
                        segment: Arc::clone(segment),
                        segment_index,
                    },
                };
                push(kind, out);
            }
            push(DisplayItemKind::ChapterDivider, out);
        }
    }
}

/// Flattens the window into one ordered sequence, chapters in ascending index order.
pub fn build_display_items(loaded: &BTreeMap<usize, LoadedChapter>) -> Vec<ReaderDisplayItem> {
    let capacity = loaded.values().map(chapter_item_count).sum();
    let mut out = Vec::with_capacity(capacity);
    for chapter in loaded.values() {
        push_chapter_items(chapter, &mut out);
    }
    out
}

/// Returns the display index of `id`, if present.
pub fn find_item(items: &[ReaderDisplayItem], id: &ItemId) -> Option<usize> {
    items.iter().position(|item| item.item_id() == *id)
}

/// Returns the display index of the first row belonging to `chapter_index`.
pub fn first_item_of_chapter(items: &[ReaderDisplayItem], chapter_index: usize) -> Option<usize> {
    items
        .iter()
        .position(|item| item.chapter_index == chapter_index)
}
