use alloc::collections::BTreeMap;
use alloc::string::ToString;

use crate::{
    DisplayItemKind, LoadedChapter, PreferencesStore, ReaderDisplayItem, ReadingPosition,
    ResolutionMethod, ResolvedScrollPosition, chapter_item_count,
};

const CONFIDENCE_EXACT: f32 = 1.0;
const CONFIDENCE_SEGMENT_INDEX: f32 = 0.9;
const CONFIDENCE_HEADER_INDEX: f32 = 0.85;
const CONFIDENCE_PROGRESS: f32 = 0.6;
const CONFIDENCE_CHAPTER_START: f32 = 0.4;

/// Captures, persists and resolves reading positions.
///
/// Capture and resolution are pure over the snapshots passed in; only `save_position` and
/// `load_position` touch the preferences store.
#[derive(Clone, Debug, Default)]
pub struct ProgressManager<P> {
    prefs: P,
}

impl<P: PreferencesStore> ProgressManager<P> {
    pub fn new(prefs: P) -> Self {
        Self { prefs }
    }

    pub fn preferences(&self) -> &P {
        &self.prefs
    }

    pub fn preferences_mut(&mut self) -> &mut P {
        &mut self.prefs
    }

    pub fn into_preferences(self) -> P {
        self.prefs
    }

    /// Records the position of the row at `first_visible_index`.
    ///
    /// Returns `None` for an out-of-range index or a loading/error placeholder.
    pub fn capture_position(
        &self,
        display_items: &[ReaderDisplayItem],
        first_visible_index: usize,
        first_visible_offset: u32,
        loaded_chapters: &BTreeMap<usize, LoadedChapter>,
        now_ms: u64,
    ) -> Option<ReadingPosition> {
        let item = display_items.get(first_visible_index)?;
        let segment_id = item.segment_id()?;

        let chapter = loaded_chapters.get(&item.chapter_index);
        let total_items = match chapter {
            Some(chapter) => chapter_item_count(chapter),
            None => display_items
                .iter()
                .filter(|other| other.chapter_index == item.chapter_index)
                .count(),
        };
        let approximate_progress = if total_items == 0 {
            0.0
        } else {
            (item.order_in_chapter as f32 / total_items as f32).clamp(0.0, 1.0)
        };

        let segment_index = match &item.kind {
            DisplayItemKind::ChapterHeader { .. } => -1,
            DisplayItemKind::ChapterDivider => {
                let segments = match chapter {
                    Some(chapter) => chapter.content_count(),
                    None => display_items
                        .iter()
                        .filter(|other| {
                            other.chapter_index == item.chapter_index
                                && other.segment_index().is_some()
                        })
                        .count(),
                };
                to_i32(segments)
            }
            _ => item.segment_index().map_or(-1, to_i32),
        };

        let position = ReadingPosition {
            chapter_url: item.chapter_url.to_string(),
            chapter_index: item.chapter_index,
            segment_id,
            segment_index_in_chapter: segment_index,
            approximate_progress,
            offset_pixels: first_visible_offset,
            timestamp_ms: now_ms,
        };
        btrace!(
            chapter_index = position.chapter_index,
            segment_id = %position.segment_id,
            progress = position.approximate_progress,
            "capture_position"
        );
        Some(position)
    }

    /// Maps a saved position back onto `display_items`.
    ///
    /// Strategies run strictly in order and the first hit wins: exact segment id, segment index,
    /// progress estimate, chapter start. The target chapter must be present and not loading.
    pub fn resolve_position(
        &self,
        saved: &ReadingPosition,
        display_items: &[ReaderDisplayItem],
        loaded_chapters: &BTreeMap<usize, LoadedChapter>,
    ) -> ResolvedScrollPosition {
        let Some(chapter) = loaded_chapters
            .values()
            .find(|c| c.url() == saved.chapter_url && !c.is_loading)
        else {
            bdebug!(url = %saved.chapter_url, "resolve_position: chapter not loaded");
            return ResolvedScrollPosition::NOT_FOUND;
        };

        let resolved = find_by_segment_id(saved, display_items)
            .or_else(|| find_by_segment_index(saved, display_items))
            .or_else(|| find_by_progress(saved, display_items, chapter))
            .or_else(|| find_chapter_start(saved, display_items))
            .unwrap_or(ResolvedScrollPosition::NOT_FOUND);
        bdebug!(
            url = %saved.chapter_url,
            method = ?resolved.method,
            display_index = resolved.display_index,
            "resolve_position"
        );
        resolved
    }

    pub fn save_position(&mut self, position: &ReadingPosition) {
        self.prefs.save_reading_position(
            &position.chapter_url,
            &position.segment_id,
            position.segment_index_in_chapter,
            position.approximate_progress,
            position.offset_pixels,
            position.timestamp_ms,
        );
    }

    pub fn load_position(&self, chapter_url: &str, chapter_index: usize) -> Option<ReadingPosition> {
        let stored = self.prefs.reading_position(chapter_url)?;
        Some(ReadingPosition {
            chapter_url: chapter_url.to_string(),
            chapter_index,
            segment_id: stored.segment_id,
            segment_index_in_chapter: stored.segment_index,
            approximate_progress: stored.progress,
            offset_pixels: stored.offset_pixels,
            timestamp_ms: stored.timestamp_ms,
        })
    }

    pub fn calculate_chapter_progress(current_segment_index: usize, total_segments: usize) -> f32 {
        if total_segments == 0 {
            return 0.0;
        }
        (current_segment_index as f32 / total_segments as f32).clamp(0.0, 1.0)
    }

    pub fn calculate_overall_progress(
        current_chapter_index: usize,
        total_chapters: usize,
        chapter_progress: f32,
    ) -> f32 {
        if total_chapters == 0 {
            return 0.0;
        }
        (current_chapter_index as f32 + chapter_progress) / total_chapters as f32
    }
}

fn to_i32(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

fn in_chapter<'a>(
    saved: &'a ReadingPosition,
    display_items: &'a [ReaderDisplayItem],
) -> impl Iterator<Item = (usize, &'a ReaderDisplayItem)> + 'a {
    display_items
        .iter()
        .enumerate()
        .filter(move |(_, item)| *item.chapter_url == *saved.chapter_url)
}

fn found(
    display_index: usize,
    offset_pixels: u32,
    method: ResolutionMethod,
    confidence: f32,
) -> ResolvedScrollPosition {
    ResolvedScrollPosition {
        display_index,
        offset_pixels,
        method,
        confidence,
    }
}

fn find_by_segment_id(
    saved: &ReadingPosition,
    display_items: &[ReaderDisplayItem],
) -> Option<ResolvedScrollPosition> {
    if saved.segment_id.is_empty() {
        return None;
    }
    // Synthetic ids (author notes) can repeat within a chapter; the saved index breaks the tie.
    let target = usize::try_from(saved.segment_index_in_chapter).ok();
    let mut chosen = None;
    for (index, item) in in_chapter(saved, display_items)
        .filter(|(_, item)| item.has_segment_id(&saved.segment_id))
    {
        if target.is_some() && item.segment_index() == target {
            chosen = Some(index);
            break;
        }
        chosen.get_or_insert(index);
    }
    Some(found(
        chosen?,
        saved.offset_pixels,
        ResolutionMethod::ExactSegmentId,
        CONFIDENCE_EXACT,
    ))
}

fn find_by_segment_index(
    saved: &ReadingPosition,
    display_items: &[ReaderDisplayItem],
) -> Option<ResolvedScrollPosition> {
    let Ok(target) = usize::try_from(saved.segment_index_in_chapter) else {
        let (index, _) = in_chapter(saved, display_items).find(|(_, item)| item.is_header())?;
        return Some(found(
            index,
            saved.offset_pixels,
            ResolutionMethod::SegmentIndex,
            CONFIDENCE_HEADER_INDEX,
        ));
    };
    let (index, _) = in_chapter(saved, display_items)
        .find(|(_, item)| item.segment_index() == Some(target))?;
    Some(found(
        index,
        saved.offset_pixels,
        ResolutionMethod::SegmentIndex,
        CONFIDENCE_SEGMENT_INDEX,
    ))
}

fn find_by_progress(
    saved: &ReadingPosition,
    display_items: &[ReaderDisplayItem],
    chapter: &LoadedChapter,
) -> Option<ResolvedScrollPosition> {
    let count = chapter.content_count();
    let progress = saved.approximate_progress;
    if count == 0 || progress.is_nan() {
        return None;
    }
    // The chapter may have fewer segments than when the position was saved; clamp rather than
    // miss.
    let scaled = progress.clamp(0.0, 1.0) * count as f32;
    let target = ((scaled + 0.5) as usize).min(count - 1);
    let (index, _) = in_chapter(saved, display_items)
        .find(|(_, item)| item.segment_index().is_some_and(|i| i >= target))?;
    Some(found(
        index,
        0,
        ResolutionMethod::ProgressEstimate,
        CONFIDENCE_PROGRESS,
    ))
}

fn find_chapter_start(
    saved: &ReadingPosition,
    display_items: &[ReaderDisplayItem],
) -> Option<ResolvedScrollPosition> {
    let (index, _) = in_chapter(saved, display_items)
        .find(|(_, item)| item.is_header())
        .or_else(|| {
            in_chapter(saved, display_items).find(|(_, item)| item.segment_index().is_some())
        })?;
    Some(found(
        index,
        0,
        ResolutionMethod::ChapterStart,
        CONFIDENCE_CHAPTER_START,
    ))
}
