use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::ops::RangeInclusive;

use crate::{LoadedChapter, ScrollConfig, chapter_item_count};

/// A load/evict decision for the hosting session.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollAction {
    None,
    LoadNext {
        chapter_index: usize,
        chapters_to_unload: Vec<usize>,
    },
    LoadPrevious {
        chapter_index: usize,
        chapters_to_unload: Vec<usize>,
    },
}

impl ScrollAction {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn chapter_index(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::LoadNext { chapter_index, .. } | Self::LoadPrevious { chapter_index, .. } => {
                Some(*chapter_index)
            }
        }
    }

    pub fn chapters_to_unload(&self) -> &[usize] {
        match self {
            Self::None => &[],
            Self::LoadNext {
                chapters_to_unload, ..
            }
            | Self::LoadPrevious {
                chapters_to_unload, ..
            } => chapters_to_unload,
        }
    }
}

/// Decides when to grow the chapter window and what to drop from it.
///
/// Holds only configuration: every method is a pure function of the snapshots passed in, so the
/// caller stays the single owner of the loaded-chapter map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollController {
    config: ScrollConfig,
}

impl ScrollController {
    pub fn new(config: ScrollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// Whether the last visible row is within `trigger_item_threshold` rows of the end.
    pub fn is_near_end(&self, last_visible_index: usize, item_count: usize) -> bool {
        item_count > 0
            && last_visible_index.saturating_add(self.config.trigger_item_threshold) >= item_count
    }

    /// Whether the first visible row is within `trigger_item_threshold` rows of the start.
    pub fn is_near_beginning(&self, first_visible_index: usize) -> bool {
        first_visible_index <= self.config.trigger_item_threshold
    }

    pub fn on_approaching_end(
        &self,
        last_visible_chapter_index: usize,
        loaded_indices: &BTreeSet<usize>,
        total_chapters: usize,
        enabled: bool,
    ) -> ScrollAction {
        if !enabled || total_chapters == 0 {
            return ScrollAction::None;
        }
        let Some(&max_loaded) = loaded_indices.last() else {
            return ScrollAction::None;
        };
        if last_visible_chapter_index.saturating_add(self.config.preload_threshold) < max_loaded {
            return ScrollAction::None;
        }
        let next = max_loaded + 1;
        if next >= total_chapters || loaded_indices.contains(&next) {
            return ScrollAction::None;
        }

        let chapters_to_unload =
            self.calculate_chapters_to_unload(last_visible_chapter_index, loaded_indices);
        btrace!(
            next,
            last_visible_chapter_index,
            unload = chapters_to_unload.len(),
            "on_approaching_end"
        );
        ScrollAction::LoadNext {
            chapter_index: next,
            chapters_to_unload,
        }
    }

    pub fn on_approaching_beginning(
        &self,
        first_visible_chapter_index: usize,
        loaded_indices: &BTreeSet<usize>,
        total_chapters: usize,
        enabled: bool,
    ) -> ScrollAction {
        if !enabled || total_chapters == 0 {
            return ScrollAction::None;
        }
        let Some(&min_loaded) = loaded_indices.first() else {
            return ScrollAction::None;
        };
        if first_visible_chapter_index > min_loaded.saturating_add(self.config.preload_threshold) {
            return ScrollAction::None;
        }
        let Some(prev) = min_loaded.checked_sub(1) else {
            return ScrollAction::None;
        };
        if prev >= total_chapters || loaded_indices.contains(&prev) {
            return ScrollAction::None;
        }

        let chapters_to_unload =
            self.calculate_chapters_to_unload(first_visible_chapter_index, loaded_indices);
        btrace!(
            prev,
            first_visible_chapter_index,
            unload = chapters_to_unload.len(),
            "on_approaching_beginning"
        );
        ScrollAction::LoadPrevious {
            chapter_index: prev,
            chapters_to_unload,
        }
    }

    /// Every loaded index outside `[current - keep, current + keep]`, ascending.
    pub fn calculate_chapters_to_unload(
        &self,
        current_chapter_index: usize,
        loaded_indices: &BTreeSet<usize>,
    ) -> Vec<usize> {
        let keep = self.keep_interval(current_chapter_index);
        loaded_indices
            .iter()
            .copied()
            .filter(|i| !keep.contains(i))
            .collect()
    }

    /// `[current - keep, current + keep]` clamped to the book. `None` for an empty book.
    pub fn get_optimal_loaded_range(
        &self,
        current_chapter_index: usize,
        total_chapters: usize,
    ) -> Option<RangeInclusive<usize>> {
        let last = total_chapters.checked_sub(1)?;
        let keep = self.keep_interval(current_chapter_index.min(last));
        Some(*keep.start()..=(*keep.end()).min(last))
    }

    /// Chapters in the optimal range that are not loaded yet, nearest first with chapters ahead of
    /// the current one before chapters behind it.
    pub fn get_chapters_to_preload(
        &self,
        current_chapter_index: usize,
        loaded_indices: &BTreeSet<usize>,
        total_chapters: usize,
    ) -> Vec<usize> {
        let Some(range) = self.get_optimal_loaded_range(current_chapter_index, total_chapters)
        else {
            return Vec::new();
        };
        let mut out: Vec<usize> = range.filter(|i| !loaded_indices.contains(i)).collect();
        out.sort_by_key(|&i| {
            (
                i < current_chapter_index,
                i.abs_diff(current_chapter_index),
            )
        });
        out
    }

    pub fn calculate_chapter_item_count(&self, chapter: &LoadedChapter) -> usize {
        chapter_item_count(chapter)
    }

    /// Rows inserted before `current_chapter_index` by `added_chapters`.
    ///
    /// The viewport shifts its first visible index by this amount to avoid a visual jump after a
    /// prepend.
    pub fn calculate_scroll_adjustment<'a>(
        &self,
        added_chapters: impl IntoIterator<Item = &'a LoadedChapter>,
        current_chapter_index: usize,
    ) -> usize {
        added_chapters
            .into_iter()
            .filter(|c| c.chapter_index < current_chapter_index)
            .map(chapter_item_count)
            .sum()
    }

    fn keep_interval(&self, current_chapter_index: usize) -> RangeInclusive<usize> {
        let keep = self.config.keep_loaded_range;
        current_chapter_index.saturating_sub(keep)..=current_chapter_index.saturating_add(keep)
    }
}
