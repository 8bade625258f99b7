use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::{
    Chapter, ChapterState, LoadOutcome, LoadedChapter, PreferencesStore, ProgressManager,
    ReaderDisplayItem, ReadingPosition, ResolvedScrollPosition, ScrollAction, ScrollController,
    SessionOptions, ViewportSnapshot, build_display_items, chapter_item_count,
};

/// A request to fetch one chapter, issued by the session and handed back with the outcome.
///
/// `generation` identifies the request: a completion whose ticket is no longer the live one for
/// its slot (evicted, reopened, retried) is discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub chapter: Chapter,
    pub chapter_index: usize,
    pub generation: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadCompletion {
    pub ticket: LoadTicket,
    pub outcome: LoadOutcome,
}

/// Result of [`ReadingSession::on_viewport`] and [`ReadingSession::preload_window`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewportUpdate {
    /// Loads the host must run (off the owning thread if it likes).
    pub tickets: Vec<LoadTicket>,
    pub evicted: Vec<usize>,
    /// Rows inserted (positive) or removed (negative) before the first visible row. Add it to the
    /// viewport's first visible index to keep the same content on screen.
    pub scroll_adjustment: isize,
}

impl ViewportUpdate {
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty() && self.evicted.is_empty() && self.scroll_adjustment == 0
    }
}

/// Result of applying a completed load.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadApplied {
    pub chapter_index: usize,
    pub state: ChapterState,
    /// Rows added before the first visible row by this chapter growing from its placeholder.
    pub scroll_adjustment: isize,
    /// Set when this load completed the chapter a saved position was waiting on.
    pub restored: Option<ResolvedScrollPosition>,
}

/// One reading session: the chapter window, its display sequence, and position tracking.
///
/// All mutation happens through `&mut self` on the owning (UI) thread. Fetches are described by
/// [`LoadTicket`]s and may run anywhere; their outcomes come back through
/// [`ReadingSession::complete_load`].
#[derive(Debug)]
pub struct ReadingSession<P> {
    options: SessionOptions,
    chapters: Vec<Chapter>,
    controller: ScrollController,
    progress: ProgressManager<P>,

    loaded: BTreeMap<usize, LoadedChapter>,
    in_flight: BTreeMap<usize, u64>, // chapter index -> live ticket generation
    next_generation: u64,
    items: Vec<ReaderDisplayItem>,

    anchor_chapter: Option<usize>, // chapter of the first visible row
    pending_restore: Option<ReadingPosition>,
    last_position: Option<ReadingPosition>,
}

impl<P: PreferencesStore> ReadingSession<P> {
    pub fn new(chapters: Vec<Chapter>, options: SessionOptions, prefs: P) -> Self {
        bdebug!(
            chapters = chapters.len(),
            keep_loaded_range = options.scroll.keep_loaded_range,
            preload_threshold = options.scroll.preload_threshold,
            "ReadingSession::new"
        );
        Self {
            controller: ScrollController::new(options.scroll),
            progress: ProgressManager::new(prefs),
            options,
            chapters,
            loaded: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            next_generation: 0,
            items: Vec::new(),
            anchor_chapter: None,
            pending_restore: None,
            last_position: None,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn total_chapters(&self) -> usize {
        self.chapters.len()
    }

    pub fn controller(&self) -> &ScrollController {
        &self.controller
    }

    pub fn progress(&self) -> &ProgressManager<P> {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressManager<P> {
        &mut self.progress
    }

    pub fn display_items(&self) -> &[ReaderDisplayItem] {
        &self.items
    }

    pub fn item(&self, display_index: usize) -> Option<&ReaderDisplayItem> {
        self.items.get(display_index)
    }

    pub fn loaded_chapters(&self) -> &BTreeMap<usize, LoadedChapter> {
        &self.loaded
    }

    pub fn loaded_chapter(&self, chapter_index: usize) -> Option<&LoadedChapter> {
        self.loaded.get(&chapter_index)
    }

    pub fn loaded_indices(&self) -> BTreeSet<usize> {
        self.loaded.keys().copied().collect()
    }

    pub fn is_in_flight(&self, chapter_index: usize) -> bool {
        self.in_flight.contains_key(&chapter_index)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn pending_restore(&self) -> Option<&ReadingPosition> {
        self.pending_restore.as_ref()
    }

    pub fn last_position(&self) -> Option<&ReadingPosition> {
        self.last_position.as_ref()
    }

    /// Resets the window to `chapter_index` and schedules its load.
    ///
    /// The chapter's saved position (if any) becomes the pending restore, resolved as soon as
    /// the chapter is ready. Returns `None` for an out-of-range index.
    pub fn open_chapter(&mut self, chapter_index: usize) -> Option<LoadTicket> {
        let chapter = self.chapters.get(chapter_index)?.clone();
        bdebug!(chapter_index, url = %chapter.url, "open_chapter");

        self.loaded.clear();
        self.in_flight.clear();
        self.pending_restore = self.progress.load_position(&chapter.url, chapter_index);
        self.anchor_chapter = Some(chapter_index);

        let ticket = self.begin_load(chapter_index, chapter);
        self.rebuild();
        Some(ticket)
    }

    /// Reinstalls a loading placeholder in a failed slot and issues a fresh ticket.
    pub fn retry(&mut self, chapter_index: usize) -> Option<LoadTicket> {
        let slot = self.loaded.get(&chapter_index)?;
        if slot.state() != ChapterState::Failed {
            return None;
        }
        let chapter = slot.chapter.clone();
        bdebug!(chapter_index, "retry");
        let ticket = self.begin_load(chapter_index, chapter);
        self.rebuild();
        Some(ticket)
    }

    /// Evaluates the viewport against the window edges and applies the resulting decisions.
    pub fn on_viewport(&mut self, snapshot: ViewportSnapshot) -> ViewportUpdate {
        let mut update = ViewportUpdate::default();
        let Some(last_row) = self.items.len().checked_sub(1) else {
            return update;
        };
        let first = snapshot.first_visible_index.min(last_row);
        let last = snapshot.last_visible_index.clamp(first, last_row);
        let first_chapter = self.items[first].chapter_index;
        let last_chapter = self.items[last].chapter_index;
        self.anchor_chapter = Some(first_chapter);

        let enabled = self.options.infinite_scroll;
        let total = self.chapters.len();
        let visible = first_chapter..=last_chapter;

        if self.controller.is_near_end(last, self.items.len()) {
            let action =
                self.controller
                    .on_approaching_end(last_chapter, &self.loaded_indices(), total, enabled);
            self.apply_action(action, first_chapter, &visible, &mut update);
        }
        if self.controller.is_near_beginning(first) {
            let action = self.controller.on_approaching_beginning(
                first_chapter,
                &self.loaded_indices(),
                total,
                enabled,
            );
            self.apply_action(action, first_chapter, &visible, &mut update);
        }

        if !update.is_empty() {
            self.rebuild();
        }
        update
    }

    /// Fills the optimal window around `current_chapter_index` and evicts everything outside it.
    ///
    /// Useful right after `open_chapter` to warm up both neighbours at once.
    pub fn preload_window(&mut self, current_chapter_index: usize) -> ViewportUpdate {
        let mut update = ViewportUpdate::default();
        let total = self.chapters.len();
        let anchor = self.anchor_chapter.unwrap_or(current_chapter_index);
        let protected = current_chapter_index..=current_chapter_index;

        let unload = self
            .controller
            .calculate_chapters_to_unload(current_chapter_index, &self.loaded_indices());
        self.evict(&unload, anchor, &protected, &mut update);

        let preload = self.controller.get_chapters_to_preload(
            current_chapter_index,
            &self.loaded_indices(),
            total,
        );
        for chapter_index in preload {
            self.schedule(chapter_index, anchor, &mut update);
        }

        if !update.is_empty() {
            self.rebuild();
        }
        update
    }

    /// Applies a finished fetch. Returns `None` when the completion is stale and was discarded.
    pub fn complete_load(&mut self, completion: LoadCompletion) -> Option<LoadApplied> {
        let LoadCompletion { ticket, outcome } = completion;
        let chapter_index = ticket.chapter_index;

        if outcome.chapter_index() != chapter_index {
            bwarn!(
                chapter_index,
                outcome_index = outcome.chapter_index(),
                "complete_load: outcome does not match its ticket"
            );
            return None;
        }
        if self.in_flight.get(&chapter_index) != Some(&ticket.generation) {
            bdebug!(
                chapter_index,
                generation = ticket.generation,
                "complete_load: discarding stale completion"
            );
            return None;
        }
        self.in_flight.remove(&chapter_index);

        let slot = self.loaded.get_mut(&chapter_index)?;
        if !slot.is_loading {
            return None;
        }
        let before = chapter_item_count(slot);
        *slot = outcome.into_loaded_chapter();
        let after = chapter_item_count(slot);
        let state = slot.state();

        let scroll_adjustment = match self.anchor_chapter {
            Some(anchor) if chapter_index < anchor => signed(after) - signed(before),
            _ => 0,
        };
        self.rebuild();
        bdebug!(chapter_index, ?state, scroll_adjustment, "complete_load");

        let restored = if state == ChapterState::Ready {
            self.resolve_pending_for(chapter_index)
        } else {
            None
        };

        Some(LoadApplied {
            chapter_index,
            state,
            scroll_adjustment,
            restored,
        })
    }

    /// Captures the position at the first visible row and persists it.
    ///
    /// The capture is returned but not written while a saved position for the same chapter is
    /// still waiting to be restored, or when the captured chapter is not ready (its header would
    /// clobber a richer saved position).
    pub fn on_scroll_settle(
        &mut self,
        first_visible_index: usize,
        first_visible_offset: u32,
        now_ms: u64,
    ) -> Option<ReadingPosition> {
        let position = self.progress.capture_position(
            &self.items,
            first_visible_index,
            first_visible_offset,
            &self.loaded,
            now_ms,
        )?;
        self.anchor_chapter = Some(position.chapter_index);

        let ready = self
            .loaded
            .get(&position.chapter_index)
            .is_some_and(|c| c.state() == ChapterState::Ready);
        let blocked = !ready
            || self
                .pending_restore
                .as_ref()
                .is_some_and(|p| p.chapter_url == position.chapter_url);
        if self.options.persist_positions && !blocked {
            self.progress.save_position(&position);
        } else {
            btrace!(blocked, "on_scroll_settle: not persisted");
        }
        self.last_position = Some(position.clone());
        Some(position)
    }

    /// Resolves the pending restore against the current sequence.
    ///
    /// The pending position is consumed only when resolution finds something.
    pub fn resolve_pending(&mut self) -> Option<ResolvedScrollPosition> {
        let pending = self.pending_restore.as_ref()?;
        let resolved = self
            .progress
            .resolve_position(pending, &self.items, &self.loaded);
        if resolved.is_found() {
            self.pending_restore = None;
        }
        Some(resolved)
    }

    pub fn cancel_pending_restore(&mut self) -> Option<ReadingPosition> {
        self.pending_restore.take()
    }

    /// Book-level progress of the last captured position, in `[0, 1]`.
    pub fn overall_progress(&self) -> f32 {
        let Some(position) = &self.last_position else {
            return 0.0;
        };
        ProgressManager::<P>::calculate_overall_progress(
            position.chapter_index,
            self.chapters.len(),
            position.approximate_progress,
        )
    }

    fn resolve_pending_for(&mut self, chapter_index: usize) -> Option<ResolvedScrollPosition> {
        let pending = self.pending_restore.as_ref()?;
        if pending.chapter_index != chapter_index {
            return None;
        }
        self.resolve_pending()
    }

    fn apply_action(
        &mut self,
        action: ScrollAction,
        anchor: usize,
        visible: &core::ops::RangeInclusive<usize>,
        update: &mut ViewportUpdate,
    ) {
        let Some(chapter_index) = action.chapter_index() else {
            return;
        };
        self.evict(action.chapters_to_unload(), anchor, visible, update);
        self.schedule(chapter_index, anchor, update);
    }

    fn evict(
        &mut self,
        indices: &[usize],
        anchor: usize,
        protected: &core::ops::RangeInclusive<usize>,
        update: &mut ViewportUpdate,
    ) {
        let restoring = self.pending_restore.as_ref().map(|p| p.chapter_index);
        for &chapter_index in indices {
            if protected.contains(&chapter_index) || restoring == Some(chapter_index) {
                continue;
            }
            let Some(removed) = self.loaded.remove(&chapter_index) else {
                continue;
            };
            self.in_flight.remove(&chapter_index);
            if chapter_index < anchor {
                update.scroll_adjustment -= signed(chapter_item_count(&removed));
            }
            bdebug!(chapter_index, "evict");
            update.evicted.push(chapter_index);
        }
    }

    fn schedule(&mut self, chapter_index: usize, anchor: usize, update: &mut ViewportUpdate) {
        if self.loaded.contains_key(&chapter_index) {
            return;
        }
        let Some(chapter) = self.chapters.get(chapter_index).cloned() else {
            return;
        };
        let ticket = self.begin_load(chapter_index, chapter);
        if let Some(placeholder) = self.loaded.get(&chapter_index) {
            update.scroll_adjustment += signed(
                self.controller
                    .calculate_scroll_adjustment([placeholder], anchor),
            );
        }
        update.tickets.push(ticket);
    }

    fn begin_load(&mut self, chapter_index: usize, chapter: Chapter) -> LoadTicket {
        let generation = self.next_generation;
        self.next_generation += 1;
        btrace!(chapter_index, generation, "begin_load");

        self.loaded.insert(
            chapter_index,
            LoadedChapter::loading(chapter.clone(), chapter_index),
        );
        self.in_flight.insert(chapter_index, generation);
        LoadTicket {
            chapter,
            chapter_index,
            generation,
        }
    }

    fn rebuild(&mut self) {
        self.items = build_display_items(&self.loaded);
        debug_assert!(
            {
                let mut ids = BTreeSet::new();
                self.items.iter().all(|item| ids.insert(item.item_id()))
            },
            "display item ids must be unique"
        );
    }
}

fn signed(v: usize) -> isize {
    isize::try_from(v).unwrap_or(isize::MAX)
}
