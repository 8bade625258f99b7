use std::time::Duration;

use bookflow::{
    LoadApplied, LoadCompletion, PreferencesStore, ReadingPosition, ReadingSession,
    ViewportSnapshot,
};

use crate::{LoadDispatcher, ScrollAnchor, capture_anchor};

/// What the host view must do to its scroll state after the sequence changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ViewportCommand {
    /// Shift the first visible row by `rows`, keeping the pixel offset.
    ScrollBy { rows: isize },
    /// Jump to a row (used when a saved position has been restored).
    ScrollTo { index: usize, offset_pixels: u32 },
}

/// A framework-neutral controller that wraps a [`ReadingSession`] and a [`LoadDispatcher`].
///
/// This type does not hold any UI objects. Adapters drive it by calling:
/// - `open` when the reader picks a chapter
/// - `on_scroll` after every layout/scroll pass
/// - `pump` each frame/timer tick to apply finished loads
/// - `on_scroll_settle` once scrolling stops
///
/// The returned [`ViewportCommand`]s must be applied in order.
#[derive(Debug)]
pub struct Controller<P> {
    session: ReadingSession<P>,
    dispatcher: LoadDispatcher,
    viewport: ViewportSnapshot,
}

impl<P: PreferencesStore> Controller<P> {
    pub fn new(session: ReadingSession<P>, dispatcher: LoadDispatcher) -> Self {
        Self {
            session,
            dispatcher,
            viewport: ViewportSnapshot::default(),
        }
    }

    pub fn session(&self) -> &ReadingSession<P> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ReadingSession<P> {
        &mut self.session
    }

    pub fn dispatcher(&self) -> &LoadDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut LoadDispatcher {
        &mut self.dispatcher
    }

    pub fn into_session(self) -> ReadingSession<P> {
        self.session
    }

    /// The last viewport reported through `on_scroll`, adjusted by every command issued since.
    pub fn viewport(&self) -> ViewportSnapshot {
        self.viewport
    }

    /// Opens a chapter and starts loading it. Returns `false` for an out-of-range index.
    pub fn open(&mut self, chapter_index: usize) -> bool {
        let Some(ticket) = self.session.open_chapter(chapter_index) else {
            return false;
        };
        let span = self
            .viewport
            .last_visible_index
            .saturating_sub(self.viewport.first_visible_index);
        self.viewport = ViewportSnapshot::new(0, 0, span);
        self.dispatcher.dispatch(ticket);
        true
    }

    /// Reloads a failed chapter. Returns `false` when the slot is not in the failed state.
    pub fn retry(&mut self, chapter_index: usize) -> bool {
        let Some(ticket) = self.session.retry(chapter_index) else {
            return false;
        };
        self.dispatcher.dispatch(ticket);
        true
    }

    /// Reports the visible rows after a scroll or layout pass.
    pub fn on_scroll(&mut self, snapshot: ViewportSnapshot) -> Vec<ViewportCommand> {
        self.viewport = snapshot;
        let update = self.session.on_viewport(snapshot);
        self.dispatcher.dispatch_all(update.tickets);

        let mut commands = Vec::new();
        self.scroll_by(update.scroll_adjustment, &mut commands);
        commands
    }

    pub fn on_scroll_settle(&mut self, now_ms: u64) -> Option<ReadingPosition> {
        self.session.on_scroll_settle(
            self.viewport.first_visible_index,
            self.viewport.first_visible_offset,
            now_ms,
        )
    }

    /// Applies every completion that has arrived so far.
    pub fn pump(&mut self) -> Vec<ViewportCommand> {
        let completions = self.dispatcher.try_drain();
        self.apply_completions(completions)
    }

    /// Like [`Self::pump`], but first waits up to `timeout` for at least one completion.
    pub fn pump_blocking(&mut self, timeout: Duration) -> Vec<ViewportCommand> {
        let mut completions: Vec<LoadCompletion> = self.dispatcher.wait(timeout).into_iter().collect();
        completions.extend(self.dispatcher.try_drain());
        self.apply_completions(completions)
    }

    /// Whether any dispatched load has not been pumped yet.
    pub fn is_loading(&self) -> bool {
        self.dispatcher.outstanding() > 0
    }

    pub fn capture_anchor(&self) -> Option<ScrollAnchor> {
        capture_anchor(
            self.session.display_items(),
            self.viewport.first_visible_index,
            self.viewport.first_visible_offset,
        )
    }

    fn apply_completions(&mut self, completions: Vec<LoadCompletion>) -> Vec<ViewportCommand> {
        let mut commands = Vec::new();
        for completion in completions {
            let Some(applied) = self.session.complete_load(completion) else {
                continue;
            };
            self.apply(applied, &mut commands);
        }
        commands
    }

    fn apply(&mut self, applied: LoadApplied, commands: &mut Vec<ViewportCommand>) {
        self.scroll_by(applied.scroll_adjustment, commands);

        let Some(restored) = applied.restored.filter(|r| r.is_found()) else {
            return;
        };
        adebug!(
            chapter_index = applied.chapter_index,
            display_index = restored.display_index,
            method = ?restored.method,
            "restored saved position"
        );
        let span = self
            .viewport
            .last_visible_index
            .saturating_sub(self.viewport.first_visible_index);
        self.viewport = ViewportSnapshot::new(
            restored.display_index,
            restored.offset_pixels,
            restored.display_index + span,
        );
        commands.push(ViewportCommand::ScrollTo {
            index: restored.display_index,
            offset_pixels: restored.offset_pixels,
        });
    }

    fn scroll_by(&mut self, rows: isize, commands: &mut Vec<ViewportCommand>) {
        if rows == 0 {
            return;
        }
        self.viewport = self.viewport.shifted(rows);
        commands.push(ViewportCommand::ScrollBy { rows });
    }
}
