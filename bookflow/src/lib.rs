//! A headless reading-session engine for long-form, chapter-based content.
//!
//! For adapter-level utilities (off-thread loading, viewport commands, anchors), see the
//! `bookflow-adapter` crate.
//!
//! The engine streams chapters into one virtualized, bidirectionally scrollable sequence of
//! display items while keeping only a bounded window of chapters in memory, and restores a
//! previously saved reading position after that window has been reloaded, shifted, or evicted.
//!
//! It is UI-agnostic. A TUI/GUI layer is expected to provide:
//! - the first/last visible row and the first row's pixel offset
//! - a way to run [`ChapterLoader::load_chapter`] for each [`LoadTicket`]
//! - rendering for each [`ReaderDisplayItem`]
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod controller;
mod display;
mod error;
mod loader;
mod options;
mod progress;
mod session;
mod source;
mod state;
mod types;


pub use controller::{ScrollAction, ScrollController};
pub use display::{
    DisplayItemKind, ItemId, ItemKey, ReaderDisplayItem, build_display_items, chapter_item_count,
    find_item, first_item_of_chapter, push_chapter_items,
};
pub use error::{LoadError, SourceError};
pub use loader::{ChapterLoader, LoadOutcome};
pub use options::{ScrollConfig, SessionOptions};
pub use progress::ProgressManager;
pub use session::{LoadApplied, LoadCompletion, LoadTicket, ReadingSession, ViewportUpdate};
pub use source::{
    ContentConverter, ContentSource, MemoryPreferences, PlainTextConverter, PreferencesStore,
    StoredPosition, split_sentences,
};
pub use state::ViewportSnapshot;
pub use types::{
    Chapter, ChapterState, ContentSegment, LoadedChapter, ReadingPosition, ResolutionMethod,
    ResolvedScrollPosition, SegmentKind, SentenceSpan,
};
