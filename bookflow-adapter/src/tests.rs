use crate::*;

use std::time::Duration;

use bookflow::{
    Chapter, ChapterLoader, ChapterState, MemoryPreferences, PreferencesStore, ReadingSession,
    ScrollConfig, SessionOptions, SourceError, ViewportSnapshot,
};

const WAIT: Duration = Duration::from_secs(5);

fn book(count: usize) -> Vec<Chapter> {
    (0..count)
        .map(|i| Chapter::new(format!("c{i}"), format!("Chapter {i}"), i))
        .collect()
}

fn book_source(url: &str) -> Result<String, SourceError> {
    Ok((0..5)
        .map(|j| format!("{url} paragraph {j}."))
        .collect::<Vec<_>>()
        .join("\n\n"))
}

fn failing_source(_url: &str) -> Result<String, SourceError> {
    Err(SourceError::new("offline"))
}

fn panicking_source(url: &str) -> Result<String, SourceError> {
    panic!("parser blew up on {url}")
}

fn options() -> SessionOptions {
    SessionOptions::new().with_scroll(
        ScrollConfig::new()
            .with_keep_loaded_range(1)
            .with_trigger_item_threshold(2),
    )
}

fn controller(dispatcher: LoadDispatcher, prefs: MemoryPreferences) -> Controller<MemoryPreferences> {
    Controller::new(ReadingSession::new(book(10), options(), prefs), dispatcher)
}

fn inline_controller() -> Controller<MemoryPreferences> {
    controller(
        LoadDispatcher::inline(ChapterLoader::default().with_source(book_source)),
        MemoryPreferences::new(),
    )
}

#[test]
fn inline_dispatch_queues_completion() {
    let mut session = ReadingSession::new(book(3), options(), MemoryPreferences::new());
    let mut d = LoadDispatcher::inline(ChapterLoader::default().with_source(book_source));
    assert_eq!(d.mode(), DispatchMode::Inline);

    d.dispatch(session.open_chapter(1).unwrap());
    assert_eq!(d.outstanding(), 1);
    let completions = d.try_drain();
    assert_eq!(completions.len(), 1);
    assert_eq!(d.outstanding(), 0);
    assert!(d.wait(Duration::from_millis(1)).is_none());

    let applied = completions
        .into_iter()
        .map(|c| session.complete_load(c).unwrap())
        .next()
        .unwrap();
    assert_eq!(applied.state, ChapterState::Ready);
}

#[test]
fn threaded_dispatch_delivers_every_completion() {
    let mut session = ReadingSession::new(book(10), options(), MemoryPreferences::new());
    let mut d = LoadDispatcher::threaded(ChapterLoader::default().with_source(book_source));
    d.dispatch(session.open_chapter(4).unwrap());
    d.dispatch_all(session.preload_window(4).tickets);
    assert_eq!(d.outstanding(), 3);

    let mut received = Vec::new();
    while let Some(completion) = d.wait(WAIT) {
        received.push(completion.ticket.chapter_index);
        assert!(session.complete_load(completion).is_some());
    }
    received.sort_unstable();
    assert_eq!(received, vec![3, 4, 5]);
    assert_eq!(d.outstanding(), 0);
    assert_eq!(session.display_items().len(), 21);
}

#[test]
fn controller_opens_and_loads() {
    let mut c = inline_controller();
    assert!(!c.open(99));
    assert!(c.open(4));
    assert!(c.is_loading());
    assert_eq!(c.session().display_items().len(), 2);

    assert!(c.pump().is_empty());
    assert!(!c.is_loading());
    assert_eq!(c.session().display_items().len(), 7);
}

#[test]
fn controller_compensates_prepend() {
    let mut c = inline_controller();
    c.open(4);
    c.pump();

    let commands = c.on_scroll(ViewportSnapshot::new(0, 10, 6));
    assert_eq!(commands, vec![ViewportCommand::ScrollBy { rows: 2 }]);
    assert_eq!(c.viewport().first_visible_index, 2);

    // Chapter 5 appends (no shift), chapter 3 grows from 2 to 7 rows above the viewport.
    let commands = c.pump();
    assert_eq!(commands, vec![ViewportCommand::ScrollBy { rows: 5 }]);
    let viewport = c.viewport();
    assert_eq!(viewport.first_visible_index, 7);
    assert_eq!(viewport.first_visible_offset, 10);

    let top = &c.session().display_items()[viewport.first_visible_index];
    assert_eq!(top.chapter_index, 4);
    assert!(top.is_header());
}

#[test]
fn controller_restores_saved_position() {
    let mut prefs = MemoryPreferences::new();
    prefs.save_reading_position("c6", "p2", 2, 0.4, 18, 1);
    let mut c = controller(
        LoadDispatcher::inline(ChapterLoader::default().with_source(book_source)),
        prefs,
    );
    c.open(6);
    let commands = c.pump();
    assert_eq!(
        commands,
        vec![ViewportCommand::ScrollTo {
            index: 3,
            offset_pixels: 18
        }]
    );

    let position = c.on_scroll_settle(50).unwrap();
    assert_eq!(position.segment_id, "p2");
    assert_eq!(position.offset_pixels, 18);
    assert_eq!(position.timestamp_ms, 50);
}

#[test]
fn controller_retries_failed_chapter() {
    let mut c = controller(
        LoadDispatcher::inline(ChapterLoader::default().with_source(failing_source)),
        MemoryPreferences::new(),
    );
    c.open(2);
    c.pump();
    assert_eq!(
        c.session().loaded_chapter(2).unwrap().state(),
        ChapterState::Failed
    );
    assert!(!c.retry(3));

    c.dispatcher_mut().loader_mut().configure(book_source);
    assert!(c.retry(2));
    c.pump();
    assert_eq!(
        c.session().loaded_chapter(2).unwrap().state(),
        ChapterState::Ready
    );
}

#[test]
fn threaded_controller_settles_after_blocking_pump() {
    let mut c = controller(
        LoadDispatcher::threaded(ChapterLoader::default().with_source(book_source)),
        MemoryPreferences::new(),
    );
    c.open(0);
    while c.is_loading() {
        c.pump_blocking(WAIT);
    }
    assert_eq!(c.session().display_items().len(), 7);
    assert!(c.session().in_flight_count() == 0);
}

#[test]
fn anchor_survives_prepend_and_eviction() {
    let mut c = inline_controller();
    c.open(4);
    c.pump();
    c.on_scroll(ViewportSnapshot::new(0, 0, 6));
    c.pump();

    // Rows: ch3 0..7, ch4 7..14, ch5 14..21. Anchor on ch4's third paragraph.
    let items = c.session().display_items();
    let anchor = capture_anchor(items, 10, 4).unwrap();
    assert_eq!(apply_anchor(items, &anchor), Some(10));
    assert!(capture_anchor(items, 21, 0).is_none());

    // Scrolling into ch5 evicts ch3 and shifts ch4 up by 7 rows.
    c.on_scroll(ViewportSnapshot::new(16, 0, 20));
    let items = c.session().display_items();
    assert_eq!(apply_anchor(items, &anchor), Some(3));
    assert_eq!(anchor.offset_pixels, 4);
}

#[test]
fn anchor_falls_back_to_chapter_start() {
    let mut c = inline_controller();
    c.open(4);
    let loading = capture_anchor(c.session().display_items(), 1, 0).unwrap();
    c.pump();
    assert_eq!(apply_anchor(c.session().display_items(), &loading), Some(0));
}

#[test]
fn panicking_source_fails_the_chapter_instead_of_hanging() {
    for dispatcher in [
        LoadDispatcher::threaded(ChapterLoader::default().with_source(panicking_source)),
        LoadDispatcher::inline(ChapterLoader::default().with_source(panicking_source)),
    ] {
        let mut c = controller(dispatcher, MemoryPreferences::new());
        c.open(2);
        for _ in 0..10 {
            if !c.is_loading() {
                break;
            }
            c.pump_blocking(WAIT);
        }
        assert!(!c.is_loading());

        let slot = c.session().loaded_chapter(2).unwrap();
        assert_eq!(slot.state(), ChapterState::Failed);
        assert!(
            slot.error
                .as_deref()
                .is_some_and(|e| e.contains("parser blew up on c2"))
        );

        c.dispatcher_mut().loader_mut().configure(book_source);
        assert!(c.retry(2));
        while c.is_loading() {
            c.pump_blocking(WAIT);
        }
        assert_eq!(
            c.session().loaded_chapter(2).unwrap().state(),
            ChapterState::Ready
        );
    }
}
