// Example: scroll forward through a book and watch the chapter window slide.
use bookflow::{
    Chapter, ChapterLoader, LoadCompletion, LoadTicket, MemoryPreferences, ReadingSession,
    ScrollConfig, SessionOptions, SourceError, ViewportSnapshot,
};

fn fetch(url: &str) -> Result<String, SourceError> {
    Ok((0..6)
        .map(|i| format!("{url}: paragraph {i}. It goes on."))
        .collect::<Vec<_>>()
        .join("\n\n"))
}

fn run_all(
    loader: &ChapterLoader,
    session: &mut ReadingSession<MemoryPreferences>,
    tickets: Vec<LoadTicket>,
) -> isize {
    let mut shift = 0;
    for ticket in tickets {
        let outcome = loader.load_chapter(&ticket.chapter, ticket.chapter_index);
        if let Some(applied) = session.complete_load(LoadCompletion { ticket, outcome }) {
            shift += applied.scroll_adjustment;
        }
    }
    shift
}

fn main() {
    let chapters: Vec<Chapter> = (0..12)
        .map(|i| Chapter::new(format!("book/ch{i}"), format!("Chapter {i}"), i))
        .collect();
    let options = SessionOptions::new().with_scroll(ScrollConfig::new().with_keep_loaded_range(1));
    let mut session = ReadingSession::new(chapters, options, MemoryPreferences::new());
    let loader = ChapterLoader::default().with_source(fetch);

    let ticket = session.open_chapter(0).expect("chapter 0 exists");
    run_all(&loader, &mut session, vec![ticket]);

    let mut viewport = ViewportSnapshot::new(0, 0, 9);
    for step in 0..40 {
        let update = session.on_viewport(viewport);
        viewport = viewport.shifted(update.scroll_adjustment);
        let shift = run_all(&loader, &mut session, update.tickets);
        viewport = viewport.shifted(shift);

        if let Some(position) = session.on_scroll_settle(viewport.first_visible_index, 0, step) {
            println!(
                "step={step:2} window={:?} rows={} top={}#{} overall={:.2}",
                session.loaded_indices(),
                session.display_items().len(),
                position.chapter_url,
                position.segment_id,
                session.overall_progress(),
            );
        }
        viewport = viewport.shifted(3);
    }
}
