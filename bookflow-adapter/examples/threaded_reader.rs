use std::thread;
use std::time::Duration;

use bookflow::{
    Chapter, ChapterLoader, ContentSource, MemoryPreferences, PreferencesStore, ReadingSession,
    SessionOptions, SourceError, ViewportSnapshot,
};
use bookflow_adapter::{Controller, LoadDispatcher};

struct SlowSource;

impl ContentSource for SlowSource {
    fn load_chapter_content(&self, chapter_url: &str) -> Result<String, SourceError> {
        thread::sleep(Duration::from_millis(30));
        if chapter_url.ends_with("13") {
            return Err(SourceError::new("connection reset"));
        }
        Ok((0..10)
            .map(|i| format!("{chapter_url} paragraph {i}. Another sentence!"))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    fn is_chapter_offline(&self, chapter_url: &str) -> bool {
        chapter_url.ends_with('0')
    }
}

fn main() {
    let chapters: Vec<Chapter> = (0..30)
        .map(|i| Chapter::new(format!("novel/{i}"), format!("Chapter {i}"), i))
        .collect();

    // A previous session stopped in the middle of chapter 12.
    let mut prefs = MemoryPreferences::new();
    prefs.save_reading_position("novel/12", "p6", 6, 0.55, 40, 0);

    let session = ReadingSession::new(chapters, SessionOptions::new(), prefs);
    let loader = ChapterLoader::default().with_source(SlowSource);
    let mut c = Controller::new(session, LoadDispatcher::threaded(loader));

    c.open(12);
    while c.is_loading() {
        for command in c.pump_blocking(Duration::from_secs(1)) {
            println!("restore: {command:?}");
        }
    }

    // Scroll towards the end of the chapter; chapter 13 fails to load.
    let rows = c.session().display_items().len();
    for command in c.on_scroll(ViewportSnapshot::new(rows - 4, 0, rows - 1)) {
        println!("scroll: {command:?}");
    }
    while c.is_loading() {
        c.pump_blocking(Duration::from_secs(1));
    }
    for (index, chapter) in c.session().loaded_chapters() {
        println!(
            "chapter {index}: {:?} segments={} cached={} error={:?}",
            chapter.state(),
            chapter.content_count(),
            chapter.is_from_cache,
            chapter.error
        );
    }

    let position = c.on_scroll_settle(1_000);
    println!("settled at {position:?}");
}
