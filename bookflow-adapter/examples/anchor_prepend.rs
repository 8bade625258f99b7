use bookflow::{
    Chapter, ChapterLoader, MemoryPreferences, ReadingSession, SessionOptions, SourceError,
    ViewportSnapshot,
};
use bookflow_adapter::{Controller, LoadDispatcher, apply_anchor};

fn fetch(url: &str) -> Result<String, SourceError> {
    Ok((0..8)
        .map(|i| format!("{url} paragraph {i}."))
        .collect::<Vec<_>>()
        .join("\n\n"))
}

fn main() {
    // Example: keep the same row on screen while an earlier chapter is loaded above it.
    //
    // The adapter flow is typically:
    // 1) capture an anchor (item id + pixel offset) before the window changes
    // 2) let the session prepend/evict chapters
    // 3) look the anchor up again to find the row's new index
    let chapters: Vec<Chapter> = (0..20)
        .map(|i| Chapter::new(format!("ch{i}"), format!("Chapter {i}"), i))
        .collect();
    let session = ReadingSession::new(chapters, SessionOptions::new(), MemoryPreferences::new());
    let loader = ChapterLoader::default().with_source(fetch);
    let mut c = Controller::new(session, LoadDispatcher::inline(loader));

    c.open(10);
    c.pump();
    c.on_scroll(ViewportSnapshot::new(3, 12, 8));
    let anchor = c.capture_anchor().expect("viewport row must exist");
    println!("before prepend: viewport={:?} anchor={anchor:?}", c.viewport());

    // Near the top: chapter 9 is requested and grows from its placeholder.
    let mut commands = c.on_scroll(ViewportSnapshot::new(1, 12, 8));
    commands.extend(c.pump());
    println!("commands={commands:?}");

    let index = apply_anchor(c.session().display_items(), &anchor);
    println!(
        "after prepend: viewport={:?} anchor_index={index:?}",
        c.viewport()
    );
}
