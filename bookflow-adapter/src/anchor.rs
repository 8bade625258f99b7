use bookflow::{ItemId, ReaderDisplayItem, find_item, first_item_of_chapter};

/// A row identity plus how far it was scrolled past the top of the viewport.
///
/// Capture one before mutating the chapter window and apply it afterwards to keep the same row on
/// screen, even when rows were inserted or removed above it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollAnchor {
    pub item_id: ItemId,
    pub offset_pixels: u32,
}

/// Captures an anchor for the row at `display_index`.
///
/// Returns `None` when the index is out of range.
pub fn capture_anchor(
    items: &[ReaderDisplayItem],
    display_index: usize,
    offset_pixels: u32,
) -> Option<ScrollAnchor> {
    let item = items.get(display_index)?;
    Some(ScrollAnchor {
        item_id: item.item_id(),
        offset_pixels,
    })
}

/// Returns the current display index of the anchored row.
///
/// Falls back to the first row of the anchored chapter when the row itself is gone (e.g. its
/// placeholder was replaced by real content).
pub fn apply_anchor(items: &[ReaderDisplayItem], anchor: &ScrollAnchor) -> Option<usize> {
    find_item(items, &anchor.item_id)
        .or_else(|| first_item_of_chapter(items, anchor.item_id.chapter_index))
}
