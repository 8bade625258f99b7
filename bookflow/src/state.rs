/// What the viewport reports after a layout/scroll pass.
///
/// Indexes are display-sequence rows; `first_visible_offset` is how far the first visible row is
/// scrolled past the top of the viewport.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportSnapshot {
    pub first_visible_index: usize,
    pub first_visible_offset: u32,
    pub last_visible_index: usize,
}

impl ViewportSnapshot {
    pub fn new(first_visible_index: usize, first_visible_offset: u32, last_visible_index: usize) -> Self {
        Self {
            first_visible_index,
            first_visible_offset,
            last_visible_index: last_visible_index.max(first_visible_index),
        }
    }

    /// Shifts both edges by `rows` (negative moves towards the start), saturating at zero.
    pub fn shifted(self, rows: isize) -> Self {
        Self {
            first_visible_index: self.first_visible_index.saturating_add_signed(rows),
            first_visible_offset: self.first_visible_offset,
            last_visible_index: self.last_visible_index.saturating_add_signed(rows),
        }
    }
}
