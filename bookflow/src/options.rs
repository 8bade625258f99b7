/// Windowing thresholds for [`crate::ScrollController`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollConfig {
    /// How many chapters before the window edge the viewport may be before the next/previous
    /// chapter is requested.
    pub preload_threshold: usize,
    /// Chapters kept resident on each side of the current one.
    pub keep_loaded_range: usize,
    /// How many display rows before either end of the sequence the viewport must reach before a
    /// load decision is evaluated at all.
    pub trigger_item_threshold: usize,
}

impl ScrollConfig {
    pub const fn new() -> Self {
        Self {
            preload_threshold: 1,
            keep_loaded_range: 2,
            trigger_item_threshold: 5,
        }
    }

    pub fn with_preload_threshold(mut self, preload_threshold: usize) -> Self {
        self.preload_threshold = preload_threshold;
        self
    }

    pub fn with_keep_loaded_range(mut self, keep_loaded_range: usize) -> Self {
        self.keep_loaded_range = keep_loaded_range;
        self
    }

    pub fn with_trigger_item_threshold(mut self, trigger_item_threshold: usize) -> Self {
        self.trigger_item_threshold = trigger_item_threshold;
        self
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for [`crate::ReadingSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionOptions {
    pub scroll: ScrollConfig,
    /// When disabled, the session never loads neighbouring chapters on its own.
    pub infinite_scroll: bool,
    /// When disabled, scroll-settle captures are returned but not written to the store.
    pub persist_positions: bool,
}

impl SessionOptions {
    pub const fn new() -> Self {
        Self {
            scroll: ScrollConfig::new(),
            infinite_scroll: true,
            persist_positions: true,
        }
    }

    pub fn with_scroll(mut self, scroll: ScrollConfig) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn with_infinite_scroll(mut self, infinite_scroll: bool) -> Self {
        self.infinite_scroll = infinite_scroll;
        self
    }

    pub fn with_persist_positions(mut self, persist_positions: bool) -> Self {
        self.persist_positions = persist_positions;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}
