use ratatui::widgets::{ListItem, ListState, ScrollbarState};
use std::collections::VecDeque;

/// Items for a bottom-to-top list with a scrollbar. Index 0 is the newest
/// item, drawn at the bottom.
pub struct ScrollableList {
    max_items: usize,
    pub list_items: VecDeque<ListItem<'static>>,
    pub list_state: ListState,
    pub scroll_state: ScrollbarState,
}

impl ScrollableList {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items: max_items.max(1),
            list_items: VecDeque::new(),
            list_state: ListState::default(),
            scroll_state: ScrollbarState::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.list_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list_items.is_empty()
    }

    /// Adds a newest item. Follows it unless the view is scrolled back.
    pub fn push(&mut self, item: ListItem<'static>) {
        self.list_items.push_front(item);
        self.list_items.truncate(self.max_items);
        let selected = match self.list_state.selected() {
            None | Some(0) => 0,
            Some(idx) => (idx + 1).min(self.len() - 1),
        };
        self.select(selected);
    }

    /// Towards older items.
    pub fn move_up(&mut self) {
        if let Some(idx) = self.list_state.selected() {
            self.select((idx + 1).min(self.len().saturating_sub(1)));
        }
    }

    /// Towards newer items.
    pub fn move_down(&mut self) {
        if let Some(idx) = self.list_state.selected() {
            self.select(idx.saturating_sub(1));
        }
    }

    /// Oldest item, at the top.
    pub fn jump_to_first(&mut self) {
        if !self.is_empty() {
            self.select(self.len() - 1);
        }
    }

    /// Newest item, at the bottom.
    pub fn jump_to_last(&mut self) {
        if !self.is_empty() {
            self.select(0);
        }
    }

    fn select(&mut self, idx: usize) {
        self.list_state.select(Some(idx));
        self.scroll_state = ScrollbarState::new(self.len()).position(self.len() - 1 - idx);
    }
}
