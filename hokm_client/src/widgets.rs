//! Small stateful widgets shared by [`crate::tui_app`]: a scrollable list
//! backed by `ratatui`'s own `ListState`/`ScrollbarState`, and a single-line
//! text input with cursor movement.

use ratatui::widgets::{ListItem, ListState, ScrollbarState};

/// A bounded, append-only list of rendered items with independent list and
/// scrollbar cursor state, used for both the chat/event log and the help
/// overlay.
pub struct ScrollableList {
    pub list_items: Vec<ListItem<'static>>,
    pub list_state: ListState,
    pub scroll_state: ScrollbarState,
    capacity: usize,
}

impl ScrollableList {
    pub fn new(capacity: usize) -> Self {
        Self {
            list_items: Vec::new(),
            list_state: ListState::default(),
            scroll_state: ScrollbarState::default(),
            capacity,
        }
    }

    /// Append an item, dropping the oldest one once `capacity` is exceeded.
    pub fn push(&mut self, item: ListItem<'static>) {
        self.list_items.push(item);
        if self.list_items.len() > self.capacity {
            self.list_items.remove(0);
        }
        self.scroll_state = self.scroll_state.content_length(self.list_items.len());
        self.jump_to_last();
    }

    pub fn move_up(&mut self) {
        let i = match self.list_state.selected() {
            Some(i) if i > 0 => i - 1,
            Some(i) => i,
            None => 0,
        };
        self.list_state.select(Some(i));
        self.scroll_state = self.scroll_state.position(i);
    }

    pub fn move_down(&mut self) {
        let last = self.list_items.len().saturating_sub(1);
        let i = match self.list_state.selected() {
            Some(i) if i < last => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.list_state.select(Some(i));
        self.scroll_state = self.scroll_state.position(i);
    }

    pub fn jump_to_first(&mut self) {
        self.list_state.select(Some(0));
        self.scroll_state = self.scroll_state.position(0);
    }

    pub fn jump_to_last(&mut self) {
        let last = self.list_items.len().saturating_sub(1);
        self.list_state.select(Some(last));
        self.scroll_state = self.scroll_state.position(last);
    }
}

/// A single-line editable text buffer tracking a character-index cursor
/// (not a byte index, so movement stays correct with multi-byte input).
pub struct UserInput {
    pub value: String,
    pub char_idx: usize,
}

impl UserInput {
    pub fn new() -> Self {
        Self { value: String::new(), char_idx: 0 }
    }

    pub fn input(&mut self, c: char) {
        let byte_idx = self.byte_index();
        self.value.insert(byte_idx, c);
        self.char_idx += 1;
    }

    pub fn backspace(&mut self) {
        if self.char_idx == 0 {
            return;
        }
        let from = self.char_idx - 1;
        let before = self.value.chars().take(from);
        let after = self.value.chars().skip(self.char_idx);
        self.value = before.chain(after).collect();
        self.char_idx -= 1;
    }

    pub fn delete(&mut self) {
        if self.char_idx >= self.value.chars().count() {
            return;
        }
        let before = self.value.chars().take(self.char_idx);
        let after = self.value.chars().skip(self.char_idx + 1);
        self.value = before.chain(after).collect();
    }

    pub fn move_left(&mut self) {
        self.char_idx = self.char_idx.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let len = self.value.chars().count();
        if self.char_idx < len {
            self.char_idx += 1;
        }
    }

    pub fn jump_to_first(&mut self) {
        self.char_idx = 0;
    }

    pub fn jump_to_last(&mut self) {
        self.char_idx = self.value.chars().count();
    }

    /// Take the current value, clearing the buffer for the next line.
    pub fn submit(&mut self) -> String {
        self.char_idx = 0;
        std::mem::take(&mut self.value)
    }

    fn byte_index(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }
}

impl Default for UserInput {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_and_backspace_round_trip() {
        let mut input = UserInput::new();
        for c in "hokm".chars() {
            input.input(c);
        }
        assert_eq!(input.value, "hokm");
        input.backspace();
        assert_eq!(input.value, "hok");
        assert_eq!(input.char_idx, 3);
    }

    #[test]
    fn submit_clears_the_buffer() {
        let mut input = UserInput::new();
        input.input('h');
        input.input('i');
        let taken = input.submit();
        assert_eq!(taken, "hi");
        assert_eq!(input.value, "");
        assert_eq!(input.char_idx, 0);
    }

    #[test]
    fn scrollable_list_evicts_oldest_past_capacity() {
        let mut list = ScrollableList::new(2);
        list.push(ListItem::new("a"));
        list.push(ListItem::new("b"));
        list.push(ListItem::new("c"));
        assert_eq!(list.list_items.len(), 2);
    }
}
