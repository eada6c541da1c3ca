use crate::models::{Source, SourceItem};
use crate::store::Snapshot;

pub const UNKNOWN_SOURCE: &str = "Unknown source";

/// One card of the master list.
#[derive(Debug, Clone, Copy)]
pub struct ListEntry<'a> {
    pub item: &'a SourceItem,
    pub source: Option<&'a Source>,
}

impl ListEntry<'_> {
    pub fn source_label(&self) -> &str {
        self.source.map(|s| s.title.as_str()).unwrap_or(UNKNOWN_SOURCE)
    }
}

/// Every item in store order, paired with its source.
pub fn entries(snapshot: &Snapshot) -> Vec<ListEntry<'_>> {
    snapshot
        .source_items()
        .iter()
        .map(|item| ListEntry {
            item,
            source: snapshot.source_for(item),
        })
        .collect()
}

/// Cursor over the master list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListState {
    pub selected: usize,
}

impl ListState {
    pub fn move_up(&mut self) -> bool {
        if self.selected > 0 {
            self.selected -= 1;
            true
        } else {
            false
        }
    }

    pub fn move_down(&mut self, len: usize) -> bool {
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            true
        } else {
            false
        }
    }

    pub fn move_to_top(&mut self) {
        self.selected = 0;
    }

    pub fn move_to_bottom(&mut self, len: usize) {
        self.selected = len.saturating_sub(1);
    }

    pub fn clamp(&mut self, len: usize) {
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    /// Moves the cursor back onto `uuid` after items were inserted around it.
    pub fn reselect(&mut self, snapshot: &Snapshot, uuid: Option<i64>) {
        let items = snapshot.source_items();
        match uuid.and_then(|uuid| items.iter().position(|i| i.uuid == uuid)) {
            Some(at) => self.selected = at,
            None => self.clamp(items.len()),
        }
    }

    pub fn selected_item<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a SourceItem> {
        snapshot.source_items().get(self.selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{item, source};

    #[test]
    fn entries_pair_each_item_with_its_source() {
        let snapshot = Snapshot::new(
            vec![source(2, "Fox")],
            vec![item(1, 2, "Settlement")],
            vec![],
        )
        .unwrap();

        let entries = entries(&snapshot);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_label(), "Fox");
    }

    #[test]
    fn missing_source_falls_back_to_label() {
        let snapshot = Snapshot::new(vec![source(2, "Fox")], vec![item(1, 7, "Orphan")], vec![]).unwrap();
        assert_eq!(entries(&snapshot)[0].source_label(), UNKNOWN_SOURCE);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut state = ListState::default();
        assert!(!state.move_up());
        assert!(!state.move_down(0));
        assert!(state.move_down(2));
        assert!(!state.move_down(2));
        assert_eq!(state.selected, 1);

        state.move_to_bottom(0);
        assert_eq!(state.selected, 0);

        state.selected = 9;
        state.clamp(3);
        assert_eq!(state.selected, 2);
    }
}
