//! Row selection for the transactions table
//!
//! Selection is scoped to the currently rendered page. Whatever triggers a
//! reload - new filter, new sort, new page - the controller clears this set
//! before storing the new rows, so stale ids never survive a refresh.

use std::collections::HashSet;

/// The set of currently checked row identifiers
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    ids: HashSet<i64>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of one id
    pub fn toggle(&mut self, id: i64) {
        if !self.ids.insert(id) {
            self.ids.remove(&id);
        }
    }

    /// Select-all checkbox semantics: checked replaces the set with exactly
    /// the ids on the rendered page, unchecked empties it. Never applies to
    /// the full filtered result set - that is the explicit delete-by-filter
    /// action, not a selection.
    pub fn select_all(&mut self, page_ids: &[i64], checked: bool) {
        self.ids.clear();
        if checked {
            self.ids.extend(page_ids.iter().copied());
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Snapshot of the selected ids (order unspecified)
    pub fn ids(&self) -> Vec<i64> {
        self.ids.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_membership() {
        let mut sel = SelectionState::new();
        sel.toggle(7);
        assert!(sel.is_selected(7));
        assert_eq!(sel.count(), 1);
        sel.toggle(7);
        assert!(!sel.is_selected(7));
        assert_eq!(sel.count(), 0);
    }

    #[test]
    fn select_all_then_clear() {
        let mut sel = SelectionState::new();
        sel.select_all(&[1, 2, 3], true);
        assert_eq!(sel.count(), 3);
        sel.clear();
        assert_eq!(sel.count(), 0);
    }

    #[test]
    fn select_all_then_toggle_removes_one() {
        let mut sel = SelectionState::new();
        sel.select_all(&[1, 2, 3], true);
        sel.toggle(1);
        assert_eq!(sel.count(), 2);
        assert!(!sel.is_selected(1));
        assert!(sel.is_selected(2));
    }

    #[test]
    fn unchecked_select_all_empties() {
        let mut sel = SelectionState::new();
        sel.toggle(9);
        sel.select_all(&[1, 2], false);
        assert_eq!(sel.count(), 0);
    }

    #[test]
    fn select_all_replaces_prior_selection() {
        let mut sel = SelectionState::new();
        sel.toggle(99); // from an earlier interaction on the same page
        sel.select_all(&[1, 2], true);
        assert_eq!(sel.count(), 2);
        assert!(!sel.is_selected(99));
    }
}
