//! Query state for the transactions list view
//!
//! Owns the filter/sort/pagination record and serializes it into one
//! canonical query string. Serialization is deterministic: fields are emitted
//! in a fixed order and unset filters are omitted entirely, so two states
//! with the same field values always produce the same string no matter the
//! order the fields were set in.

use chrono::NaiveDate;
use url::form_urlencoded;

use crate::api::models::{FilterPredicate, TxnType};

/// Default page size; the service caps requests at 100 rows
pub const DEFAULT_PER_PAGE: u32 = 25;

// ─────────────────────────────────────────────────────────────────────────────
// Sort
// ─────────────────────────────────────────────────────────────────────────────

/// Columns the service accepts in `sort_by`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Amount,
    Merchant,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Amount => "amount",
            Self::Merchant => "merchant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn flipped(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query state
// ─────────────────────────────────────────────────────────────────────────────

/// The canonical filter/sort/pagination record for the list view
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    filters: FilterPredicate,
    sort_by: SortKey,
    sort_dir: SortDir,
    page: u32,
    per_page: u32,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            filters: FilterPredicate::default(),
            // Most recent first is the useful default for financial views
            sort_by: SortKey::Date,
            sort_dir: SortDir::Desc,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn sort(&self) -> (SortKey, SortDir) {
        (self.sort_by, self.sort_dir)
    }

    pub fn filters(&self) -> &FilterPredicate {
        &self.filters
    }

    /// Re-serialize the filter fields (no sort, no paging) as the
    /// delete-by-filter predicate.
    pub fn filter_predicate(&self) -> FilterPredicate {
        self.filters.clone()
    }

    // ── Filter setters ───────────────────────────────────────────────────────
    // Every filter change resets the page to 1: the new result set may have
    // fewer pages than the previous cursor implied.

    fn edit_filters(&mut self, edit: impl FnOnce(&mut FilterPredicate)) {
        edit(&mut self.filters);
        self.page = 1;
    }

    pub fn set_search(&mut self, value: Option<String>) {
        self.edit_filters(|f| f.search = non_empty(value));
    }

    pub fn set_merchant(&mut self, value: Option<String>) {
        self.edit_filters(|f| f.merchant = non_empty(value));
    }

    pub fn set_category(&mut self, value: Option<i64>) {
        self.edit_filters(|f| f.category_id = value);
    }

    pub fn set_txn_type(&mut self, value: Option<TxnType>) {
        self.edit_filters(|f| f.txn_type = value);
    }

    pub fn set_date_from(&mut self, value: Option<NaiveDate>) {
        self.edit_filters(|f| f.date_from = value);
    }

    pub fn set_date_to(&mut self, value: Option<NaiveDate>) {
        self.edit_filters(|f| f.date_to = value);
    }

    pub fn set_amount_min(&mut self, value: Option<f64>) {
        self.edit_filters(|f| f.amount_min = value);
    }

    pub fn set_amount_max(&mut self, value: Option<f64>) {
        self.edit_filters(|f| f.amount_max = value);
    }

    /// Clear every filter field; sort and page size survive, page resets to 1
    pub fn reset_filters(&mut self) {
        self.filters = FilterPredicate::default();
        self.page = 1;
    }

    // ── Sort and paging ──────────────────────────────────────────────────────

    /// Same column flips direction; a new column starts descending.
    /// Either way the page resets to 1.
    pub fn toggle_sort(&mut self, column: SortKey) {
        if self.sort_by == column {
            self.sort_dir = self.sort_dir.flipped();
        } else {
            self.sort_by = column;
            self.sort_dir = SortDir::Desc;
        }
        self.page = 1;
    }

    /// Set the page directly; no other field changes. The client only floors
    /// at 1 - the server's own range validation governs the rest.
    pub fn set_page(&mut self, n: u32) {
        self.page = n.max(1);
    }

    /// Changing the page size invalidates the cursor, so page resets to 1
    pub fn set_per_page(&mut self, n: u32) {
        self.per_page = n.max(1);
        self.page = 1;
    }

    // ── Serialization ────────────────────────────────────────────────────────

    /// Canonical query string: set filters in a fixed order, then sort and
    /// pagination (always present).
    pub fn serialize(&self) -> String {
        let mut q = form_urlencoded::Serializer::new(String::new());
        let f = &self.filters;
        if let Some(v) = &f.search {
            q.append_pair("search", v);
        }
        if let Some(v) = &f.merchant {
            q.append_pair("merchant", v);
        }
        if let Some(v) = f.category_id {
            q.append_pair("category_id", &v.to_string());
        }
        if let Some(v) = f.txn_type {
            q.append_pair("txn_type", v.as_str());
        }
        if let Some(v) = f.date_from {
            q.append_pair("date_from", &v.to_string());
        }
        if let Some(v) = f.date_to {
            q.append_pair("date_to", &v.to_string());
        }
        if let Some(v) = f.amount_min {
            q.append_pair("amount_min", &v.to_string());
        }
        if let Some(v) = f.amount_max {
            q.append_pair("amount_max", &v.to_string());
        }
        q.append_pair("sort_by", self.sort_by.as_str());
        q.append_pair("sort_dir", self.sort_dir.as_str());
        q.append_pair("page", &self.page.to_string());
        q.append_pair("per_page", &self.per_page.to_string());
        q.finish()
    }
}

/// Empty strings are treated as unset, never serialized
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_serialization_has_sort_and_paging_only() {
        let q = QueryState::new();
        assert_eq!(q.serialize(), "sort_by=date&sort_dir=desc&page=1&per_page=25");
    }

    #[test]
    fn set_filters_serialize_scenario() {
        let mut q = QueryState::new();
        q.set_search(Some("rent".into()));
        let s = q.serialize();
        assert_eq!(s, "search=rent&sort_by=date&sort_dir=desc&page=1&per_page=25");
        assert!(!s.contains("merchant"));
        assert!(!s.contains("category_id"));
        assert!(!s.contains("date_from"));
        assert!(!s.contains("amount_min"));
    }

    #[test]
    fn serialization_is_order_independent() {
        let mut a = QueryState::new();
        a.set_merchant(Some("acme".into()));
        a.set_search(Some("rent".into()));
        a.set_amount_min(Some(10.5));

        let mut b = QueryState::new();
        b.set_amount_min(Some(10.5));
        b.set_search(Some("rent".into()));
        b.set_merchant(Some("acme".into()));

        assert_eq!(a.serialize(), b.serialize());
    }

    #[test]
    fn empty_string_filters_are_omitted() {
        let mut q = QueryState::new();
        q.set_search(Some("  ".into()));
        q.set_merchant(Some(String::new()));
        assert_eq!(q.serialize(), QueryState::new().serialize());
    }

    #[test]
    fn filter_change_resets_page() {
        let mut q = QueryState::new();
        q.set_page(5);
        q.set_merchant(Some("acme".into()));
        assert_eq!(q.page(), 1);
    }

    #[test]
    fn sort_change_resets_page_and_new_column_starts_descending() {
        let mut q = QueryState::new();
        q.set_page(3);
        q.toggle_sort(SortKey::Amount);
        assert_eq!(q.sort(), (SortKey::Amount, SortDir::Desc));
        assert_eq!(q.page(), 1);
    }

    #[test]
    fn repeated_sort_flips_direction() {
        let mut q = QueryState::new();
        q.toggle_sort(SortKey::Date); // already the sort column: desc -> asc
        assert_eq!(q.sort(), (SortKey::Date, SortDir::Asc));
        q.toggle_sort(SortKey::Date);
        assert_eq!(q.sort(), (SortKey::Date, SortDir::Desc));
    }

    #[test]
    fn set_page_changes_nothing_else() {
        let mut q = QueryState::new();
        q.set_search(Some("rent".into()));
        let before = q.filters().clone();
        q.set_page(4);
        assert_eq!(q.page(), 4);
        assert_eq!(q.filters(), &before);
        assert_eq!(q.sort(), (SortKey::Date, SortDir::Desc));
    }

    #[test]
    fn set_page_floors_at_one() {
        let mut q = QueryState::new();
        q.set_page(0);
        assert_eq!(q.page(), 1);
    }

    #[test]
    fn reset_filters_keeps_sort_and_page_size() {
        let mut q = QueryState::new();
        q.set_search(Some("rent".into()));
        q.toggle_sort(SortKey::Merchant);
        q.set_per_page(50);
        q.set_page(2);
        q.reset_filters();
        assert_eq!(q.filters(), &FilterPredicate::default());
        assert_eq!(q.sort(), (SortKey::Merchant, SortDir::Desc));
        assert_eq!(q.per_page(), 50);
        assert_eq!(q.page(), 1);
    }

    #[test]
    fn values_are_url_encoded() {
        let mut q = QueryState::new();
        q.set_search(Some("coffee shop".into()));
        assert!(q.serialize().starts_with("search=coffee+shop&"));
    }
}
