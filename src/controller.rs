//! Transactions list controller
//!
//! The reconciliation glue between query state, selection state, and the
//! result pages coming back from the transport. The controller is a pure
//! state machine: command handlers mutate state and hand back a [`Reload`]
//! ticket; the caller performs the fetch and feeds the response to
//! [`TxnController::apply_page`].
//!
//! Overlapping reloads resolve as last-request-wins: every issued reload gets
//! a monotonic sequence number and `apply_page` discards responses older than
//! the latest issued, so a slow early response can never overwrite the view.

use chrono::NaiveDate;

use crate::api::models::{BulkDeleteRequest, ResultPage, TxnType};
use crate::query::{QueryState, SortKey};
use crate::selection::SelectionState;

/// One filter-field mutation, decoupled from any input surface
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Search(Option<String>),
    Merchant(Option<String>),
    Category(Option<i64>),
    TxnType(Option<TxnType>),
    DateFrom(Option<NaiveDate>),
    DateTo(Option<NaiveDate>),
    AmountMin(Option<f64>),
    AmountMax(Option<f64>),
}

/// A reload the caller must perform: fetch `query`, then feed the response
/// back through `apply_page` with the same `seq`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reload {
    pub seq: u64,
    pub query: String,
}

/// Owns the list view's query, selection, and last result page
pub struct TxnController {
    query: QueryState,
    selection: SelectionState,
    page: Option<ResultPage>,
    issued_seq: u64,
}

impl Default for TxnController {
    fn default() -> Self {
        Self::new()
    }
}

impl TxnController {
    pub fn new() -> Self {
        Self {
            query: QueryState::new(),
            selection: SelectionState::new(),
            page: None,
            issued_seq: 0,
        }
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn page(&self) -> Option<&ResultPage> {
        self.page.as_ref()
    }

    /// The bulk-action bar is hidden (not merely disabled) at zero selected
    pub fn bulk_bar_visible(&self) -> bool {
        self.selection.count() > 0
    }

    // ── Command handlers ─────────────────────────────────────────────────────

    /// Stamp a new reload; anything issued earlier becomes stale
    pub fn issue_reload(&mut self) -> Reload {
        self.issued_seq += 1;
        Reload {
            seq: self.issued_seq,
            query: self.query.serialize(),
        }
    }

    pub fn on_filter_changed(&mut self, change: FilterChange) -> Reload {
        match change {
            FilterChange::Search(v) => self.query.set_search(v),
            FilterChange::Merchant(v) => self.query.set_merchant(v),
            FilterChange::Category(v) => self.query.set_category(v),
            FilterChange::TxnType(v) => self.query.set_txn_type(v),
            FilterChange::DateFrom(v) => self.query.set_date_from(v),
            FilterChange::DateTo(v) => self.query.set_date_to(v),
            FilterChange::AmountMin(v) => self.query.set_amount_min(v),
            FilterChange::AmountMax(v) => self.query.set_amount_max(v),
        }
        self.issue_reload()
    }

    pub fn on_sort(&mut self, column: SortKey) -> Reload {
        self.query.toggle_sort(column);
        self.issue_reload()
    }

    pub fn on_page(&mut self, n: u32) -> Reload {
        self.query.set_page(n);
        self.issue_reload()
    }

    /// Configured page size; applied once at startup, before the first fetch
    pub fn set_per_page(&mut self, n: u32) {
        self.query.set_per_page(n);
    }

    pub fn on_reset_filters(&mut self) -> Reload {
        self.query.reset_filters();
        self.issue_reload()
    }

    /// Accept a fetched page, or discard it as stale
    ///
    /// Selection is cleared before the new rows are stored - it never
    /// survives a reload, whatever triggered it.
    pub fn apply_page(&mut self, seq: u64, page: ResultPage) -> bool {
        if seq != self.issued_seq {
            tracing::debug!(
                "discarding stale result (seq {seq}, latest {})",
                self.issued_seq
            );
            return false;
        }
        self.selection.clear();
        self.page = Some(page);
        true
    }

    // ── Selection ────────────────────────────────────────────────────────────

    pub fn on_selection_toggled(&mut self, id: i64) {
        self.selection.toggle(id);
    }

    /// Select-all applies to the rendered page only
    pub fn on_select_all(&mut self, checked: bool) {
        let page_ids: Vec<i64> = self
            .page
            .as_ref()
            .map(|p| p.transactions.iter().map(|t| t.id).collect())
            .unwrap_or_default();
        self.selection.select_all(&page_ids, checked);
    }

    // ── Bulk deletion ────────────────────────────────────────────────────────

    /// Delete-by-explicit-id-set body from the current selection; `None`
    /// when nothing is selected.
    pub fn bulk_delete_selected(&self) -> Option<BulkDeleteRequest> {
        if self.selection.count() == 0 {
            return None;
        }
        let mut ids = self.selection.ids();
        ids.sort_unstable();
        Some(BulkDeleteRequest::by_ids(ids))
    }

    /// Delete-by-filter body: the current filter fields plus the explicit
    /// match-all marker. Sort and paging are excluded.
    pub fn bulk_delete_filtered(&self) -> BulkDeleteRequest {
        BulkDeleteRequest::by_filter(self.query.filter_predicate())
    }

    /// State transition after a confirmed, successful bulk delete. No state
    /// is touched before server confirmation; the filter-wide variant also
    /// returns to page 1 since the result set shrank arbitrarily.
    pub fn after_bulk_delete(&mut self, filter_wide: bool) -> Reload {
        if filter_wide {
            self.query.set_page(1);
        }
        self.issue_reload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{FilterPredicate, Transaction};

    fn page_with_ids(ids: &[i64]) -> ResultPage {
        ResultPage {
            transactions: ids
                .iter()
                .map(|&id| Transaction {
                    id,
                    date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                    description: None,
                    merchant: None,
                    category_id: None,
                    amount: 12.5,
                    txn_type: TxnType::Debit,
                    balance: None,
                    currency: None,
                })
                .collect(),
            page: 1,
            per_page: 25,
            total: ids.len() as u64,
            total_pages: 1,
        }
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut ctl = TxnController::new();
        let first = ctl.issue_reload();
        let second = ctl.issue_reload();

        // The older response arrives last; it must not win
        assert!(ctl.apply_page(second.seq, page_with_ids(&[1, 2])));
        assert!(!ctl.apply_page(first.seq, page_with_ids(&[9])));
        assert_eq!(ctl.page().unwrap().transactions[0].id, 1);
    }

    #[test]
    fn selection_is_cleared_on_every_applied_reload() {
        let mut ctl = TxnController::new();
        let r = ctl.issue_reload();
        ctl.apply_page(r.seq, page_with_ids(&[1, 2, 3]));
        ctl.on_selection_toggled(1);
        ctl.on_selection_toggled(2);
        assert_eq!(ctl.selection().count(), 2);

        let r = ctl.on_page(2);
        ctl.apply_page(r.seq, page_with_ids(&[4, 5]));
        assert_eq!(ctl.selection().count(), 0);
    }

    #[test]
    fn discarded_response_leaves_selection_alone() {
        let mut ctl = TxnController::new();
        let r = ctl.issue_reload();
        ctl.apply_page(r.seq, page_with_ids(&[1, 2]));
        ctl.on_selection_toggled(1);

        let newer = ctl.issue_reload();
        let stale_seq = newer.seq - 1;
        assert!(!ctl.apply_page(stale_seq, page_with_ids(&[7])));
        assert_eq!(ctl.selection().count(), 1);
    }

    #[test]
    fn filter_command_resets_page_and_serializes() {
        let mut ctl = TxnController::new();
        let r = ctl.on_page(3);
        assert!(r.query.contains("page=3"));
        let r = ctl.on_filter_changed(FilterChange::Search(Some("rent".into())));
        assert!(r.query.contains("search=rent"));
        assert!(r.query.contains("page=1"));
    }

    #[test]
    fn select_all_scoped_to_rendered_page() {
        let mut ctl = TxnController::new();
        let r = ctl.issue_reload();
        ctl.apply_page(r.seq, page_with_ids(&[10, 11, 12]));

        ctl.on_select_all(true);
        assert_eq!(ctl.selection().count(), 3);
        assert!(ctl.bulk_bar_visible());

        ctl.on_select_all(false);
        assert_eq!(ctl.selection().count(), 0);
        assert!(!ctl.bulk_bar_visible());
    }

    #[test]
    fn bulk_delete_selected_requires_a_selection() {
        let mut ctl = TxnController::new();
        assert!(ctl.bulk_delete_selected().is_none());

        let r = ctl.issue_reload();
        ctl.apply_page(r.seq, page_with_ids(&[5, 6]));
        ctl.on_selection_toggled(6);
        ctl.on_selection_toggled(5);
        match ctl.bulk_delete_selected() {
            Some(BulkDeleteRequest::ByIds { ids }) => assert_eq!(ids, vec![5, 6]),
            other => panic!("expected ByIds, got {other:?}"),
        }
    }

    #[test]
    fn bulk_delete_filtered_excludes_sort_and_paging() {
        let mut ctl = TxnController::new();
        ctl.on_filter_changed(FilterChange::Merchant(Some("acme".into())));
        ctl.on_sort(SortKey::Amount);
        ctl.on_page(2);

        let body = serde_json::to_value(ctl.bulk_delete_filtered()).unwrap();
        assert_eq!(body["all"], serde_json::json!(true));
        assert_eq!(body["merchant"], serde_json::json!("acme"));
        assert!(body.get("sort_by").is_none());
        assert!(body.get("page").is_none());
    }

    #[test]
    fn filtered_delete_returns_to_page_one() {
        let mut ctl = TxnController::new();
        ctl.on_page(4);
        let r = ctl.after_bulk_delete(true);
        assert!(r.query.contains("page=1"));

        // The id-set variant keeps the current page
        ctl.on_page(4);
        let r = ctl.after_bulk_delete(false);
        assert!(r.query.contains("page=4"));
    }

    #[test]
    fn reset_filters_clears_predicate() {
        let mut ctl = TxnController::new();
        ctl.on_filter_changed(FilterChange::Search(Some("rent".into())));
        ctl.on_reset_filters();
        assert_eq!(ctl.query().filters(), &FilterPredicate::default());
    }
}
