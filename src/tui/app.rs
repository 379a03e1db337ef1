//! Application state and key dispatch
//!
//! All state mutation happens here, on the single event-loop task. Network
//! fetches are spawned and come back as [`AppEvent`]s, so the handlers in
//! `handle_event` are the one place remote state is reconciled into the view.

use std::sync::Arc;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;

use crate::api::models::{BulkDeleteRequest, Category, Job, TxnType};
use crate::api::Transport;
use crate::controller::{FilterChange, Reload, TxnController};
use crate::events::{AppEvent, ToastKind};
use crate::logging::LogBuffer;
use crate::poll::JobPollSupervisor;
use crate::query::SortKey;

use super::components::Toast;

// ─────────────────────────────────────────────────────────────────────────────
// View state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Transactions,
    Jobs,
}

/// Which filter field the prompt is editing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptField {
    Search,
    Merchant,
    Category,
    TxnType,
    DateFrom,
    DateTo,
    AmountMin,
    AmountMax,
}

impl PromptField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Merchant => "merchant",
            Self::Category => "category id",
            Self::TxnType => "type (debit/credit)",
            Self::DateFrom => "date from (YYYY-MM-DD)",
            Self::DateTo => "date to (YYYY-MM-DD)",
            Self::AmountMin => "amount min",
            Self::AmountMax => "amount max",
        }
    }
}

/// In-progress filter edit
pub struct Prompt {
    pub field: PromptField,
    pub buffer: String,
}

/// Pending destructive action awaiting explicit confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    /// Delete the current explicit selection (count shown in the modal)
    DeleteSelected(usize),
    /// Delete everything matching the current filters
    DeleteFiltered,
}

// ─────────────────────────────────────────────────────────────────────────────
// App
// ─────────────────────────────────────────────────────────────────────────────

pub struct App {
    api: Arc<dyn Transport>,
    events_tx: mpsc::Sender<AppEvent>,

    pub controller: TxnController,
    pub supervisor: JobPollSupervisor,
    pub jobs: Vec<Job>,
    pub categories: Vec<Category>,

    pub view: View,
    pub cursor: usize,
    pub jobs_scroll: usize,
    pub select_all_checked: bool,
    pub prompt: Option<Prompt>,
    pub confirm: Option<Confirm>,
    pub toast: Option<Toast>,
    pub log_buffer: LogBuffer,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        api: Arc<dyn Transport>,
        events_tx: mpsc::Sender<AppEvent>,
        log_buffer: LogBuffer,
        per_page: u32,
    ) -> Self {
        let mut controller = TxnController::new();
        controller.set_per_page(per_page);
        let supervisor = JobPollSupervisor::new(api.clone(), events_tx.clone());
        Self {
            api,
            events_tx,
            controller,
            supervisor,
            jobs: Vec::new(),
            categories: Vec::new(),
            view: View::Transactions,
            cursor: 0,
            jobs_scroll: 0,
            select_all_checked: false,
            prompt: None,
            confirm: None,
            toast: None,
            log_buffer,
            should_quit: false,
        }
    }

    /// Initial loads: categories, first transactions page, job list.
    /// The job list response bootstraps the poll supervisor.
    pub fn bootstrap(&mut self) {
        self.load_categories();
        self.reload_transactions();
        self.reload_jobs();
    }

    // ── Spawned fetches ──────────────────────────────────────────────────────

    fn reload_transactions(&mut self) {
        let reload = self.controller.issue_reload();
        self.spawn_fetch(reload);
    }

    fn spawn_fetch(&self, reload: Reload) {
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match api.list_transactions(&reload.query).await {
                Ok(page) => AppEvent::PageLoaded {
                    seq: reload.seq,
                    page,
                },
                Err(err) => AppEvent::error(err.to_string()),
            };
            let _ = tx.send(event).await;
        });
    }

    fn reload_jobs(&self) {
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match api.list_jobs().await {
                Ok(jobs) => AppEvent::JobsLoaded(jobs),
                Err(err) => AppEvent::error(err.to_string()),
            };
            let _ = tx.send(event).await;
        });
    }

    fn load_categories(&self) {
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            // Missing categories only degrade the filter prompt; stay quiet
            if let Ok(categories) = api.list_categories().await {
                let _ = tx.send(AppEvent::CategoriesLoaded(categories)).await;
            }
        });
    }

    fn spawn_bulk_delete(&self, req: BulkDeleteRequest, filter_wide: bool) {
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match api.bulk_delete(&req).await {
                Ok(resp) => AppEvent::BulkDeleted {
                    deleted: resp.deleted,
                    filter_wide,
                },
                // Failed delete leaves query and selection untouched
                Err(err) => AppEvent::error(err.to_string()),
            };
            let _ = tx.send(event).await;
        });
    }

    // ── Event handling (the single consumer) ─────────────────────────────────

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::JobFinished { job_id, outcome } => {
                // Retire the handle, notify, then refresh - in that order
                self.supervisor.stop(job_id);
                let (kind, message) = outcome.notice();
                self.show_toast(kind, message);
                self.reload_jobs();
            }
            AppEvent::JobsLoaded(jobs) => {
                self.jobs = jobs;
                self.jobs_scroll = self.jobs_scroll.min(self.jobs.len().saturating_sub(1));
                self.supervisor.watch_active(&self.jobs);
            }
            AppEvent::PageLoaded { seq, page } => {
                if self.controller.apply_page(seq, page) {
                    let rows = self
                        .controller
                        .page()
                        .map(|p| p.transactions.len())
                        .unwrap_or(0);
                    self.cursor = self.cursor.min(rows.saturating_sub(1));
                    self.select_all_checked = false;
                }
            }
            AppEvent::CategoriesLoaded(categories) => {
                self.categories = categories;
            }
            AppEvent::BulkDeleted {
                deleted,
                filter_wide,
            } => {
                // The server's count is the truth, not the requested size
                self.show_toast(
                    ToastKind::Info,
                    format!("Deleted {deleted} transaction(s)"),
                );
                let reload = self.controller.after_bulk_delete(filter_wide);
                self.spawn_fetch(reload);
            }
            AppEvent::Toast { kind, message } => {
                self.show_toast(kind, message);
            }
        }
    }

    pub fn show_toast(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.toast = Some(Toast::new(kind, message));
    }

    /// Periodic tick: expire the toast
    pub fn tick(&mut self) {
        if self.toast.as_ref().is_some_and(|t| t.is_expired()) {
            self.toast = None;
        }
    }

    // ── Key dispatch ─────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.confirm.is_some() {
            self.handle_confirm_key(key.code);
            return;
        }
        if self.prompt.is_some() {
            self.handle_prompt_key(key.code);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.view = View::Transactions,
            KeyCode::Char('2') => {
                self.view = View::Jobs;
                self.reload_jobs();
            }
            KeyCode::Char('R') => match self.view {
                View::Transactions => self.reload_transactions(),
                View::Jobs => self.reload_jobs(),
            },
            _ => match self.view {
                View::Transactions => self.handle_txn_key(key.code),
                View::Jobs => self.handle_jobs_key(key.code),
            },
        }
    }

    fn handle_txn_key(&mut self, code: KeyCode) {
        let rows = self
            .controller
            .page()
            .map(|p| p.transactions.len())
            .unwrap_or(0);

        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if rows > 0 {
                    self.cursor = (self.cursor + 1).min(rows - 1);
                }
            }
            // Row selection
            KeyCode::Char(' ') => {
                if let Some(id) = self.cursor_row_id() {
                    self.controller.on_selection_toggled(id);
                }
            }
            KeyCode::Char('x') => {
                self.select_all_checked = !self.select_all_checked;
                self.controller.on_select_all(self.select_all_checked);
            }
            // Sorting
            KeyCode::Char('s') => self.sort(SortKey::Date),
            KeyCode::Char('a') => self.sort(SortKey::Amount),
            KeyCode::Char('e') => self.sort(SortKey::Merchant),
            // Paging
            KeyCode::Char('n') | KeyCode::Right => {
                if let Some(p) = self.controller.page() {
                    if p.page < p.total_pages {
                        let reload = self.controller.on_page(p.page + 1);
                        self.spawn_fetch(reload);
                    }
                }
            }
            KeyCode::Char('p') | KeyCode::Left => {
                if let Some(p) = self.controller.page() {
                    if p.page > 1 {
                        let reload = self.controller.on_page(p.page - 1);
                        self.spawn_fetch(reload);
                    }
                }
            }
            // Filter prompts
            KeyCode::Char('/') => self.open_prompt(PromptField::Search),
            KeyCode::Char('m') => self.open_prompt(PromptField::Merchant),
            KeyCode::Char('c') => self.open_prompt(PromptField::Category),
            KeyCode::Char('t') => self.open_prompt(PromptField::TxnType),
            KeyCode::Char('g') => self.open_prompt(PromptField::DateFrom),
            KeyCode::Char('G') => self.open_prompt(PromptField::DateTo),
            KeyCode::Char('<') => self.open_prompt(PromptField::AmountMin),
            KeyCode::Char('>') => self.open_prompt(PromptField::AmountMax),
            KeyCode::Char('r') => {
                let reload = self.controller.on_reset_filters();
                self.spawn_fetch(reload);
            }
            // Bulk deletion - destructive, always behind a confirm
            KeyCode::Char('D') => {
                let count = self.controller.selection().count();
                if count > 0 {
                    self.confirm = Some(Confirm::DeleteSelected(count));
                }
            }
            KeyCode::Char('X') => {
                self.confirm = Some(Confirm::DeleteFiltered);
            }
            _ => {}
        }
    }

    fn handle_jobs_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.jobs_scroll = self.jobs_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if !self.jobs.is_empty() {
                    self.jobs_scroll = (self.jobs_scroll + 1).min(self.jobs.len() - 1);
                }
            }
            _ => {}
        }
    }

    fn sort(&mut self, column: SortKey) {
        let reload = self.controller.on_sort(column);
        self.spawn_fetch(reload);
    }

    fn cursor_row_id(&self) -> Option<i64> {
        self.controller
            .page()
            .and_then(|p| p.transactions.get(self.cursor))
            .map(|t| t.id)
    }

    // ── Prompt editing ───────────────────────────────────────────────────────

    fn open_prompt(&mut self, field: PromptField) {
        let f = self.controller.query().filters();
        let buffer = match field {
            PromptField::Search => f.search.clone().unwrap_or_default(),
            PromptField::Merchant => f.merchant.clone().unwrap_or_default(),
            PromptField::Category => f.category_id.map(|v| v.to_string()).unwrap_or_default(),
            PromptField::TxnType => f.txn_type.map(|v| v.as_str().to_string()).unwrap_or_default(),
            PromptField::DateFrom => f.date_from.map(|v| v.to_string()).unwrap_or_default(),
            PromptField::DateTo => f.date_to.map(|v| v.to_string()).unwrap_or_default(),
            PromptField::AmountMin => f.amount_min.map(|v| v.to_string()).unwrap_or_default(),
            PromptField::AmountMax => f.amount_max.map(|v| v.to_string()).unwrap_or_default(),
        };
        self.prompt = Some(Prompt { field, buffer });
    }

    fn handle_prompt_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.prompt = None;
            }
            KeyCode::Enter => self.commit_prompt(),
            KeyCode::Backspace => {
                if let Some(prompt) = &mut self.prompt {
                    prompt.buffer.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(prompt) = &mut self.prompt {
                    prompt.buffer.push(c);
                }
            }
            _ => {}
        }
    }

    /// Parse the prompt buffer into a typed filter change. An empty buffer
    /// clears the field; an unparsable one becomes an error toast with no
    /// state change.
    fn commit_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let raw = prompt.buffer.trim();
        let empty = raw.is_empty();

        let change = match prompt.field {
            PromptField::Search => FilterChange::Search((!empty).then(|| raw.to_string())),
            PromptField::Merchant => FilterChange::Merchant((!empty).then(|| raw.to_string())),
            PromptField::Category => {
                if empty {
                    FilterChange::Category(None)
                } else {
                    match raw.parse::<i64>() {
                        Ok(id) => FilterChange::Category(Some(id)),
                        Err(_) => {
                            self.show_toast(ToastKind::Error, "Category id must be a number");
                            return;
                        }
                    }
                }
            }
            PromptField::TxnType => {
                if empty {
                    FilterChange::TxnType(None)
                } else {
                    match raw.to_lowercase().as_str() {
                        "debit" => FilterChange::TxnType(Some(TxnType::Debit)),
                        "credit" => FilterChange::TxnType(Some(TxnType::Credit)),
                        _ => {
                            self.show_toast(ToastKind::Error, "Type must be debit or credit");
                            return;
                        }
                    }
                }
            }
            PromptField::DateFrom | PromptField::DateTo => {
                let value = if empty {
                    None
                } else {
                    match raw.parse::<NaiveDate>() {
                        Ok(d) => Some(d),
                        Err(_) => {
                            self.show_toast(ToastKind::Error, "Date must be YYYY-MM-DD");
                            return;
                        }
                    }
                };
                if prompt.field == PromptField::DateFrom {
                    FilterChange::DateFrom(value)
                } else {
                    FilterChange::DateTo(value)
                }
            }
            PromptField::AmountMin | PromptField::AmountMax => {
                let value = if empty {
                    None
                } else {
                    match raw.parse::<f64>() {
                        Ok(v) => Some(v),
                        Err(_) => {
                            self.show_toast(ToastKind::Error, "Amount must be a number");
                            return;
                        }
                    }
                };
                if prompt.field == PromptField::AmountMin {
                    FilterChange::AmountMin(value)
                } else {
                    FilterChange::AmountMax(value)
                }
            }
        };

        let reload = self.controller.on_filter_changed(change);
        self.spawn_fetch(reload);
    }

    // ── Confirm modal ────────────────────────────────────────────────────────

    fn handle_confirm_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                let confirm = self.confirm.take();
                match confirm {
                    Some(Confirm::DeleteSelected(_)) => {
                        if let Some(req) = self.controller.bulk_delete_selected() {
                            self.spawn_bulk_delete(req, false);
                        }
                    }
                    Some(Confirm::DeleteFiltered) => {
                        self.spawn_bulk_delete(self.controller.bulk_delete_filtered(), true);
                    }
                    None => {}
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm = None;
            }
            _ => {}
        }
    }
}
