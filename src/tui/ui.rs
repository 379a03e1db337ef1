//! Rendering
//!
//! Pure draw code: reads App state, produces widgets. No state mutation
//! happens here.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::api::models::{Job, JobStatus, TxnType};
use crate::config::VERSION;
use crate::query::{SortDir, SortKey};

use super::app::{App, Confirm, View};

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let mut constraints = vec![
        Constraint::Length(1), // title bar
        Constraint::Min(3),    // main area
    ];
    if app.view == View::Transactions && app.controller.bulk_bar_visible() {
        constraints.push(Constraint::Length(1)); // bulk bar (hidden at zero)
    }
    constraints.push(Constraint::Length(1)); // status bar
    if app.prompt.is_some() {
        constraints.push(Constraint::Length(1)); // prompt line
    }
    let chunks = Layout::vertical(constraints).split(area);

    draw_title_bar(f, chunks[0], app);

    let mut next = 2;
    match app.view {
        View::Transactions => {
            draw_transactions(f, chunks[1], app);
            if app.controller.bulk_bar_visible() {
                draw_bulk_bar(f, chunks[next], app);
                next += 1;
            }
        }
        View::Jobs => draw_jobs(f, chunks[1], app),
    }

    draw_status_bar(f, chunks[next], app);
    next += 1;

    if let Some(prompt) = &app.prompt {
        let line = Paragraph::new(format!("{}: {}_", prompt.field.label(), prompt.buffer))
            .style(Style::default().fg(Color::Yellow));
        f.render_widget(line, chunks[next]);
    }

    if let Some(confirm) = &app.confirm {
        draw_confirm(f, area, confirm);
    }

    if let Some(toast) = &app.toast {
        toast.render(f, area);
    }
}

fn draw_title_bar(f: &mut Frame, area: Rect, app: &App) {
    let tab = |label: &str, active: bool| {
        let style = if active {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Span::styled(label.to_string(), style)
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" finwatch v{VERSION} "),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("| "),
        tab("[1] transactions", app.view == View::Transactions),
        Span::raw("  "),
        tab("[2] jobs", app.view == View::Jobs),
        Span::raw("  | q quit"),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions view
// ─────────────────────────────────────────────────────────────────────────────

fn sort_marker(app: &App, column: SortKey) -> &'static str {
    let (key, dir) = app.controller.query().sort();
    if key != column {
        return "";
    }
    match dir {
        SortDir::Asc => " ^",
        SortDir::Desc => " v",
    }
}

fn draw_transactions(f: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(vec![
        Cell::from(if app.select_all_checked { "[x]" } else { "[ ]" }),
        Cell::from(format!("Date{}", sort_marker(app, SortKey::Date))),
        Cell::from("Description"),
        Cell::from(format!("Merchant{}", sort_marker(app, SortKey::Merchant))),
        Cell::from("Category"),
        Cell::from(format!("Amount{}", sort_marker(app, SortKey::Amount))),
        Cell::from("Type"),
        Cell::from("Balance"),
        Cell::from("Cur"),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = match app.controller.page() {
        Some(page) if !page.transactions.is_empty() => page
            .transactions
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let selected = app.controller.selection().is_selected(t.id);
                let marker = if selected { "[x]" } else { "[ ]" };
                let category = t
                    .category_id
                    .and_then(|id| app.categories.iter().find(|c| c.id == id))
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| "-".to_string());
                let type_style = match t.txn_type {
                    TxnType::Debit => Style::default().fg(Color::Red),
                    TxnType::Credit => Style::default().fg(Color::Green),
                };
                let mut row = Row::new(vec![
                    Cell::from(marker),
                    Cell::from(t.date.to_string()),
                    Cell::from(t.description.clone().unwrap_or_else(|| "-".into())),
                    Cell::from(t.merchant.clone().unwrap_or_else(|| "-".into())),
                    Cell::from(category),
                    Cell::from(format!("{:.2}", t.amount)),
                    Cell::from(Span::styled(t.txn_type.as_str(), type_style)),
                    Cell::from(
                        t.balance
                            .map(|b| format!("{b:.2}"))
                            .unwrap_or_else(|| "-".into()),
                    ),
                    Cell::from(t.currency.clone().unwrap_or_default()),
                ]);
                if i == app.cursor {
                    row = row.style(Style::default().add_modifier(Modifier::REVERSED));
                } else if selected {
                    row = row.style(Style::default().fg(Color::Cyan));
                }
                row
            })
            .collect(),
        _ => vec![Row::new(vec![
            Cell::from(""),
            Cell::from(Span::styled(
                "No transactions found",
                Style::default().fg(Color::DarkGray),
            )),
        ])],
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(10),
            Constraint::Min(16),
            Constraint::Length(18),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Length(3),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(" Transactions "));

    f.render_widget(table, area);
}

fn draw_bulk_bar(f: &mut Frame, area: Rect, app: &App) {
    let count = app.controller.selection().count();
    let line = Paragraph::new(format!(
        " {count} selected | D delete selection | X delete all matching filters"
    ))
    .style(Style::default().fg(Color::Black).bg(Color::Yellow));
    f.render_widget(line, area);
}

// ─────────────────────────────────────────────────────────────────────────────
// Jobs view
// ─────────────────────────────────────────────────────────────────────────────

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Queued => Style::default().fg(Color::DarkGray),
        JobStatus::Running => Style::default().fg(Color::Yellow),
        JobStatus::Completed => Style::default().fg(Color::Green),
        JobStatus::Failed => Style::default().fg(Color::Red),
    }
}

fn job_row(job: &Job, highlighted: bool) -> Row<'static> {
    let mut row = Row::new(vec![
        Cell::from(job.original_filename.clone()),
        Cell::from(
            job.page_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".into()),
        ),
        Cell::from(Span::styled(
            job.status.as_str(),
            status_style(job.status),
        )),
        Cell::from(job.error_message.clone().unwrap_or_else(|| "-".into())),
        Cell::from(job.created_at.clone().unwrap_or_else(|| "-".into())),
        Cell::from(job.completed_at.clone().unwrap_or_else(|| "-".into())),
    ]);
    if highlighted {
        row = row.style(Style::default().add_modifier(Modifier::REVERSED));
    }
    row
}

fn draw_jobs(f: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(vec![
        Cell::from("File"),
        Cell::from("Pages"),
        Cell::from("Status"),
        Cell::from("Error"),
        Cell::from("Created"),
        Cell::from("Completed"),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = app
        .jobs
        .iter()
        .enumerate()
        .map(|(i, job)| job_row(job, i == app.jobs_scroll))
        .collect();

    let watching = app.supervisor.active_count();
    let title = if watching > 0 {
        format!(" Import jobs ({watching} polling) ")
    } else {
        " Import jobs ".to_string()
    };

    let table = Table::new(
        rows,
        [
            Constraint::Min(20),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Min(16),
            Constraint::Length(19),
            Constraint::Length(19),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(table, area);
}

// ─────────────────────────────────────────────────────────────────────────────
// Status bar, confirm modal
// ─────────────────────────────────────────────────────────────────────────────

fn filters_summary(app: &App) -> String {
    let f = app.controller.query().filters();
    let mut parts = Vec::new();
    if let Some(v) = &f.search {
        parts.push(format!("search={v}"));
    }
    if let Some(v) = &f.merchant {
        parts.push(format!("merchant={v}"));
    }
    if let Some(v) = f.category_id {
        parts.push(format!("category={v}"));
    }
    if let Some(v) = f.txn_type {
        parts.push(format!("type={v}"));
    }
    if f.date_from.is_some() || f.date_to.is_some() {
        parts.push("dates".to_string());
    }
    if f.amount_min.is_some() || f.amount_max.is_some() {
        parts.push("amounts".to_string());
    }
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(" ")
    }
}

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let text = match app.view {
        View::Transactions => {
            let paging = match app.controller.page() {
                Some(p) => format!("Page {} of {} ({} results)", p.page, p.total_pages, p.total),
                None => "Loading...".to_string(),
            };
            let (key, dir) = app.controller.query().sort();
            format!(
                " {paging} | sort {} {} | filters: {} | r reset filters",
                key.as_str(),
                dir.as_str(),
                filters_summary(app)
            )
        }
        View::Jobs => {
            let last_log = app
                .log_buffer
                .latest()
                .map(|e| format!("{} {}", e.level, e.message))
                .unwrap_or_default();
            format!(" {} job(s) | R refresh | {}", app.jobs.len(), last_log)
        }
    };
    let bar = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    f.render_widget(bar, area);
}

fn draw_confirm(f: &mut Frame, area: Rect, confirm: &Confirm) {
    let message = match confirm {
        Confirm::DeleteSelected(count) => {
            format!("Delete {count} selected transaction(s)?")
        }
        Confirm::DeleteFiltered => {
            "Delete ALL transactions matching current filters? This cannot be undone.".to_string()
        }
    };

    let width = (message.len() as u16 + 6).min(area.width.saturating_sub(4));
    let modal = centered_rect(width, 5, area);

    let text = vec![
        Line::from(message),
        Line::from(""),
        Line::from(Span::styled(
            "y confirm / n cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Confirm ");

    f.render_widget(Clear, modal);
    f.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(block),
        modal,
    );
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
