// Events that flow from background tasks to the UI loop
//
// Fetches and polling run as spawned tasks; their results come back over one
// mpsc channel as AppEvent values. A single consumer processes them in order,
// which keeps side-effect ordering (notification before list refresh)
// structural rather than timing-dependent.

use crate::api::models::{Category, Job, ResultPage};

/// Visual flavor of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Error,
}

/// How a watched job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { transaction_count: u64 },
    Failed { message: String },
}

impl JobOutcome {
    /// Notification shown at the terminal transition
    pub fn notice(&self) -> (ToastKind, String) {
        match self {
            Self::Completed { transaction_count } => (
                ToastKind::Info,
                format!("Import complete - {transaction_count} transactions added"),
            ),
            Self::Failed { message } => (ToastKind::Error, format!("Import failed: {message}")),
        }
    }
}

/// Main event type that flows through the application
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A watched job reached a terminal status
    JobFinished { job_id: i64, outcome: JobOutcome },

    /// The job list was fetched
    JobsLoaded(Vec<Job>),

    /// A transactions page arrived for the reload stamped `seq`
    PageLoaded { seq: u64, page: ResultPage },

    /// The category list was fetched
    CategoriesLoaded(Vec<Category>),

    /// A bulk delete succeeded; `deleted` is the server's count
    BulkDeleted { deleted: u64, filter_wide: bool },

    /// A user-visible notification
    Toast { kind: ToastKind, message: String },
}

impl AppEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Toast {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }
}
