//! Wire types for the ledger service API
//!
//! These mirror the JSON bodies the service produces and consumes. Timestamps
//! arrive as plain text from the service and are displayed verbatim; only
//! transaction dates are parsed, since date-range filters compare them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Jobs
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle status of a statement-import job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal statuses never transition again; polling stops here.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A server-tracked statement-import job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: i64,
    pub import_id: i64,
    pub status: JobStatus,
    pub original_filename: String,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Number of transactions produced; present once the job completed
    #[serde(default)]
    pub transaction_count: Option<u64>,
}

/// Response to a statement upload: the job to start watching
#[derive(Debug, Clone, Deserialize)]
pub struct UploadAccepted {
    pub import_id: i64,
    pub job_id: i64,
    pub status: JobStatus,
    pub filename: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

/// Debit or credit, as classified by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnType {
    Debit,
    Credit,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::fmt::Display for TxnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the transactions table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    pub amount: f64,
    pub txn_type: TxnType,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One page of query results plus pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultPage {
    pub transactions: Vec<Transaction>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// A spending category, for the category filter
#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Bulk deletion
// ─────────────────────────────────────────────────────────────────────────────

/// Filter fields re-serialized as a deletion predicate (no sort, no paging)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterPredicate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_type: Option<TxnType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_max: Option<f64>,
}

/// Body of a bulk-delete request
///
/// Two distinct shapes: an explicit id set from the current selection, or the
/// current filter predicate with an `all: true` marker. The marker is what
/// separates "delete everything matching these filters" from an accidental
/// empty request.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BulkDeleteRequest {
    ByIds {
        ids: Vec<i64>,
    },
    ByFilter {
        all: bool,
        #[serde(flatten)]
        predicate: FilterPredicate,
    },
}

impl BulkDeleteRequest {
    pub fn by_ids(ids: Vec<i64>) -> Self {
        Self::ByIds { ids }
    }

    pub fn by_filter(predicate: FilterPredicate) -> Self {
        Self::ByFilter {
            all: true,
            predicate,
        }
    }
}

/// The server's deleted-count is the sole source of truth for success messages
#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_deserializes_lowercase() {
        let job: Job = serde_json::from_str(
            r#"{"job_id": 7, "import_id": 3, "status": "running",
                "original_filename": "jan.pdf"}"#,
        )
        .unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(!job.status.is_terminal());
        assert_eq!(job.transaction_count, None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
    }

    #[test]
    fn bulk_delete_by_ids_body() {
        let body = serde_json::to_value(BulkDeleteRequest::by_ids(vec![1, 2, 3])).unwrap();
        assert_eq!(body, serde_json::json!({"ids": [1, 2, 3]}));
    }

    #[test]
    fn bulk_delete_by_filter_carries_marker_and_set_fields_only() {
        let predicate = FilterPredicate {
            merchant: Some("acme".into()),
            txn_type: Some(TxnType::Debit),
            ..Default::default()
        };
        let body = serde_json::to_value(BulkDeleteRequest::by_filter(predicate)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"all": true, "merchant": "acme", "txn_type": "debit"})
        );
    }
}
