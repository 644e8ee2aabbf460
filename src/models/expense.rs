use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{MediaEvent, ParsedMessage};

/// A message classified as a probable monetary transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCandidate {
    /// The source message this candidate was detected in
    pub message: ParsedMessage,
    /// Chosen amount, the maximum of the significant numbers found
    pub amount: f64,
    /// More than one plausible amount, or no currency hint was present
    pub needs_review: bool,
    /// Message matches total/subtotal vocabulary
    pub is_total_line: bool,
    /// Excluded from import by default; downstream review may re-include
    pub excluded: bool,
    /// User-assignable during review
    pub category: Option<String>,
}

/// Qualitative strength of a heuristic receipt match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    High,
    Medium,
    Low,
}

/// A proposed association between an expense candidate and an export file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptMatch {
    /// Filename from the export bundle, consumed at most once per run
    pub filename: String,
    pub confidence: MatchConfidence,
    /// The media event that justified the match
    pub event: MediaEvent,
}

/// Expense record accepted by the persistence collaborator at import time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub amount: f64,
    pub partner_id: String,
    pub category: Option<String>,
    pub notes: String,
    pub receipt_urls: Vec<String>,
    pub missing_receipt: bool,
    pub needs_review: bool,
}

/// Expense record as returned by the persistence collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub partner_id: String,
    pub category: Option<String>,
    pub notes: String,
    #[serde(default)]
    pub receipt_urls: Vec<String>,
    #[serde(default)]
    pub missing_receipt: bool,
    #[serde(default)]
    pub needs_review: bool,
}

/// Unmatched-file metadata routed to the manual-assignment inbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxEntry {
    pub storage_path: String,
    pub original_filename: String,
    /// Sender of the media event the file was traced to, if any
    pub sender: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
}

/// Seen-hash record written against a persisted expense at import time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashRecord {
    pub message_hash: String,
    pub expense_id: String,
    pub import_run_id: String,
}
