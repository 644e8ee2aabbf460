pub mod memory;
pub mod rest;

pub use memory::{MemoryObjectStorage, MemoryStore};
pub use rest::{RestStore, StoreConfig};

use std::collections::HashSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::{
    ExpenseRecord, HashRecord, InboxEntry, NewExpense, Partner, SenderAssignment, SenderMap,
};

/// Counters written back onto a finished import run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRunStats {
    pub expenses_imported: usize,
    pub receipts_matched: usize,
    pub receipts_unmatched: usize,
}

/// Persistence collaborator for one project's records.
///
/// The core pipeline is pure; these calls surround it and are awaited
/// sequentially, so implementations need no interior coordination beyond
/// their own storage.
#[allow(async_fn_in_trait)]
pub trait ProjectStore {
    /// Existing display-name assignments for the project
    async fn sender_mappings(&self, project_id: &str) -> Result<SenderMap>;

    /// Upsert keyed by (project, display name)
    async fn upsert_sender_mapping(
        &self,
        project_id: &str,
        sender: &str,
        assignment: &SenderAssignment,
    ) -> Result<()>;

    /// Active partner records for the project
    async fn partners(&self, project_id: &str) -> Result<Vec<Partner>>;

    /// Subset of the given hashes already recorded for the project
    async fn seen_hashes(&self, project_id: &str, hashes: &[String]) -> Result<HashSet<String>>;

    /// Record an accepted hash against its persisted expense
    async fn record_hash(&self, project_id: &str, record: &HashRecord) -> Result<()>;

    /// Insert an expense, returning its id
    async fn insert_expense(&self, project_id: &str, expense: &NewExpense) -> Result<String>;

    /// All expense records for the project
    async fn expenses(&self, project_id: &str) -> Result<Vec<ExpenseRecord>>;

    /// Route an unmatched file to the manual-assignment inbox
    async fn insert_inbox_entry(&self, project_id: &str, entry: &InboxEntry) -> Result<()>;

    /// Open an import run, returning its id
    async fn create_import_run(&self, project_id: &str, filename: &str) -> Result<String>;

    /// Write final counters onto the run
    async fn finish_import_run(
        &self,
        project_id: &str,
        run_id: &str,
        stats: &ImportRunStats,
    ) -> Result<()>;
}

/// Binary object storage with upload-and-get-URL semantics
#[allow(async_fn_in_trait)]
pub trait ObjectStorage {
    /// Store bytes under the given path and return a public URL
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String>;
}
