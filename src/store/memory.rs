use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Result;

use crate::models::{
    ExpenseRecord, HashRecord, InboxEntry, NewExpense, Partner, SenderAssignment, SenderMap,
};

use super::{ImportRunStats, ObjectStorage, ProjectStore};

#[derive(Debug, Default)]
struct State {
    mappings: SenderMap,
    partners: Vec<Partner>,
    hashes: Vec<HashRecord>,
    expenses: Vec<ExpenseRecord>,
    inbox: Vec<InboxEntry>,
    runs: Vec<ImportRun>,
    next_id: usize,
}

#[derive(Debug, Clone)]
pub struct ImportRun {
    pub id: String,
    pub filename: String,
    pub stats: Option<ImportRunStats>,
}

/// In-memory single-project store for tests and offline dry runs.
/// The project id argument is accepted and ignored.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partners(partners: Vec<Partner>) -> Self {
        let store = Self::new();
        store.state.lock().unwrap().partners = partners;
        store
    }

    pub fn seed_mapping(&self, sender: &str, assignment: SenderAssignment) {
        self.state
            .lock()
            .unwrap()
            .mappings
            .insert(sender, assignment);
    }

    pub fn seed_hash(&self, record: HashRecord) {
        self.state.lock().unwrap().hashes.push(record);
    }

    // Snapshot accessors for assertions

    pub fn stored_expenses(&self) -> Vec<ExpenseRecord> {
        self.state.lock().unwrap().expenses.clone()
    }

    pub fn stored_hashes(&self) -> Vec<HashRecord> {
        self.state.lock().unwrap().hashes.clone()
    }

    pub fn stored_inbox(&self) -> Vec<InboxEntry> {
        self.state.lock().unwrap().inbox.clone()
    }

    pub fn stored_runs(&self) -> Vec<ImportRun> {
        self.state.lock().unwrap().runs.clone()
    }

    pub fn stored_mappings(&self) -> SenderMap {
        self.state.lock().unwrap().mappings.clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        format!("{}-{}", prefix, state.next_id)
    }
}

impl ProjectStore for MemoryStore {
    async fn sender_mappings(&self, _project_id: &str) -> Result<SenderMap> {
        Ok(self.state.lock().unwrap().mappings.clone())
    }

    async fn upsert_sender_mapping(
        &self,
        _project_id: &str,
        sender: &str,
        assignment: &SenderAssignment,
    ) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .mappings
            .insert(sender, assignment.clone());
        Ok(())
    }

    async fn partners(&self, _project_id: &str) -> Result<Vec<Partner>> {
        Ok(self.state.lock().unwrap().partners.clone())
    }

    async fn seen_hashes(&self, _project_id: &str, hashes: &[String]) -> Result<HashSet<String>> {
        let state = self.state.lock().unwrap();
        let known: HashSet<&str> = state.hashes.iter().map(|h| h.message_hash.as_str()).collect();
        Ok(hashes
            .iter()
            .filter(|h| known.contains(h.as_str()))
            .cloned()
            .collect())
    }

    async fn record_hash(&self, _project_id: &str, record: &HashRecord) -> Result<()> {
        self.state.lock().unwrap().hashes.push(record.clone());
        Ok(())
    }

    async fn insert_expense(&self, _project_id: &str, expense: &NewExpense) -> Result<String> {
        let id = self.next_id("exp");
        let record = ExpenseRecord {
            id: id.clone(),
            date: expense.date,
            amount: expense.amount,
            partner_id: expense.partner_id.clone(),
            category: expense.category.clone(),
            notes: expense.notes.clone(),
            receipt_urls: expense.receipt_urls.clone(),
            missing_receipt: expense.missing_receipt,
            needs_review: expense.needs_review,
        };
        self.state.lock().unwrap().expenses.push(record);
        Ok(id)
    }

    async fn expenses(&self, _project_id: &str) -> Result<Vec<ExpenseRecord>> {
        Ok(self.state.lock().unwrap().expenses.clone())
    }

    async fn insert_inbox_entry(&self, _project_id: &str, entry: &InboxEntry) -> Result<()> {
        self.state.lock().unwrap().inbox.push(entry.clone());
        Ok(())
    }

    async fn create_import_run(&self, _project_id: &str, filename: &str) -> Result<String> {
        let id = self.next_id("run");
        self.state.lock().unwrap().runs.push(ImportRun {
            id: id.clone(),
            filename: filename.to_string(),
            stats: None,
        });
        Ok(id)
    }

    async fn finish_import_run(
        &self,
        _project_id: &str,
        run_id: &str,
        stats: &ImportRunStats,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(run) = state.runs.iter_mut().find(|r| r.id == run_id) {
            run.stats = Some(stats.clone());
        }
        Ok(())
    }
}

/// In-memory object storage; uploads whose path contains the configured
/// failure marker error out, for exercising partial-failure paths
#[derive(Debug, Default)]
pub struct MemoryObjectStorage {
    uploads: Mutex<Vec<String>>,
    fail_marker: Option<String>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            fail_marker: Some(marker.to_string()),
        }
    }

    pub fn uploaded_paths(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

impl ObjectStorage for MemoryObjectStorage {
    async fn upload(&self, path: &str, _bytes: Vec<u8>) -> Result<String> {
        if let Some(marker) = &self.fail_marker {
            if path.contains(marker.as_str()) {
                anyhow::bail!("simulated upload failure for {}", path);
            }
        }
        self.uploads.lock().unwrap().push(path.to_string());
        Ok(format!("memory://receipts/{}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seen_hashes_intersects() {
        let store = MemoryStore::new();
        store.seed_hash(HashRecord {
            message_hash: "aaa".to_string(),
            expense_id: "e1".to_string(),
            import_run_id: "r1".to_string(),
        });

        let seen = store
            .seen_hashes("p", &["aaa".to_string(), "bbb".to_string()])
            .await
            .unwrap();
        assert!(seen.contains("aaa"));
        assert!(!seen.contains("bbb"));
    }

    #[tokio::test]
    async fn test_failing_upload_marker() {
        let storage = MemoryObjectStorage::failing_on("bad");
        assert!(storage.upload("ok/receipt.jpg", vec![1]).await.is_ok());
        assert!(storage.upload("bad/receipt.jpg", vec![1]).await.is_err());
        assert_eq!(storage.uploaded_paths().len(), 1);
    }
}
