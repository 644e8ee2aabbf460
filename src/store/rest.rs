use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::models::{
    ExpenseRecord, HashRecord, InboxEntry, NewExpense, Partner, SenderAssignment, SenderMap,
};

use super::{ImportRunStats, ObjectStorage, ProjectStore};

/// Configuration for the PostgREST-style persistence backend
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the backend (no trailing slash)
    pub base_url: String,
    /// API key sent as both apikey and bearer token
    pub api_key: String,
}

impl StoreConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("HISAB_API_URL")
            .context("HISAB_API_URL environment variable not set")?;
        let api_key = std::env::var("HISAB_API_KEY")
            .context("HISAB_API_KEY environment variable not set")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

/// HTTP client for the record store and receipt object storage
pub struct RestStore {
    client: Client,
    config: StoreConfig,
}

impl RestStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    async fn ensure_success(response: Response, what: &str) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("store error during {}: {} - {}", what, status, body);
        }
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct MappingRow {
    whatsapp_name: String,
    partner_id: Option<String>,
    #[serde(default)]
    ignored: bool,
}

#[derive(Debug, Serialize)]
struct MappingUpsert<'a> {
    project_id: &'a str,
    whatsapp_name: &'a str,
    partner_id: Option<&'a str>,
    ignored: bool,
}

#[derive(Debug, Deserialize)]
struct SeenHashRow {
    message_hash: String,
}

#[derive(Debug, Serialize)]
struct HashInsert<'a> {
    project_id: &'a str,
    message_hash: &'a str,
    expense_id: &'a str,
    import_run_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ExpenseInsert<'a> {
    project_id: &'a str,
    date: NaiveDate,
    amount_egp: f64,
    paid_by_partner_id: &'a str,
    category: Option<&'a str>,
    notes: &'a str,
    receipt_urls: &'a [String],
    missing_receipt: bool,
    needs_review: bool,
}

#[derive(Debug, Deserialize)]
struct ExpenseRow {
    id: String,
    date: NaiveDate,
    amount_egp: f64,
    paid_by_partner_id: String,
    category: Option<String>,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    receipt_urls: Vec<String>,
    #[serde(default)]
    missing_receipt: bool,
    #[serde(default)]
    needs_review: bool,
}

impl From<ExpenseRow> for ExpenseRecord {
    fn from(row: ExpenseRow) -> Self {
        Self {
            id: row.id,
            date: row.date,
            amount: row.amount_egp,
            partner_id: row.paid_by_partner_id,
            category: row.category,
            notes: row.notes,
            receipt_urls: row.receipt_urls,
            missing_receipt: row.missing_receipt,
            needs_review: row.needs_review,
        }
    }
}

#[derive(Debug, Serialize)]
struct InboxInsert<'a> {
    project_id: &'a str,
    storage_path: &'a str,
    original_filename: &'a str,
    whatsapp_sender: Option<&'a str>,
    timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
struct RunInsert<'a> {
    project_id: &'a str,
    filename: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

impl ProjectStore for RestStore {
    async fn sender_mappings(&self, project_id: &str) -> Result<SenderMap> {
        let url = self.table_url("sender_mappings");
        let response = self
            .authed(self.client.get(&url))
            .query(&[
                ("project_id", format!("eq.{project_id}")),
                ("select", "whatsapp_name,partner_id,ignored".to_string()),
            ])
            .send()
            .await
            .context("failed to fetch sender mappings")?;
        let rows: Vec<MappingRow> = Self::ensure_success(response, "sender_mappings fetch")
            .await?
            .json()
            .await
            .context("failed to parse sender mappings")?;

        let mut map = SenderMap::new();
        for row in rows {
            map.insert(
                row.whatsapp_name,
                SenderAssignment {
                    partner_id: row.partner_id,
                    ignored: row.ignored,
                },
            );
        }
        Ok(map)
    }

    async fn upsert_sender_mapping(
        &self,
        project_id: &str,
        sender: &str,
        assignment: &SenderAssignment,
    ) -> Result<()> {
        let url = self.table_url("sender_mappings");
        let body = MappingUpsert {
            project_id,
            whatsapp_name: sender,
            partner_id: assignment.partner_id.as_deref(),
            ignored: assignment.ignored,
        };
        let response = self
            .authed(self.client.post(&url))
            .query(&[("on_conflict", "project_id,whatsapp_name")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&body)
            .send()
            .await
            .context("failed to upsert sender mapping")?;
        Self::ensure_success(response, "sender_mapping upsert").await?;
        Ok(())
    }

    async fn partners(&self, project_id: &str) -> Result<Vec<Partner>> {
        let url = self.table_url("partners");
        let response = self
            .authed(self.client.get(&url))
            .query(&[
                ("project_id", format!("eq.{project_id}")),
                ("active", "is.true".to_string()),
                ("select", "id,name".to_string()),
            ])
            .send()
            .await
            .context("failed to fetch partners")?;
        Self::ensure_success(response, "partners fetch")
            .await?
            .json()
            .await
            .context("failed to parse partners")
    }

    async fn seen_hashes(&self, project_id: &str, hashes: &[String]) -> Result<HashSet<String>> {
        if hashes.is_empty() {
            return Ok(HashSet::new());
        }
        let url = self.table_url("import_message_hashes");
        let filter = format!("in.({})", hashes.join(","));
        let response = self
            .authed(self.client.get(&url))
            .query(&[
                ("project_id", format!("eq.{project_id}")),
                ("message_hash", filter),
                ("select", "message_hash".to_string()),
            ])
            .send()
            .await
            .context("failed to check seen hashes")?;
        let rows: Vec<SeenHashRow> = Self::ensure_success(response, "seen hash check")
            .await?
            .json()
            .await
            .context("failed to parse seen hashes")?;
        Ok(rows.into_iter().map(|r| r.message_hash).collect())
    }

    async fn record_hash(&self, project_id: &str, record: &HashRecord) -> Result<()> {
        let url = self.table_url("import_message_hashes");
        let body = HashInsert {
            project_id,
            message_hash: &record.message_hash,
            expense_id: &record.expense_id,
            import_run_id: &record.import_run_id,
        };
        let response = self
            .authed(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .context("failed to record message hash")?;
        Self::ensure_success(response, "hash insert").await?;
        Ok(())
    }

    async fn insert_expense(&self, project_id: &str, expense: &NewExpense) -> Result<String> {
        let url = self.table_url("expenses");
        let body = ExpenseInsert {
            project_id,
            date: expense.date,
            amount_egp: expense.amount,
            paid_by_partner_id: &expense.partner_id,
            category: expense.category.as_deref(),
            notes: &expense.notes,
            receipt_urls: &expense.receipt_urls,
            missing_receipt: expense.missing_receipt,
            needs_review: expense.needs_review,
        };
        let response = self
            .authed(self.client.post(&url))
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .context("failed to insert expense")?;
        let rows: Vec<IdRow> = Self::ensure_success(response, "expense insert")
            .await?
            .json()
            .await
            .context("failed to parse expense insert response")?;
        rows.into_iter()
            .next()
            .map(|r| r.id)
            .context("expense insert returned no row")
    }

    async fn expenses(&self, project_id: &str) -> Result<Vec<ExpenseRecord>> {
        let url = self.table_url("expenses");
        let response = self
            .authed(self.client.get(&url))
            .query(&[
                ("project_id", format!("eq.{project_id}")),
                ("order", "date.desc".to_string()),
            ])
            .send()
            .await
            .context("failed to fetch expenses")?;
        let rows: Vec<ExpenseRow> = Self::ensure_success(response, "expenses fetch")
            .await?
            .json()
            .await
            .context("failed to parse expenses")?;
        Ok(rows.into_iter().map(ExpenseRecord::from).collect())
    }

    async fn insert_inbox_entry(&self, project_id: &str, entry: &InboxEntry) -> Result<()> {
        let url = self.table_url("receipt_inbox");
        let body = InboxInsert {
            project_id,
            storage_path: &entry.storage_path,
            original_filename: &entry.original_filename,
            whatsapp_sender: entry.sender.as_deref(),
            timestamp: entry.timestamp,
        };
        let response = self
            .authed(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .context("failed to insert inbox entry")?;
        Self::ensure_success(response, "inbox insert").await?;
        Ok(())
    }

    async fn create_import_run(&self, project_id: &str, filename: &str) -> Result<String> {
        let url = self.table_url("import_runs");
        let body = RunInsert {
            project_id,
            filename,
        };
        let response = self
            .authed(self.client.post(&url))
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .context("failed to create import run")?;
        let rows: Vec<IdRow> = Self::ensure_success(response, "import run insert")
            .await?
            .json()
            .await
            .context("failed to parse import run response")?;
        rows.into_iter()
            .next()
            .map(|r| r.id)
            .context("import run insert returned no row")
    }

    async fn finish_import_run(
        &self,
        project_id: &str,
        run_id: &str,
        stats: &ImportRunStats,
    ) -> Result<()> {
        let url = self.table_url("import_runs");
        let response = self
            .authed(self.client.patch(&url))
            .query(&[
                ("id", format!("eq.{run_id}")),
                ("project_id", format!("eq.{project_id}")),
            ])
            .json(stats)
            .send()
            .await
            .context("failed to finish import run")?;
        Self::ensure_success(response, "import run update").await?;
        Ok(())
    }
}

impl ObjectStorage for RestStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        let url = format!(
            "{}/storage/v1/object/receipts/{}",
            self.config.base_url, path
        );
        let response = self
            .authed(self.client.post(&url))
            .header("content-type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("failed to upload {}", path))?;
        Self::ensure_success(response, "receipt upload").await?;

        Ok(format!(
            "{}/storage/v1/object/public/receipts/{}",
            self.config.base_url, path
        ))
    }
}
