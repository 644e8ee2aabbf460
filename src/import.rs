use std::collections::HashSet;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::heuristics::{DetectorConfig, detect_expenses};
use crate::io::{ExportBundle, ScanReport};
use crate::models::{HashRecord, InboxEntry, NewExpense, ParsedMessage, SenderMap};
use crate::parser::parse_transcript;
use crate::reconcile::{MatcherConfig, match_receipts, partition_seen};
use crate::store::{ImportRunStats, ObjectStorage, ProjectStore};

/// Knobs for one import run
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Label recorded on the import run
    pub filename: String,
    pub detector: DetectorConfig,
    pub matcher: MatcherConfig,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            filename: "WhatsApp Export".to_string(),
            detector: DetectorConfig::default(),
            matcher: MatcherConfig::default(),
        }
    }
}

/// Per-item outcome counts for one import run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub expenses_imported: usize,
    pub receipts_matched: usize,
    pub receipts_unmatched: usize,
    pub inbox_files: usize,
    pub duplicates_skipped: usize,
    pub excluded_skipped: usize,
    /// Collaborator calls that failed; the run continues past each one
    pub failures: usize,
}

/// Preview an import without writing anything.
///
/// Read-only against the store: previewing the same export twice never
/// records hashes or mappings, so an abandoned wizard session leaves no
/// trace.
pub async fn preview_import<S: ProjectStore>(
    store: &S,
    project_id: &str,
    bundle: &ExportBundle,
    local_mapping: &SenderMap,
    options: &ImportOptions,
) -> Result<ScanReport> {
    let outcome = parse_transcript(&bundle.chat_text);

    let mut senders = store.sender_mappings(project_id).await?;
    senders.merge(local_mapping);
    let partners = store.partners(project_id).await?;

    let mapped: Vec<ParsedMessage> = outcome
        .messages
        .iter()
        .filter(|m| senders.partner_id_of(&m.sender).is_some())
        .cloned()
        .collect();
    let candidates = detect_expenses(&mapped, &options.detector);

    let hashes: Vec<String> = candidates.iter().map(|c| c.message.hash.clone()).collect();
    let seen = store.seen_hashes(project_id, &hashes).await?;
    let partition = partition_seen(&candidates, &seen);

    let matches = match_receipts(
        &candidates,
        &outcome.media_events,
        &bundle.file_names(),
        &senders,
        &options.matcher,
    );

    Ok(ScanReport::build(
        &outcome, &candidates, &matches, &partition, &senders, &partners,
    ))
}

/// Run the full ingestion pipeline against the collaborators.
///
/// Parse, detect over mapped senders, dedup against the seen-hash store,
/// match receipts, then persist. Collaborator failures are counted per
/// item and never abort the loop, so one bad upload cannot block the rest
/// of the export.
pub async fn run_import<S: ProjectStore, O: ObjectStorage>(
    store: &S,
    storage: &O,
    project_id: &str,
    bundle: &ExportBundle,
    local_mapping: &SenderMap,
    options: &ImportOptions,
) -> Result<ImportReport> {
    let outcome = parse_transcript(&bundle.chat_text);
    if outcome.messages.is_empty() {
        anyhow::bail!("no parsable messages found in transcript");
    }
    info!(
        "Parsed {} messages, {} media events",
        outcome.messages.len(),
        outcome.media_events.len()
    );

    // Persist the mapping decisions made for this run, then work with the
    // store view overlaid with them
    for (sender, assignment) in local_mapping.iter() {
        store
            .upsert_sender_mapping(project_id, sender, assignment)
            .await?;
    }
    let mut senders = store.sender_mappings(project_id).await?;
    senders.merge(local_mapping);

    // Only messages from mapped, non-ignored senders are considered
    let mapped: Vec<ParsedMessage> = outcome
        .messages
        .iter()
        .filter(|m| senders.partner_id_of(&m.sender).is_some())
        .cloned()
        .collect();
    let candidates = detect_expenses(&mapped, &options.detector);
    info!("Detected {} expense candidates", candidates.len());

    let hashes: Vec<String> = candidates.iter().map(|c| c.message.hash.clone()).collect();
    let seen = store.seen_hashes(project_id, &hashes).await?;
    let partition = partition_seen(&candidates, &seen);

    let files = bundle.file_names();
    let matches = match_receipts(
        &candidates,
        &outcome.media_events,
        &files,
        &senders,
        &options.matcher,
    );

    let run_id = store.create_import_run(project_id, &options.filename).await?;

    let mut report = ImportReport::default();
    let mut used_files: HashSet<String> = HashSet::new();

    for (idx, candidate) in candidates.iter().enumerate() {
        if partition.is_duplicate(idx) {
            report.duplicates_skipped += 1;
            continue;
        }
        if candidate.excluded {
            debug!(
                "Skipping excluded candidate from {}: {}",
                candidate.message.sender, candidate.amount
            );
            report.excluded_skipped += 1;
            continue;
        }
        // Mapped by construction; stale mappings just skip the row
        let Some(partner_id) = senders.partner_id_of(&candidate.message.sender) else {
            continue;
        };

        let mut receipt_urls = Vec::new();
        if let Some(receipt) = matches[idx].as_ref() {
            used_files.insert(receipt.filename.clone());
            match upload_receipt(storage, project_id, bundle, &receipt.filename, false).await {
                Ok(url) => {
                    receipt_urls.push(url);
                    report.receipts_matched += 1;
                }
                Err(err) => {
                    warn!("Receipt upload failed for {}: {:#}", receipt.filename, err);
                    report.failures += 1;
                }
            }
        } else {
            report.receipts_unmatched += 1;
        }

        let expense = NewExpense {
            date: candidate.message.timestamp.date(),
            amount: candidate.amount,
            partner_id: partner_id.to_string(),
            category: candidate.category.clone(),
            notes: candidate.message.notes.clone(),
            missing_receipt: receipt_urls.is_empty(),
            needs_review: candidate.needs_review,
            receipt_urls,
        };

        let expense_id = match store.insert_expense(project_id, &expense).await {
            Ok(id) => id,
            Err(err) => {
                warn!(
                    "Expense insert failed for {} ({}): {:#}",
                    candidate.message.sender, candidate.amount, err
                );
                report.failures += 1;
                continue;
            }
        };

        let record = HashRecord {
            message_hash: candidate.message.hash.clone(),
            expense_id,
            import_run_id: run_id.clone(),
        };
        if let Err(err) = store.record_hash(project_id, &record).await {
            warn!("Hash record failed: {:#}", err);
            report.failures += 1;
        }

        report.expenses_imported += 1;
    }

    // Leftover images go to the manual-assignment inbox
    for file in bundle.media.iter().filter(|f| f.is_image()) {
        if used_files.contains(&file.filename) {
            continue;
        }
        let url = match upload_receipt(storage, project_id, bundle, &file.filename, true).await {
            Ok(url) => url,
            Err(err) => {
                warn!("Inbox upload failed for {}: {:#}", file.filename, err);
                report.failures += 1;
                continue;
            }
        };
        // Trace the file back to a media event for sender/timestamp context
        let related = outcome
            .media_events
            .iter()
            .find(|e| e.filename.as_deref() == Some(file.filename.as_str()));
        let entry = InboxEntry {
            storage_path: url,
            original_filename: file.filename.clone(),
            sender: related.map(|e| e.sender.clone()),
            timestamp: related.map(|e| e.timestamp),
        };
        if let Err(err) = store.insert_inbox_entry(project_id, &entry).await {
            warn!("Inbox insert failed for {}: {:#}", file.filename, err);
            report.failures += 1;
            continue;
        }
        report.inbox_files += 1;
    }

    let stats = ImportRunStats {
        expenses_imported: report.expenses_imported,
        receipts_matched: report.receipts_matched,
        receipts_unmatched: report.receipts_unmatched + report.inbox_files,
    };
    store.finish_import_run(project_id, &run_id, &stats).await?;

    info!(
        "Import complete: {} expenses, {} receipts linked, {} to inbox, {} failures",
        report.expenses_imported, report.receipts_matched, report.inbox_files, report.failures
    );

    Ok(report)
}

/// Read the file from the bundle and upload it under a unique path
async fn upload_receipt<O: ObjectStorage>(
    storage: &O,
    project_id: &str,
    bundle: &ExportBundle,
    filename: &str,
    inbox: bool,
) -> Result<String> {
    let file = bundle
        .file(filename)
        .ok_or_else(|| anyhow::anyhow!("file {} missing from bundle", filename))?;
    let bytes = file.read_bytes()?;
    let path = if inbox {
        format!("{}/inbox/{}-{}", project_id, Uuid::new_v4(), filename)
    } else {
        format!("{}/{}-{}", project_id, Uuid::new_v4(), filename)
    };
    storage.upload(&path, bytes).await
}
