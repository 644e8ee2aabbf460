use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{
    ExpenseCandidate, MatchConfidence, Partner, ReceiptMatch, SenderMap,
};
use crate::parser::ParseOutcome;
use crate::reconcile::DedupPartition;

/// Machine-readable result of a scan, one row per candidate
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub stats: ScanStats,
    pub rows: Vec<CandidateRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanStats {
    pub messages: usize,
    pub media_events: usize,
    pub senders: usize,
    pub candidates: usize,
    pub needs_review: usize,
    pub excluded: usize,
    pub duplicates: usize,
    pub receipts_matched: usize,
    /// Sum over rows that would import as-is
    pub included_total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateRow {
    pub timestamp: NaiveDateTime,
    pub sender: String,
    /// Mapped partner name, if the sender is assigned
    pub partner: Option<String>,
    pub amount: f64,
    pub needs_review: bool,
    pub is_total_line: bool,
    pub excluded: bool,
    pub duplicate: bool,
    pub receipt: Option<ReceiptSummary>,
    /// Leading slice of the message notes
    pub preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptSummary {
    pub filename: String,
    pub confidence: MatchConfidence,
}

impl ScanReport {
    /// Assemble the report from pipeline outputs. Row order follows
    /// candidate order so review listings are stable.
    pub fn build(
        outcome: &ParseOutcome,
        candidates: &[ExpenseCandidate],
        matches: &[Option<ReceiptMatch>],
        partition: &DedupPartition,
        senders: &SenderMap,
        partners: &[Partner],
    ) -> Self {
        let partner_name = |sender: &str| -> Option<String> {
            let id = senders.partner_id_of(sender)?;
            partners.iter().find(|p| p.id == id).map(|p| p.name.clone())
        };

        let rows: Vec<CandidateRow> = candidates
            .iter()
            .enumerate()
            .map(|(idx, candidate)| {
                let duplicate = partition.is_duplicate(idx);
                CandidateRow {
                    timestamp: candidate.message.timestamp,
                    sender: candidate.message.sender.clone(),
                    partner: partner_name(&candidate.message.sender),
                    amount: candidate.amount,
                    needs_review: candidate.needs_review,
                    is_total_line: candidate.is_total_line,
                    excluded: candidate.excluded,
                    duplicate,
                    receipt: matches.get(idx).and_then(|m| {
                        m.as_ref().map(|m| ReceiptSummary {
                            filename: m.filename.clone(),
                            confidence: m.confidence,
                        })
                    }),
                    preview: candidate.message.notes.chars().take(80).collect(),
                }
            })
            .collect();

        let unique_senders: std::collections::HashSet<&str> = outcome
            .messages
            .iter()
            .map(|m| m.sender.as_str())
            .collect();

        let stats = ScanStats {
            messages: outcome.messages.len(),
            media_events: outcome.media_events.len(),
            senders: unique_senders.len(),
            candidates: rows.len(),
            needs_review: rows.iter().filter(|r| r.needs_review && !r.duplicate).count(),
            excluded: rows.iter().filter(|r| r.excluded).count(),
            duplicates: rows.iter().filter(|r| r.duplicate).count(),
            receipts_matched: rows.iter().filter(|r| r.receipt.is_some()).count(),
            included_total: rows
                .iter()
                .filter(|r| !r.excluded && !r.duplicate && r.partner.is_some())
                .map(|r| r.amount)
                .sum(),
        };

        Self { stats, rows }
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }

    /// Format the report as a terminal preview
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Scan Summary");
        let _ = writeln!(out, "============");
        let _ = writeln!(
            out,
            "Messages: {} ({} media, {} senders)",
            self.stats.messages, self.stats.media_events, self.stats.senders
        );
        let _ = writeln!(
            out,
            "Candidates: {} ({} need review, {} excluded, {} duplicates)",
            self.stats.candidates,
            self.stats.needs_review,
            self.stats.excluded,
            self.stats.duplicates
        );
        let _ = writeln!(out, "Receipts matched: {}", self.stats.receipts_matched);
        let _ = writeln!(out, "Included total: EGP {:.2}", self.stats.included_total);
        let _ = writeln!(out);

        for row in &self.rows {
            let mut flags = Vec::new();
            if row.duplicate {
                flags.push("dup");
            }
            if row.excluded {
                flags.push("excluded");
            }
            if row.needs_review {
                flags.push("review");
            }
            if row.is_total_line {
                flags.push("total");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(","))
            };

            let receipt = match &row.receipt {
                Some(r) => format!("  receipt: {} ({:?})", r.filename, r.confidence),
                None => "  receipt: none".to_string(),
            };

            let _ = writeln!(
                out,
                "{} {:<16} {:>10.2}{}{}\n    {}",
                row.timestamp.format("%Y-%m-%d %H:%M"),
                row.partner.as_deref().unwrap_or(&row.sender),
                row.amount,
                flags,
                receipt,
                row.preview
            );
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::heuristics::{DetectorConfig, detect_expenses};
    use crate::models::SenderAssignment;
    use crate::parser::parse_transcript;
    use crate::reconcile::{MatcherConfig, match_receipts, partition_seen};

    fn build_report() -> ScanReport {
        let raw = "[2025-10-08, 22:07:34] Ahmed: دهان 500 جنيه\n\
                   [2025-10-08, 22:08:00] Ahmed: image omitted\n\
                   [2025-10-08, 22:30:00] Omar: total 800 LE";
        let outcome = parse_transcript(raw);
        let candidates = detect_expenses(&outcome.messages, &DetectorConfig::default());

        let mut senders = SenderMap::new();
        senders.insert(
            "Ahmed",
            SenderAssignment {
                partner_id: Some("p1".to_string()),
                ignored: false,
            },
        );
        let partners = vec![Partner {
            id: "p1".to_string(),
            name: "Ahmed K".to_string(),
        }];
        let files = vec!["IMG-0001.jpg".to_string()];
        let matches = match_receipts(
            &candidates,
            &outcome.media_events,
            &files,
            &senders,
            &MatcherConfig::default(),
        );
        let partition = partition_seen(&candidates, &HashSet::new());

        ScanReport::build(&outcome, &candidates, &matches, &partition, &senders, &partners)
    }

    #[test]
    fn test_report_stats() {
        let report = build_report();

        assert_eq!(report.stats.messages, 3);
        assert_eq!(report.stats.media_events, 1);
        assert_eq!(report.stats.senders, 2);
        assert_eq!(report.stats.candidates, 2);
        assert_eq!(report.stats.receipts_matched, 1);
        // Omar's total line is excluded and unmapped; only Ahmed's 500 counts
        assert_eq!(report.stats.included_total, 500.0);
    }

    #[test]
    fn test_report_rows_follow_candidate_order() {
        let report = build_report();

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].partner.as_deref(), Some("Ahmed K"));
        assert!(report.rows[0].receipt.is_some());
        assert!(report.rows[1].excluded);
        assert!(report.rows[1].partner.is_none());
    }

    #[test]
    fn test_render_text_lists_every_row() {
        let report = build_report();
        let text = report.render_text();

        assert!(text.contains("Scan Summary"));
        assert!(text.contains("Ahmed K"));
        assert!(text.contains("total"));
        assert!(text.contains("IMG-0001.jpg"));
    }
}
