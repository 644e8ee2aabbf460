use std::collections::HashSet;

use crate::models::{
    ExpenseCandidate, MatchConfidence, MediaEvent, MediaKind, MessageContent, ParsedMessage,
    ReceiptMatch, SenderMap,
};

/// Configuration for receipt-to-expense proximity matching
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Media events farther than this from the candidate are rejected
    pub max_gap_secs: i64,
    /// Within this gap a proximity match is high confidence, otherwise medium
    pub high_confidence_secs: i64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_gap_secs: 300,
            high_confidence_secs: 120,
        }
    }
}

/// Associate expense candidates with export files, best effort.
///
/// Pass 1 binds explicit `<attached:>` filenames at high confidence. Pass 2
/// infers from proximity: image events without an explicit filename, from a
/// sender mapped to the same partner as the candidate, nearest within the
/// window; the bound file is the first unconsumed image from the bundle,
/// since raw filenames carry no timestamp correlation guarantee. A filename
/// is consumed at most once per run; unmatched candidates come back as
/// `None` so callers can route them without ambiguity.
pub fn match_receipts(
    candidates: &[ExpenseCandidate],
    events: &[MediaEvent],
    files: &[String],
    senders: &SenderMap,
    config: &MatcherConfig,
) -> Vec<Option<ReceiptMatch>> {
    let mut matches: Vec<Option<ReceiptMatch>> = vec![None; candidates.len()];
    let mut consumed: HashSet<usize> = HashSet::new();

    // Pass 1: explicit attachment references
    for (i, candidate) in candidates.iter().enumerate() {
        let Some(name) = candidate.message.attached_filename() else {
            continue;
        };
        let Some(file_idx) = find_file(files, &consumed, |f| f == name) else {
            continue;
        };
        consumed.insert(file_idx);
        matches[i] = Some(ReceiptMatch {
            filename: files[file_idx].clone(),
            confidence: MatchConfidence::High,
            event: event_from_message(&candidate.message),
        });
    }

    // Pass 2: proximity inference over image events without explicit names
    for (i, candidate) in candidates.iter().enumerate() {
        if matches[i].is_some() {
            continue;
        }
        let Some(partner_id) = senders.partner_id_of(&candidate.message.sender) else {
            continue;
        };

        let mut best: Option<(usize, i64)> = None;
        for (event_idx, event) in events.iter().enumerate() {
            if event.kind != MediaKind::Image || event.filename.is_some() {
                continue;
            }
            if senders.partner_id_of(&event.sender) != Some(partner_id) {
                continue;
            }
            let gap = (event.timestamp - candidate.message.timestamp)
                .num_seconds()
                .abs();
            if gap > config.max_gap_secs {
                continue;
            }
            // Nearest wins, ties broken by encounter order
            if best.is_none_or(|(_, best_gap)| gap < best_gap) {
                best = Some((event_idx, gap));
            }
        }

        let Some((event_idx, gap)) = best else {
            continue;
        };
        // Bind some unused image from the bundle, in bundle order
        let Some(file_idx) = find_file(files, &consumed, |f| {
            MediaKind::from_filename(f) == MediaKind::Image
        }) else {
            continue;
        };

        consumed.insert(file_idx);
        let confidence = if gap <= config.high_confidence_secs {
            MatchConfidence::High
        } else {
            MatchConfidence::Medium
        };
        matches[i] = Some(ReceiptMatch {
            filename: files[file_idx].clone(),
            confidence,
            event: events[event_idx].clone(),
        });
    }

    matches
}

/// First file index satisfying the predicate that has not been consumed
fn find_file(
    files: &[String],
    consumed: &HashSet<usize>,
    predicate: impl Fn(&str) -> bool,
) -> Option<usize> {
    files
        .iter()
        .enumerate()
        .find(|(idx, f)| !consumed.contains(idx) && predicate(f))
        .map(|(idx, _)| idx)
}

fn event_from_message(message: &ParsedMessage) -> MediaEvent {
    let (kind, filename) = match &message.content {
        MessageContent::Media { kind, filename } => (*kind, filename.clone()),
        MessageContent::Text => (MediaKind::Image, None),
    };
    MediaEvent {
        timestamp: message.timestamp,
        sender: message.sender.clone(),
        kind,
        filename,
    }
}
