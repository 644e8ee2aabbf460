pub mod header;

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::models::{MediaEvent, MediaKind, MessageContent, ParsedMessage};
use header::{LineKind, classify_line};

/// Result of parsing one raw transcript
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    /// Structured messages in source order
    pub messages: Vec<ParsedMessage>,
    /// Media emissions, indexed separately for proximity search
    pub media_events: Vec<MediaEvent>,
}

// System notices are not user content and never become messages
const SYSTEM_NOTICES: &[&str] = &[
    "messages and calls are end-to-end encrypted",
    "you created group",
    "this message was deleted",
    "security code changed",
    "joined using this group",
    "left this group",
    "changed the group",
    "added you",
    "removed you",
    "changed the subject",
    "changed this group",
    "waiting for this message",
];

fn attached_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<attached:\s*([^>]+)>").expect("invalid attached regex"))
}

fn omitted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(image|video|audio|sticker|document|GIF)\s*omitted")
            .expect("invalid omitted regex")
    })
}

/// Parse raw transcript text into structured messages and media events.
///
/// Supports both export header grammars, folds continuation lines into the
/// open message, drops system notices, and never errors: malformed input
/// degrades to fewer messages, and empty input yields an empty outcome.
pub fn parse_transcript(raw: &str) -> ParseOutcome {
    let text = preprocess(raw);

    let mut outcome = ParseOutcome::default();
    let mut open: Option<OpenMessage> = None;

    for line in text.lines() {
        match classify_line(line) {
            LineKind::Header {
                timestamp,
                sender,
                body,
            } => {
                flush(open.take(), &mut outcome);
                open = Some(OpenMessage {
                    timestamp,
                    sender,
                    lines: vec![body],
                });
            }
            LineKind::Banner => {
                flush(open.take(), &mut outcome);
            }
            LineKind::Continuation => {
                // A continuation with no open message is discarded
                if let Some(msg) = open.as_mut() {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        msg.lines.push(trimmed.to_string());
                    }
                }
            }
        }
    }

    // Don't forget the last message
    flush(open.take(), &mut outcome);

    outcome
}

/// Strip the BOM, bidirectional and zero-width control marks, and carriage
/// returns that would otherwise break header pattern matching
fn preprocess(raw: &str) -> String {
    raw.chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{FEFF}' | '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}'
                    | '\u{200B}'..='\u{200D}' | '\r'
            )
        })
        .collect()
}

struct OpenMessage {
    timestamp: NaiveDateTime,
    sender: String,
    lines: Vec<String>,
}

/// Finalize the open message: trim, drop empties and system notices,
/// classify media, fingerprint
fn flush(open: Option<OpenMessage>, outcome: &mut ParseOutcome) {
    let Some(msg) = open else { return };

    let text = msg.lines.join("\n").trim().to_string();
    if text.is_empty() {
        return;
    }

    let lower = text.to_lowercase();
    if SYSTEM_NOTICES.iter().any(|p| lower.contains(p)) {
        return;
    }

    let content = classify_content(&text);
    let notes = strip_media_markers(&text);
    let hash = ParsedMessage::fingerprint(msg.timestamp, &msg.sender, &text);

    if let MessageContent::Media { kind, filename } = &content {
        outcome.media_events.push(MediaEvent {
            timestamp: msg.timestamp,
            sender: msg.sender.clone(),
            kind: *kind,
            filename: filename.clone(),
        });
    }

    outcome.messages.push(ParsedMessage {
        timestamp: msg.timestamp,
        sender: msg.sender,
        text,
        notes,
        content,
        hash,
    });
}

/// A body is media if it carries an omission placeholder or an explicit
/// attachment tag. The sub-type comes from the omission keyword, or from
/// the tagged filename's extension.
fn classify_content(text: &str) -> MessageContent {
    let filename = attached_re()
        .captures(text)
        .map(|caps| caps[1].trim().to_string());
    let omitted_kind = omitted_re()
        .captures(text)
        .map(|caps| keyword_kind(&caps[1]));

    match (omitted_kind, filename) {
        (Some(kind), filename) => MessageContent::Media { kind, filename },
        (None, Some(name)) => MessageContent::Media {
            kind: MediaKind::from_filename(&name),
            filename: Some(name),
        },
        (None, None) => MessageContent::Text,
    }
}

fn keyword_kind(keyword: &str) -> MediaKind {
    match keyword.to_ascii_lowercase().as_str() {
        "video" => MediaKind::Video,
        "audio" => MediaKind::Audio,
        "document" => MediaKind::Document,
        // image, sticker, GIF
        _ => MediaKind::Image,
    }
}

/// Remove attachment tags and omission markers, leaving the residual text
/// that serves as expense notes
fn strip_media_markers(text: &str) -> String {
    let stripped = attached_re().replace_all(text, "");
    let stripped = omitted_re().replace_all(&stripped, "");
    stripped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_grammars() {
        let raw = "[2025-10-08, 22:07:34] Ahmed: paid 500 for paint\n\
                   9/10/25, 9:15 AM - Omar: delivery tomorrow";
        let outcome = parse_transcript(raw);

        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(outcome.messages[0].sender, "Ahmed");
        assert_eq!(
            outcome.messages[0].timestamp.to_string(),
            "2025-10-08 22:07:34"
        );
        assert_eq!(outcome.messages[1].sender, "Omar");
        assert_eq!(
            outcome.messages[1].timestamp.to_string(),
            "2025-10-09 09:15:00"
        );
    }

    #[test]
    fn test_continuation_lines_fold() {
        let raw = "[2025-10-08, 22:07:34] Ahmed: bought supplies\n\
                   paint 300\n\
                   brushes 50";
        let outcome = parse_transcript(raw);

        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(
            outcome.messages[0].text,
            "bought supplies\npaint 300\nbrushes 50"
        );
    }

    #[test]
    fn test_orphan_continuation_discarded() {
        let outcome = parse_transcript("stray line with no header\nanother one");
        assert!(outcome.messages.is_empty());
    }

    #[test]
    fn test_bom_and_bidi_marks_stripped() {
        let raw = "\u{FEFF}\u{200E}[2025-10-08, 22:07:34] \u{200F}Ahmed: paid \u{200E}500";
        let outcome = parse_transcript(raw);

        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.messages[0].sender, "Ahmed");
        assert_eq!(outcome.messages[0].text, "paid 500");
    }

    #[test]
    fn test_system_notices_dropped() {
        let raw = "[2025-10-08, 20:00:00] Renovation: Messages and calls are end-to-end encrypted. No one outside of this chat can read them.\n\
                   [2025-10-08, 20:01:00] Ahmed: This message was deleted.\n\
                   [2025-10-08, 20:02:00] Ahmed: real content";
        let outcome = parse_transcript(raw);

        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.messages[0].text, "real content");
    }

    #[test]
    fn test_banner_line_closes_message() {
        let raw = "[2025-10-08, 20:00:00] Ahmed: first\n\
                   [2025-10-08, 20:01:00] Renovation Group\n\
                   orphaned continuation";
        let outcome = parse_transcript(raw);

        // The banner closes "first"; the later continuation has no open
        // message and is dropped
        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.messages[0].text, "first");
    }

    #[test]
    fn test_media_omitted_classification() {
        let raw = "[2025-10-08, 20:00:00] Ahmed: image omitted\n\
                   [2025-10-08, 20:01:00] Omar: video omitted\n\
                   [2025-10-08, 20:02:00] Omar: sticker omitted";
        let outcome = parse_transcript(raw);

        assert_eq!(outcome.media_events.len(), 3);
        assert_eq!(outcome.media_events[0].kind, MediaKind::Image);
        assert_eq!(outcome.media_events[1].kind, MediaKind::Video);
        assert_eq!(outcome.media_events[2].kind, MediaKind::Image);
        assert!(outcome.messages.iter().all(|m| m.is_media()));
    }

    #[test]
    fn test_attached_tag_extracts_filename() {
        let raw = "[2025-10-08, 20:00:00] Ahmed: <attached: 00000042-PHOTO-2025-10-08.jpg>";
        let outcome = parse_transcript(raw);

        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(
            outcome.messages[0].attached_filename(),
            Some("00000042-PHOTO-2025-10-08.jpg")
        );
        assert_eq!(outcome.media_events[0].kind, MediaKind::Image);
        assert_eq!(outcome.messages[0].notes, "");
    }

    #[test]
    fn test_media_with_caption_keeps_notes() {
        let raw = "[2025-10-08, 20:00:00] Ahmed: <attached: receipt.jpg>\n\
                   paint receipt 450 جنيه";
        let outcome = parse_transcript(raw);

        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.messages[0].notes, "paint receipt 450 جنيه");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let raw = "[2025-10-08, 22:07:34] Ahmed: paid 500\n\
                   second line\n\
                   9/10/25, 9:15 AM - Omar: image omitted";
        let first = parse_transcript(raw);
        let second = parse_transcript(raw);

        assert_eq!(first.messages, second.messages);
        assert_eq!(first.media_events, second.media_events);
        let hashes: Vec<_> = first.messages.iter().map(|m| &m.hash).collect();
        let rehashes: Vec<_> = second.messages.iter().map(|m| &m.hash).collect();
        assert_eq!(hashes, rehashes);
    }

    #[test]
    fn test_empty_input_is_valid() {
        let outcome = parse_transcript("");
        assert!(outcome.messages.is_empty());
        assert!(outcome.media_events.is_empty());
    }

    #[test]
    fn test_arabic_body_preserved() {
        let raw = "[2025-10-08, 22:07:34] أحمد: دفعت ٥٠٠ جنيه للدهان";
        let outcome = parse_transcript(raw);

        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.messages[0].sender, "أحمد");
        assert_eq!(outcome.messages[0].text, "دفعت ٥٠٠ جنيه للدهان");
    }
}
