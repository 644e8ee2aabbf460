use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Media bucket inferred from an omission keyword or a filename extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    /// Classify a filename by extension, defaulting to Document
    pub fn from_filename(filename: &str) -> Self {
        let ext = filename
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "heic" => Self::Image,
            "mp4" | "mov" | "avi" | "webm" => Self::Video,
            "mp3" | "ogg" | "opus" | "wav" | "m4a" | "aac" => Self::Audio,
            _ => Self::Document,
        }
    }
}

/// What a message body carries besides text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    /// Plain text message
    Text,
    /// Message referencing a media attachment, either by an explicit
    /// `<attached: file>` tag or an "omitted" placeholder
    Media {
        kind: MediaKind,
        /// Present only for explicit attachment tags
        filename: Option<String>,
    },
}

/// One logical chat entry: a header line plus folded continuation lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMessage {
    /// Calendar-resolved timestamp from the export header
    pub timestamp: NaiveDateTime,
    /// Sender display name exactly as it appears in the chat
    pub sender: String,
    /// Full folded body, continuation lines joined by newline
    pub text: String,
    /// Body with attachment tags and omission markers stripped, used as
    /// expense notes downstream
    pub notes: String,
    /// Text or media classification
    pub content: MessageContent,
    /// Stable fingerprint of timestamp + sender + text, the dedup key
    pub hash: String,
}

impl ParsedMessage {
    /// Content fingerprint used as the natural dedup key.
    ///
    /// SHA-256 over `timestamp|sender|text` so that re-parsing the same
    /// export, even across process restarts, reproduces the same hashes.
    pub fn fingerprint(timestamp: NaiveDateTime, sender: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(timestamp.format("%Y-%m-%dT%H:%M:%S").to_string());
        hasher.update(b"|");
        hasher.update(sender.as_bytes());
        hasher.update(b"|");
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_media(&self) -> bool {
        matches!(self.content, MessageContent::Media { .. })
    }

    /// Filename from an explicit attachment tag, if any
    pub fn attached_filename(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Media {
                filename: Some(name),
                ..
            } => Some(name),
            _ => None,
        }
    }
}

/// A media emission observed inline in the transcript, indexed separately
/// from messages for proximity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEvent {
    pub timestamp: NaiveDateTime,
    pub sender: String,
    pub kind: MediaKind,
    /// Present only for explicit attachment tags
    pub filename: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 8)
            .unwrap()
            .and_hms_opt(22, 7, 34)
            .unwrap()
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = ParsedMessage::fingerprint(ts(), "Ahmed", "paid 500");
        let b = ParsedMessage::fingerprint(ts(), "Ahmed", "paid 500");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_differs_by_field() {
        let base = ParsedMessage::fingerprint(ts(), "Ahmed", "paid 500");
        assert_ne!(base, ParsedMessage::fingerprint(ts(), "Omar", "paid 500"));
        assert_ne!(base, ParsedMessage::fingerprint(ts(), "Ahmed", "paid 600"));
    }

    #[test]
    fn test_media_kind_from_filename() {
        assert_eq!(MediaKind::from_filename("IMG-0001.JPG"), MediaKind::Image);
        assert_eq!(MediaKind::from_filename("VID-0001.mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_filename("PTT-0001.opus"), MediaKind::Audio);
        assert_eq!(MediaKind::from_filename("invoice.pdf"), MediaKind::Document);
        assert_eq!(MediaKind::from_filename("noext"), MediaKind::Document);
    }
}
