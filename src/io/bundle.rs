use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::MediaKind;

/// Input-format failures surfaced to the caller as validation errors
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("no chat transcript found in {0}")]
    MissingChat(PathBuf),
    #[error("unsupported input {0}: expected a .txt transcript or an unpacked export directory")]
    Unsupported(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// Extensions collected as media attachments from the export
const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "heic", "mp4", "mov", "mp3", "ogg", "opus", "wav",
    "m4a", "pdf",
];

/// One attachment file from the export, read lazily at upload time
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub filename: String,
    pub path: PathBuf,
}

impl MediaFile {
    pub fn is_image(&self) -> bool {
        MediaKind::from_filename(&self.filename) == MediaKind::Image
    }

    pub fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

/// An unpacked export: the chat text plus its media attachments.
/// Archive extraction happens before this boundary.
#[derive(Debug, Clone, Default)]
pub struct ExportBundle {
    pub chat_text: String,
    /// Attachments in deterministic (name-sorted) order
    pub media: Vec<MediaFile>,
}

impl ExportBundle {
    pub fn from_text(chat_text: impl Into<String>) -> Self {
        Self {
            chat_text: chat_text.into(),
            media: Vec::new(),
        }
    }

    pub fn file_names(&self) -> Vec<String> {
        self.media.iter().map(|f| f.filename.clone()).collect()
    }

    pub fn file(&self, filename: &str) -> Option<&MediaFile> {
        self.media.iter().find(|f| f.filename == filename)
    }
}

/// Load an export from a bare `.txt` transcript or an unpacked directory.
///
/// Directory discovery follows the export convention: `_chat.txt`, any
/// `*_chat.txt`, a `chat`-containing `.txt`, or a lone `.txt` file; other
/// entries with recognized media extensions become attachments.
pub fn load_bundle(path: &Path) -> Result<ExportBundle, BundleError> {
    if path.is_file() {
        if extension_of(path).as_deref() == Some("txt") {
            return Ok(ExportBundle::from_text(std::fs::read_to_string(path)?));
        }
        return Err(BundleError::Unsupported(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(BundleError::Unsupported(path.to_path_buf()));
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let mut chat_path: Option<PathBuf> = None;
    let mut text_files: Vec<PathBuf> = Vec::new();
    let mut media = Vec::new();

    for entry in entries {
        let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let name_lower = name.to_lowercase();

        if name_lower.ends_with(".txt") {
            if name_lower == "_chat.txt"
                || name_lower.ends_with("_chat.txt")
                || name_lower.contains("chat")
            {
                chat_path.get_or_insert(entry.clone());
            }
            text_files.push(entry);
            continue;
        }

        if extension_of(&entry).is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.as_str())) {
            media.push(MediaFile {
                filename: name.to_string(),
                path: entry,
            });
        }
    }

    // A lone .txt is unambiguous even without "chat" in the name
    if chat_path.is_none() && text_files.len() == 1 {
        chat_path = text_files.pop();
    }

    let Some(chat_path) = chat_path else {
        return Err(BundleError::MissingChat(path.to_path_buf()));
    };

    Ok(ExportBundle {
        chat_text: std::fs::read_to_string(chat_path)?,
        media,
    })
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_directory_bundle() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("_chat.txt"), "[2025-10-08, 22:07:34] A: hi").unwrap();
        fs::write(dir.path().join("IMG-0002.jpg"), b"x").unwrap();
        fs::write(dir.path().join("IMG-0001.jpg"), b"x").unwrap();
        fs::write(dir.path().join("voice.opus"), b"x").unwrap();
        fs::write(dir.path().join("notes.docx"), b"x").unwrap();

        let bundle = load_bundle(dir.path()).unwrap();

        assert!(bundle.chat_text.contains("22:07:34"));
        // Name-sorted, unrecognized extensions skipped
        assert_eq!(
            bundle.file_names(),
            vec!["IMG-0001.jpg", "IMG-0002.jpg", "voice.opus"]
        );
        assert!(bundle.file("IMG-0001.jpg").unwrap().is_image());
        assert!(!bundle.file("voice.opus").unwrap().is_image());
    }

    #[test]
    fn test_prefixed_chat_file_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("WhatsApp Chat with Renovation_chat.txt"),
            "text",
        )
        .unwrap();

        let bundle = load_bundle(dir.path()).unwrap();
        assert_eq!(bundle.chat_text, "text");
    }

    #[test]
    fn test_lone_txt_is_the_transcript() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("export.txt"), "text").unwrap();

        let bundle = load_bundle(dir.path()).unwrap();
        assert_eq!(bundle.chat_text, "text");
    }

    #[test]
    fn test_missing_chat_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("IMG-0001.jpg"), b"x").unwrap();

        match load_bundle(dir.path()) {
            Err(BundleError::MissingChat(_)) => {}
            other => panic!("expected MissingChat, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_file_input() {
        let dir = tempfile::tempdir().unwrap();
        let zip = dir.path().join("export.zip");
        fs::write(&zip, b"PK").unwrap();

        match load_bundle(&zip) {
            Err(BundleError::Unsupported(_)) => {}
            other => panic!("expected Unsupported, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_txt_input() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("chat.txt");
        fs::write(&txt, "[2025-10-08, 22:07:34] A: hi").unwrap();

        let bundle = load_bundle(&txt).unwrap();
        assert!(bundle.media.is_empty());
        assert!(!bundle.chat_text.is_empty());
    }
}
