//! Outbound messaging capabilities.
//!
//! The orchestration core only ever talks to these traits; the binary wires
//! in a concrete gateway adapter.

use crate::error::TransportError;
use crate::event::MessageRef;
use async_trait::async_trait;
use copper_sparrow_core::ConversationId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Presence states the assistant can signal while working on a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    /// Actively typing a reply.
    Composing,
    /// Stopped typing.
    Paused,
    /// Online, idle.
    Available,
}

/// Where outbound media bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// A remote URL the transport can fetch itself.
    Url(String),
    /// A local file produced by a tool.
    Path(PathBuf),
}

impl MediaSource {
    /// Returns the local path when the source is a file.
    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Url(_) => None,
        }
    }
}

/// Outbound send capability of the messaging transport.
///
/// Sends are best-effort: callers log failures and continue; a failed send
/// never aborts the turn that produced it.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Sends a plain text message.
    async fn send_text(&self, to: &ConversationId, text: &str) -> Result<(), TransportError>;

    /// Sends an image with an optional caption.
    async fn send_image(
        &self,
        to: &ConversationId,
        image: &MediaSource,
        caption: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Sends a document with its file name and MIME type.
    async fn send_document(
        &self,
        to: &ConversationId,
        document: &MediaSource,
        file_name: &str,
        mime_type: &str,
    ) -> Result<(), TransportError>;

    /// Sends a sticker.
    async fn send_sticker(&self, to: &ConversationId, sticker: &MediaSource) -> Result<(), TransportError>;

    /// Updates the assistant's presence in the conversation.
    async fn send_presence(&self, to: &ConversationId, state: PresenceState) -> Result<(), TransportError>;
}

/// Media retrieved on demand for a tool call.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    /// Temp file the bytes were written to. The caller owns deletion.
    pub path: PathBuf,
    /// MIME type reported by the transport.
    pub mime_type: String,
}

/// On-demand media retrieval from the current or quoted message.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetches media for the referenced message into a temp file.
    ///
    /// Returns `Ok(None)` when neither the message nor its quoted message
    /// carries media; absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport lookup itself fails.
    async fn fetch_media(
        &self,
        conversation: &ConversationId,
        message: &MessageRef,
    ) -> Result<Option<FetchedMedia>, TransportError>;
}

/// Guesses a MIME type for an outbound document from its file extension.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("pptx") => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        Some("csv") => "text/csv",
        Some("txt") | Some("md") => "text/plain",
        Some("html") => "text/html",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("opus") | Some("ogg") => "audio/ogg",
        Some("mp4") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_lookup_known_extensions() {
        assert_eq!(mime_for_path(Path::new("report.pdf")), "application/pdf");
        assert_eq!(mime_for_path(Path::new("notes.TXT")), "text/plain");
        assert_eq!(mime_for_path(Path::new("clip.mp4")), "video/mp4");
    }

    #[test]
    fn mime_lookup_unknown_extension() {
        assert_eq!(mime_for_path(Path::new("blob.xyz")), "application/octet-stream");
        assert_eq!(mime_for_path(Path::new("no_extension")), "application/octet-stream");
    }

    #[test]
    fn media_source_path_accessor() {
        let source = MediaSource::Path(PathBuf::from("/tmp/out.webp"));
        assert!(source.as_path().is_some());
        let source = MediaSource::Url("https://example.com/img.png".to_string());
        assert!(source.as_path().is_none());
    }
}
