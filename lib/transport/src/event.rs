//! Inbound event types delivered by the messaging transport.

use crate::error::TransportError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use copper_sparrow_core::ConversationId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque token locating one transport message.
///
/// The media fetcher uses this to retrieve bytes for the current or quoted
/// message on demand; the core never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(String);

impl MessageRef {
    /// Creates a message reference from the transport's message token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds of media attached to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// A still image.
    Image,
    /// A video clip.
    Video,
    /// A chat sticker.
    Sticker,
    /// A document (pdf, office file, plain text, ...).
    Document,
    /// An audio clip or voice note.
    Audio,
}

/// One media attachment carried by an inbound event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// What kind of media this is.
    pub kind: AttachmentKind,
    /// MIME type reported by the transport.
    pub mime_type: String,
    /// Original file name, when the transport provides one.
    #[serde(default)]
    pub file_name: Option<String>,
    /// Base64-encoded media bytes, when delivered inline with the event.
    #[serde(default)]
    pub data_b64: Option<String>,
}

impl Attachment {
    /// Decodes the inline media bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if no inline bytes were delivered or they are not
    /// valid base64.
    pub fn bytes(&self) -> Result<Vec<u8>, TransportError> {
        let data = self.data_b64.as_ref().ok_or_else(|| TransportError::InvalidMedia {
            reason: "attachment carries no inline bytes".to_string(),
        })?;
        BASE64.decode(data).map_err(|e| TransportError::InvalidMedia {
            reason: e.to_string(),
        })
    }
}

/// One inbound utterance from the messaging transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// The conversation this message belongs to.
    pub conversation: ConversationId,
    /// Token for the message itself, usable by the media fetcher.
    pub message: MessageRef,
    /// Display name of the sender, when known.
    #[serde(default)]
    pub sender_name: Option<String>,
    /// The message text (caption text for media messages).
    #[serde(default)]
    pub text: String,
    /// Media attached to the message.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// True when the event echoes a message this account sent itself.
    #[serde(default)]
    pub is_from_self: bool,
}

impl InboundEvent {
    /// Returns the first attachment of the given kind, if any.
    #[must_use]
    pub fn attachment_of(&self, kind: AttachmentKind) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.kind == kind)
    }

    /// Returns the first non-document media attachment, if any.
    #[must_use]
    pub fn media_attachment(&self) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|a| a.kind != AttachmentKind::Document)
    }

    /// True when the event has neither text nor attachments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with(kind: AttachmentKind) -> InboundEvent {
        InboundEvent {
            conversation: ConversationId::new("c1"),
            message: MessageRef::new("m1"),
            sender_name: None,
            text: String::new(),
            attachments: vec![Attachment {
                kind,
                mime_type: "image/jpeg".to_string(),
                file_name: None,
                data_b64: None,
            }],
            is_from_self: false,
        }
    }

    #[test]
    fn attachment_bytes_roundtrip() {
        let attachment = Attachment {
            kind: AttachmentKind::Image,
            mime_type: "image/png".to_string(),
            file_name: None,
            data_b64: Some(BASE64.encode(b"png-bytes")),
        };
        assert_eq!(attachment.bytes().expect("decode"), b"png-bytes");
    }

    #[test]
    fn attachment_bytes_missing() {
        let attachment = Attachment {
            kind: AttachmentKind::Image,
            mime_type: "image/png".to_string(),
            file_name: None,
            data_b64: None,
        };
        assert!(attachment.bytes().is_err());
    }

    #[test]
    fn media_attachment_skips_documents() {
        let event = event_with(AttachmentKind::Document);
        assert!(event.media_attachment().is_none());

        let event = event_with(AttachmentKind::Sticker);
        assert!(event.media_attachment().is_some());
    }

    #[test]
    fn empty_event_detection() {
        let mut event = event_with(AttachmentKind::Image);
        assert!(!event.is_empty());
        event.attachments.clear();
        event.text = "  ".to_string();
        assert!(event.is_empty());
    }

    #[test]
    fn inbound_event_deserializes_with_defaults() {
        let json = r#"{"conversation": "c1", "message": "m1"}"#;
        let event: InboundEvent = serde_json::from_str(json).expect("deserialize");
        assert!(event.text.is_empty());
        assert!(event.attachments.is_empty());
        assert!(!event.is_from_self);
    }
}
