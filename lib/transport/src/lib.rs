//! Messaging transport interfaces for the copper-sparrow assistant.
//!
//! This crate defines the boundary between the core orchestration logic and
//! the messaging transport behind it:
//!
//! - **Inbound events**: one user utterance with optional media attachments
//! - **Outbound capabilities**: text/image/document/sticker sends and presence
//! - **Media fetching**: on-demand retrieval of current-or-quoted message media
//! - **Outbound formatting**: markdown to chat-surface markup
//!
//! No wire protocol is implemented here; adapters live in the binary.

pub mod error;
pub mod event;
pub mod format;
pub mod sender;

pub use error::TransportError;
pub use event::{Attachment, AttachmentKind, InboundEvent, MessageRef};
pub use format::format_for_chat;
pub use sender::{FetchedMedia, MediaFetcher, MediaSource, MessageSender, PresenceState, mime_for_path};
