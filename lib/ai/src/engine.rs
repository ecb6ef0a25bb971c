//! Multi-round tool-calling orchestration with provider fallback.
//!
//! One engine run turns a single user utterance into zero or more tool
//! invocations and one final reply:
//!
//! 1. Build the working transcript from stored history plus the fresh user
//!    content and call the first provider with its dialect's tool schema.
//! 2. Execute any requested tool calls in order, feeding each result back
//!    into the transcript, and re-invoke the provider, up to five rounds.
//! 3. On any provider fault, discard the attempt and restart from scratch
//!    with the next provider. Side effects already sent are not retracted.
//! 4. When every provider fails, notify the user once and leave the stored
//!    history untouched.

use crate::error::{EngineError, ProviderError};
use crate::provider::{ChatProvider, InlineMedia, ToolCallRequest, TranscriptEntry};
use copper_sparrow_conversation::{ContextStore, SpeakerRole};
use copper_sparrow_core::ConversationId;
use copper_sparrow_tools::{SideEffect, ToolContext, ToolRegistry, ToolResult, side_effect_for};
use copper_sparrow_transport::{
    FetchedMedia, MediaFetcher, MediaSource, MessageRef, MessageSender, mime_for_path,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maximum provider invocations per attempt.
const MAX_ROUNDS: usize = 5;

/// Reply used when the round limit is reached with no usable text.
pub const FALLBACK_REPLY: &str = "Sorry, I could not come up with a reply this time.";

/// The single notice sent when every provider failed.
pub const UNAVAILABLE_REPLY: &str =
    "The assistant is temporarily unavailable. Please try again in a moment.";

/// Transient status notice shown while a tool runs, keyed by tool name.
fn status_notice(tool: &str) -> Option<&'static str> {
    match tool {
        "web_search" => Some("> _Searching the web..._"),
        "sticker_maker" => Some("> _Rendering a sticker..._"),
        "image_generator" => Some("> _Generating an image..._"),
        "file_generator" | "file_converter" => Some("> _Preparing a file..._"),
        _ => None,
    }
}

/// Media that arrived with the in-flight message.
#[derive(Debug, Clone)]
pub struct InboundMedia {
    /// Local temp file holding the bytes. The dispatcher owns deletion.
    pub path: PathBuf,
    /// MIME type reported by the transport.
    pub mime_type: String,
    /// Base64 payload for providers that accept inline media.
    pub data_b64: String,
}

/// The fresh user content for one engine run.
#[derive(Debug, Clone)]
pub struct UserContent {
    /// The utterance text, after any dispatcher preprocessing.
    pub text: String,
    /// Media attached to the message, when any.
    pub media: Option<InboundMedia>,
    /// Transport token for the message, for on-demand media fetches.
    pub message: MessageRef,
}

impl UserContent {
    fn to_entry(&self) -> TranscriptEntry {
        TranscriptEntry::User {
            text: self.text.clone(),
            media: self.media.as_ref().map(|m| InlineMedia {
                mime_type: m.mime_type.clone(),
                data_b64: m.data_b64.clone(),
            }),
        }
    }
}

/// The orchestration engine.
pub struct Engine {
    providers: Vec<Arc<dyn ChatProvider>>,
    registry: Arc<ToolRegistry>,
    store: Arc<ContextStore>,
    sender: Arc<dyn MessageSender>,
    media: Arc<dyn MediaFetcher>,
    system_prompt: Option<String>,
}

impl Engine {
    /// Creates an engine over an ordered provider list (primary first).
    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn ChatProvider>>,
        registry: Arc<ToolRegistry>,
        store: Arc<ContextStore>,
        sender: Arc<dyn MessageSender>,
        media: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            providers,
            registry,
            store,
            sender,
            media,
            system_prompt: None,
        }
    }

    /// Sets the persona system prompt sent with every provider call.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Runs one full turn.
    ///
    /// The caller must have appended the user turn to the context store
    /// already; the engine rebuilds the outbound transcript from everything
    /// before it plus `content`. On success the reply is appended as an
    /// assistant turn and returned.
    ///
    /// # Errors
    ///
    /// Returns `AllProvidersFailed` after notifying the user once; the
    /// stored history is left without an assistant turn in that case.
    pub async fn run_turn(
        &self,
        conversation: &ConversationId,
        content: &UserContent,
    ) -> Result<String, EngineError> {
        for provider in &self.providers {
            match self.attempt(provider.as_ref(), conversation, content).await {
                Ok(reply) => {
                    self.store.append(conversation, &reply, SpeakerRole::Assistant);
                    return Ok(reply);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "provider attempt failed, falling back"
                    );
                }
            }
        }

        self.send_text_best_effort(conversation, UNAVAILABLE_REPLY).await;
        Err(EngineError::AllProvidersFailed)
    }

    /// One provider's full run through the round loop.
    ///
    /// Any provider fault aborts the whole attempt; partial round state is
    /// discarded by the caller starting over.
    async fn attempt(
        &self,
        provider: &dyn ChatProvider,
        conversation: &ConversationId,
        content: &UserContent,
    ) -> Result<String, ProviderError> {
        let mut transcript = self.base_transcript(conversation, content);
        let tools = self.registry.schema_for(provider.dialect());
        let mut best_text: Option<String> = None;

        for round in 1..=MAX_ROUNDS {
            let turn = provider
                .chat(self.system_prompt.as_deref(), &transcript, tools.as_ref())
                .await?;

            if !turn.has_tool_calls() {
                return Ok(turn
                    .text
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| FALLBACK_REPLY.to_string()));
            }

            tracing::debug!(
                provider = provider.name(),
                round,
                calls = turn.tool_calls.len(),
                "processing tool-call round"
            );
            if let Some(text) = turn.text.as_deref().filter(|t| !t.is_empty()) {
                best_text = Some(text.to_string());
            }

            transcript.push(TranscriptEntry::ToolCallRound {
                text: turn.text.clone(),
                calls: turn.tool_calls.clone(),
            });
            for call in &turn.tool_calls {
                let entry = self.run_tool_call(conversation, content, call).await;
                transcript.push(entry);
            }
        }

        Ok(best_text.unwrap_or_else(|| FALLBACK_REPLY.to_string()))
    }

    /// The stored history excluding the in-flight turn, plus the fresh user
    /// content.
    fn base_transcript(
        &self,
        conversation: &ConversationId,
        content: &UserContent,
    ) -> Vec<TranscriptEntry> {
        let turns = self.store.get(conversation);
        let prior = turns.len().saturating_sub(1);
        let mut transcript: Vec<TranscriptEntry> =
            turns[..prior].iter().map(TranscriptEntry::from).collect();
        transcript.push(content.to_entry());
        transcript
    }

    /// Executes one tool call end to end and returns its transcript entry.
    async fn run_tool_call(
        &self,
        conversation: &ConversationId,
        content: &UserContent,
        call: &ToolCallRequest,
    ) -> TranscriptEntry {
        if let Some(notice) = status_notice(&call.name) {
            self.send_text_best_effort(conversation, notice).await;
        }

        let (ctx, fetched) = self.resolve_context(conversation, content, &call.name).await;
        let result = self
            .registry
            .execute(&call.name, call.arguments.clone(), &ctx)
            .await;

        if result.success {
            self.dispatch_side_effect(conversation, &call.name, &result).await;
        }

        // The fetch was made solely for this call; release it on every path.
        if let Some(fetched) = fetched {
            if let Err(e) = tokio::fs::remove_file(&fetched.path).await {
                tracing::warn!(path = %fetched.path.display(), error = %e, "could not remove fetched media");
            }
        }

        TranscriptEntry::ToolResponse {
            call_id: call.id.clone(),
            name: call.name.clone(),
            payload: result.to_payload(),
        }
    }

    /// Resolves the execution context for one tool call.
    ///
    /// Reuses the already-downloaded inbound media when present; otherwise
    /// fetches on demand for tools that need media. Absence of media is not
    /// fatal here; the tool decides whether to error.
    async fn resolve_context(
        &self,
        conversation: &ConversationId,
        content: &UserContent,
        tool_name: &str,
    ) -> (ToolContext, Option<FetchedMedia>) {
        let ctx = ToolContext::for_conversation(conversation.clone());

        if let Some(media) = &content.media {
            return (ctx.with_media(media.path.clone(), media.mime_type.clone()), None);
        }

        let needs_media = self
            .registry
            .get(tool_name)
            .is_some_and(|tool| tool.needs_media());
        if needs_media {
            match self.media.fetch_media(conversation, &content.message).await {
                Ok(Some(fetched)) => {
                    let ctx = ctx.with_media(fetched.path.clone(), fetched.mime_type.clone());
                    return (ctx, Some(fetched));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(tool = tool_name, error = %e, "on-demand media fetch failed");
                }
            }
        }

        (ctx, None)
    }

    /// Sends the outbound message matching a successful side-effect tool.
    async fn dispatch_side_effect(
        &self,
        conversation: &ConversationId,
        tool_name: &str,
        result: &ToolResult,
    ) {
        match side_effect_for(tool_name) {
            Some(SideEffect::Image) => {
                if let Some(url) = result.str_field("image_url") {
                    let caption = result
                        .str_field("model_used")
                        .map(|model| format!("_Generated by {model}_"));
                    let send = self
                        .sender
                        .send_image(conversation, &MediaSource::Url(url.to_string()), caption.as_deref())
                        .await;
                    if let Err(e) = send {
                        tracing::warn!(error = %e, "image send failed");
                    }
                }
            }
            Some(SideEffect::Sticker) => {
                if let Some(path) = result.str_field("sticker_path") {
                    let source = MediaSource::Path(PathBuf::from(path));
                    if let Err(e) = self.sender.send_sticker(conversation, &source).await {
                        tracing::warn!(error = %e, "sticker send failed");
                    }
                }
            }
            Some(SideEffect::Document) => {
                if let Some(path) = result.str_field("file_path") {
                    let path = PathBuf::from(path);
                    let file_name = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("file")
                        .to_string();
                    let mime_type = mime_for_path(Path::new(&path));
                    let source = MediaSource::Path(path);
                    let send = self
                        .sender
                        .send_document(conversation, &source, &file_name, mime_type)
                        .await;
                    if let Err(e) = send {
                        tracing::warn!(error = %e, "document send failed");
                    }
                }
            }
            None => {}
        }
    }

    async fn send_text_best_effort(&self, conversation: &ConversationId, text: &str) {
        if let Err(e) = self.sender.send_text(conversation, text).await {
            tracing::warn!(error = %e, "text send failed");
        }
    }
}
