//! The turn dispatcher.
//!
//! Routing order for one inbound event: self-echo filter, activity
//! recording, recap interception, command matching, document ingestion,
//! empty-utterance drop, then the orchestration engine. Turns for the same
//! conversation are serialized; different conversations interleave freely.

use crate::command::{Command, parse_command};
use crate::error::ExtractError;
use async_trait::async_trait;
use chrono::Utc;
use copper_sparrow_ai::{Analyzer, Engine, InboundMedia, UserContent};
use copper_sparrow_conversation::{ContextStore, SpeakerRole};
use copper_sparrow_core::ConversationId;
use copper_sparrow_recap::{RecapKind, RecapManager};
use copper_sparrow_recap::ActivitySink;
use copper_sparrow_tools::{ToolContext, ToolRegistry};
use copper_sparrow_transport::{
    Attachment, AttachmentKind, InboundEvent, MediaSource, MessageSender, PresenceState,
    format_for_chat,
};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use ulid::Ulid;

const RESET_CONFIRMATION: &str = "_Conversation context cleared._";
const RECAP_INSUFFICIENT: &str = "_Not enough chat activity last month for a recap yet._";
const STICKER_FALLBACK_INSTRUCTION: &str = "React to this sticker.";
const DOCUMENT_FALLBACK_QUESTION: &str = "Describe this document.";
const DOCUMENT_SUMMARY_QUERY: &str = "Write a detailed summary.";

/// Text extraction from inbound documents (pdf, office files, plain text).
#[async_trait]
pub trait DocumentTextExtractor: Send + Sync {
    /// Extracts readable text from the file.
    ///
    /// # Errors
    ///
    /// Returns an error when the format is unsupported or extraction fails.
    async fn extract(&self, path: &Path, mime_type: &str) -> Result<String, ExtractError>;
}

/// Routes each inbound utterance to the recap stepper, a command handler,
/// the document flow, or the orchestration engine.
pub struct Dispatcher {
    store: Arc<ContextStore>,
    engine: Arc<Engine>,
    recap: Arc<RecapManager>,
    registry: Arc<ToolRegistry>,
    sender: Arc<dyn MessageSender>,
    analyzer: Arc<dyn Analyzer>,
    extractor: Arc<dyn DocumentTextExtractor>,
    activity: Arc<dyn ActivitySink>,
    scratch_dir: PathBuf,
    pending_documents: Mutex<HashMap<ConversationId, String>>,
    turn_locks: Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>>,
}

impl Dispatcher {
    /// Wires the dispatcher over its collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<ContextStore>,
        engine: Arc<Engine>,
        recap: Arc<RecapManager>,
        registry: Arc<ToolRegistry>,
        sender: Arc<dyn MessageSender>,
        analyzer: Arc<dyn Analyzer>,
        extractor: Arc<dyn DocumentTextExtractor>,
        activity: Arc<dyn ActivitySink>,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            engine,
            recap,
            registry,
            sender,
            analyzer,
            extractor,
            activity,
            scratch_dir,
            pending_documents: Mutex::new(HashMap::new()),
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Handles one inbound event to completion.
    ///
    /// Every failure path is logged and absorbed here; the caller only
    /// acknowledges receipt.
    pub async fn handle(&self, event: InboundEvent) {
        if event.is_from_self {
            return;
        }

        let conversation = event.conversation.clone();
        let turn_lock = self.turn_lock(&conversation);
        let _turn = turn_lock.lock().await;

        tracing::info!(
            conversation = %conversation,
            from = event.sender_name.as_deref().unwrap_or("user"),
            text = %event.text.chars().take(50).collect::<String>(),
            "inbound message"
        );
        self.activity.record(&conversation, &event.text);

        // An active recap session owns every turn for its conversation.
        if self.recap.is_active(&conversation) {
            if let Some(fragment) = self.recap.advance(&conversation, &event.text).await {
                self.send_text(&conversation, &format_for_chat(&fragment)).await;
            }
            return;
        }

        match parse_command(&event.text) {
            Some(Command::Recap) => {
                self.start_recap(&conversation).await;
                return;
            }
            Some(Command::Reset) => {
                self.store.clear(&conversation);
                self.send_text(&conversation, RESET_CONFIRMATION).await;
                return;
            }
            Some(Command::Sticker) => {
                self.make_sticker(&event).await;
                return;
            }
            None => {}
        }

        if let Some(document) = event.attachment_of(AttachmentKind::Document) {
            let document = document.clone();
            self.ingest_document(&conversation, &document).await;
            return;
        }

        if event.is_empty() {
            tracing::debug!(conversation = %conversation, "dropping empty utterance");
            return;
        }

        self.engine_turn(event).await;
    }

    /// The default path: context append, presence, engine run, reply send.
    async fn engine_turn(&self, event: InboundEvent) {
        let conversation = event.conversation.clone();
        let mut text = event.text.clone();

        // A previously ingested document is consumed by the next utterance.
        let parked = self.lock_pending().remove(&conversation);
        if let Some(context) = parked {
            let question = if text.trim().is_empty() {
                DOCUMENT_FALLBACK_QUESTION.to_string()
            } else {
                text.clone()
            };
            text = format!("Here is the content of a document I shared:\n'{context}'\n{question}");
        }

        if event.attachment_of(AttachmentKind::Sticker).is_some() {
            let instruction = if text.trim().is_empty() {
                STICKER_FALLBACK_INSTRUCTION.to_string()
            } else {
                text.clone()
            };
            text = format!("[sticker received] {instruction}");
        }

        let media = self.save_inbound_media(&event).await;

        self.store.append(&conversation, &text, SpeakerRole::User);
        if let Err(e) = self
            .sender
            .send_presence(&conversation, PresenceState::Composing)
            .await
        {
            tracing::debug!(error = %e, "presence update failed");
        }

        let content = UserContent {
            text,
            media: media.clone(),
            message: event.message.clone(),
        };
        match self.engine.run_turn(&conversation, &content).await {
            Ok(reply) => {
                self.send_text(&conversation, &format_for_chat(&reply)).await;
            }
            Err(e) => {
                // The engine already notified the user.
                tracing::warn!(conversation = %conversation, error = %e, "turn failed");
            }
        }

        if let Some(media) = media {
            self.remove_scratch_file(&media.path).await;
        }
    }

    async fn start_recap(&self, conversation: &ConversationId) {
        match self
            .recap
            .initiate(conversation, RecapKind::Monthly, Utc::now())
            .await
        {
            Ok(Some(intro)) => {
                self.send_text(conversation, &format_for_chat(&intro)).await;
            }
            Ok(None) => {
                self.send_text(conversation, RECAP_INSUFFICIENT).await;
            }
            Err(e) => {
                tracing::warn!(conversation = %conversation, error = %e, "recap initiation failed");
                self.send_text(conversation, RECAP_INSUFFICIENT).await;
            }
        }
    }

    /// Direct sticker rendering, bypassing the engine.
    async fn make_sticker(&self, event: &InboundEvent) {
        let conversation = event.conversation.clone();
        let Some(media) = self.save_inbound_media(event).await else {
            tracing::debug!(conversation = %conversation, "sticker command without usable media");
            return;
        };

        let ctx = ToolContext::for_conversation(conversation.clone())
            .with_media(media.path.clone(), media.mime_type.clone());
        let result = self
            .registry
            .execute("sticker_maker", json!({"target": "auto"}), &ctx)
            .await;

        if result.success {
            if let Some(path) = result.str_field("sticker_path") {
                let source = MediaSource::Path(PathBuf::from(path));
                if let Err(e) = self.sender.send_sticker(&conversation, &source).await {
                    tracing::warn!(error = %e, "sticker send failed");
                }
            }
        } else {
            tracing::warn!(
                conversation = %conversation,
                error = result.error.as_deref().unwrap_or("unknown"),
                "sticker rendering failed"
            );
        }

        self.remove_scratch_file(&media.path).await;
    }

    /// Extracts and analyzes a document, parking the result for the next
    /// utterance.
    async fn ingest_document(&self, conversation: &ConversationId, attachment: &Attachment) {
        let Some(media) = self.write_attachment(attachment).await else {
            return;
        };

        let extraction = self.extractor.extract(&media.path, &attachment.mime_type).await;
        match extraction {
            Ok(text) if !text.trim().is_empty() => {
                let analysis = self.analyzer.analyze(&text, DOCUMENT_SUMMARY_QUERY).await;
                self.lock_pending().insert(conversation.clone(), analysis);

                let name = attachment.file_name.as_deref().unwrap_or("document");
                self.send_text(
                    conversation,
                    &format!("> _Done reading \"{name}\". What should I do with it?_"),
                )
                .await;
            }
            Ok(_) => {
                tracing::debug!(conversation = %conversation, "document produced no text");
            }
            Err(e) => {
                tracing::warn!(conversation = %conversation, error = %e, "document ingestion failed");
            }
        }

        self.remove_scratch_file(&media.path).await;
    }

    /// Writes the event's media attachment (if any) into the scratch dir.
    ///
    /// Attachments without inline bytes yield `None`; media-needing tools
    /// fall back to an on-demand fetch inside the engine.
    async fn save_inbound_media(&self, event: &InboundEvent) -> Option<InboundMedia> {
        let attachment = event.media_attachment()?;
        self.write_attachment(attachment).await
    }

    async fn write_attachment(&self, attachment: &Attachment) -> Option<InboundMedia> {
        let data_b64 = attachment.data_b64.clone()?;
        let bytes = match attachment.bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable attachment");
                return None;
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.scratch_dir).await {
            tracing::warn!(error = %e, "could not create scratch dir");
            return None;
        }
        let extension = extension_for(&attachment.mime_type, attachment.file_name.as_deref());
        let path = self.scratch_dir.join(format!("in_{}.{extension}", Ulid::new()));
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            tracing::warn!(error = %e, "could not write attachment");
            return None;
        }

        Some(InboundMedia {
            path,
            mime_type: attachment.mime_type.clone(),
            data_b64,
        })
    }

    async fn send_text(&self, conversation: &ConversationId, text: &str) {
        if let Err(e) = self.sender.send_text(conversation, text).await {
            tracing::warn!(error = %e, "text send failed");
        }
    }

    async fn remove_scratch_file(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "could not remove scratch file");
        }
    }

    fn turn_lock(&self, conversation: &ConversationId) -> Arc<tokio::sync::Mutex<()>> {
        self.turn_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(conversation.clone())
            .or_default()
            .clone()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<ConversationId, String>> {
        self.pending_documents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// File extension for a scratch copy of an attachment.
fn extension_for(mime_type: &str, file_name: Option<&str>) -> String {
    if let Some(ext) = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|e| e.to_str())
    {
        return ext.to_ascii_lowercase();
    }
    mime_type
        .split('/')
        .nth(1)
        .map(|subtype| {
            subtype
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use copper_sparrow_ai::{ChatProvider, ChatTurn, ProviderError, TranscriptEntry};
    use copper_sparrow_recap::{PeriodStats, StatsError, StatsSource};
    use copper_sparrow_tools::SchemaDialect;
    use copper_sparrow_transport::{FetchedMedia, MediaFetcher, MessageRef, TransportError};
    use serde_json::Value as JsonValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        reply: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn dialect(&self) -> SchemaDialect {
            SchemaDialect::FunctionCall
        }

        async fn chat(
            &self,
            _system: Option<&str>,
            _transcript: &[TranscriptEntry],
            _tools: Option<&JsonValue>,
        ) -> Result<ChatTurn, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatTurn::text(self.reply))
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        texts: Mutex<Vec<String>>,
    }

    impl RecordingSender {
        fn texts(&self) -> Vec<String> {
            self.texts.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send_text(&self, _to: &ConversationId, text: &str) -> Result<(), TransportError> {
            self.texts.lock().expect("lock").push(text.to_string());
            Ok(())
        }

        async fn send_image(
            &self,
            _to: &ConversationId,
            _image: &MediaSource,
            _caption: Option<&str>,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send_document(
            &self,
            _to: &ConversationId,
            _document: &MediaSource,
            _file_name: &str,
            _mime_type: &str,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send_sticker(
            &self,
            _to: &ConversationId,
            _sticker: &MediaSource,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn send_presence(
            &self,
            _to: &ConversationId,
            _state: PresenceState,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct NoMedia;

    #[async_trait]
    impl MediaFetcher for NoMedia {
        async fn fetch_media(
            &self,
            _conversation: &ConversationId,
            _message: &MessageRef,
        ) -> Result<Option<FetchedMedia>, TransportError> {
            Ok(None)
        }
    }

    struct FixtureStats {
        stats: Option<PeriodStats>,
    }

    #[async_trait]
    impl StatsSource for FixtureStats {
        async fn period_stats(
            &self,
            _conversation: &ConversationId,
            _year: i32,
            _month: u32,
        ) -> Result<Option<PeriodStats>, StatsError> {
            Ok(self.stats.clone())
        }
    }

    struct EchoAnalyzer;

    #[async_trait]
    impl Analyzer for EchoAnalyzer {
        async fn analyze(&self, context: &str, _query: &str) -> String {
            format!("analyzed: {}", context.chars().take(20).collect::<String>())
        }
    }

    struct PlainExtractor;

    #[async_trait]
    impl DocumentTextExtractor for PlainExtractor {
        async fn extract(&self, path: &Path, _mime_type: &str) -> Result<String, ExtractError> {
            std::fs::read_to_string(path).map_err(|e| ExtractError::Failed {
                reason: e.to_string(),
            })
        }
    }

    #[derive(Default)]
    struct CountingSink {
        count: AtomicUsize,
    }

    impl ActivitySink for CountingSink {
        fn record(&self, _conversation: &ConversationId, _text: &str) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        store: Arc<ContextStore>,
        sender: Arc<RecordingSender>,
        provider: Arc<FixedProvider>,
        _scratch: tempfile::TempDir,
    }

    fn fixture_with_stats(stats: Option<PeriodStats>) -> Fixture {
        let scratch = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(ContextStore::new());
        let sender = Arc::new(RecordingSender::default());
        let provider = Arc::new(FixedProvider {
            reply: "engine reply",
            calls: AtomicUsize::new(0),
        });
        let registry = Arc::new(ToolRegistry::new());
        let engine = Arc::new(Engine::new(
            vec![provider.clone()],
            registry.clone(),
            store.clone(),
            sender.clone(),
            Arc::new(NoMedia),
        ));
        let recap = Arc::new(RecapManager::new(
            Arc::new(FixtureStats { stats }),
            Arc::new(EchoAnalyzer),
        ));
        let dispatcher = Dispatcher::new(
            store.clone(),
            engine,
            recap,
            registry,
            sender.clone(),
            Arc::new(EchoAnalyzer),
            Arc::new(PlainExtractor),
            Arc::new(CountingSink::default()),
            scratch.path().to_path_buf(),
        );
        Fixture {
            dispatcher,
            store,
            sender,
            provider,
            _scratch: scratch,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_stats(None)
    }

    fn active_stats() -> PeriodStats {
        let mut stats = PeriodStats {
            total_messages: 20,
            active_days: vec!["01".to_string()],
            topic_samples: vec!["plans".to_string()],
            ..PeriodStats::default()
        };
        stats.hourly_activity.insert(21, 9);
        stats
    }

    fn event(text: &str) -> InboundEvent {
        InboundEvent {
            conversation: ConversationId::new("c1"),
            message: MessageRef::new("m1"),
            sender_name: Some("Ada".to_string()),
            text: text.to_string(),
            attachments: Vec::new(),
            is_from_self: false,
        }
    }

    fn conversation() -> ConversationId {
        ConversationId::new("c1")
    }

    #[tokio::test]
    async fn normal_turn_runs_engine_and_replies() {
        let f = fixture();
        f.dispatcher.handle(event("hello there")).await;

        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.store.len(&conversation()), 2);
        assert_eq!(f.sender.texts(), vec!["engine reply".to_string()]);
    }

    #[tokio::test]
    async fn self_echoes_are_ignored() {
        let f = fixture();
        let mut echoed = event("hi");
        echoed.is_from_self = true;
        f.dispatcher.handle(echoed).await;

        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 0);
        assert!(f.sender.texts().is_empty());
    }

    #[tokio::test]
    async fn empty_utterance_is_dropped_silently() {
        let f = fixture();
        f.dispatcher.handle(event("   ")).await;

        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 0);
        assert!(f.sender.texts().is_empty());
        assert!(f.store.is_empty(&conversation()));
    }

    #[tokio::test]
    async fn reset_command_clears_context_and_confirms() {
        let f = fixture();
        f.dispatcher.handle(event("remember this")).await;
        assert_eq!(f.store.len(&conversation()), 2);

        f.dispatcher.handle(event(".newchat")).await;
        assert!(f.store.is_empty(&conversation()));
        assert_eq!(f.sender.texts().last().map(String::as_str), Some(RESET_CONFIRMATION));
    }

    #[tokio::test]
    async fn recap_with_insufficient_data_reports_fixed_line() {
        let f = fixture();
        f.dispatcher.handle(event(".recap")).await;

        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.sender.texts(), vec![RECAP_INSUFFICIENT.to_string()]);
    }

    #[tokio::test]
    async fn active_recap_intercepts_turns_until_it_completes() {
        let f = fixture_with_stats(Some(active_stats()));

        f.dispatcher.handle(event(".recap")).await;
        // Step 1 fragment, engine untouched.
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.sender.texts().len(), 1);

        f.dispatcher.handle(event("wow")).await;
        f.dispatcher.handle(event("and then?")).await;
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.sender.texts().len(), 3);

        // The session ended after step 3; this turn reaches the engine.
        f.dispatcher.handle(event("back to normal")).await;
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn document_is_ingested_and_prefixes_the_next_turn() {
        let f = fixture();
        let mut with_doc = event("");
        with_doc.attachments.push(Attachment {
            kind: AttachmentKind::Document,
            mime_type: "text/plain".to_string(),
            file_name: Some("notes.txt".to_string()),
            data_b64: Some(BASE64.encode(b"meeting notes about sparrows")),
        });
        f.dispatcher.handle(with_doc).await;

        let acks = f.sender.texts();
        assert!(acks[0].contains("notes.txt"));
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 0);

        f.dispatcher.handle(event("summarize it")).await;
        assert_eq!(f.provider.calls.load(Ordering::SeqCst), 1);
        let turns = f.store.get(&conversation());
        assert!(turns[0].text.contains("analyzed:"), "parked analysis is prefixed");
        assert!(turns[0].text.contains("summarize it"));

        // The parked context is consumed once.
        f.dispatcher.handle(event("and again?")).await;
        let turns = f.store.get(&conversation());
        assert!(!turns[2].text.contains("analyzed:"));
    }

    #[tokio::test]
    async fn sticker_attachment_annotates_the_user_text() {
        let f = fixture();
        let mut with_sticker = event("");
        with_sticker.attachments.push(Attachment {
            kind: AttachmentKind::Sticker,
            mime_type: "image/webp".to_string(),
            file_name: None,
            data_b64: Some(BASE64.encode(b"webp")),
        });
        f.dispatcher.handle(with_sticker).await;

        let turns = f.store.get(&conversation());
        assert!(turns[0].text.starts_with("[sticker received]"));
        assert!(turns[0].text.contains(STICKER_FALLBACK_INSTRUCTION));
    }

    #[test]
    fn extension_prefers_file_name_over_mime() {
        assert_eq!(extension_for("application/pdf", Some("report.PDF")), "pdf");
        assert_eq!(extension_for("image/jpeg", None), "jpeg");
        assert_eq!(extension_for("weird", None), "bin");
    }
}
