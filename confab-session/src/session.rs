//! Chat orchestration.
//!
//! [`ChatSession`] runs one send at a time: append the user message,
//! compress if needed, build the request, obtain a token, execute with a
//! single 401 retry, then thread the reply back into the window.

use std::future::Future;
use std::sync::Arc;

use confab_core::{
    ChatSettings, ContextStats, ConversationSnapshot, ConversationStore, ConversationWindow,
    Message, OutputFormat, SendMessageResult, SettingsSource, StreamEvent, TokenUsage,
    UsageTotals, estimate_tokens, estimate_tokens_for,
};
use confab_transport::{ChatMessage, ChatRequest, ChatResponse, ChatTransport, TransportError};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::auth::TokenManager;
use crate::context::{Compression, ContextWindowManager};
use crate::error::{ChatError, SendFailure};
use crate::prompts::JSON_SYSTEM_PROMPT;

/// A conversation with the completion API.
pub struct ChatSession {
    tokens: Arc<TokenManager>,
    transport: Arc<dyn ChatTransport>,
    context: ContextWindowManager,
    settings: Arc<dyn SettingsSource>,
    store: Arc<dyn ConversationStore>,
    window: ConversationWindow,
    totals: UsageTotals,
}

/// State carried from the start of a send to its completion.
struct Pending {
    user: Message,
    settings: ChatSettings,
    compression: Option<Compression>,
}

/// What the send produced before usage accounting.
struct Reply {
    content: String,
    usage: Option<confab_transport::Usage>,
}

impl ChatSession {
    /// Creates a session with an empty window.
    pub fn new(
        tokens: Arc<TokenManager>,
        transport: Arc<dyn ChatTransport>,
        settings: Arc<dyn SettingsSource>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        let context = ContextWindowManager::new(transport.clone(), tokens.clone());
        Self {
            tokens,
            transport,
            context,
            settings,
            store,
            window: ConversationWindow::new(),
            totals: UsageTotals::default(),
        }
    }

    /// The token manager shared by this session.
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// The current window.
    pub fn window(&self) -> &ConversationWindow {
        &self.window
    }

    /// Cumulative usage since the session started or was cleared.
    pub fn usage_totals(&self) -> UsageTotals {
        self.totals
    }

    /// Statistics for the current window.
    pub fn stats(&self) -> ContextStats {
        ContextWindowManager::get_stats(self.window.summaries(), self.window.recent())
    }

    /// Current settings from the settings source.
    pub async fn settings(&self) -> Result<ChatSettings, ChatError> {
        Ok(self.settings.load().await?)
    }

    /// Rebuilds the window from the conversation store.
    #[instrument(skip(self))]
    pub async fn restore(&mut self) -> Result<(), ChatError> {
        let recent = self.store.load_recent().await?;
        let summaries = self.store.load_summaries().await?;
        debug!(recent = recent.len(), summaries = summaries.len(), "Conversation restored");
        self.window = ConversationWindow::from_parts(recent, summaries);
        Ok(())
    }

    /// Empties the window, the usage totals, and the store.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) -> Result<(), ChatError> {
        self.store.clear_all().await?;
        self.window.clear();
        self.totals = UsageTotals::default();
        info!("Conversation cleared");
        Ok(())
    }

    /// Captures the window and usage totals.
    pub async fn export(&self) -> ConversationSnapshot {
        let model = self.settings.load().await.ok().map(|s| s.model);
        ConversationSnapshot::new(self.window.clone(), self.totals, model)
    }

    /// Replaces the conversation with `snapshot` and rewrites the store.
    #[instrument(skip(self, snapshot))]
    pub async fn import(&mut self, snapshot: ConversationSnapshot) -> Result<(), ChatError> {
        self.store.clear_all().await?;
        for summary in snapshot.window.summaries() {
            self.store.insert_summary(summary).await?;
        }
        for message in snapshot.window.recent() {
            self.store.append_message(message).await?;
        }
        info!(
            messages = snapshot.window.recent_len(),
            summaries = snapshot.window.summaries().len(),
            "Conversation imported"
        );
        self.window = snapshot.window;
        self.totals = snapshot.usage;
        Ok(())
    }

    /// Lists model IDs available to the current token.
    pub async fn available_models(&self) -> Result<Vec<String>, ChatError> {
        let transport = &self.transport;
        let models = with_auth_retry(&self.tokens, |token| async move {
            transport.list_models(&token).await
        })
        .await?;
        Ok(models.into_iter().map(|m| m.id).collect())
    }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Sends `text` and waits for the whole reply.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn send_message(&mut self, text: &str) -> Result<SendMessageResult, SendFailure> {
        let pending = self.begin(text).await?;
        let request = self.build_request(&pending.settings);

        let transport = &self.transport;
        let outcome = with_auth_retry(&self.tokens, |token| {
            let request = &request;
            async move { transport.send(request, &token).await }
        })
        .await
        .and_then(into_reply);

        self.finish(pending, outcome).await
    }

    /// Sends `text` as a streamed request.
    ///
    /// Each content delta is passed to `on_delta` as it arrives. Cancelling
    /// `cancel` closes the stream and fails the send with
    /// [`ChatError::Cancelled`].
    #[instrument(skip(self, text, on_delta, cancel), fields(chars = text.len()))]
    pub async fn send_message_streaming<F>(
        &mut self,
        text: &str,
        mut on_delta: F,
        cancel: &CancellationToken,
    ) -> Result<SendMessageResult, SendFailure>
    where
        F: FnMut(&str) + Send,
    {
        let pending = self.begin(text).await?;
        let request = self.build_request(&pending.settings).streaming();

        let transport = &self.transport;
        let open = with_auth_retry(&self.tokens, |token| {
            let request = &request;
            async move { transport.open_stream(request, &token).await }
        });

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ChatError::Cancelled),
            opened = open => opened,
        };

        let outcome = match opened {
            Ok(mut stream) => {
                let mut content = String::new();
                let result = loop {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            stream.cancel();
                            break Err(ChatError::Cancelled);
                        }
                        event = stream.next() => match event {
                            Some(StreamEvent::Content(delta)) => {
                                on_delta(&delta);
                                content.push_str(&delta);
                            }
                            Some(StreamEvent::Finished(reason)) => {
                                debug!(reason = %reason, "Stream finished");
                            }
                            Some(StreamEvent::Error(cause)) => break Err(ChatError::Network(cause)),
                            Some(StreamEvent::Done) | None => break Ok(()),
                        }
                    }
                };
                result.and_then(|()| {
                    if content.trim().is_empty() {
                        Err(ChatError::EmptyResponse)
                    } else {
                        Ok(Reply {
                            content,
                            usage: None,
                        })
                    }
                })
            }
            Err(e) => Err(e),
        };

        self.finish(pending, outcome).await
    }

    /// Appends the user message and compresses if needed.
    async fn begin(&mut self, text: &str) -> Result<Pending, SendFailure> {
        let mut user_message = Message::user(text);

        if text.trim().is_empty() {
            user_message.mark_error();
            return Err(SendFailure {
                user_message,
                error: ChatError::Config("message is empty".into()),
            });
        }

        let settings = match self.settings.load().await {
            Ok(settings) => settings,
            Err(e) => {
                user_message.mark_error();
                return Err(SendFailure {
                    user_message,
                    error: e.into(),
                });
            }
        };

        self.window.push(user_message.clone());

        let mut compression = None;
        if ContextWindowManager::should_compress(self.window.recent_len(), &settings) {
            compression = self.context.fold_oldest(&mut self.window, &settings).await;
            if let Some(done) = &compression {
                self.persist_compression(done).await;
            }
        }

        Ok(Pending {
            user: user_message,
            settings,
            compression,
        })
    }

    fn build_request(&self, settings: &ChatSettings) -> ChatRequest {
        let system_prompt = match settings.output_format {
            OutputFormat::Json => Some(JSON_SYSTEM_PROMPT),
            OutputFormat::None => settings.system_prompt(),
        };

        let mut messages = Vec::with_capacity(self.window.recent_len() + 2);
        if let Some(prompt) = system_prompt {
            messages.push(ChatMessage::system(prompt));
        }
        messages.extend(ContextWindowManager::prepare_context_for_api(
            self.window.summaries(),
            self.window.recent(),
        ));
        ChatRequest::from_settings(settings, messages)
    }

    /// Threads the outcome back into the window.
    async fn finish(
        &mut self,
        pending: Pending,
        outcome: Result<Reply, ChatError>,
    ) -> Result<SendMessageResult, SendFailure> {
        let Pending {
            user: mut user_message,
            compression,
            ..
        } = pending;
        let compressed_count = compression.as_ref().map_or(0, Compression::count);

        let reply = match outcome {
            Ok(reply) => reply,
            Err(error) => {
                warn!(error = %error, "Send failed");
                if self.window.remove_last_if(&user_message.id).is_none() {
                    debug!("Provisional message no longer last, leaving it in place");
                }
                user_message.mark_error();
                return Err(SendFailure {
                    user_message,
                    error,
                });
            }
        };

        let estimated_prompt = estimate_tokens_for(
            self.window.recent().iter().map(|m| m.content.as_str()),
        ) + self
                .window
                .summaries()
                .iter()
                .map(|s| s.estimated_tokens)
                .sum::<usize>();
        let usage = TokenUsage {
            estimated_prompt,
            estimated_completion: estimate_tokens(&reply.content),
            actual_prompt: reply.usage.map(|u| u.prompt_tokens),
            actual_completion: reply.usage.map(|u| u.completion_tokens),
            actual_total: reply.usage.map(|u| u.total_tokens),
        };

        user_message.mark_sent();
        if let Some(message) = self.window.message_mut(&user_message.id) {
            message.mark_sent();
        }
        let assistant = Message::assistant(reply.content).with_usage(usage);
        self.window.push(assistant.clone());
        self.totals.record(&usage);

        for message in [&user_message, &assistant] {
            if let Err(e) = self.store.append_message(message).await {
                warn!(error = %e, "Failed to persist message");
            }
        }

        debug!(
            prompt = usage.prompt(),
            completion = usage.completion(),
            compressed = compressed_count,
            "Send complete"
        );
        Ok(SendMessageResult {
            user_message,
            message: assistant,
            compressed_count,
        })
    }

    async fn persist_compression(&self, compression: &Compression) {
        if let Err(e) = self.store.insert_summary(&compression.summary).await {
            warn!(error = %e, "Failed to persist summary");
            return;
        }
        if let Err(e) = self
            .store
            .mark_compressed(&compression.folded_ids(), &compression.summary.id)
            .await
        {
            warn!(error = %e, "Failed to mark messages compressed");
        }
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("recent", &self.window.recent_len())
            .field("summaries", &self.window.summaries().len())
            .field("totals", &self.totals)
            .finish_non_exhaustive()
    }
}

fn into_reply(response: ChatResponse) -> Result<Reply, ChatError> {
    let content = response
        .first_content()
        .filter(|c| !c.trim().is_empty())
        .ok_or(ChatError::EmptyResponse)?
        .to_string();
    Ok(Reply {
        content,
        usage: response.usage,
    })
}

/// Runs `op` with a valid token, refreshing once and retrying once on 401.
async fn with_auth_retry<T, F, Fut>(tokens: &TokenManager, mut op: F) -> Result<T, ChatError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let token = tokens.get_valid_token().await?;
    match op(token.access_token).await {
        Err(e) if e.is_unauthorized() => {
            info!("Token rejected, refreshing");
            let token = tokens.refresh_token().await?;
            op(token.access_token).await.map_err(ChatError::from)
        }
        other => other.map_err(ChatError::from),
    }
}
