use crate::db::GraspDb;
use crate::llm::{LLMClient, LLMClientFactoryTrait, ProviderKind};
use crate::rag::prompt::build_system_prompt;
use crate::rag::retriever::ContextRetriever;
use crate::types::{
    AppError, ChatMessageRequest, ChatMessageResponse, ContextChunk, MessageRole, Result,
    StoredMessage, Video,
};
use std::sync::Arc;
use tracing::{error, info};

/// Answers chat questions about a video.
///
/// Retrieval, prompt assembly and the provider call happen first; the
/// question and answer are written to the chat log only once the provider
/// has answered. A failed call leaves the log untouched.
pub struct ChatResponder {
    db: Arc<GraspDb>,
    llm_factory: Arc<dyn LLMClientFactoryTrait>,
    retriever: ContextRetriever,
    history_messages: usize,
}

impl ChatResponder {
    pub fn new(
        db: Arc<GraspDb>,
        llm_factory: Arc<dyn LLMClientFactoryTrait>,
        retriever: ContextRetriever,
        history_messages: usize,
    ) -> Self {
        Self {
            db,
            llm_factory,
            retriever,
            history_messages,
        }
    }

    pub async fn answer(&self, request: &ChatMessageRequest) -> Result<ChatMessageResponse> {
        let question = request.message.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("Message must not be empty".to_string()));
        }

        let timestamp = request.current_timestamp.unwrap_or(0.0);
        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(AppError::InvalidInput(
                "current_timestamp must be a non-negative number of seconds".to_string(),
            ));
        }

        let video = self
            .db
            .get_video(&request.video_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

        // Resolve the provider before the question is embedded
        let provider = request
            .provider
            .unwrap_or_else(|| self.llm_factory.default_provider());
        let client = self.llm_factory.create_for(provider)?;

        let chunks = self.db.get_chunks(&video.id).await?;
        let context = self
            .retriever
            .retrieve(&video.id, &chunks, question, timestamp)
            .await?;

        self.respond(client.as_ref(), provider, &video, question, timestamp, context)
            .await
    }

    /// Ask `client` about `question` with the assembled context, then
    /// persist the exchange.
    pub async fn respond(
        &self,
        client: &dyn LLMClient,
        provider: ProviderKind,
        video: &Video,
        question: &str,
        timestamp: f64,
        context: Vec<ContextChunk>,
    ) -> Result<ChatMessageResponse> {
        let history = self
            .db
            .recent_messages(&video.id, self.history_messages)
            .await?;
        let system = build_system_prompt(&context, timestamp, &video.title);
        let messages = build_messages(system, &history, question);

        let content = client.generate_with_history(&messages).await.map_err(|e| {
            error!(video_id = %video.id, provider = %provider, "Chat completion failed: {}", e);
            e
        })?;

        let chunk_ids: Vec<i64> = context.iter().map(|c| c.id).collect();
        self.db
            .append_exchange(&video.id, question, &content, timestamp, &chunk_ids)
            .await?;

        info!(
            video_id = %video.id,
            provider = %provider,
            model = client.model_name(),
            context_chunks = chunk_ids.len(),
            "Chat answered"
        );

        Ok(ChatMessageResponse {
            role: MessageRole::Assistant,
            content,
            context_chunks: context,
        })
    }
}

/// `[system, history..., user question]` as `(role, content)` pairs.
///
/// History starts at its first user turn, since Anthropic and Gemini
/// reject a conversation that opens with an answer.
pub fn build_messages(
    system: String,
    history: &[StoredMessage],
    question: &str,
) -> Vec<(String, String)> {
    let first_user = history
        .iter()
        .position(|m| m.role == MessageRole::User)
        .unwrap_or(history.len());

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(("system".to_string(), system));
    messages.extend(
        history[first_user..]
            .iter()
            .map(|m| (m.role.as_str().to_string(), m.content.clone())),
    );
    messages.push(("user".to_string(), question.to_string()));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(id: i64, role: MessageRole, content: &str) -> StoredMessage {
        StoredMessage {
            id,
            video_id: "vid".to_string(),
            role,
            content: content.to_string(),
            timestamp: 0.0,
            context_chunks: vec![],
            created_at: String::new(),
        }
    }

    #[test]
    fn test_build_messages_order() {
        let history = vec![
            stored(1, MessageRole::User, "what is a tensor?"),
            stored(2, MessageRole::Assistant, "a multi-dimensional array"),
        ];
        let messages = build_messages("sys".to_string(), &history, "and a gradient?");

        let roles: Vec<&str> = messages.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[3].1, "and a gradient?");
    }

    #[test]
    fn test_build_messages_drops_leading_answer() {
        // an odd history window starts halfway through an exchange
        let history = vec![
            stored(2, MessageRole::Assistant, "a multi-dimensional array"),
            stored(3, MessageRole::User, "and a gradient?"),
            stored(4, MessageRole::Assistant, "a vector of partial derivatives"),
        ];
        let messages = build_messages("sys".to_string(), &history, "thanks, and a jacobian?");

        let roles: Vec<&str> = messages.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[1].1, "and a gradient?");
    }

    #[test]
    fn test_build_messages_history_of_only_answers() {
        let history = vec![stored(1, MessageRole::Assistant, "orphaned answer")];
        let messages = build_messages("sys".to_string(), &history, "hello");

        let roles: Vec<&str> = messages.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(roles, vec!["system", "user"]);
    }
}
