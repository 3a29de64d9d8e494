//! Conversation history for the agent runtime
//!
//! Tracks the messages exchanged with a provider, estimates their token
//! footprint and prunes older turns once the configured threshold is crossed.

use crate::providers::{Message, TokenUsage};

/// Conversation history with token tracking and pruning
///
/// Token counts use a characters / 4 heuristic. Provider-reported usage is
/// accumulated separately for reporting.
///
/// When the estimate exceeds `prune_threshold * max_tokens`, system messages
/// and the last `min_retain_turns` user turns are kept and everything older
/// is replaced with a short summary system message.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    token_count: usize,
    max_tokens: usize,
    min_retain_turns: usize,
    prune_threshold: f64,
    provider_token_usage: Option<TokenUsage>,
}

impl Conversation {
    /// Creates a new conversation with specified limits
    ///
    /// # Examples
    ///
    /// ```
    /// use sahayi::agent::Conversation;
    ///
    /// let conversation = Conversation::new(8000, 5, 0.8);
    /// assert_eq!(conversation.token_count(), 0);
    /// ```
    pub fn new(max_tokens: usize, min_retain_turns: usize, prune_threshold: f64) -> Self {
        Self {
            messages: Vec::new(),
            token_count: 0,
            max_tokens,
            min_retain_turns,
            prune_threshold: prune_threshold.clamp(0.0, 1.0),
            provider_token_usage: None,
        }
    }

    /// Adds a user message to the conversation
    ///
    /// # Examples
    ///
    /// ```
    /// use sahayi::agent::Conversation;
    ///
    /// let mut conversation = Conversation::new(8000, 5, 0.8);
    /// conversation.add_user_message("My name is John Smith");
    /// assert_eq!(conversation.messages().len(), 1);
    /// ```
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::user(content));
    }

    /// Adds an assistant text message to the conversation
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::assistant(content));
    }

    /// Adds a tool result message to the conversation
    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.add_message(Message::tool_result(tool_call_id, content));
    }

    /// Adds a system message to the conversation
    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::system(content));
    }

    /// Adds an arbitrary message, such as an assistant message carrying
    /// tool calls
    pub fn add_message(&mut self, message: Message) {
        self.token_count += message_tokens(&message);
        self.messages.push(message);
        self.prune_if_needed();
    }

    fn prune_if_needed(&mut self) {
        let threshold = (self.max_tokens as f64 * self.prune_threshold) as usize;

        if self.token_count <= threshold {
            return;
        }

        let mut keep_from_index = 0;
        let mut retained_turns = 0;

        for (idx, message) in self.messages.iter().enumerate().rev() {
            if message.role == "user" {
                retained_turns += 1;
                if retained_turns >= self.min_retain_turns {
                    keep_from_index = idx;
                    break;
                }
            }
        }

        // Not enough turns to prune without dropping the ones we must keep
        if keep_from_index == 0 {
            return;
        }

        let mut system_messages = Vec::new();
        let mut to_prune = Vec::new();
        let mut to_keep = Vec::new();

        for (idx, message) in self.messages.drain(..).enumerate() {
            if message.role == "system" && !is_summary(&message) {
                system_messages.push(message);
            } else if idx < keep_from_index {
                to_prune.push(message);
            } else {
                to_keep.push(message);
            }
        }

        if !to_prune.is_empty() {
            tracing::debug!("Pruning {} messages from conversation", to_prune.len());
            system_messages.push(Message::system(create_summary(&to_prune)));
        }

        self.messages = system_messages;
        self.messages.extend(to_keep);
        self.token_count = self.messages.iter().map(message_tokens).sum();
    }

    /// Returns all messages in the conversation
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the estimated token count
    ///
    /// # Examples
    ///
    /// ```
    /// use sahayi::agent::Conversation;
    ///
    /// let mut conversation = Conversation::new(8000, 5, 0.8);
    /// conversation.add_user_message("I need help");
    /// assert!(conversation.token_count() > 0);
    /// ```
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Returns the maximum token limit
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Returns the number of messages in the conversation
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Clears all messages from the conversation
    pub fn clear(&mut self) {
        self.messages.clear();
        self.token_count = 0;
        self.provider_token_usage = None;
    }

    /// Accumulates provider-reported token usage
    ///
    /// # Examples
    ///
    /// ```
    /// use sahayi::agent::Conversation;
    /// use sahayi::providers::TokenUsage;
    ///
    /// let mut conversation = Conversation::new(8000, 5, 0.8);
    /// conversation.update_from_provider_usage(&TokenUsage::new(50, 25));
    /// conversation.update_from_provider_usage(&TokenUsage::new(10, 5));
    /// assert_eq!(conversation.provider_token_usage().unwrap().total_tokens, 90);
    /// ```
    pub fn update_from_provider_usage(&mut self, usage: &TokenUsage) {
        self.provider_token_usage = Some(match self.provider_token_usage {
            Some(existing) => TokenUsage::new(
                existing.prompt_tokens + usage.prompt_tokens,
                existing.completion_tokens + usage.completion_tokens,
            ),
            None => *usage,
        });
    }

    /// Returns accumulated provider token usage, if any was reported
    pub fn provider_token_usage(&self) -> Option<TokenUsage> {
        self.provider_token_usage
    }
}

fn message_tokens(message: &Message) -> usize {
    let content_tokens = message.content.as_deref().map(estimate_tokens).unwrap_or(0);

    let tool_call_tokens: usize = message
        .tool_calls
        .iter()
        .flatten()
        .map(|call| estimate_tokens(&call.function.name) + estimate_tokens(&call.function.arguments))
        .sum();

    content_tokens + tool_call_tokens
}

const SUMMARY_HEADER: &str = "Summary of earlier conversation:";

/// Earlier summaries are folded into the next one instead of piling up
fn is_summary(message: &Message) -> bool {
    message.role == "system"
        && message
            .content
            .as_deref()
            .map_or(false, |c| c.starts_with(SUMMARY_HEADER))
}

fn create_summary(messages: &[Message]) -> String {
    let mut user_messages = 0;
    let mut assistant_messages = 0;
    let mut tool_calls = 0;

    for message in messages {
        match message.role.as_str() {
            "user" => user_messages += 1,
            "assistant" => {
                assistant_messages += 1;
                tool_calls += message.tool_calls.as_ref().map(Vec::len).unwrap_or(0);
            }
            _ => {}
        }
    }

    let mut summary = format!("{}\n\n", SUMMARY_HEADER);
    summary.push_str(&format!("- {} user messages\n", user_messages));
    summary.push_str(&format!("- {} assistant responses\n", assistant_messages));
    if tool_calls > 0 {
        summary.push_str(&format!("- {} tool calls executed\n", tool_calls));
    }

    if let Some(content) = messages.first().and_then(|m| m.content.as_ref()) {
        summary.push_str(&format!("\nFirst message: {}\n", truncate_string(content, 100)));
    }
    if messages.len() > 1 {
        if let Some(content) = messages.last().and_then(|m| m.content.as_ref()) {
            summary.push_str(&format!("Last message: {}\n", truncate_string(content, 100)));
        }
    }

    summary
}

/// Estimates token count for a string (characters / 4, rounded up)
fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() + 3) / 4
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let mut truncated = s.chars().take(max_len.saturating_sub(3)).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
