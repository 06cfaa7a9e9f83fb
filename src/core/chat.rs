//! Chat session with single-flight sends
//!
//! A `ChatSession` owns one conversation. Each `send`:
//! 1. Appends the user's message
//! 2. Replays the recent history to the completion service under a deadline
//! 3. Appends exactly one assistant message: the reply or a fallback
//!
//! Only one send may be in flight per session; extra sends are ignored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::config::{prompts_builtin, RequestProfile};
use crate::conversation::{ConversationState, Message, Turn};
use crate::providers::{CompletionClient, CompletionRequest};

use super::fallback::{complete_within, FailureKind, FallbackTable};

/// Number of prior messages replayed with each request
pub const HISTORY_WINDOW: usize = 6;

/// What a call to `send` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOutcome {
    /// Blank input, or a request was already in flight
    Ignored,
    Replied,
    TimedOut,
    Failed,
}

/// Render-ready copy of the conversation
#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub is_waiting: bool,
}

struct Inner {
    conversation: ConversationState,
    /// Bumped by `reset` so a reply to a discarded history is dropped
    epoch: u64,
}

pub struct ChatSession {
    client: Arc<dyn CompletionClient>,
    profile: RequestProfile,
    deadline: Duration,
    system_prompt: String,
    fallbacks: FallbackTable,
    inner: Mutex<Inner>,
}

/// Clears the waiting flag when the send finishes or is dropped mid-flight
struct WaitingGuard<'a> {
    session: &'a ChatSession,
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.session.lock().conversation.set_waiting(false);
    }
}

impl ChatSession {
    pub fn new(client: Arc<dyn CompletionClient>, profile: RequestProfile) -> Self {
        Self {
            client,
            deadline: profile.timeout(),
            profile,
            system_prompt: prompts_builtin::CHAT_SYSTEM.to_string(),
            fallbacks: FallbackTable::CHAT,
            inner: Mutex::new(Inner {
                conversation: ConversationState::seeded(prompts_builtin::GREETING),
                epoch: 0,
            }),
        }
    }

    /// Override the profile's deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let inner = self.lock();
        ChatSnapshot {
            messages: inner.conversation.messages().to_vec(),
            is_waiting: inner.conversation.is_waiting(),
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.lock().conversation.is_waiting()
    }

    /// Send one user message and wait for the assistant's turn
    pub async fn send(&self, raw_text: &str) -> SendOutcome {
        let text = raw_text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }

        let (request, epoch) = {
            let mut inner = self.lock();
            if inner.conversation.is_waiting() {
                tracing::debug!("send ignored, request already in flight");
                return SendOutcome::Ignored;
            }

            let mut turns = Vec::with_capacity(HISTORY_WINDOW + 2);
            turns.push(Turn::system(self.system_prompt.as_str()));
            turns.extend(inner.conversation.recent_turns(HISTORY_WINDOW));
            turns.push(Turn::user(text));

            inner.conversation.push(Message::user(text));
            inner.conversation.set_waiting(true);
            (CompletionRequest::new(turns, &self.profile), inner.epoch)
        };

        let _guard = WaitingGuard { session: self };

        let result = complete_within(self.client.as_ref(), &request, self.deadline).await;
        let (reply, outcome) = match result {
            Ok(text) => (text, SendOutcome::Replied),
            Err(kind) => {
                let outcome = match kind {
                    FailureKind::Timeout => SendOutcome::TimedOut,
                    FailureKind::Transport => SendOutcome::Failed,
                };
                (self.fallbacks.text(kind).to_string(), outcome)
            }
        };

        let mut inner = self.lock();
        if inner.epoch == epoch {
            inner.conversation.push(Message::assistant(reply));
        } else {
            tracing::debug!("conversation was reset, dropping reply");
        }
        outcome
    }

    /// Back to the single greeting
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.conversation.reset();
        inner.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::core::testing::ScriptedClient;

    fn session(client: Arc<ScriptedClient>) -> ChatSession {
        ChatSession::new(client, RequestProfile::chat())
    }

    #[tokio::test]
    async fn test_send_appends_user_and_reply() {
        let client = Arc::new(ScriptedClient::replying("Start with iron-rich cereal."));
        let chat = session(client.clone());

        let outcome = chat.send("  What first?  ").await;
        assert_eq!(outcome, SendOutcome::Replied);

        let snap = chat.snapshot();
        assert!(!snap.is_waiting);
        assert_eq!(snap.messages.len(), 3);
        assert_eq!(snap.messages[1].text, "What first?");
        assert!(snap.messages[1].is_from_user);
        assert_eq!(snap.messages[2].text, "Start with iron-rich cereal.");
        assert!(!snap.messages[2].is_from_user);

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        let turns = &requests[0].messages;
        assert_eq!(turns[0].role, Role::System);
        assert_eq!(turns[0].content, prompts_builtin::CHAT_SYSTEM);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, prompts_builtin::GREETING);
        assert_eq!(turns.last().unwrap().content, "What first?");
        assert_eq!(requests[0].max_tokens, 500);
    }

    #[tokio::test]
    async fn test_blank_input_is_noop() {
        let client = Arc::new(ScriptedClient::replying("unused"));
        let chat = session(client.clone());

        assert_eq!(chat.send("").await, SendOutcome::Ignored);
        assert_eq!(chat.send("   ").await, SendOutcome::Ignored);
        assert_eq!(chat.snapshot().messages.len(), 1);
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_history_window_excludes_older_messages() {
        let client = Arc::new(ScriptedClient::replying("ok"));
        let chat = session(client.clone());

        for i in 0..5 {
            chat.send(&format!("question {}", i)).await;
        }

        let requests = client.requests();
        let last = requests.last().unwrap();
        // system + six prior messages + the new one
        assert_eq!(last.messages.len(), HISTORY_WINDOW + 2);
        assert_eq!(last.messages[1].content, "question 1");
        assert_eq!(last.messages[2].content, "ok");
        assert_eq!(last.messages[6].content, "ok");
        assert_eq!(last.messages.last().unwrap().content, "question 4");
    }

    #[tokio::test]
    async fn test_second_send_while_waiting_is_ignored() {
        let client = Arc::new(
            ScriptedClient::replying("slow answer").after(Duration::from_millis(100)),
        );
        let chat = session(client.clone());

        let (first, second) = tokio::join!(chat.send("one"), chat.send("two"));
        assert_eq!(first, SendOutcome::Replied);
        assert_eq!(second, SendOutcome::Ignored);

        let snap = chat.snapshot();
        assert_eq!(snap.messages.len(), 3);
        assert_eq!(snap.messages[1].text, "one");
        assert!(!snap.is_waiting);
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_appends_fallback() {
        let client = Arc::new(ScriptedClient::replying("too late").after(Duration::from_secs(5)));
        let chat = session(client).with_deadline(Duration::from_millis(50));

        let outcome = chat.send("Is honey safe?").await;
        assert_eq!(outcome, SendOutcome::TimedOut);

        let snap = chat.snapshot();
        assert_eq!(snap.messages.len(), 3);
        assert_eq!(snap.messages[2].text, prompts_builtin::CHAT_TIMEOUT);
        assert!(!snap.is_waiting);
    }

    #[tokio::test]
    async fn test_server_error_appends_fallback() {
        let chat = session(Arc::new(ScriptedClient::failing(500)));

        let outcome = chat.send("Is honey safe?").await;
        assert_eq!(outcome, SendOutcome::Failed);

        let snap = chat.snapshot();
        assert_eq!(snap.messages.len(), 3);
        assert_eq!(snap.messages[2].text, prompts_builtin::CHAT_TRANSPORT);
        assert!(!snap.is_waiting);
    }

    #[tokio::test]
    async fn test_dropped_send_releases_waiting() {
        let client = Arc::new(ScriptedClient::replying("never").after(Duration::from_secs(5)));
        let chat = session(client);

        let pending = chat.send("hello");
        let _ = tokio::time::timeout(Duration::from_millis(20), pending).await;

        assert!(!chat.is_waiting());
        assert_eq!(chat.snapshot().messages.len(), 2);
    }

    #[tokio::test]
    async fn test_reset_restores_greeting() {
        let chat = session(Arc::new(ScriptedClient::replying("ok")));
        for i in 0..4 {
            chat.send(&format!("q{}", i)).await;
        }
        assert_eq!(chat.snapshot().messages.len(), 9);

        chat.reset();
        let snap = chat.snapshot();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages[0].text, prompts_builtin::GREETING);
    }

    #[tokio::test]
    async fn test_reset_during_send_drops_late_reply() {
        let chat = session(Arc::new(
            ScriptedClient::replying("late").after(Duration::from_millis(50)),
        ));

        let (outcome, _) = tokio::join!(chat.send("hi"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            chat.reset();
        });

        assert_eq!(outcome, SendOutcome::Replied);
        assert_eq!(chat.snapshot().messages.len(), 1);
        assert!(!chat.is_waiting());
    }
}
