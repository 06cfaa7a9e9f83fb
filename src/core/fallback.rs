//! Deadline-bounded completion calls and the canned replies used when they fail

use std::time::Duration;

use crate::config::prompts_builtin;
use crate::providers::{CompletionClient, CompletionRequest};

/// Why a completion call produced no usable text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The deadline passed and the request was dropped
    Timeout,
    /// Network error, non-2xx status or a body without content
    Transport,
}

/// Display text substituted for each failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackTable {
    timeout: &'static str,
    transport: &'static str,
}

impl FallbackTable {
    /// Replies appended to a chat conversation
    pub const CHAT: FallbackTable = FallbackTable {
        timeout: prompts_builtin::CHAT_TIMEOUT,
        transport: prompts_builtin::CHAT_TRANSPORT,
    };

    /// Error banners shown by the plan generator
    pub const PLAN: FallbackTable = FallbackTable {
        timeout: prompts_builtin::PLAN_TIMEOUT,
        transport: prompts_builtin::PLAN_TRANSPORT,
    };

    pub fn text(&self, kind: FailureKind) -> &'static str {
        match kind {
            FailureKind::Timeout => self.timeout,
            FailureKind::Transport => self.transport,
        }
    }
}

/// Issue one request and wait at most `deadline` for it.
///
/// On timeout the request future is dropped, which aborts the HTTP call.
pub async fn complete_within(
    client: &dyn CompletionClient,
    request: &CompletionRequest,
    deadline: Duration,
) -> Result<String, FailureKind> {
    match tokio::time::timeout(deadline, client.complete(request)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) if e.is_timeout() => {
            tracing::warn!("completion transport timed out: {}", e);
            Err(FailureKind::Timeout)
        }
        Ok(Err(e)) => {
            tracing::warn!("completion request failed: {}", e);
            Err(FailureKind::Transport)
        }
        Err(_) => {
            tracing::warn!(?deadline, "completion request exceeded deadline");
            Err(FailureKind::Timeout)
        }
    }
}
