//! Shared application state

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::auth::AuthService;
use crate::config::Profiles;
use crate::core::{ChatSession, FoodLogStore, PlanSession};
use crate::providers::CompletionClient;

struct Entry<T> {
    session: Arc<T>,
    last_seen: Instant,
}

/// Live sessions of one kind, keyed by id
pub struct Registry<T> {
    sessions: Arc<RwLock<HashMap<Uuid, Entry<T>>>>,
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T> Registry<T> {
    pub async fn insert(&self, session: T) -> (Uuid, Arc<T>) {
        let id = Uuid::new_v4();
        let session = Arc::new(session);
        let entry = Entry {
            session: Arc::clone(&session),
            last_seen: Instant::now(),
        };
        self.sessions.write().await.insert(id, entry);
        (id, session)
    }

    /// Fetch a session and mark it as used
    pub async fn get(&self, id: Uuid) -> Option<Arc<T>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(Arc::clone(&entry.session))
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Drop sessions unused for longer than `max_idle`. Sessions a request
    /// still holds are kept. Returns how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.last_seen.elapsed() <= max_idle || Arc::strong_count(&entry.session) > 1
        });
        before - sessions.len()
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub profiles: Profiles,
    pub client: Arc<dyn CompletionClient>,
    pub auth: Arc<AuthService>,
    pub logs: Arc<FoodLogStore>,
    pub chats: Registry<ChatSession>,
    pub plans: Registry<PlanSession>,
}

impl AppState {
    pub fn new(
        profiles: Profiles,
        client: Arc<dyn CompletionClient>,
        auth: Arc<AuthService>,
        logs: Arc<FoodLogStore>,
    ) -> Self {
        Self {
            profiles,
            client,
            auth,
            logs,
            chats: Registry::default(),
            plans: Registry::default(),
        }
    }

    pub fn new_chat(&self) -> ChatSession {
        ChatSession::new(Arc::clone(&self.client), self.profiles.chat.clone())
    }

    pub fn new_plan(&self) -> PlanSession {
        PlanSession::new(Arc::clone(&self.client), self.profiles.plan.clone())
    }

    /// Periodically drop chat and plan sessions idle for longer than `max_idle`
    pub fn spawn_session_sweeper(&self, max_idle: Duration) -> JoinHandle<()> {
        let chats = self.chats.clone();
        let plans = self.plans.clone();
        let period = (max_idle / 2).clamp(Duration::from_millis(10), Duration::from_secs(60));

        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            loop {
                ticker.tick().await;
                let dropped = chats.evict_idle(max_idle).await + plans.evict_idle(max_idle).await;
                if dropped > 0 {
                    tracing::debug!(dropped, "evicted idle sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthService;
    use crate::core::store::connect_in_memory;
    use crate::core::testing::ScriptedClient;

    #[tokio::test]
    async fn test_evict_idle_keeps_recent_and_held() {
        let registry: Registry<String> = Registry::default();
        let (stale, _) = registry.insert("stale".to_string()).await;
        let (recent, _) = registry.insert("recent".to_string()).await;
        let (_, held) = registry.insert("held".to_string()).await;

        time::sleep(Duration::from_millis(60)).await;
        registry.get(recent).await.unwrap();

        assert_eq!(registry.evict_idle(Duration::from_millis(30)).await, 1);
        assert!(registry.get(stale).await.is_none());
        assert!(registry.get(recent).await.is_some());
        assert_eq!(held.as_str(), "held");

        drop(held);
        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(registry.evict_idle(Duration::from_millis(30)).await, 2);
    }

    #[tokio::test]
    async fn test_sweeper_drops_idle_sessions() {
        let pool = connect_in_memory().await.unwrap();
        let state = AppState::new(
            Profiles::default(),
            Arc::new(ScriptedClient::replying("unused")),
            Arc::new(AuthService::new(pool.clone()).await.unwrap()),
            Arc::new(FoodLogStore::new(pool).await.unwrap()),
        );
        let (chat, _) = state.chats.insert(state.new_chat()).await;
        let (plan, _) = state.plans.insert(state.new_plan()).await;

        let sweeper = state.spawn_session_sweeper(Duration::from_millis(20));
        time::sleep(Duration::from_millis(200)).await;
        sweeper.abort();

        assert!(state.chats.get(chat).await.is_none());
        assert!(state.plans.get(plan).await.is_none());
    }
}
