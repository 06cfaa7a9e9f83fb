//! Single-shot meal plan generation
//!
//! A `PlanSession` backs one "create plan" dialog: it holds the last intake,
//! the generated plan or an error banner, and can save the plan for the
//! signed-in user.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::auth::IdentityContext;
use crate::config::{prompts_builtin, RequestProfile};
use crate::conversation::Turn;
use crate::providers::{CompletionClient, CompletionRequest};

use super::fallback::{complete_within, FallbackTable};
use super::plan::{build_prompt, PlanDetails, PlanIntake, ValidIntake, ValidationError};
use super::store::{FoodLog, FoodLogStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Invalid intake: {0}")]
    Validation(#[from] ValidationError),

    #[error("A plan is already being generated")]
    Busy,

    #[error("No plan has been generated yet")]
    NoPlan,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Render-ready copy of the dialog state
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanSnapshot {
    pub intake: Option<ValidIntake>,
    pub plan: Option<String>,
    pub error: Option<String>,
    pub is_generating: bool,
}

#[derive(Default)]
struct Inner {
    view: PlanSnapshot,
    /// Bumped by `reset` so a late result is not applied to a fresh dialog
    epoch: u64,
}

pub struct PlanSession {
    client: Arc<dyn CompletionClient>,
    profile: RequestProfile,
    deadline: Duration,
    fallbacks: FallbackTable,
    inner: Mutex<Inner>,
}

struct GeneratingGuard<'a> {
    session: &'a PlanSession,
}

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        self.session.lock().view.is_generating = false;
    }
}

impl PlanSession {
    pub fn new(client: Arc<dyn CompletionClient>, profile: RequestProfile) -> Self {
        Self {
            client,
            deadline: profile.timeout(),
            profile,
            fallbacks: FallbackTable::PLAN,
            inner: Mutex::new(Inner::default()),
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

    pub fn snapshot(&self) -> PlanSnapshot {
        self.lock().view.clone()
    }

    /// Generate a plan for `intake`.
    ///
    /// Timeouts and service failures are not errors here: they land in the
    /// snapshot's `error` banner.
    pub async fn generate(&self, intake: &PlanIntake) -> Result<PlanSnapshot, PlanError> {
        let intake = intake.validate()?;
        let prompt = build_prompt(&intake);

        let epoch = {
            let mut inner = self.lock();
            if inner.view.is_generating {
                return Err(PlanError::Busy);
            }
            inner.view = PlanSnapshot {
                intake: Some(intake),
                plan: None,
                error: None,
                is_generating: true,
            };
            inner.epoch
        };

        let _guard = GeneratingGuard { session: self };

        let request = CompletionRequest::new(
            vec![Turn::system(prompt.system), Turn::user(prompt.user)],
            &self.profile,
        );

        let result = complete_within(self.client.as_ref(), &request, self.deadline).await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            tracing::debug!("plan dialog was reset, dropping result");
        } else {
            match result {
                Ok(plan) => {
                    tracing::info!(chars = plan.len(), "meal plan generated");
                    inner.view.plan = Some(plan);
                }
                Err(kind) => inner.view.error = Some(self.fallbacks.text(kind).to_string()),
            }
        }

        // The guard clears the shared flag once this returns.
        let mut view = inner.view.clone();
        view.is_generating = false;
        Ok(view)
    }

    /// Save the current plan for the signed-in user
    pub async fn save(
        &self,
        identity: &IdentityContext,
        store: &FoodLogStore,
    ) -> Result<FoodLog, PlanError> {
        let details = {
            let inner = self.lock();
            match (&inner.view.intake, &inner.view.plan) {
                (Some(intake), Some(plan)) => PlanDetails {
                    intake: intake.clone(),
                    plan: plan.clone(),
                },
                _ => return Err(PlanError::NoPlan),
            }
        };

        let Some(user) = identity.user() else {
            self.lock().view.error = Some(prompts_builtin::PLAN_SIGN_IN.to_string());
            return Err(PlanError::NotAuthenticated);
        };

        match store.insert(user.id, details).await {
            Ok(log) => {
                self.lock().view.error = None;
                Ok(log)
            }
            Err(e) => {
                tracing::error!("failed to save plan: {}", e);
                self.lock().view.error = Some(prompts_builtin::PLAN_SAVE_FAILED.to_string());
                Err(e.into())
            }
        }
    }

    /// Clear intake, plan and error for a fresh dialog
    pub fn reset(&self) {
        let mut inner = self.lock();
        let generating = inner.view.is_generating;
        inner.view = PlanSnapshot {
            is_generating: generating,
            ..Default::default()
        };
        inner.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;
    use crate::conversation::Role;
    use crate::core::plan::{AgeRange, Goal, MealsPerDay, Sex};
    use crate::core::store::connect_in_memory;
    use crate::core::testing::ScriptedClient;
    use chrono::Utc;
    use uuid::Uuid;

    fn intake() -> PlanIntake {
        PlanIntake {
            age_range: Some(AgeRange::SixToEight),
            height_cm: Some(66.0),
            weight_kg: Some(7.2),
            sex: Some(Sex::Boy),
            goal: Some(Goal::PickyEater),
            meals_per_day: MealsPerDay::new(4).unwrap(),
            ..Default::default()
        }
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "parent@example.com".to_string(),
            created_at: Utc::now(),
        }
    }

    async fn store() -> FoodLogStore {
        FoodLogStore::new(connect_in_memory().await.unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_uses_plan_profile() {
        let client = Arc::new(ScriptedClient::replying("DAY 1:\n- 7:00 oatmeal"));
        let session = PlanSession::new(client.clone(), RequestProfile::plan());

        let view = session.generate(&intake()).await.unwrap();
        assert_eq!(view.plan.as_deref(), Some("DAY 1:\n- 7:00 oatmeal"));
        assert!(view.error.is_none());
        assert!(!view.is_generating);
        assert!(!session.snapshot().is_generating);

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.max_tokens, 1500);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("Each day must have 4 meals"));
        assert!(request.messages[1].content.contains("PROGRESS TRACKING:"));
    }

    #[tokio::test]
    async fn test_invalid_intake_never_reaches_network() {
        let client = Arc::new(ScriptedClient::replying("unused"));
        let session = PlanSession::new(client.clone(), RequestProfile::plan());

        let err = session.generate(&PlanIntake::default()).await.unwrap_err();
        assert!(matches!(err, PlanError::Validation(ValidationError::Missing(_))));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_sets_banner() {
        let client = Arc::new(ScriptedClient::replying("late").after(Duration::from_secs(5)));
        let session = PlanSession::new(client, RequestProfile::plan())
            .with_deadline(Duration::from_millis(50));

        let view = session.generate(&intake()).await.unwrap();
        assert!(view.plan.is_none());
        assert_eq!(view.error.as_deref(), Some(prompts_builtin::PLAN_TIMEOUT));
        assert!(!session.snapshot().is_generating);
    }

    #[tokio::test]
    async fn test_failure_sets_banner() {
        let session = PlanSession::new(
            Arc::new(ScriptedClient::failing(502)),
            RequestProfile::plan(),
        );

        let view = session.generate(&intake()).await.unwrap();
        assert_eq!(view.error.as_deref(), Some(prompts_builtin::PLAN_TRANSPORT));
    }

    #[tokio::test]
    async fn test_concurrent_generate_is_busy() {
        let client = Arc::new(ScriptedClient::replying("plan").after(Duration::from_millis(100)));
        let session = PlanSession::new(client.clone(), RequestProfile::plan());
        let form = intake();

        let (first, second) = tokio::join!(session.generate(&form), session.generate(&form));
        assert!(first.is_ok());
        assert!(matches!(second, Err(PlanError::Busy)));
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_during_generate_drops_late_plan() {
        let client =
            Arc::new(ScriptedClient::replying("late plan").after(Duration::from_millis(80)));
        let session = PlanSession::new(client.clone(), RequestProfile::plan());
        let form = intake();

        let (first, second) = tokio::join!(session.generate(&form), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session.reset();
            let view = session.snapshot();
            assert!(view.intake.is_none());
            assert!(view.is_generating);
            session.generate(&form).await
        });

        let first = first.unwrap();
        assert!(first.plan.is_none());
        assert!(first.error.is_none());
        assert!(matches!(second, Err(PlanError::Busy)));

        let view = session.snapshot();
        assert!(view.plan.is_none());
        assert!(view.error.is_none());
        assert!(!view.is_generating);
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_save_requires_sign_in() {
        let session = PlanSession::new(
            Arc::new(ScriptedClient::replying("my plan")),
            RequestProfile::plan(),
        );
        let store = store().await;
        session.generate(&intake()).await.unwrap();

        let err = session
            .save(&IdentityContext::anonymous(), &store)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::NotAuthenticated));

        let view = session.snapshot();
        assert_eq!(view.plan.as_deref(), Some("my plan"));
        assert_eq!(view.error.as_deref(), Some(prompts_builtin::PLAN_SIGN_IN));
    }

    #[tokio::test]
    async fn test_save_persists_for_user() {
        let session = PlanSession::new(
            Arc::new(ScriptedClient::replying("my plan")),
            RequestProfile::plan(),
        );
        let store = store().await;
        let parent = user();

        assert!(matches!(
            session.save(&IdentityContext::signed_in(parent.clone()), &store).await,
            Err(PlanError::NoPlan)
        ));

        session.generate(&intake()).await.unwrap();
        let log = session
            .save(&IdentityContext::signed_in(parent.clone()), &store)
            .await
            .unwrap();
        assert_eq!(log.user_id, parent.id);
        assert_eq!(log.plan_details.plan, "my plan");

        let logs = store.list_for_owner(parent.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].plan_details.intake.meals_per_day.get(), 4);
    }

    #[tokio::test]
    async fn test_reset_clears_dialog() {
        let session = PlanSession::new(
            Arc::new(ScriptedClient::replying("plan")),
            RequestProfile::plan(),
        );
        session.generate(&intake()).await.unwrap();

        session.reset();
        let view = session.snapshot();
        assert!(view.intake.is_none());
        assert!(view.plan.is_none());
        assert!(view.error.is_none());
    }
}
