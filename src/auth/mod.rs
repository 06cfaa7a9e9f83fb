//! Accounts, sign-in sessions and the identity passed to plan operations
//!
//! Passwords are hashed with Argon2id. A successful sign-in yields an opaque
//! bearer token; callers resolve tokens into an [`IdentityContext`] and hand
//! that to whatever needs to know who is asking. Sign-in and sign-out are
//! broadcast as [`AuthEvent`]s.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Who is making a request, if anyone
#[derive(Debug, Clone, Default)]
pub struct IdentityContext {
    user: Option<User>,
}

impl IdentityContext {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

/// Change in authentication state
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(User),
    SignedOut { user_id: Uuid },
}

/// A signed-in session
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    WeakPassword,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct AuthService {
    pool: SqlitePool,
    events: broadcast::Sender<AuthEvent>,
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AuthError::InvalidEmail),
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_user(id: &str, email: String, created_at: &str) -> Option<User> {
    Some(User {
        id: Uuid::parse_str(id).ok()?,
        email,
        created_at: DateTime::parse_from_rfc3339(created_at)
            .ok()?
            .with_timezone(&Utc),
    })
}

async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))?
}

async fn verify_password(password: String, stored: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored).map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))?
}

impl AuthService {
    /// Wrap a pool and make sure the schema exists
    pub async fn new(pool: SqlitePool) -> Result<Self, AuthError> {
        let (events, _) = broadcast::channel(32);
        let service = Self { pool, events };
        service.init_schema().await?;
        Ok(service)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS auth_sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Listen for sign-in and sign-out
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Create an account and sign it in
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            // Stored with microsecond precision
            created_at: Utc::now().trunc_subsecs(6),
        };
        let hash = hash_password(password.to_string()).await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(hash)
        .bind(timestamp(user.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            // A concurrent sign-up won the race for this email
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AuthError::EmailTaken,
            other => AuthError::Database(other),
        })?;

        tracing::info!(user_id = %user.id, "account created");
        self.open_session(user).await
    }

    /// Check credentials and open a session
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;

        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, email, hash, created_at)) = row else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), hash).await? {
            tracing::debug!(%email, "sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let user = parse_user(&id, email, &created_at).ok_or(AuthError::InvalidCredentials)?;
        self.open_session(user).await
    }

    async fn open_session(&self, user: User) -> Result<AuthSession, AuthError> {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

        sqlx::query("INSERT INTO auth_sessions (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(user.id.to_string())
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;

        self.publish(AuthEvent::SignedIn(user.clone()));
        Ok(AuthSession { token, user })
    }

    /// Revoke a token. Returns false if it was not a live session.
    pub async fn sign_out(&self, token: &str) -> Result<bool, AuthError> {
        let Some(user) = self.current_user(token).await? else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        self.publish(AuthEvent::SignedOut { user_id: user.id });
        Ok(true)
    }

    /// The user a token belongs to, if the session is live
    pub async fn current_user(&self, token: &str) -> Result<Option<User>, AuthError> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.created_at
            FROM auth_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(id, email, created_at)| parse_user(&id, email, &created_at)))
    }

    /// Resolve an optional bearer token into an identity
    pub async fn identity(&self, token: Option<&str>) -> Result<IdentityContext, AuthError> {
        match token {
            Some(token) => Ok(self
                .current_user(token)
                .await?
                .map(IdentityContext::signed_in)
                .unwrap_or_default()),
            None => Ok(IdentityContext::anonymous()),
        }
    }
}
