use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rusqlite::Connection;
use serde::Serialize;
use sha1::Sha1;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;

use crate::db::queries;
use crate::models::{User, UserRole};

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        }
    }
}

/// Session state as seen by a consumer. Starts out `loading` until a token
/// has been resolved.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
            error: None,
        }
    }
}

impl AuthState {
    fn signed_in(user: AuthUser) -> Self {
        Self {
            user: Some(user),
            loading: false,
            error: None,
        }
    }

    fn failed(error: &str) -> Self {
        Self {
            user: None,
            loading: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn { user_id: String, email: String },
    SignedOut { user_id: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
}

/// Issues and verifies signed session tokens for the admin console and
/// publishes sign-in/sign-out events to subscribers.
pub struct AuthProvider {
    key: HmacSha1,
    session_ttl: Duration,
    /// Signed-out tokens mapped to their expiry.
    revoked: Mutex<HashMap<String, i64>>,
    events: broadcast::Sender<AuthEvent>,
    subscribers: Arc<AtomicUsize>,
}

impl AuthProvider {
    pub fn new(secret: &str, session_ttl: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!secret.is_empty(), "auth secret must not be empty");
        let key = HmacSha1::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid auth secret: {e}"))?;
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            key,
            session_ttl,
            revoked: Mutex::new(HashMap::new()),
            events,
            subscribers: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn mac(&self) -> HmacSha1 {
        self.key.clone()
    }

    /// Salted argon2 hash in PHC string format.
    pub fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    pub fn sign_in(
        &self,
        conn: &Connection,
        email: &str,
        password: &str,
    ) -> anyhow::Result<Result<Session, AuthError>> {
        let Some(user) = queries::get_user_by_email(conn, email.trim())? else {
            return Ok(Err(AuthError::InvalidCredentials));
        };
        if !self.verify_password(password, &user.password_hash) {
            tracing::warn!(email = %email, "failed sign-in attempt");
            return Ok(Err(AuthError::InvalidCredentials));
        }

        let expires_at = (Utc::now() + self.session_ttl).timestamp();
        let payload = format!("{}.{expires_at}", user.id);
        let token = format!("{payload}.{}", self.sign(&payload));

        let user = AuthUser::from(user);
        tracing::info!(user_id = %user.id, "admin signed in");
        let _ = self.events.send(AuthEvent::SignedIn {
            user_id: user.id.clone(),
            email: user.email.clone(),
        });

        Ok(Ok(Session {
            token,
            expires_at,
            user,
        }))
    }

    pub fn resolve(&self, conn: &Connection, token: &str) -> anyhow::Result<AuthState> {
        let Some((user_id, expires_at)) = self.verify_token(token) else {
            return Ok(AuthState::failed("invalid session"));
        };
        if expires_at <= Utc::now().timestamp() {
            return Ok(AuthState::failed("session expired"));
        }
        if self.is_revoked(token) {
            return Ok(AuthState::failed("signed out"));
        }

        match queries::get_user(conn, &user_id)? {
            Some(user) => Ok(AuthState::signed_in(user.into())),
            None => Ok(AuthState::failed("unknown user")),
        }
    }

    pub fn sign_out(&self, token: &str) {
        let Some((user_id, expires_at)) = self.verify_token(token) else {
            return;
        };
        let now = Utc::now().timestamp();
        if let Ok(mut revoked) = self.revoked.lock() {
            // Expired tokens are rejected anyway, no need to remember them.
            revoked.retain(|_, exp| *exp > now);
            if expires_at > now {
                revoked.insert(token.to_string(), expires_at);
            }
        }
        tracing::info!(user_id = %user_id, "admin signed out");
        let _ = self.events.send(AuthEvent::SignedOut { user_id });
    }

    /// Registers a listener for auth events. Dropping the subscription
    /// unregisters it.
    pub fn subscribe(&self) -> AuthSubscription {
        self.subscribers.fetch_add(1, Ordering::SeqCst);
        AuthSubscription {
            inner: BroadcastStream::new(self.events.subscribe()),
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }

    fn is_revoked(&self, token: &str) -> bool {
        self.revoked
            .lock()
            .map(|r| r.contains_key(token))
            .unwrap_or(true)
    }

    fn verify_token(&self, token: &str) -> Option<(String, i64)> {
        let (payload, signature) = token.rsplit_once('.')?;
        let (user_id, expires_at) = payload.rsplit_once('.')?;
        let expires_at: i64 = expires_at.parse().ok()?;

        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        Some((user_id.to_string(), expires_at))
    }
}

pub struct AuthSubscription {
    inner: BroadcastStream<AuthEvent>,
    subscribers: Arc<AtomicUsize>,
}

impl Stream for AuthSubscription {
    type Item = AuthEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<AuthEvent>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                // Lagged: skip the missed events.
                Poll::Ready(Some(Err(_))) => continue,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.subscribers.fetch_sub(1, Ordering::SeqCst);
    }
}
