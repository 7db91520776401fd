//! Session issuing, validation, sliding expiry and revocation.
//!
//! Sessions live in memory only. The map is keyed by session id and every
//! entry carries its own lock, so operations on different sessions contend
//! only on the map's read lock. An entry lock is never held while the map
//! lock is being acquired.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use intelplat_core::{Role, Secret, SharedClock, SystemClock};

use crate::credentials::{CredentialError, CredentialStore, UserRecord};
use crate::{AuthError, Principal, RoleSet, authorize};

/// Opaque bearer token identifying a session (256 random bits, base64url).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Result<Self, AuthError> {
        let mut buf = [0u8; 32];
        getrandom::getrandom(&mut buf).map_err(|e| AuthError::TokenGeneration(e.to_string()))?;
        Ok(Self(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)))
    }

    /// Wrap a token presented by a client.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix that is safe to log.
    pub fn fingerprint(&self) -> &str {
        let end = self.0.char_indices().nth(8).map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl core::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SessionId({}…)", self.fingerprint())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    /// Terminal: expired, logged out or revoked.
    Invalidated,
}

/// Snapshot of a session as issued or last touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Inactivity window; each authorized action slides the expiry by this much.
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::minutes(30),
        }
    }
}

#[derive(Debug)]
struct LiveState {
    expires_at: DateTime<Utc>,
    state: SessionState,
}

#[derive(Debug)]
struct SessionSlot {
    id: SessionId,
    username: String,
    role: Role,
    created_at: DateTime<Utc>,
    live: Mutex<LiveState>,
}

impl SessionSlot {
    fn snapshot(&self, expires_at: DateTime<Utc>) -> Session {
        Session {
            id: self.id.clone(),
            username: self.username.clone(),
            role: self.role,
            created_at: self.created_at,
            expires_at,
        }
    }

    fn principal(&self, expires_at: DateTime<Utc>) -> Principal {
        Principal {
            session_id: self.id.clone(),
            username: self.username.clone(),
            role: self.role,
            expires_at,
        }
    }

    /// Check liveness at `now`, invalidating on expiry. Returns the current
    /// expiry if still active.
    fn check_active(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut live = self.live.lock();
        match live.state {
            SessionState::Invalidated => None,
            SessionState::Active if now >= live.expires_at => {
                live.state = SessionState::Invalidated;
                None
            }
            SessionState::Active => Some(live.expires_at),
        }
    }

    /// Slide expiry if still active.
    fn slide(&self, now: DateTime<Utc>, idle: Duration) -> Option<DateTime<Utc>> {
        let mut live = self.live.lock();
        match live.state {
            SessionState::Invalidated => None,
            SessionState::Active if now >= live.expires_at => {
                live.state = SessionState::Invalidated;
                None
            }
            SessionState::Active => {
                live.expires_at = expiry(now, idle);
                Some(live.expires_at)
            }
        }
    }

    /// Returns true if this call moved the session out of `Active`.
    fn invalidate(&self) -> bool {
        let mut live = self.live.lock();
        let was_active = live.state == SessionState::Active;
        live.state = SessionState::Invalidated;
        was_active
    }
}

/// Credential verification plus role-scoped session management.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    sessions: RwLock<HashMap<SessionId, Arc<SessionSlot>>>,
    config: SessionConfig,
    clock: SharedClock,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, config: SessionConfig) -> Self {
        Self::with_clock(store, config, SystemClock::shared())
    }

    pub fn with_clock(
        store: Arc<dyn CredentialStore>,
        config: SessionConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            sessions: RwLock::new(HashMap::new()),
            config,
            clock,
        }
    }

    /// Read-only access to the backing credential store.
    pub fn credentials(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    /// Verify credentials and issue a new session.
    ///
    /// Exactly one password verification runs whether or not the username
    /// exists.
    pub fn login(&self, username: &str, password: &Secret<String>) -> Result<Session, AuthError> {
        let record = match self.store.find_by_username(username) {
            Ok(record) => record,
            Err(CredentialError::NotFound) => {
                self.store.verify_absent(password);
                warn!("login rejected");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                self.store.verify_absent(password);
                return Err(AuthError::from_store(e, username));
            }
        };

        if !self.store.verify_password(&record, password) {
            warn!("login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        self.issue(&record)
    }

    /// Issue a session for a verified record.
    ///
    /// The record is re-read under the map's write lock. A concurrent role
    /// change or password rotation either lands before that read or revokes
    /// the inserted session once the lock is released.
    fn issue(&self, verified: &UserRecord) -> Result<Session, AuthError> {
        let id = SessionId::generate()?;
        let mut map = self.sessions.write();

        let record = match self.store.find_by_username(&verified.username) {
            Ok(current) if current.password_hash == verified.password_hash => current,
            Ok(_) | Err(CredentialError::NotFound) => {
                drop(map);
                warn!("login rejected: credentials changed during verification");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                drop(map);
                return Err(AuthError::from_store(e, &verified.username));
            }
        };

        let now = self.clock.now();
        let expires_at = expiry(now, self.config.idle_timeout);
        let slot = Arc::new(SessionSlot {
            id: id.clone(),
            username: record.username.clone(),
            role: record.role,
            created_at: now,
            live: Mutex::new(LiveState {
                expires_at,
                state: SessionState::Active,
            }),
        });
        let session = slot.snapshot(expires_at);
        map.insert(id.clone(), slot);
        drop(map);

        info!(
            username = %record.username,
            role = %record.role,
            sid = id.fingerprint(),
            ttl_secs = self.config.idle_timeout.num_seconds(),
            "session issued"
        );
        Ok(session)
    }

    fn slot(&self, id: &SessionId) -> Option<Arc<SessionSlot>> {
        self.sessions.read().get(id).cloned()
    }

    fn forget(&self, id: &SessionId) {
        self.sessions.write().remove(id);
    }

    /// Validate a session and check it against `required`.
    ///
    /// On success the expiry slides forward (the action counts as activity).
    /// A forbidden check does not slide the expiry.
    pub fn authorize(
        &self,
        id: &SessionId,
        required: impl Into<RoleSet>,
    ) -> Result<Principal, AuthError> {
        let required = required.into();
        let Some(slot) = self.slot(id) else {
            return Err(AuthError::SessionExpired);
        };

        let now = self.clock.now();
        if slot.check_active(now).is_none() {
            self.forget(id);
            debug!(sid = id.fingerprint(), "session expired");
            return Err(AuthError::SessionExpired);
        }

        if let Err(e) = authorize(slot.role, &required) {
            warn!(
                username = %slot.username,
                role = %slot.role,
                required = %required,
                "authorization denied"
            );
            return Err(e.into());
        }

        let Some(expires_at) = slot.slide(now, self.config.idle_timeout) else {
            self.forget(id);
            return Err(AuthError::SessionExpired);
        };

        Ok(slot.principal(expires_at))
    }

    /// Check that a session is live without counting the check as activity.
    pub fn validate(&self, id: &SessionId) -> Result<Principal, AuthError> {
        let Some(slot) = self.slot(id) else {
            return Err(AuthError::SessionExpired);
        };
        match slot.check_active(self.clock.now()) {
            Some(expires_at) => Ok(slot.principal(expires_at)),
            None => {
                self.forget(id);
                debug!(sid = id.fingerprint(), "session expired");
                Err(AuthError::SessionExpired)
            }
        }
    }

    /// Slide the expiry window of an active session.
    pub fn touch(&self, id: &SessionId) -> Result<Session, AuthError> {
        let Some(slot) = self.slot(id) else {
            return Err(AuthError::SessionExpired);
        };
        match slot.slide(self.clock.now(), self.config.idle_timeout) {
            Some(expires_at) => Ok(slot.snapshot(expires_at)),
            None => {
                self.forget(id);
                Err(AuthError::SessionExpired)
            }
        }
    }

    /// Invalidate a session. Idempotent; returns whether it was active.
    pub fn logout(&self, id: &SessionId) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        let was_active = slot.invalidate();
        self.forget(id);
        if was_active {
            info!(username = %slot.username, sid = id.fingerprint(), "session logged out");
        }
        was_active
    }

    /// Invalidate every session of `username`. Returns how many were active.
    pub fn revoke_user(&self, username: &str) -> usize {
        let slots: Vec<Arc<SessionSlot>> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.username == username)
            .cloned()
            .collect();

        let mut count = 0;
        for slot in &slots {
            if slot.invalidate() {
                count += 1;
            }
        }
        {
            let mut map = self.sessions.write();
            for slot in &slots {
                map.remove(&slot.id);
            }
        }
        info!(username, count, "sessions revoked");
        count
    }

    /// Drop expired and invalidated entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let dead: Vec<SessionId> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.check_active(now).is_none())
            .map(|s| s.id.clone())
            .collect();
        if !dead.is_empty() {
            let mut map = self.sessions.write();
            for id in &dead {
                map.remove(id);
            }
            debug!(count = dead.len(), "purged expired sessions");
        }
        dead.len()
    }

    /// Number of sessions currently active.
    pub fn active_sessions(&self) -> usize {
        let now = self.clock.now();
        self.sessions
            .read()
            .values()
            .filter(|s| s.check_active(now).is_some())
            .count()
    }

    /// Create a new account.
    pub fn register(
        &self,
        username: &str,
        password: &Secret<String>,
        role: Role,
    ) -> Result<UserRecord, AuthError> {
        self.store
            .create(username, password, role)
            .map_err(|e| AuthError::from_store(e, username))
    }

    /// Change a user's role and revoke their sessions, so no session outlives
    /// the role it was issued for.
    pub fn change_role(&self, username: &str, role: Role) -> Result<UserRecord, AuthError> {
        let record = self
            .store
            .update_role(username, role)
            .map_err(|e| AuthError::from_store(e, username))?;
        self.revoke_user(&record.username);
        Ok(record)
    }

    /// Rotate a user's password and revoke their sessions.
    pub fn rotate_password(
        &self,
        username: &str,
        new_password: &Secret<String>,
    ) -> Result<UserRecord, AuthError> {
        let record = self
            .store
            .rotate_password(username, new_password)
            .map_err(|e| AuthError::from_store(e, username))?;
        self.revoke_user(&record.username);
        Ok(record)
    }
}

/// `now + idle`, saturating at the latest representable instant.
fn expiry(now: DateTime<Utc>, idle: Duration) -> DateTime<Utc> {
    now.checked_add_signed(idle).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl core::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("sessions", &self.sessions.read().len())
            .finish_non_exhaustive()
    }
}
