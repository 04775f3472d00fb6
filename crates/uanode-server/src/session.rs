// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server-side session lifecycle.
//!
//! ```text
//! Created → Active → Closing  → Closed
//!                  ↘ TimedOut ↗
//! ```
//!
//! Sessions live in a [`DashMap`] so requests on different sessions never
//! contend on one lock. Closed sessions leave a tombstone for a while, so
//! a late request reports `BadSessionClosed` instead of
//! `BadSessionIdInvalid`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uanode_config::{SecurityConfig, ServerConfig};
use uanode_core::access::AuthorizationContext;
use uanode_core::protocol::{ChannelId, SessionId};
use uanode_core::status::StatusCode;
use uanode_core::types::{SecurityPair, UserIdentity};

// =============================================================================
// Configuration
// =============================================================================

/// Session lifetime bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Idle time after which a session expires.
    pub timeout: Duration,
    /// Interval of the background sweep.
    pub sweep_interval: Duration,
    /// How long closed session ids are remembered.
    pub closed_retention: Duration,
    /// Maximum number of concurrent sessions.
    pub max_sessions: usize,
}

impl SessionConfig {
    /// Creates a configuration; timeout and sweep interval have no default.
    pub fn new(timeout: Duration, sweep_interval: Duration) -> Self {
        Self {
            timeout,
            sweep_interval,
            closed_retention: Duration::from_secs(300),
            max_sessions: 100,
        }
    }

    /// Sets the tombstone retention.
    pub fn with_closed_retention(mut self, retention: Duration) -> Self {
        self.closed_retention = retention;
        self
    }

    /// Sets the session limit.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    /// Builds the configuration from the server section.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.session_timeout, config.sweep_interval)
            .with_closed_retention(config.closed_session_retention)
            .with_max_sessions(config.max_sessions)
    }
}

/// Which identity tokens are accepted.
#[derive(Clone, Default)]
pub struct IdentityPolicy {
    allow_anonymous: bool,
    users: HashMap<String, String>,
}

impl IdentityPolicy {
    /// Creates a policy with no user accounts.
    pub fn new(allow_anonymous: bool) -> Self {
        Self {
            allow_anonymous,
            users: HashMap::new(),
        }
    }

    /// Adds an account.
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }

    /// Builds the policy from the security section.
    pub fn from_config(config: &SecurityConfig) -> Self {
        config
            .users
            .iter()
            .fold(Self::new(config.allow_anonymous), |policy, user| {
                policy.with_user(&user.username, &user.password)
            })
    }

    /// Returns whether anonymous sessions are accepted.
    pub fn allow_anonymous(&self) -> bool {
        self.allow_anonymous
    }

    /// Checks an identity token.
    ///
    /// Anonymous while disabled gives `BadIdentityTokenInvalid`; an unknown
    /// user or wrong password gives `BadIdentityTokenRejected`.
    pub fn authorize(&self, identity: &UserIdentity) -> Result<AuthorizationContext, StatusCode> {
        match identity {
            UserIdentity::Anonymous if self.allow_anonymous => Ok(AuthorizationContext::anonymous()),
            UserIdentity::Anonymous => Err(StatusCode::BAD_IDENTITY_TOKEN_INVALID),
            UserIdentity::UserName { username, password } => match self.users.get(username) {
                Some(expected) if expected == password => Ok(AuthorizationContext::authenticated()),
                _ => Err(StatusCode::BAD_IDENTITY_TOKEN_REJECTED),
            },
        }
    }
}

impl fmt::Debug for IdentityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.users.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("IdentityPolicy")
            .field("allow_anonymous", &self.allow_anonymous)
            .field("users", &names)
            .finish()
    }
}

// =============================================================================
// Session
// =============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Allocated, identity not yet applied.
    Created,
    /// Accepting requests.
    Active,
    /// Being closed on request.
    Closing,
    /// Idle timeout elapsed.
    TimedOut,
    /// Gone.
    Closed,
}

impl SessionState {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::TimedOut => "timed_out",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client asked for it.
    Requested,
    /// Idle timeout.
    TimedOut,
    /// Server shutdown.
    Shutdown,
}

#[derive(Debug)]
struct Session {
    name: String,
    channel_id: Option<ChannelId>,
    identity: UserIdentity,
    auth: AuthorizationContext,
    security: SecurityPair,
    state: SessionState,
    created_at: DateTime<Utc>,
    last_activity: Instant,
    timeout: Duration,
}

impl Session {
    fn is_idle(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_activity) > self.timeout
    }
}

#[derive(Debug, Clone, Copy)]
struct Tombstone {
    closed_at: Instant,
    reason: CloseReason,
}

/// Read-only view of a session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Session id.
    pub session_id: SessionId,
    /// Client-chosen name.
    pub name: String,
    /// Bound channel, `None` while the client is reconnecting.
    pub channel_id: Option<ChannelId>,
    /// Identity label (never the password).
    pub identity: String,
    /// Negotiated security.
    pub security: SecurityPair,
    /// Lifecycle state.
    pub state: SessionState,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time since the last request.
    pub idle: Duration,
    /// Enforced idle timeout.
    pub timeout: Duration,
}

/// Result of a successful `CreateSession`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    /// New session id.
    pub session_id: SessionId,
    /// Idle timeout the server will enforce.
    pub revised_timeout: Duration,
}

// =============================================================================
// Statistics
// =============================================================================

/// Session counters.
#[derive(Debug, Default)]
pub struct SessionStats {
    created: AtomicU64,
    closed: AtomicU64,
    timed_out: AtomicU64,
    rejected_identity: AtomicU64,
    rebound: AtomicU64,
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStatsSnapshot {
    /// Sessions created.
    pub created: u64,
    /// Sessions closed on request or at shutdown.
    pub closed: u64,
    /// Sessions expired by idle timeout.
    pub timed_out: u64,
    /// Identity tokens refused.
    pub rejected_identity: u64,
    /// Sessions re-bound to a new channel.
    pub rebound: u64,
}

impl SessionStats {
    /// Returns a snapshot.
    pub fn snapshot(&self) -> SessionStatsSnapshot {
        SessionStatsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            rejected_identity: self.rejected_identity.load(Ordering::Relaxed),
            rebound: self.rebound.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// SessionManager
// =============================================================================

/// Tracks sessions, their channel binding and their idle time.
#[derive(Debug)]
pub struct SessionManager {
    config: SessionConfig,
    identity: IdentityPolicy,
    sessions: DashMap<SessionId, Session>,
    tombstones: DashMap<SessionId, Tombstone>,
    sweep_lock: Mutex<()>,
    stats: SessionStats,
}

impl SessionManager {
    /// Creates a manager.
    pub fn new(config: SessionConfig, identity: IdentityPolicy) -> Self {
        Self {
            config,
            identity,
            sessions: DashMap::new(),
            tombstones: DashMap::new(),
            sweep_lock: Mutex::new(()),
            stats: SessionStats::default(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the identity policy.
    pub fn identity_policy(&self) -> &IdentityPolicy {
        &self.identity
    }

    /// Creates and activates a session bound to `channel_id`.
    pub fn create_session(
        &self,
        channel_id: ChannelId,
        security: SecurityPair,
        name: &str,
        identity: &UserIdentity,
        requested_timeout: Duration,
    ) -> Result<CreatedSession, StatusCode> {
        let auth = match self.identity.authorize(identity) {
            Ok(auth) => auth,
            Err(status) => {
                self.stats.rejected_identity.fetch_add(1, Ordering::Relaxed);
                info!(
                    channel_id,
                    identity = %identity.label(),
                    status = %status,
                    "Session identity rejected"
                );
                return Err(status);
            }
        };

        if self.sessions.len() >= self.config.max_sessions {
            info!(
                max_sessions = self.config.max_sessions,
                "Session rejected: limit reached"
            );
            return Err(StatusCode::BAD_TOO_MANY_SESSIONS);
        }

        let revised_timeout = if requested_timeout.is_zero() {
            self.config.timeout
        } else {
            requested_timeout.min(self.config.timeout)
        };

        let session_id = SessionId::generate();
        let mut session = Session {
            name: name.to_string(),
            channel_id: Some(channel_id),
            identity: identity.clone(),
            auth,
            security,
            state: SessionState::Created,
            created_at: Utc::now(),
            last_activity: Instant::now(),
            timeout: revised_timeout,
        };
        info!(
            session_id = %session_id,
            channel_id,
            identity = %identity.label(),
            security = %security,
            "Session created"
        );

        session.state = SessionState::Active;
        self.sessions.insert(session_id.clone(), session);
        self.stats.created.fetch_add(1, Ordering::Relaxed);
        info!(
            session_id = %session_id,
            timeout_ms = revised_timeout.as_millis() as u64,
            "Session activated"
        );

        Ok(CreatedSession {
            session_id,
            revised_timeout,
        })
    }

    /// Re-binds an existing session to `channel_id`.
    ///
    /// The identity must be the one the session was created with.
    pub fn activate_session(
        &self,
        channel_id: ChannelId,
        session_id: &SessionId,
        identity: &UserIdentity,
    ) -> Result<(), StatusCode> {
        let now = Instant::now();
        let previous = {
            let Some(mut session) = self.sessions.get_mut(session_id) else {
                return Err(self.missing_status(session_id));
            };
            if session.is_idle(now) {
                drop(session);
                self.expire(session_id, now);
                return Err(StatusCode::BAD_SESSION_CLOSED);
            }
            if session.identity != *identity {
                return Err(StatusCode::BAD_IDENTITY_TOKEN_REJECTED);
            }
            session.last_activity = now;
            session.channel_id.replace(channel_id)
        };

        if previous != Some(channel_id) {
            self.stats.rebound.fetch_add(1, Ordering::Relaxed);
            info!(
                session_id = %session_id,
                channel_id,
                previous_channel = ?previous,
                "Session re-bound"
            );
        }
        Ok(())
    }

    /// Validates a request on `session_id` arriving over `channel_id` and
    /// records the activity.
    ///
    /// Returns the session's authorization context, valid until the session
    /// would go idle.
    pub fn begin_request(
        &self,
        session_id: &SessionId,
        channel_id: ChannelId,
    ) -> Result<AuthorizationContext, StatusCode> {
        let now = Instant::now();
        let Some(mut session) = self.sessions.get_mut(session_id) else {
            return Err(self.missing_status(session_id));
        };
        if session.is_idle(now) {
            drop(session);
            self.expire(session_id, now);
            return Err(StatusCode::BAD_SESSION_CLOSED);
        }
        if session.channel_id != Some(channel_id) {
            return Err(StatusCode::BAD_SECURE_CHANNEL_ID_INVALID);
        }
        session.last_activity = now;
        Ok(session
            .auth
            .clone()
            .valid_until((now + session.timeout).into_std()))
    }

    /// Closes a session bound to `channel_id`. Closing an already closed
    /// session succeeds.
    pub fn close_session(
        &self,
        session_id: &SessionId,
        channel_id: ChannelId,
    ) -> Result<(), StatusCode> {
        if let Some(session) = self.sessions.get(session_id) {
            if session.channel_id != Some(channel_id) {
                return Err(StatusCode::BAD_SECURE_CHANNEL_ID_INVALID);
            }
        }
        if self.end_session(session_id, CloseReason::Requested) {
            return Ok(());
        }
        if self.tombstones.contains_key(session_id) {
            debug!(session_id = %session_id, "Session already closed");
            return Ok(());
        }
        Err(StatusCode::BAD_SESSION_ID_INVALID)
    }

    /// Unbinds every session from a lost channel.
    ///
    /// The sessions stay active until they are re-bound or time out.
    pub fn detach_channel(&self, channel_id: ChannelId) -> usize {
        let mut detached = 0;
        for mut entry in self.sessions.iter_mut() {
            if entry.channel_id == Some(channel_id) {
                entry.channel_id = None;
                detached += 1;
                debug!(session_id = %entry.key(), channel_id, "Session detached from channel");
            }
        }
        detached
    }

    /// Closes every session.
    pub fn close_all(&self, reason: CloseReason) -> usize {
        let ids: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.iter()
            .filter(|id| self.end_session(id, reason))
            .count()
    }

    /// Expires idle sessions and forgets old tombstones.
    ///
    /// Returns the number of sessions that timed out.
    pub fn sweep(&self) -> usize {
        let _guard = self.sweep_lock.lock();
        let now = Instant::now();

        let idle: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|e| e.is_idle(now))
            .map(|e| e.key().clone())
            .collect();
        let expired = idle.iter().filter(|id| self.expire(id, now)).count();

        let retention = self.config.closed_retention;
        self.tombstones
            .retain(|_, t| now.saturating_duration_since(t.closed_at) < retention);

        if expired > 0 {
            debug!(expired, remaining = self.sessions.len(), "Session sweep finished");
        }
        expired
    }

    /// Runs [`sweep`](Self::sweep) every `sweep_interval` until shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.config.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        manager.sweep();
                    }
                    _ = shutdown.recv() => {
                        debug!("Session sweeper stopped");
                        break;
                    }
                }
            }
        })
    }

    /// Returns a view of one session.
    pub fn session(&self, session_id: &SessionId) -> Option<SessionInfo> {
        let now = Instant::now();
        self.sessions.get(session_id).map(|s| SessionInfo {
            session_id: session_id.clone(),
            name: s.name.clone(),
            channel_id: s.channel_id,
            identity: s.identity.label(),
            security: s.security,
            state: s.state,
            created_at: s.created_at,
            idle: now.saturating_duration_since(s.last_activity),
            timeout: s.timeout,
        })
    }

    /// Returns the number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no session is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns the counters.
    pub fn stats(&self) -> SessionStatsSnapshot {
        self.stats.snapshot()
    }

    fn missing_status(&self, session_id: &SessionId) -> StatusCode {
        if self.tombstones.contains_key(session_id) {
            StatusCode::BAD_SESSION_CLOSED
        } else {
            StatusCode::BAD_SESSION_ID_INVALID
        }
    }

    /// Times out one session if it is still idle at `now`.
    fn expire(&self, session_id: &SessionId, now: Instant) -> bool {
        let Some((_, mut session)) = self.sessions.remove_if(session_id, |_, s| s.is_idle(now))
        else {
            return false;
        };
        session.state = SessionState::TimedOut;
        session.auth.revoke();
        info!(
            session_id = %session_id,
            idle_ms = now.saturating_duration_since(session.last_activity).as_millis() as u64,
            state = %session.state,
            "Session timed out"
        );
        session.state = SessionState::Closed;
        self.tombstones.insert(
            session_id.clone(),
            Tombstone {
                closed_at: now,
                reason: CloseReason::TimedOut,
            },
        );
        self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn end_session(&self, session_id: &SessionId, reason: CloseReason) -> bool {
        let Some((_, mut session)) = self.sessions.remove(session_id) else {
            return false;
        };
        session.state = SessionState::Closing;
        session.auth.revoke();
        session.state = SessionState::Closed;
        self.tombstones.insert(
            session_id.clone(),
            Tombstone {
                closed_at: Instant::now(),
                reason,
            },
        );
        self.stats.closed.fetch_add(1, Ordering::Relaxed);
        info!(
            session_id = %session_id,
            name = %session.name,
            reason = ?reason,
            "Session closed"
        );
        true
    }

    /// Returns why a remembered session ended.
    pub fn close_reason(&self, session_id: &SessionId) -> Option<CloseReason> {
        self.tombstones.get(session_id).map(|t| t.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNEL: ChannelId = 1;

    fn manager(timeout: Duration) -> SessionManager {
        SessionManager::new(
            SessionConfig::new(timeout, Duration::from_secs(1)),
            IdentityPolicy::new(true).with_user("operator", "secret"),
        )
    }

    fn create(m: &SessionManager) -> SessionId {
        m.create_session(
            CHANNEL,
            SecurityPair::none(),
            "test",
            &UserIdentity::Anonymous,
            Duration::ZERO,
        )
        .unwrap()
        .session_id
    }

    #[tokio::test]
    async fn test_create_session_is_active() {
        let m = manager(Duration::from_secs(60));
        let id = create(&m);
        let info = m.session(&id).unwrap();
        assert_eq!(info.state, SessionState::Active);
        assert_eq!(info.channel_id, Some(CHANNEL));
        assert_eq!(info.timeout, Duration::from_secs(60));
        assert!(m.begin_request(&id, CHANNEL).is_ok());
        assert_eq!(m.stats().created, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_authorization_lasts_one_idle_timeout() {
        let m = manager(Duration::from_secs(60));
        let id = create(&m);

        tokio::time::advance(Duration::from_secs(30)).await;
        let auth = m.begin_request(&id, CHANNEL).unwrap();
        let now = Instant::now();
        assert!(auth.is_valid_at((now + Duration::from_secs(59)).into_std()));
        assert!(!auth.is_valid_at((now + Duration::from_secs(60)).into_std()));

        let later = m.begin_request(&id, CHANNEL).unwrap();
        assert!(later.is_valid_at((now + Duration::from_secs(59)).into_std()));
    }

    #[tokio::test]
    async fn test_revised_timeout_capped() {
        let m = manager(Duration::from_secs(60));
        let created = m
            .create_session(
                CHANNEL,
                SecurityPair::none(),
                "t",
                &UserIdentity::Anonymous,
                Duration::from_secs(3600),
            )
            .unwrap();
        assert_eq!(created.revised_timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_identity_validation() {
        let m = SessionManager::new(
            SessionConfig::new(Duration::from_secs(60), Duration::from_secs(1)),
            IdentityPolicy::new(false).with_user("operator", "secret"),
        );
        let anon = m.create_session(
            CHANNEL,
            SecurityPair::none(),
            "t",
            &UserIdentity::Anonymous,
            Duration::ZERO,
        );
        assert_eq!(anon.unwrap_err(), StatusCode::BAD_IDENTITY_TOKEN_INVALID);

        let wrong = m.create_session(
            CHANNEL,
            SecurityPair::none(),
            "t",
            &UserIdentity::user_name("operator", "nope"),
            Duration::ZERO,
        );
        assert_eq!(wrong.unwrap_err(), StatusCode::BAD_IDENTITY_TOKEN_REJECTED);

        let ok = m.create_session(
            CHANNEL,
            SecurityPair::none(),
            "t",
            &UserIdentity::user_name("operator", "secret"),
            Duration::ZERO,
        );
        assert!(ok.is_ok());
        assert_eq!(m.stats().rejected_identity, 2);
    }

    #[tokio::test]
    async fn test_session_limit() {
        let m = SessionManager::new(
            SessionConfig::new(Duration::from_secs(60), Duration::from_secs(1)).with_max_sessions(1),
            IdentityPolicy::new(true),
        );
        create(&m);
        let second = m.create_session(
            CHANNEL,
            SecurityPair::none(),
            "t",
            &UserIdentity::Anonymous,
            Duration::ZERO,
        );
        assert_eq!(second.unwrap_err(), StatusCode::BAD_TOO_MANY_SESSIONS);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let m = manager(Duration::from_secs(60));
        let id = create(&m);
        assert!(m.close_session(&id, CHANNEL).is_ok());
        assert!(m.close_session(&id, CHANNEL).is_ok());
        assert_eq!(m.close_reason(&id), Some(CloseReason::Requested));
        assert_eq!(
            m.begin_request(&id, CHANNEL).unwrap_err(),
            StatusCode::BAD_SESSION_CLOSED
        );
        assert_eq!(
            m.close_session(&SessionId::from("never-existed"), CHANNEL).unwrap_err(),
            StatusCode::BAD_SESSION_ID_INVALID
        );
        assert_eq!(m.stats().closed, 1);
    }

    #[tokio::test]
    async fn test_close_requires_bound_channel() {
        let m = manager(Duration::from_secs(60));
        let id = create(&m);
        assert_eq!(
            m.close_session(&id, CHANNEL + 1).unwrap_err(),
            StatusCode::BAD_SECURE_CHANNEL_ID_INVALID
        );
        assert!(m.session(&id).is_some());
        assert_eq!(m.stats().closed, 0);

        m.close_session(&id, CHANNEL).unwrap();
        assert!(m.close_session(&id, CHANNEL + 1).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expires_idle_sessions() {
        let m = manager(Duration::from_secs(10));
        let idle = create(&m);
        let busy = create(&m);

        tokio::time::advance(Duration::from_secs(6)).await;
        m.begin_request(&busy, CHANNEL).unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(m.sweep(), 1);
        assert!(m.session(&idle).is_none());
        assert!(m.session(&busy).is_some());
        assert_eq!(
            m.begin_request(&idle, CHANNEL).unwrap_err(),
            StatusCode::BAD_SESSION_CLOSED
        );
        assert_eq!(m.close_reason(&idle), Some(CloseReason::TimedOut));
        assert_eq!(m.stats().timed_out, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_rejected_before_sweep() {
        let m = manager(Duration::from_secs(10));
        let id = create(&m);
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(
            m.begin_request(&id, CHANNEL).unwrap_err(),
            StatusCode::BAD_SESSION_CLOSED
        );
        assert!(m.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tombstones_are_forgotten() {
        let m = SessionManager::new(
            SessionConfig::new(Duration::from_secs(60), Duration::from_secs(1))
                .with_closed_retention(Duration::from_secs(30)),
            IdentityPolicy::new(true),
        );
        let id = create(&m);
        m.close_session(&id, CHANNEL).unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        m.sweep();
        assert_eq!(
            m.begin_request(&id, CHANNEL).unwrap_err(),
            StatusCode::BAD_SESSION_ID_INVALID
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweeper() {
        let m = Arc::new(manager(Duration::from_secs(2)));
        let (tx, rx) = broadcast::channel(1);
        let handle = m.spawn_sweeper(rx);
        let id = create(&m);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(m.session(&id).is_none());

        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_rebind_to_new_channel() {
        let m = manager(Duration::from_secs(60));
        let id = create(&m);

        assert_eq!(m.detach_channel(CHANNEL), 1);
        assert_eq!(
            m.begin_request(&id, CHANNEL).unwrap_err(),
            StatusCode::BAD_SECURE_CHANNEL_ID_INVALID
        );

        assert_eq!(
            m.activate_session(2, &id, &UserIdentity::user_name("operator", "secret"))
                .unwrap_err(),
            StatusCode::BAD_IDENTITY_TOKEN_REJECTED
        );
        m.activate_session(2, &id, &UserIdentity::Anonymous).unwrap();
        assert!(m.begin_request(&id, 2).is_ok());
        assert_eq!(m.stats().rebound, 1);
    }

    #[tokio::test]
    async fn test_close_all() {
        let m = manager(Duration::from_secs(60));
        create(&m);
        create(&m);
        assert_eq!(m.close_all(CloseReason::Shutdown), 2);
        assert!(m.is_empty());
    }

    #[test]
    fn test_identity_policy_debug_hides_passwords() {
        let policy = IdentityPolicy::new(true).with_user("operator", "secret");
        let debug = format!("{:?}", policy);
        assert!(debug.contains("operator"));
        assert!(!debug.contains("secret"));
    }
}
