// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-operation access decisions.
//!
//! [`AccessController::check_access`] is a pure function of the session's
//! authorization, the node and the operation. It does not consult the
//! node's setter; the node store applies that check separately, and both
//! must pass for a write to succeed.

use std::fmt;
use std::time::Instant;

use crate::address_space::Node;
use crate::status::StatusCode;

/// Operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessOperation {
    /// Read an attribute.
    Read,
    /// Write the Value attribute.
    Write,
}

impl fmt::Display for AccessOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Why an operation was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    /// The session never established an authorization context.
    NotAuthorized,
    /// The authorization context has expired.
    AuthorizationExpired,
    /// Anonymous access is disabled on this server.
    AnonymousDisabled,
    /// The node's current access level forbids reading.
    NotReadable,
    /// The node's current access level forbids writing.
    NotWritable,
    /// The node's user access level forbids the operation.
    UserAccessDenied,
}

impl DenyReason {
    /// Item status reported for this denial.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthorized | Self::AuthorizationExpired | Self::UserAccessDenied => {
                StatusCode::BAD_USER_ACCESS_DENIED
            }
            Self::AnonymousDisabled => StatusCode::BAD_IDENTITY_TOKEN_INVALID,
            Self::NotReadable => StatusCode::BAD_NOT_READABLE,
            Self::NotWritable => StatusCode::BAD_NOT_WRITABLE,
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotAuthorized => "no authorization established",
            Self::AuthorizationExpired => "authorization expired",
            Self::AnonymousDisabled => "anonymous access disabled",
            Self::NotReadable => "node is not readable",
            Self::NotWritable => "node is not writable",
            Self::UserAccessDenied => "user access level denies operation",
        };
        f.write_str(text)
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The operation may proceed.
    Allowed,
    /// The operation is denied.
    Denied(DenyReason),
}

impl AccessDecision {
    /// Returns `true` if allowed.
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Authorization state owned by one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationContext {
    anonymous: bool,
    established: bool,
    valid_until: Option<Instant>,
}

impl AuthorizationContext {
    /// A context that was never established.
    pub fn none() -> Self {
        Self {
            anonymous: true,
            established: false,
            valid_until: None,
        }
    }

    /// An established anonymous context.
    pub fn anonymous() -> Self {
        Self {
            anonymous: true,
            established: true,
            valid_until: None,
        }
    }

    /// An established authenticated context.
    pub fn authenticated() -> Self {
        Self {
            anonymous: false,
            established: true,
            valid_until: None,
        }
    }

    /// Limits validity to `deadline`.
    pub fn valid_until(mut self, deadline: Instant) -> Self {
        self.valid_until = Some(deadline);
        self
    }

    /// Marks the context as revoked.
    pub fn revoke(&mut self) {
        self.established = false;
    }

    /// Returns `true` for anonymous identities.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Returns `true` if established and not expired at `now`.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        self.established && self.valid_until.map_or(true, |deadline| now < deadline)
    }
}

/// Evaluates access flags and session authorization.
#[derive(Debug, Clone, Copy)]
pub struct AccessController {
    allow_anonymous: bool,
}

impl AccessController {
    /// Creates a controller.
    pub const fn new(allow_anonymous: bool) -> Self {
        Self { allow_anonymous }
    }

    /// Returns whether anonymous sessions are accepted.
    pub const fn allow_anonymous(&self) -> bool {
        self.allow_anonymous
    }

    /// Decides whether `operation` on `node` is permitted at `now`.
    pub fn check_access(
        &self,
        auth: &AuthorizationContext,
        node: &Node,
        operation: AccessOperation,
        now: Instant,
    ) -> AccessDecision {
        if !auth.established {
            return AccessDecision::Denied(DenyReason::NotAuthorized);
        }
        if !auth.is_valid_at(now) {
            return AccessDecision::Denied(DenyReason::AuthorizationExpired);
        }
        if auth.anonymous && !self.allow_anonymous {
            return AccessDecision::Denied(DenyReason::AnonymousDisabled);
        }

        let Some(var) = node.variable() else {
            return match operation {
                AccessOperation::Read => AccessDecision::Allowed,
                AccessOperation::Write => AccessDecision::Denied(DenyReason::NotWritable),
            };
        };

        let (current, user) = match operation {
            AccessOperation::Read => (var.access_level.can_read(), var.user_access_level.can_read()),
            AccessOperation::Write => (
                var.access_level.can_write(),
                var.user_access_level.can_write(),
            ),
        };

        match (current, user, operation) {
            (true, true, _) => AccessDecision::Allowed,
            (false, _, AccessOperation::Read) => AccessDecision::Denied(DenyReason::NotReadable),
            (false, _, AccessOperation::Write) => AccessDecision::Denied(DenyReason::NotWritable),
            (true, false, _) => AccessDecision::Denied(DenyReason::UserAccessDenied),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_space::{NodeStore, ReadOnlyValue, ReadWriteValue, VariableSpec};
    use crate::types::{AccessLevel, DataType, NodeId};
    use std::sync::Arc;
    use std::time::Duration;

    fn store() -> NodeStore {
        let mut store = NodeStore::new();
        let objects = NodeId::objects_folder();
        store
            .add_variable(
                &objects,
                VariableSpec::new(
                    NodeId::string(1, "Rw"),
                    "Rw",
                    DataType::Double,
                    Arc::new(ReadWriteValue::double(0.0)),
                )
                .access(AccessLevel::READ_WRITE),
            )
            .unwrap();
        store
            .add_variable(
                &objects,
                VariableSpec::new(
                    NodeId::string(1, "Ro"),
                    "Ro",
                    DataType::String,
                    Arc::new(ReadOnlyValue::new("x")),
                ),
            )
            .unwrap();
        store
            .add_variable(
                &objects,
                VariableSpec::new(
                    NodeId::string(1, "UserRo"),
                    "UserRo",
                    DataType::Double,
                    Arc::new(ReadWriteValue::double(0.0)),
                )
                .access(AccessLevel::READ_WRITE)
                .user_access(AccessLevel::READ_ONLY),
            )
            .unwrap();
        store
            .add_variable(
                &objects,
                VariableSpec::new(
                    NodeId::string(1, "Hidden"),
                    "Hidden",
                    DataType::Double,
                    Arc::new(ReadWriteValue::double(0.0)),
                )
                .access(AccessLevel::NONE),
            )
            .unwrap();
        store
    }

    fn node<'a>(store: &'a NodeStore, name: &str) -> &'a Node {
        store.resolve(&NodeId::string(1, name)).unwrap()
    }

    #[test]
    fn test_read_write_allowed() {
        let store = store();
        let ac = AccessController::new(true);
        let auth = AuthorizationContext::anonymous();
        let now = Instant::now();
        assert!(ac
            .check_access(&auth, node(&store, "Rw"), AccessOperation::Read, now)
            .is_allowed());
        assert!(ac
            .check_access(&auth, node(&store, "Rw"), AccessOperation::Write, now)
            .is_allowed());
    }

    #[test]
    fn test_write_denied_on_read_only() {
        let store = store();
        let ac = AccessController::new(true);
        let decision = ac.check_access(
            &AuthorizationContext::anonymous(),
            node(&store, "Ro"),
            AccessOperation::Write,
            Instant::now(),
        );
        assert_eq!(decision, AccessDecision::Denied(DenyReason::NotWritable));
        assert_eq!(DenyReason::NotWritable.status_code(), StatusCode::BAD_NOT_WRITABLE);
    }

    #[test]
    fn test_user_access_level_applies() {
        let store = store();
        let ac = AccessController::new(true);
        let auth = AuthorizationContext::authenticated();
        let now = Instant::now();
        assert!(ac
            .check_access(&auth, node(&store, "UserRo"), AccessOperation::Read, now)
            .is_allowed());
        assert_eq!(
            ac.check_access(&auth, node(&store, "UserRo"), AccessOperation::Write, now),
            AccessDecision::Denied(DenyReason::UserAccessDenied)
        );
        assert_eq!(
            ac.check_access(&auth, node(&store, "Hidden"), AccessOperation::Read, now),
            AccessDecision::Denied(DenyReason::NotReadable)
        );
    }

    #[test]
    fn test_unestablished_session_denied() {
        let store = store();
        let ac = AccessController::new(true);
        assert_eq!(
            ac.check_access(
                &AuthorizationContext::none(),
                node(&store, "Rw"),
                AccessOperation::Read,
                Instant::now()
            ),
            AccessDecision::Denied(DenyReason::NotAuthorized)
        );
    }

    #[test]
    fn test_revoked_session_denied() {
        let store = store();
        let ac = AccessController::new(true);
        let mut auth = AuthorizationContext::authenticated();
        auth.revoke();
        assert_eq!(
            ac.check_access(&auth, node(&store, "Rw"), AccessOperation::Read, Instant::now()),
            AccessDecision::Denied(DenyReason::NotAuthorized)
        );
    }

    #[test]
    fn test_expired_authorization_denied() {
        let store = store();
        let ac = AccessController::new(true);
        let start = Instant::now();
        let auth = AuthorizationContext::authenticated().valid_until(start + Duration::from_secs(10));
        assert!(ac
            .check_access(&auth, node(&store, "Rw"), AccessOperation::Read, start)
            .is_allowed());
        assert_eq!(
            ac.check_access(
                &auth,
                node(&store, "Rw"),
                AccessOperation::Read,
                start + Duration::from_secs(10)
            ),
            AccessDecision::Denied(DenyReason::AuthorizationExpired)
        );
    }

    #[test]
    fn test_anonymous_disabled() {
        let store = store();
        let ac = AccessController::new(false);
        let now = Instant::now();
        assert_eq!(
            ac.check_access(
                &AuthorizationContext::anonymous(),
                node(&store, "Rw"),
                AccessOperation::Read,
                now
            ),
            AccessDecision::Denied(DenyReason::AnonymousDisabled)
        );
        assert!(ac
            .check_access(
                &AuthorizationContext::authenticated(),
                node(&store, "Rw"),
                AccessOperation::Read,
                now
            )
            .is_allowed());
    }

    #[test]
    fn test_object_nodes() {
        let store = store();
        let ac = AccessController::new(true);
        let objects = store.resolve(&NodeId::objects_folder()).unwrap();
        let auth = AuthorizationContext::anonymous();
        let now = Instant::now();
        assert!(ac
            .check_access(&auth, objects, AccessOperation::Read, now)
            .is_allowed());
        assert!(!ac
            .check_access(&auth, objects, AccessOperation::Write, now)
            .is_allowed());
    }

    #[test]
    fn test_check_is_pure() {
        let store = store();
        let ac = AccessController::new(true);
        let auth = AuthorizationContext::anonymous();
        let now = Instant::now();
        let first = ac.check_access(&auth, node(&store, "Ro"), AccessOperation::Write, now);
        let second = ac.check_access(&auth, node(&store, "Ro"), AccessOperation::Write, now);
        assert_eq!(first, second);
        assert_eq!(auth, AuthorizationContext::anonymous());
    }
}
