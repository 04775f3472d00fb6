// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Peer certificate validation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uanode_core::protocol::PeerCertificate;

use crate::error::ServerResult;
use crate::security::store::{thumbprint, CertificateStore, TrustStatus};

// =============================================================================
// ValidationOutcome
// =============================================================================

/// Why a certificate was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Listed in the rejected set.
    Rejected,
    /// `not_after` is in the past.
    Expired,
    /// `not_before` is in the future.
    NotYetValid,
    /// Unknown and unknown certificates are not accepted.
    Untrusted,
}

impl RejectReason {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::Untrusted => "untrusted",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict on a peer certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The certificate may be used.
    Accepted {
        /// SHA-256 thumbprint.
        thumbprint: String,
        /// `true` if the certificate was unknown and has just been trusted.
        auto_trusted: bool,
    },
    /// The certificate must not be used.
    Rejected {
        /// SHA-256 thumbprint.
        thumbprint: String,
        /// Reason, for logs only.
        reason: RejectReason,
    },
}

impl ValidationOutcome {
    /// Returns `true` for [`ValidationOutcome::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

// =============================================================================
// CertificateValidator Trait
// =============================================================================

/// Decides whether a peer certificate may be used.
#[async_trait]
pub trait CertificateValidator: Send + Sync + fmt::Debug {
    /// Validates `cert` at `now`.
    async fn validate_at(
        &self,
        cert: &PeerCertificate,
        now: DateTime<Utc>,
    ) -> ServerResult<ValidationOutcome>;

    /// Validates `cert` at the current time.
    async fn validate(&self, cert: &PeerCertificate) -> ServerResult<ValidationOutcome> {
        self.validate_at(cert, Utc::now()).await
    }
}

// =============================================================================
// StoreValidator
// =============================================================================

/// Validator backed by a [`CertificateStore`].
///
/// Checks run in this order: explicit rejection, validity window, trust.
/// With `reject_unauthorized` off, an unknown certificate that passes the
/// first two checks is added to the trusted set. With it on, the
/// certificate is filed under rejected for review.
#[derive(Debug)]
pub struct StoreValidator {
    store: Arc<dyn CertificateStore>,
    reject_unauthorized: bool,
}

impl StoreValidator {
    /// Creates a validator.
    pub fn new(store: Arc<dyn CertificateStore>, reject_unauthorized: bool) -> Self {
        Self {
            store,
            reject_unauthorized,
        }
    }

    /// Returns the backing store.
    pub fn store(&self) -> &Arc<dyn CertificateStore> {
        &self.store
    }

    fn reject(thumbprint: String, reason: RejectReason, subject: &str) -> ValidationOutcome {
        tracing::warn!(
            thumbprint = %thumbprint,
            subject = subject,
            reason = %reason,
            "Peer certificate rejected"
        );
        ValidationOutcome::Rejected { thumbprint, reason }
    }
}

#[async_trait]
impl CertificateValidator for StoreValidator {
    async fn validate_at(
        &self,
        cert: &PeerCertificate,
        now: DateTime<Utc>,
    ) -> ServerResult<ValidationOutcome> {
        let tp = thumbprint(&cert.der);
        let status = self.store.trust_status(&tp).await?;

        if status == TrustStatus::Rejected {
            return Ok(Self::reject(tp, RejectReason::Rejected, &cert.subject));
        }
        if now < cert.not_before {
            return Ok(Self::reject(tp, RejectReason::NotYetValid, &cert.subject));
        }
        if now > cert.not_after {
            return Ok(Self::reject(tp, RejectReason::Expired, &cert.subject));
        }

        match status {
            TrustStatus::Trusted => Ok(ValidationOutcome::Accepted {
                thumbprint: tp,
                auto_trusted: false,
            }),
            _ if self.reject_unauthorized => {
                self.store.add(&cert.der, TrustStatus::Rejected).await?;
                Ok(Self::reject(tp, RejectReason::Untrusted, &cert.subject))
            }
            _ => {
                self.store.add(&cert.der, TrustStatus::Trusted).await?;
                tracing::info!(
                    thumbprint = %tp,
                    subject = %cert.subject,
                    "Auto-trusted unknown peer certificate"
                );
                Ok(ValidationOutcome::Accepted {
                    thumbprint: tp,
                    auto_trusted: true,
                })
            }
        }
    }
}
