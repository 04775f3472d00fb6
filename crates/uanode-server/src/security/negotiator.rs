// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Security mode and policy negotiation.

use std::sync::Arc;

use uanode_core::protocol::PeerCertificate;
use uanode_core::status::StatusCode;
use uanode_core::types::SecurityPair;

use crate::security::validator::{CertificateValidator, ValidationOutcome};

/// Result of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// The requested pair is in use.
    Selected(SecurityPair),
    /// The channel must be refused with this status.
    Rejected(StatusCode),
}

impl NegotiationOutcome {
    /// Returns the selected pair, if any.
    pub fn selected(&self) -> Option<SecurityPair> {
        match self {
            Self::Selected(pair) => Some(*pair),
            Self::Rejected(_) => None,
        }
    }
}

/// Returns the advertised pair equal to `requested`, if any.
///
/// There is no closest-match fallback.
pub fn select(requested: SecurityPair, advertised: &[SecurityPair]) -> Option<SecurityPair> {
    advertised.iter().copied().find(|pair| *pair == requested)
}

/// Selects a security pair and validates the peer certificate.
#[derive(Debug, Clone)]
pub struct SecurityNegotiator {
    advertised: Vec<SecurityPair>,
    validator: Arc<dyn CertificateValidator>,
}

impl SecurityNegotiator {
    /// Creates a negotiator for the advertised pairs.
    pub fn new(advertised: Vec<SecurityPair>, validator: Arc<dyn CertificateValidator>) -> Self {
        Self {
            advertised,
            validator,
        }
    }

    /// Returns the advertised pairs.
    pub fn advertised(&self) -> &[SecurityPair] {
        &self.advertised
    }

    /// Negotiates the pair requested by a client.
    ///
    /// An unadvertised pair yields `BadSecurityPolicyRejected` whichever half
    /// of it is wrong. A signing mode needs a certificate that passes
    /// validation, otherwise `BadCertificateInvalid`.
    pub async fn negotiate(
        &self,
        requested: SecurityPair,
        certificate: Option<&PeerCertificate>,
    ) -> NegotiationOutcome {
        let Some(selected) = select(requested, &self.advertised) else {
            tracing::warn!(
                mode = %requested.mode,
                policy = %requested.policy,
                "Security negotiation rejected"
            );
            return NegotiationOutcome::Rejected(StatusCode::BAD_SECURITY_POLICY_REJECTED);
        };

        if selected.policy.is_none() || !selected.mode.requires_certificate() {
            return NegotiationOutcome::Selected(selected);
        }

        let Some(cert) = certificate else {
            tracing::warn!(
                mode = %selected.mode,
                policy = %selected.policy,
                "Security negotiation rejected: no client certificate"
            );
            return NegotiationOutcome::Rejected(StatusCode::BAD_CERTIFICATE_INVALID);
        };

        match self.validator.validate(cert).await {
            Ok(ValidationOutcome::Accepted { thumbprint, .. }) => {
                tracing::debug!(
                    thumbprint = %thumbprint,
                    security = %selected,
                    "Client certificate accepted"
                );
                NegotiationOutcome::Selected(selected)
            }
            Ok(ValidationOutcome::Rejected { .. }) => {
                NegotiationOutcome::Rejected(StatusCode::BAD_CERTIFICATE_INVALID)
            }
            Err(e) => {
                tracing::error!(error = %e, "Certificate store lookup failed");
                NegotiationOutcome::Rejected(StatusCode::BAD_CERTIFICATE_INVALID)
            }
        }
    }
}
