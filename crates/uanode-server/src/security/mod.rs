// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Channel security: negotiation, certificate trust and PKI.
//!
//! ```text
//! SecurityNegotiator
//! └── CertificateValidator (StoreValidator)
//!     └── CertificateStore (FileSystemStore | MemoryStore)
//! ```

pub mod negotiator;
pub mod pki;
pub mod store;
pub mod validator;

pub use negotiator::{select, NegotiationOutcome, SecurityNegotiator};
pub use pki::{init_pki, CertificateSubject, PkiLayout, PkiReport};
pub use store::{thumbprint, CertificateStore, FileSystemStore, MemoryStore, TrustStatus};
pub use validator::{CertificateValidator, RejectReason, StoreValidator, ValidationOutcome};
