// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Certificate trust storage.
//!
//! Certificates are keyed by their SHA-256 thumbprint. The store only
//! answers trust lookups; validity windows are checked by the validator.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::error::{ServerError, ServerResult};
use crate::security::pki::PkiLayout;

/// Returns the lowercase hex SHA-256 thumbprint of a DER certificate.
pub fn thumbprint(cert_der: &[u8]) -> String {
    hex::encode(Sha256::digest(cert_der))
}

// =============================================================================
// TrustStatus
// =============================================================================

/// Trust status of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrustStatus {
    /// Certificate is trusted.
    Trusted,
    /// Certificate has been explicitly rejected.
    Rejected,
    /// The store has never seen this certificate.
    #[default]
    Unknown,
}

impl TrustStatus {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trusted => "trusted",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TrustStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// CertificateStore Trait
// =============================================================================

/// Trust lookups and updates for peer certificates.
#[async_trait]
pub trait CertificateStore: Send + Sync + fmt::Debug {
    /// Returns the store name.
    fn name(&self) -> &str;

    /// Prepares the store (creates directories, loads the index).
    async fn initialize(&self) -> ServerResult<()>;

    /// Returns the trust status of a thumbprint.
    async fn trust_status(&self, thumbprint: &str) -> ServerResult<TrustStatus>;

    /// Adds a certificate with the given status and returns its thumbprint.
    async fn add(&self, cert_der: &[u8], status: TrustStatus) -> ServerResult<String>;

    /// Changes the status of a known certificate.
    async fn set_trust_status(&self, thumbprint: &str, status: TrustStatus) -> ServerResult<()>;

    /// Lists the thumbprints with a given status.
    async fn list_by_status(&self, status: TrustStatus) -> ServerResult<Vec<String>>;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory certificate store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, TrustStatus>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CertificateStore for MemoryStore {
    fn name(&self) -> &str {
        "MemoryStore"
    }

    async fn initialize(&self) -> ServerResult<()> {
        Ok(())
    }

    async fn trust_status(&self, thumbprint: &str) -> ServerResult<TrustStatus> {
        Ok(self
            .entries
            .read()
            .get(thumbprint)
            .copied()
            .unwrap_or_default())
    }

    async fn add(&self, cert_der: &[u8], status: TrustStatus) -> ServerResult<String> {
        let tp = thumbprint(cert_der);
        let mut entries = self.entries.write();
        if status == TrustStatus::Unknown {
            entries.remove(&tp);
        } else {
            entries.insert(tp.clone(), status);
        }
        Ok(tp)
    }

    async fn set_trust_status(&self, thumbprint: &str, status: TrustStatus) -> ServerResult<()> {
        let mut entries = self.entries.write();
        if !entries.contains_key(thumbprint) {
            return Err(ServerError::CertificateNotFound {
                thumbprint: thumbprint.to_string(),
            });
        }
        if status == TrustStatus::Unknown {
            entries.remove(thumbprint);
        } else {
            entries.insert(thumbprint.to_string(), status);
        }
        Ok(())
    }

    async fn list_by_status(&self, status: TrustStatus) -> ServerResult<Vec<String>> {
        let mut list: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(tp, _)| tp.clone())
            .collect();
        list.sort();
        Ok(list)
    }
}

// =============================================================================
// FileSystemStore
// =============================================================================

/// Filesystem-based certificate store.
///
/// Uses the PKI directory layout:
/// - `own/` - the application certificate and private key
/// - `trusted/` - trusted peer certificates
/// - `rejected/` - rejected certificates (for review)
/// - `issuers/` - CA certificates
///
/// Peer certificates are stored as `<thumbprint>.der`. Moving a file from
/// `rejected/` to `trusted/` by hand trusts it after the next
/// [`initialize`](CertificateStore::initialize).
#[derive(Debug)]
pub struct FileSystemStore {
    layout: PkiLayout,
    index: RwLock<HashMap<String, TrustStatus>>,
}

impl FileSystemStore {
    /// Creates a store rooted at `pki_dir`.
    pub fn new(pki_dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: PkiLayout::new(pki_dir),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the directory layout.
    pub fn layout(&self) -> &PkiLayout {
        &self.layout
    }

    fn dir_for(&self, status: TrustStatus) -> Option<&Path> {
        match status {
            TrustStatus::Trusted => Some(self.layout.trusted_dir()),
            TrustStatus::Rejected => Some(self.layout.rejected_dir()),
            TrustStatus::Unknown => None,
        }
    }

    fn cert_path(&self, thumbprint: &str, status: TrustStatus) -> Option<PathBuf> {
        self.dir_for(status)
            .map(|dir| dir.join(format!("{}.der", thumbprint)))
    }

    async fn scan(&self, status: TrustStatus) -> ServerResult<Vec<String>> {
        let Some(dir) = self.dir_for(status) else {
            return Ok(Vec::new());
        };
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| ServerError::store_io(dir, e))?;

        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ServerError::store_io(dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("der") {
                continue;
            }
            // Files copied in by hand may not be named after their thumbprint.
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| ServerError::store_io(&path, e))?;
            found.push(thumbprint(&bytes));
        }
        Ok(found)
    }
}

#[async_trait]
impl CertificateStore for FileSystemStore {
    fn name(&self) -> &str {
        "FileSystemStore"
    }

    async fn initialize(&self) -> ServerResult<()> {
        self.layout.ensure().await?;

        let trusted = self.scan(TrustStatus::Trusted).await?;
        let rejected = self.scan(TrustStatus::Rejected).await?;

        let mut index = self.index.write();
        index.clear();
        // A certificate present in both directories stays rejected.
        for tp in trusted {
            index.insert(tp, TrustStatus::Trusted);
        }
        for tp in rejected {
            index.insert(tp, TrustStatus::Rejected);
        }

        tracing::info!(
            pki_dir = %self.layout.root().display(),
            certificates = index.len(),
            "Initialized certificate store"
        );
        Ok(())
    }

    async fn trust_status(&self, thumbprint: &str) -> ServerResult<TrustStatus> {
        Ok(self
            .index
            .read()
            .get(thumbprint)
            .copied()
            .unwrap_or_default())
    }

    async fn add(&self, cert_der: &[u8], status: TrustStatus) -> ServerResult<String> {
        let tp = thumbprint(cert_der);
        let previous = self.trust_status(&tp).await?;

        if let Some(path) = self.cert_path(&tp, previous) {
            if previous != status {
                remove_if_exists(&path).await?;
            }
        }
        if let Some(path) = self.cert_path(&tp, status) {
            tokio::fs::write(&path, cert_der)
                .await
                .map_err(|e| ServerError::store_io(&path, e))?;
        }

        {
            let mut index = self.index.write();
            if status == TrustStatus::Unknown {
                index.remove(&tp);
            } else {
                index.insert(tp.clone(), status);
            }
        }

        tracing::info!(thumbprint = %tp, status = %status, "Added certificate to store");
        Ok(tp)
    }

    async fn set_trust_status(&self, thumbprint: &str, status: TrustStatus) -> ServerResult<()> {
        let current = self.trust_status(thumbprint).await?;
        let Some(old_path) = self.cert_path(thumbprint, current) else {
            return Err(ServerError::CertificateNotFound {
                thumbprint: thumbprint.to_string(),
            });
        };
        if current == status {
            return Ok(());
        }

        match self.cert_path(thumbprint, status) {
            Some(new_path) => tokio::fs::rename(&old_path, &new_path)
                .await
                .map_err(|e| ServerError::store_io(&new_path, e))?,
            None => remove_if_exists(&old_path).await?,
        }

        {
            let mut index = self.index.write();
            if status == TrustStatus::Unknown {
                index.remove(thumbprint);
            } else {
                index.insert(thumbprint.to_string(), status);
            }
        }

        tracing::info!(
            thumbprint = thumbprint,
            old_status = %current,
            new_status = %status,
            "Updated certificate trust status"
        );
        Ok(())
    }

    async fn list_by_status(&self, status: TrustStatus) -> ServerResult<Vec<String>> {
        let mut list: Vec<String> = self
            .index
            .read()
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(tp, _)| tp.clone())
            .collect();
        list.sort();
        Ok(list)
    }
}

async fn remove_if_exists(path: &Path) -> ServerResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ServerError::store_io(path, e)),
    }
}
