// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! PKI directory layout and application certificate generation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use uanode_core::protocol::PeerCertificate;

use crate::error::{ServerError, ServerResult};
use crate::security::store::thumbprint;

/// File name of the application certificate under `own/`.
pub const CERTIFICATE_FILE: &str = "cert.der";

/// File name of the certificate in PEM form under `own/`.
pub const CERTIFICATE_PEM_FILE: &str = "cert.pem";

/// File name of the private key under `own/`.
pub const PRIVATE_KEY_FILE: &str = "private_key.pem";

/// Validity of a generated application certificate, starting at midnight
/// UTC of the generation day.
pub const CERTIFICATE_VALIDITY_DAYS: i64 = 365;

// =============================================================================
// PkiLayout
// =============================================================================

/// Paths of the PKI directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkiLayout {
    root: PathBuf,
    own: PathBuf,
    trusted: PathBuf,
    rejected: PathBuf,
    issuers: PathBuf,
}

impl PkiLayout {
    /// Creates the layout for `root`; nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            own: root.join("own"),
            trusted: root.join("trusted"),
            rejected: root.join("rejected"),
            issuers: root.join("issuers"),
            root,
        }
    }

    /// PKI root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Own certificate and key.
    pub fn own_dir(&self) -> &Path {
        &self.own
    }

    /// Trusted peers.
    pub fn trusted_dir(&self) -> &Path {
        &self.trusted
    }

    /// Rejected peers.
    pub fn rejected_dir(&self) -> &Path {
        &self.rejected
    }

    /// Issuer certificates.
    pub fn issuers_dir(&self) -> &Path {
        &self.issuers
    }

    /// Path of the application certificate.
    pub fn certificate_path(&self) -> PathBuf {
        self.own.join(CERTIFICATE_FILE)
    }

    /// Path of the private key.
    pub fn private_key_path(&self) -> PathBuf {
        self.own.join(PRIVATE_KEY_FILE)
    }

    /// Loads the application certificate as a [`PeerCertificate`].
    ///
    /// Returns `None` if no certificate has been generated. The validity
    /// window is derived from the generation day, which is the file's
    /// modification date.
    pub async fn load_own_certificate(&self, subject: &str) -> ServerResult<Option<PeerCertificate>> {
        let path = self.certificate_path();
        let der = match tokio::fs::read(&path).await {
            Ok(der) => der,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ServerError::store_io(&path, e)),
        };
        let modified = tokio::fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .map_err(|e| ServerError::store_io(&path, e))?;

        let (not_before, not_after) = validity_window(DateTime::<Utc>::from(modified));
        Ok(Some(PeerCertificate {
            der,
            subject: subject.to_string(),
            not_before,
            not_after,
        }))
    }

    /// Creates every directory of the layout.
    pub async fn ensure(&self) -> ServerResult<()> {
        for dir in [&self.own, &self.trusted, &self.rejected, &self.issuers] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ServerError::store_io(dir, e))?;
        }
        Ok(())
    }
}

// =============================================================================
// Certificate generation
// =============================================================================

/// Identity written into a generated application certificate.
#[derive(Debug, Clone)]
pub struct CertificateSubject {
    /// Common name.
    pub common_name: String,
    /// Application URI, placed in the subject alternative names.
    pub application_uri: String,
    /// DNS names.
    pub hostnames: Vec<String>,
}

/// Outcome of [`init_pki`].
#[derive(Debug, Clone)]
pub struct PkiReport {
    /// Layout that was prepared.
    pub layout: PkiLayout,
    /// `true` if a new certificate was generated.
    pub generated: bool,
    /// SHA-256 thumbprint of the application certificate.
    pub thumbprint: String,
}

/// Creates the PKI layout and a self-signed application certificate if
/// none exists yet.
pub async fn init_pki(root: impl Into<PathBuf>, subject: &CertificateSubject) -> ServerResult<PkiReport> {
    let layout = PkiLayout::new(root);
    layout.ensure().await?;

    let cert_path = layout.certificate_path();
    if tokio::fs::try_exists(&cert_path)
        .await
        .map_err(|e| ServerError::store_io(&cert_path, e))?
    {
        let der = tokio::fs::read(&cert_path)
            .await
            .map_err(|e| ServerError::store_io(&cert_path, e))?;
        let tp = thumbprint(&der);
        tracing::info!(thumbprint = %tp, "Application certificate already present");
        return Ok(PkiReport {
            layout,
            generated: false,
            thumbprint: tp,
        });
    }

    let generated = generate_self_signed(subject)?;

    let pem_path = layout.own_dir().join(CERTIFICATE_PEM_FILE);
    let key_path = layout.private_key_path();
    tokio::fs::write(&cert_path, &generated.der)
        .await
        .map_err(|e| ServerError::store_io(&cert_path, e))?;
    tokio::fs::write(&pem_path, &generated.pem)
        .await
        .map_err(|e| ServerError::store_io(&pem_path, e))?;
    tokio::fs::write(&key_path, &generated.key_pem)
        .await
        .map_err(|e| ServerError::store_io(&key_path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&key_path, permissions).await.ok();
    }

    let tp = thumbprint(&generated.der);
    tracing::info!(
        thumbprint = %tp,
        subject = %subject.common_name,
        path = %cert_path.display(),
        "Generated application certificate"
    );

    Ok(PkiReport {
        layout,
        generated: true,
        thumbprint: tp,
    })
}

fn validity_window(generated_at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = generated_at.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(CERTIFICATE_VALIDITY_DAYS))
}

struct GeneratedCertificate {
    der: Vec<u8>,
    pem: String,
    key_pem: String,
}

fn generate_self_signed(subject: &CertificateSubject) -> ServerResult<GeneratedCertificate> {
    let mut params = rcgen::CertificateParams::new(subject.hostnames.clone())
        .map_err(|e| ServerError::generation(e.to_string()))?;
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, subject.common_name.clone());

    let uri = rcgen::Ia5String::try_from(subject.application_uri.clone())
        .map_err(|e| ServerError::generation(format!("invalid application URI: {}", e)))?;
    params.subject_alt_names.push(rcgen::SanType::URI(uri));

    let (not_before, not_after) = validity_window(Utc::now());
    params.not_before = rcgen::date_time_ymd(
        not_before.year(),
        not_before.month() as u8,
        not_before.day() as u8,
    );
    params.not_after = rcgen::date_time_ymd(not_after.year(), not_after.month() as u8, not_after.day() as u8);

    let key_pair = rcgen::KeyPair::generate().map_err(|e| ServerError::generation(e.to_string()))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| ServerError::generation(e.to_string()))?;

    Ok(GeneratedCertificate {
        der: cert.der().to_vec(),
        pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
    })
}
