// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `init-pki` command.

use uanode_config::UaNodeConfig;

use crate::cli::InitPkiArgs;
use crate::error::BinResult;
use crate::runtime::certificate_subject;

/// Creates the PKI layout and the application certificate, then prints the
/// certificate thumbprint.
pub async fn init_pki(config: &UaNodeConfig, args: InitPkiArgs) -> BinResult<()> {
    let root = args
        .pki_dir
        .unwrap_or_else(|| config.security.pki_dir.clone());

    let mut subject = certificate_subject(config);
    for hostname in args.hostnames {
        if !subject.hostnames.contains(&hostname) {
            subject.hostnames.push(hostname);
        }
    }

    let report = uanode_server::security::init_pki(&root, &subject).await?;

    if report.generated {
        println!("Generated application certificate");
    } else {
        println!("Application certificate already present");
    }
    println!("  PKI directory: {}", report.layout.root().display());
    println!("  Certificate:   {}", report.layout.certificate_path().display());
    println!("  Subject:       {}", subject.common_name);
    println!("  DNS names:     {}", subject.hostnames.join(", "));
    println!("  Thumbprint:    {}", report.thumbprint);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_pki_uses_argument_dir() {
        let dir = TempDir::new().unwrap();
        let args = InitPkiArgs {
            pki_dir: Some(dir.path().join("custom")),
            hostnames: vec!["gateway.local".into()],
        };

        init_pki(&UaNodeConfig::default(), args).await.unwrap();
        assert!(dir.path().join("custom").join("own").join("cert.der").exists());
        assert!(dir.path().join("custom").join("rejected").is_dir());
    }
}
