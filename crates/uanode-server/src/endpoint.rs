// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Endpoint publication.

use uanode_config::UaNodeConfig;
use uanode_core::types::{ApplicationDescription, EndpointDescription};

/// Builds one endpoint description per configured security pair.
pub fn build_endpoints(config: &UaNodeConfig) -> Vec<EndpointDescription> {
    let url = config.endpoint_url();
    let server = application_description(config);

    config
        .security
        .endpoints
        .iter()
        .map(|pair| EndpointDescription {
            endpoint_url: url.clone(),
            security_mode: pair.mode,
            security_policy_uri: pair.policy.uri().to_string(),
            server: server.clone(),
        })
        .collect()
}

/// Application identity advertised with every endpoint.
pub fn application_description(config: &UaNodeConfig) -> ApplicationDescription {
    let server = &config.server;
    ApplicationDescription {
        application_uri: server.application_uri.clone(),
        product_uri: server.build_info.product_uri.clone(),
        application_name: server.application_name.clone(),
        product_name: server.build_info.product_name.clone(),
        build_number: server.build_info.build_number.clone(),
    }
}

/// Logs every endpoint at info level.
pub fn log_endpoints(endpoints: &[EndpointDescription]) {
    for endpoint in endpoints {
        tracing::info!(
            url = %endpoint.endpoint_url,
            mode = %endpoint.security_mode,
            policy = %endpoint.security_policy_uri,
            "Endpoint published"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uanode_core::types::{SecurityMode, SecurityPair, SecurityPolicy};

    #[test]
    fn test_one_endpoint_per_pair() {
        let mut config = UaNodeConfig::default();
        config.security.endpoints = vec![
            SecurityPair::none(),
            SecurityPair::new(SecurityMode::SignAndEncrypt, SecurityPolicy::Basic256Sha256),
        ];

        let endpoints = build_endpoints(&config);
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].endpoint_url, "opc.tcp://localhost:4334/UA/MyServer");
        assert_eq!(endpoints[1].security_pair(), Some(config.security.endpoints[1]));
        assert_eq!(endpoints[0].server.product_name, "MySampleServer");
    }
}
