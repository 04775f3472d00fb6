// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node ids and initial values of the sample device.
//!
//! Both the server, which builds these nodes, and the client, which reads
//! and writes them, take the ids from here.

use crate::types::NodeId;

/// Browse name of the device object.
pub const DEVICE_NAME: &str = "MyDevice";

/// Initial Temperature value.
pub const INITIAL_TEMPERATURE: f64 = 25.0;

/// Initial Humidity value.
pub const INITIAL_HUMIDITY: f64 = 60.0;

/// Ids of the sample nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNodes {
    /// The device object.
    pub device: NodeId,
    /// Temperature variable.
    pub temperature: NodeId,
    /// Humidity variable.
    pub humidity: NodeId,
    /// Host name variable.
    pub host_name: NodeId,
    /// Uptime variable.
    pub uptime: NodeId,
    /// Load average variable.
    pub cpu_usage: NodeId,
}

impl DeviceNodes {
    /// Ids in namespace `ns`.
    pub fn in_namespace(ns: u16) -> Self {
        Self {
            device: NodeId::string(ns, DEVICE_NAME),
            temperature: NodeId::string(ns, "Temperature"),
            humidity: NodeId::string(ns, "Humidity"),
            host_name: NodeId::string(ns, "HostName"),
            uptime: NodeId::string(ns, "Uptime"),
            cpu_usage: NodeId::string(ns, "CPUUsage"),
        }
    }

    /// The five variables, in browse order.
    pub fn variables(&self) -> [NodeId; 5] {
        [
            self.temperature.clone(),
            self.humidity.clone(),
            self.host_name.clone(),
            self.uptime.clone(),
            self.cpu_usage.clone(),
        ]
    }
}

impl Default for DeviceNodes {
    fn default() -> Self {
        Self::in_namespace(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ids_match_wire_contract() {
        let nodes = DeviceNodes::default();
        assert_eq!(nodes.temperature.to_string(), "ns=1;s=Temperature");
        assert_eq!(nodes.cpu_usage.to_string(), "ns=1;s=CPUUsage");
        assert_eq!(nodes.variables()[2], NodeId::string(1, "HostName"));
    }
}
