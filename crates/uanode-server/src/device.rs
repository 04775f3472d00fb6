// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The sample device address space.
//!
//! ```text
//! Objects (ns=0;i=85)
//! └── MyDevice (ns=1;s=MyDevice)
//!     ├── Temperature  Double  RW
//!     ├── Humidity     Double  RW
//!     ├── HostName     String  RO, computed
//!     ├── Uptime       UInt32  RO, computed
//!     └── CPUUsage     Double  RO, computed
//! ```

use std::sync::Arc;
use std::time::Duration;

use uanode_config::VariableRanges;
use uanode_core::address_space::{
    AddressSpaceError, ComputedValue, HostInfo, NodeStore, ReadWriteValue, VariableSpec,
};
use uanode_core::device::{DEVICE_NAME, INITIAL_HUMIDITY, INITIAL_TEMPERATURE};
use uanode_core::types::{AccessLevel, DataType, NodeId};

pub use uanode_core::device::DeviceNodes;

const FAST_SAMPLING: Duration = Duration::from_millis(100);
const SLOW_SAMPLING: Duration = Duration::from_millis(1000);

/// Builds the address space holding the sample device.
///
/// `namespace_uri` is registered first, so the device lives in namespace 1.
pub fn build_address_space(
    namespace_uri: &str,
    ranges: &VariableRanges,
    host: Arc<dyn HostInfo>,
) -> Result<(NodeStore, DeviceNodes), AddressSpaceError> {
    let mut store = NodeStore::new();
    let ns = store.register_namespace(namespace_uri);
    let nodes = DeviceNodes::in_namespace(ns);

    let device = store.add_object(&NodeId::objects_folder(), ns, DEVICE_NAME)?;

    store.add_variable(
        &device,
        VariableSpec::new(
            nodes.temperature.clone(),
            "Temperature",
            DataType::Double,
            Arc::new(ReadWriteValue::double(INITIAL_TEMPERATURE).with_range(ranges.temperature)),
        )
        .access(AccessLevel::READ_WRITE)
        .minimum_sampling_interval(FAST_SAMPLING),
    )?;
    store.add_variable(
        &device,
        VariableSpec::new(
            nodes.humidity.clone(),
            "Humidity",
            DataType::Double,
            Arc::new(ReadWriteValue::double(INITIAL_HUMIDITY).with_range(ranges.humidity)),
        )
        .access(AccessLevel::READ_WRITE)
        .minimum_sampling_interval(FAST_SAMPLING),
    )?;
    store.add_variable(
        &device,
        VariableSpec::new(
            nodes.host_name.clone(),
            "HostName",
            DataType::String,
            Arc::new(ComputedValue::hostname(Arc::clone(&host))),
        )
        .minimum_sampling_interval(SLOW_SAMPLING),
    )?;
    store.add_variable(
        &device,
        VariableSpec::new(
            nodes.uptime.clone(),
            "Uptime",
            DataType::UInt32,
            Arc::new(ComputedValue::uptime_seconds(Arc::clone(&host))),
        )
        .minimum_sampling_interval(FAST_SAMPLING),
    )?;
    store.add_variable(
        &device,
        VariableSpec::new(
            nodes.cpu_usage.clone(),
            "CPUUsage",
            DataType::Double,
            Arc::new(ComputedValue::load_average(host)),
        )
        .minimum_sampling_interval(FAST_SAMPLING),
    )?;

    tracing::debug!(
        namespace = ns,
        nodes = store.len(),
        "Sample device address space built"
    );
    Ok((store, nodes))
}
