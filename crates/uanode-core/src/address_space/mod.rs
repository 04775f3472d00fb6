// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address-space model.
//!
//! - [`NodeStore`]: nodes keyed by id in a tree rooted at the Objects folder
//! - [`ValueAccessor`]: the get/set capability of each Variable
//! - [`HostInfo`]: snapshot source for computed variables
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use uanode_core::address_space::{NodeStore, ReadWriteValue, VariableSpec};
//! use uanode_core::types::{AccessLevel, DataType, NodeId};
//! use uanode_core::variant::Variant;
//!
//! let mut store = NodeStore::new();
//! let ns = store.register_namespace("urn:example");
//! let device = store.add_object(&NodeId::objects_folder(), ns, "MyDevice").unwrap();
//! let temp = store
//!     .add_variable(
//!         &device,
//!         VariableSpec::new(
//!             NodeId::string(ns, "Temperature"),
//!             "Temperature",
//!             DataType::Double,
//!             Arc::new(ReadWriteValue::double(25.0)),
//!         )
//!         .access(AccessLevel::READ_WRITE),
//!     )
//!     .unwrap();
//!
//! assert!(store.write_value(&temp, &Variant::Double(26.0)).is_good());
//! assert_eq!(store.read_value(&temp).value, Some(Variant::Double(26.0)));
//! ```

mod accessor;
mod host;
mod node;
mod store;

pub use accessor::{
    ComputedValue, ReadOnlyValue, ReadWriteValue, SnapshotProjection, ValueAccessor, ValueRange,
};
pub use host::{FixedHostInfo, HostInfo, HostSnapshot, SystemHostInfo};
pub use node::{Node, ParentRef, ReferenceDescription, ReferenceType, VariableAttributes};
pub use store::{AddressSpaceError, NodeStore, VariableSpec, LOCAL_ACTOR};
