// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The node store.
//!
//! A [`NodeStore`] is built once through `&mut self` calls and then shared
//! behind an `Arc`. After construction the node map is never mutated, so
//! lookups take no lock at all. Only variable values change, each behind the
//! lock owned by its accessor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::accessor::ValueAccessor;
use super::node::{Node, ParentRef, ReferenceDescription, ReferenceType, VariableAttributes};
use crate::status::StatusCode;
use crate::types::{AccessLevel, AttributeId, DataType, NodeId};
use crate::variant::{DataValue, Variant};

/// Actor name recorded for writes made without a session.
pub const LOCAL_ACTOR: &str = "local";

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while building the address space.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressSpaceError {
    /// The node id is already in use.
    #[error("Node id '{0}' already exists")]
    DuplicateNodeId(NodeId),

    /// The parent does not exist.
    #[error("Parent node '{0}' not found")]
    ParentNotFound(NodeId),

    /// Variables cannot have children.
    #[error("Parent node '{0}' is not an object")]
    ParentNotObject(NodeId),

    /// The accessor returns a value of another type than declared.
    #[error("Node '{node_id}' declares {declared} but its accessor returns {actual}")]
    TypeMismatch {
        /// Node being added.
        node_id: NodeId,
        /// Declared type.
        declared: DataType,
        /// Type returned by the accessor.
        actual: String,
    },

    /// The browse name is empty.
    #[error("Browse name must not be empty")]
    EmptyBrowseName,
}

// =============================================================================
// VariableSpec
// =============================================================================

/// Parameters for [`NodeStore::add_variable`].
#[derive(Debug, Clone)]
pub struct VariableSpec {
    node_id: NodeId,
    browse_name: String,
    data_type: DataType,
    access_level: AccessLevel,
    user_access_level: AccessLevel,
    minimum_sampling_interval: Duration,
    accessor: Arc<dyn ValueAccessor>,
}

impl VariableSpec {
    /// Creates a read-only variable spec with a zero sampling interval.
    pub fn new(
        node_id: NodeId,
        browse_name: impl Into<String>,
        data_type: DataType,
        accessor: Arc<dyn ValueAccessor>,
    ) -> Self {
        Self {
            node_id,
            browse_name: browse_name.into(),
            data_type,
            access_level: AccessLevel::READ_ONLY,
            user_access_level: AccessLevel::READ_ONLY,
            minimum_sampling_interval: Duration::ZERO,
            accessor,
        }
    }

    /// Sets both the current and the user access level.
    pub fn access(mut self, level: AccessLevel) -> Self {
        self.access_level = level;
        self.user_access_level = level;
        self
    }

    /// Sets the user access level alone.
    pub fn user_access(mut self, level: AccessLevel) -> Self {
        self.user_access_level = level;
        self
    }

    /// Sets the advisory minimum sampling interval.
    pub fn minimum_sampling_interval(mut self, interval: Duration) -> Self {
        self.minimum_sampling_interval = interval;
        self
    }
}

// =============================================================================
// NodeStore
// =============================================================================

/// The address space: nodes keyed by id, arranged as a tree under the
/// Objects folder.
#[derive(Debug)]
pub struct NodeStore {
    nodes: HashMap<NodeId, Node>,
    children: HashMap<NodeId, Vec<NodeId>>,
    namespaces: Vec<String>,
}

impl NodeStore {
    /// Creates a store holding the root folder and the Objects folder, with
    /// namespace 0 registered.
    pub fn new() -> Self {
        let mut store = Self {
            nodes: HashMap::new(),
            children: HashMap::new(),
            namespaces: vec!["http://opcfoundation.org/UA/".to_string()],
        };

        let root = NodeId::root_folder();
        store.insert(Node {
            node_id: root.clone(),
            browse_name: "Root".to_string(),
            display_name: "Root".to_string(),
            parent: None,
            is_folder: true,
            variable: None,
        });
        store.insert(Node {
            node_id: NodeId::objects_folder(),
            browse_name: "Objects".to_string(),
            display_name: "Objects".to_string(),
            parent: Some(ParentRef {
                node_id: root,
                reference_type: ReferenceType::Organizes,
            }),
            is_folder: true,
            variable: None,
        });
        store
    }

    /// Registers a namespace URI and returns its index. Registering the same
    /// URI twice returns the existing index.
    pub fn register_namespace(&mut self, uri: impl Into<String>) -> u16 {
        let uri = uri.into();
        if let Some(idx) = self.namespaces.iter().position(|ns| *ns == uri) {
            return idx as u16;
        }
        self.namespaces.push(uri);
        (self.namespaces.len() - 1) as u16
    }

    /// Returns the registered namespace URIs.
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Adds an object below `parent` with id `ns=<namespace>;s=<browse_name>`.
    pub fn add_object(
        &mut self,
        parent: &NodeId,
        namespace: u16,
        browse_name: impl Into<String>,
    ) -> Result<NodeId, AddressSpaceError> {
        let browse_name = browse_name.into();
        if browse_name.is_empty() {
            return Err(AddressSpaceError::EmptyBrowseName);
        }
        let node_id = NodeId::string(namespace, browse_name.clone());
        let parent = self.parent_ref(parent, &node_id)?;

        self.insert(Node {
            node_id: node_id.clone(),
            display_name: browse_name.clone(),
            browse_name,
            parent: Some(parent),
            is_folder: false,
            variable: None,
        });
        tracing::debug!(node_id = %node_id, "Object added");
        Ok(node_id)
    }

    /// Adds a variable below `parent`.
    ///
    /// Fails if the id is taken, the parent is missing or is a variable, or
    /// the accessor's current value does not carry the declared type.
    pub fn add_variable(
        &mut self,
        parent: &NodeId,
        spec: VariableSpec,
    ) -> Result<NodeId, AddressSpaceError> {
        if spec.browse_name.is_empty() {
            return Err(AddressSpaceError::EmptyBrowseName);
        }
        let node_id = spec.node_id;
        let parent = self.parent_ref(parent, &node_id)?;

        if let Some(value) = spec.accessor.get().value {
            if value.data_type() != Some(spec.data_type) {
                return Err(AddressSpaceError::TypeMismatch {
                    node_id,
                    declared: spec.data_type,
                    actual: value
                        .data_type()
                        .map_or_else(|| "an empty value".to_string(), |t| t.to_string()),
                });
            }
        }

        self.insert(Node {
            node_id: node_id.clone(),
            display_name: spec.browse_name.clone(),
            browse_name: spec.browse_name,
            parent: Some(parent),
            is_folder: false,
            variable: Some(VariableAttributes {
                data_type: spec.data_type,
                access_level: spec.access_level,
                user_access_level: spec.user_access_level,
                minimum_sampling_interval: spec.minimum_sampling_interval,
                accessor: spec.accessor,
            }),
        });
        tracing::debug!(node_id = %node_id, data_type = %spec.data_type, "Variable added");
        Ok(node_id)
    }

    fn parent_ref(
        &self,
        parent: &NodeId,
        child: &NodeId,
    ) -> Result<ParentRef, AddressSpaceError> {
        if self.nodes.contains_key(child) {
            return Err(AddressSpaceError::DuplicateNodeId(child.clone()));
        }
        let parent_node = self
            .nodes
            .get(parent)
            .ok_or_else(|| AddressSpaceError::ParentNotFound(parent.clone()))?;
        if parent_node.variable.is_some() {
            return Err(AddressSpaceError::ParentNotObject(parent.clone()));
        }
        let reference_type = if parent_node.is_folder {
            ReferenceType::Organizes
        } else {
            ReferenceType::HasComponent
        };
        Ok(ParentRef {
            node_id: parent.clone(),
            reference_type,
        })
    }

    fn insert(&mut self, node: Node) {
        if let Some(parent) = &node.parent {
            self.children
                .entry(parent.node_id.clone())
                .or_default()
                .push(node.node_id.clone());
        }
        self.nodes.insert(node.node_id.clone(), node);
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Looks up a node.
    pub fn resolve(&self, node_id: &NodeId) -> Result<&Node, StatusCode> {
        self.nodes
            .get(node_id)
            .ok_or(StatusCode::BAD_NODE_ID_UNKNOWN)
    }

    /// Returns the number of nodes, including the two folders.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the store holds no nodes. Never the case after
    /// [`NodeStore::new`].
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all variable nodes.
    pub fn variables(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.variable.is_some())
    }

    /// Returns the child references of a node, in insertion order.
    pub fn browse(&self, node_id: &NodeId) -> Result<Vec<ReferenceDescription>, StatusCode> {
        self.resolve(node_id)?;
        let refs = self
            .children
            .get(node_id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.nodes.get(child))
            .filter_map(|child| {
                child.parent.as_ref().map(|p| ReferenceDescription {
                    reference_type: p.reference_type,
                    node_id: child.node_id.clone(),
                    browse_name: child.browse_name.clone(),
                    node_class: child.node_class(),
                })
            })
            .collect();
        Ok(refs)
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Reads the Value attribute.
    ///
    /// Returns `BadNodeIdUnknown` for unknown ids and `BadAttributeIdInvalid`
    /// for objects.
    pub fn read_value(&self, node_id: &NodeId) -> DataValue {
        match self.resolve(node_id) {
            Ok(node) => match &node.variable {
                Some(var) => var.accessor.get(),
                None => DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
            },
            Err(status) => DataValue::bad(status),
        }
    }

    /// Reads any supported attribute.
    pub fn read_attribute(&self, node_id: &NodeId, attribute: AttributeId) -> DataValue {
        let node = match self.resolve(node_id) {
            Ok(node) => node,
            Err(status) => return DataValue::bad(status),
        };

        let common = match attribute {
            AttributeId::VALUE => return self.read_value(node_id),
            AttributeId::NODE_ID => Some(Variant::String(node.node_id.to_string())),
            AttributeId::NODE_CLASS => Some(Variant::Int32(node.node_class().value() as i32)),
            AttributeId::BROWSE_NAME => Some(Variant::String(node.browse_name.clone())),
            AttributeId::DISPLAY_NAME => Some(Variant::String(node.display_name.clone())),
            _ => None,
        };
        if let Some(value) = common {
            return DataValue::good(value);
        }

        let Some(var) = &node.variable else {
            return DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID);
        };
        let value = match attribute {
            AttributeId::DATA_TYPE => {
                Variant::String(NodeId::numeric(0, var.data_type.type_id()).to_string())
            }
            AttributeId::ACCESS_LEVEL => Variant::Byte(var.access_level.bits()),
            AttributeId::USER_ACCESS_LEVEL => Variant::Byte(var.user_access_level.bits()),
            AttributeId::MINIMUM_SAMPLING_INTERVAL => {
                Variant::Double(var.minimum_sampling_interval.as_millis() as f64)
            }
            _ => return DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
        };
        DataValue::good(value)
    }

    /// Writes the Value attribute on behalf of [`LOCAL_ACTOR`].
    pub fn write_value(&self, node_id: &NodeId, value: &Variant) -> StatusCode {
        self.write_value_as(LOCAL_ACTOR, node_id, value)
    }

    /// Writes the Value attribute and records an audit entry for `actor`.
    ///
    /// Returns `BadNotWritable` when no setter is bound or the access level
    /// forbids writing. Coercion failures come back as `BadTypeMismatch` or
    /// `BadOutOfRange` and leave the stored value unchanged.
    pub fn write_value_as(&self, actor: &str, node_id: &NodeId, value: &Variant) -> StatusCode {
        let status = match self.resolve(node_id) {
            Ok(node) => match &node.variable {
                Some(var) if !var.accessor.is_settable() || !var.access_level.can_write() => {
                    StatusCode::BAD_NOT_WRITABLE
                }
                Some(var) => var.accessor.set(value),
                None => StatusCode::BAD_ATTRIBUTE_ID_INVALID,
            },
            Err(status) => status,
        };

        if status.is_good() {
            tracing::info!(
                target: "uanode::audit",
                actor,
                node_id = %node_id,
                value = %value,
                "Value written"
            );
        } else {
            tracing::debug!(
                target: "uanode::audit",
                actor,
                node_id = %node_id,
                status = %status,
                "Value write rejected"
            );
        }
        status
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}
