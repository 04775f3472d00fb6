// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address-space nodes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::accessor::ValueAccessor;
use crate::types::{AccessLevel, DataType, NodeClass, NodeId};

/// Hierarchical reference from a parent to a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceType {
    /// The parent is a folder that organizes the child.
    Organizes,
    /// The child is a component of the parent object.
    HasComponent,
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organizes => f.write_str("Organizes"),
            Self::HasComponent => f.write_str("HasComponent"),
        }
    }
}

/// The single parent relation of a non-root node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    /// Parent node.
    pub node_id: NodeId,
    /// Relation from parent to child.
    pub reference_type: ReferenceType,
}

/// Variable-specific attributes.
#[derive(Debug, Clone)]
pub struct VariableAttributes {
    /// Declared type of the value.
    pub data_type: DataType,
    /// Current access level.
    pub access_level: AccessLevel,
    /// User access level.
    pub user_access_level: AccessLevel,
    /// Advisory minimum sampling interval.
    pub minimum_sampling_interval: Duration,
    /// Value accessor.
    pub accessor: Arc<dyn ValueAccessor>,
}

/// A node in the address space.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) node_id: NodeId,
    pub(crate) browse_name: String,
    pub(crate) display_name: String,
    pub(crate) parent: Option<ParentRef>,
    pub(crate) is_folder: bool,
    pub(crate) variable: Option<VariableAttributes>,
}

impl Node {
    /// Returns the node id.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Returns the browse name.
    pub fn browse_name(&self) -> &str {
        &self.browse_name
    }

    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the node class.
    pub fn node_class(&self) -> NodeClass {
        if self.variable.is_some() {
            NodeClass::Variable
        } else {
            NodeClass::Object
        }
    }

    /// Returns the parent relation, `None` for the root folder.
    pub fn parent(&self) -> Option<&ParentRef> {
        self.parent.as_ref()
    }

    /// Returns `true` for folder objects.
    pub fn is_folder(&self) -> bool {
        self.is_folder
    }

    /// Returns the variable attributes, `None` for objects.
    pub fn variable(&self) -> Option<&VariableAttributes> {
        self.variable.as_ref()
    }
}

/// A child reference returned by browsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDescription {
    /// Relation from the browsed node to the target.
    pub reference_type: ReferenceType,
    /// Target node.
    pub node_id: NodeId,
    /// Target browse name.
    pub browse_name: String,
    /// Target node class.
    pub node_class: NodeClass,
}
