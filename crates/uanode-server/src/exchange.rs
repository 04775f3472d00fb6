// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Batched attribute read, write and browse.
//!
//! Every item resolves to its own status. An unknown node, a denied access
//! or a failed coercion affects that item only; the batch always returns
//! one result per input item, in input order.

use std::sync::Arc;

use tokio::time::Instant;
use uanode_core::access::{
    AccessController, AccessDecision, AccessOperation, AuthorizationContext, DenyReason,
};
use uanode_core::address_space::{Node, NodeStore, ReferenceDescription};
use uanode_core::protocol::{ReadValueId, WriteValue};
use uanode_core::status::StatusCode;
use uanode_core::types::{AttributeId, NodeId};
use uanode_core::variant::DataValue;

/// Attributes served by reads besides `Value`.
const METADATA_ATTRIBUTES: [AttributeId; 8] = [
    AttributeId::NODE_ID,
    AttributeId::NODE_CLASS,
    AttributeId::BROWSE_NAME,
    AttributeId::DISPLAY_NAME,
    AttributeId::DATA_TYPE,
    AttributeId::ACCESS_LEVEL,
    AttributeId::USER_ACCESS_LEVEL,
    AttributeId::MINIMUM_SAMPLING_INTERVAL,
];

/// Applies read and write batches to a shared [`NodeStore`].
#[derive(Debug, Clone)]
pub struct AttributeExchange {
    store: Arc<NodeStore>,
    access: AccessController,
}

impl AttributeExchange {
    /// Creates an exchange over `store`.
    pub fn new(store: Arc<NodeStore>, access: AccessController) -> Self {
        Self { store, access }
    }

    /// Returns the node store.
    pub fn store(&self) -> &Arc<NodeStore> {
        &self.store
    }

    /// Reads every item. Items not started before `deadline` report
    /// `BadTimeout`.
    pub fn read(
        &self,
        auth: &AuthorizationContext,
        items: &[ReadValueId],
        deadline: Option<Instant>,
    ) -> Vec<DataValue> {
        items
            .iter()
            .map(|item| {
                if expired(deadline) {
                    return DataValue::bad(StatusCode::BAD_TIMEOUT);
                }
                self.read_item(auth, item)
            })
            .collect()
    }

    /// Writes every item on behalf of `actor`. Items not started before
    /// `deadline` report `BadTimeout`. Succeeded items are not rolled back
    /// when a later one fails.
    pub fn write(
        &self,
        actor: &str,
        auth: &AuthorizationContext,
        items: &[WriteValue],
        deadline: Option<Instant>,
    ) -> Vec<StatusCode> {
        items
            .iter()
            .map(|item| {
                if expired(deadline) {
                    return StatusCode::BAD_TIMEOUT;
                }
                self.write_item(actor, auth, item)
            })
            .collect()
    }

    /// Lists the children of a node.
    pub fn browse(&self, node_id: &NodeId) -> Result<Vec<ReferenceDescription>, StatusCode> {
        self.store.browse(node_id)
    }

    fn read_item(&self, auth: &AuthorizationContext, item: &ReadValueId) -> DataValue {
        let node = match self.store.resolve(&item.node_id) {
            Ok(node) => node,
            Err(status) => return DataValue::bad(status),
        };

        // Metadata is readable by any established session.
        let operation = if item.attribute_id.is_value() {
            AccessOperation::Read
        } else if METADATA_ATTRIBUTES.contains(&item.attribute_id) {
            return match self.check(auth, node, AccessOperation::Read, true) {
                Ok(()) => self.store.read_attribute(&item.node_id, item.attribute_id),
                Err(status) => DataValue::bad(status),
            };
        } else {
            return DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID);
        };

        match self.check(auth, node, operation, false) {
            Ok(()) => self.store.read_value(&item.node_id),
            Err(status) => DataValue::bad(status),
        }
    }

    fn write_item(&self, actor: &str, auth: &AuthorizationContext, item: &WriteValue) -> StatusCode {
        let node = match self.store.resolve(&item.node_id) {
            Ok(node) => node,
            Err(status) => return status,
        };

        if !item.attribute_id.is_value() {
            return if METADATA_ATTRIBUTES.contains(&item.attribute_id) {
                StatusCode::BAD_NOT_WRITABLE
            } else {
                StatusCode::BAD_ATTRIBUTE_ID_INVALID
            };
        }

        if let Err(status) = self.check(auth, node, AccessOperation::Write, false) {
            return status;
        }
        self.store.write_value_as(actor, &item.node_id, &item.value)
    }

    fn check(
        &self,
        auth: &AuthorizationContext,
        node: &Node,
        operation: AccessOperation,
        metadata: bool,
    ) -> Result<(), StatusCode> {
        let now = Instant::now().into_std();
        match self.access.check_access(auth, node, operation, now) {
            AccessDecision::Allowed => Ok(()),
            // Flags govern the Value attribute only.
            AccessDecision::Denied(reason)
                if metadata
                    && matches!(reason, DenyReason::NotReadable | DenyReason::UserAccessDenied) =>
            {
                Ok(())
            }
            AccessDecision::Denied(reason) => Err(reason.status_code()),
        }
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}
