// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Identifier, type and security types shared by the server and the client.
//!
//! - **NodeId**: namespace-qualified node identifiers with `ns=1;s=Name` parsing
//! - **DataType / NodeClass / AttributeId**: address-space metadata
//! - **AccessLevel**: per-node read/write flags
//! - **SecurityMode / SecurityPolicy**: the negotiable security pair
//! - **UserIdentity**: identity tokens presented at session creation
//! - **EndpointDescription**: what a server advertises
//!
//! # Examples
//!
//! ```
//! use uanode_core::types::NodeId;
//!
//! let node: NodeId = "ns=1;s=Temperature".parse().unwrap();
//! assert_eq!(node, NodeId::string(1, "Temperature"));
//! assert_eq!(node.to_string(), "ns=1;s=Temperature");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// ParseError
// =============================================================================

/// Error returned when parsing one of the textual forms in this module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} '{input}': {reason}")]
pub struct ParseError {
    /// What was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

impl ParseError {
    fn new(kind: &'static str, input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// NodeId
// =============================================================================

/// Node identifier: a namespace index plus a numeric, string or GUID value.
///
/// Two node ids are equal only if both the namespace and the identifier
/// match exactly. This is the contract shared by server and client for the
/// sample node set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = standard namespace).
    pub namespace_index: u16,

    /// The identifier within the namespace.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// The root folder (`i=84`).
    pub const ROOT_FOLDER: u32 = 84;

    /// The Objects folder (`i=85`), root of every application object.
    pub const OBJECTS_FOLDER: u32 = 85;

    /// Creates a numeric node id.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node id.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node id.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Returns the Objects folder node id.
    pub fn objects_folder() -> Self {
        Self::numeric(0, Self::OBJECTS_FOLDER)
    }

    /// Returns the root folder node id.
    pub fn root_folder() -> Self {
        Self::numeric(0, Self::ROOT_FOLDER)
    }

    /// Returns `true` if the identifier is a string.
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::String(_))
    }

    /// Returns `true` if the identifier is numeric.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::Numeric(_))
    }

    /// Formats as `ns=<n>;<t>=<v>`, omitting the namespace for namespace 0.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = ParseError;

    /// Parses `ns=1;s=Name`, `ns=2;i=1001`, `ns=3;g=<uuid>`, `i=85` or `s=Name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns, id) = rest
                    .split_once(';')
                    .ok_or_else(|| ParseError::new("node id", s, "missing identifier after namespace"))?;
                let ns: u16 = ns
                    .parse()
                    .map_err(|_| ParseError::new("node id", s, "invalid namespace index"))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            let value = id
                .parse()
                .map_err(|_| ParseError::new("node id", s, "invalid numeric identifier"))?;
            NodeIdentifier::Numeric(value)
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            if id.is_empty() {
                return Err(ParseError::new("node id", s, "empty string identifier"));
            }
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            let uuid = Uuid::parse_str(id)
                .map_err(|e| ParseError::new("node id", s, format!("invalid GUID: {e}")))?;
            NodeIdentifier::Guid(uuid)
        } else {
            return Err(ParseError::new(
                "node id",
                s,
                "unknown identifier type, expected i=, s= or g=",
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

/// Node identifier value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),
    /// String identifier.
    String(String),
    /// GUID identifier.
    Guid(Uuid),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={v}"),
            Self::String(v) => write!(f, "s={v}"),
            Self::Guid(v) => write!(f, "g={v}"),
        }
    }
}

// =============================================================================
// DataType
// =============================================================================

/// Declared data type of a Variable node and the tag carried by a Variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean.
    Boolean,
    /// Signed 8-bit integer.
    SByte,
    /// Unsigned 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    String,
    /// UTC timestamp.
    DateTime,
}

impl DataType {
    /// Returns the standard type node identifier (`i=<n>`).
    pub const fn type_id(&self) -> u32 {
        match self {
            Self::Boolean => 1,
            Self::SByte => 2,
            Self::Byte => 3,
            Self::Int16 => 4,
            Self::UInt16 => 5,
            Self::Int32 => 6,
            Self::UInt32 => 7,
            Self::Int64 => 8,
            Self::UInt64 => 9,
            Self::Float => 10,
            Self::Double => 11,
            Self::String => 12,
            Self::DateTime => 13,
        }
    }

    /// Returns the type name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
        }
    }

    /// Returns `true` for integer types.
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::SByte
                | Self::Byte
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
        )
    }

    /// Returns `true` for floating point types.
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Returns `true` for integer and floating point types.
    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.to_lowercase().as_str() {
            "boolean" | "bool" => Self::Boolean,
            "sbyte" => Self::SByte,
            "byte" => Self::Byte,
            "int16" => Self::Int16,
            "uint16" => Self::UInt16,
            "int32" => Self::Int32,
            "uint32" => Self::UInt32,
            "int64" => Self::Int64,
            "uint64" => Self::UInt64,
            "float" => Self::Float,
            "double" => Self::Double,
            "string" => Self::String,
            "datetime" => Self::DateTime,
            _ => return Err(ParseError::new("data type", s, "unknown type name")),
        };
        Ok(ty)
    }
}

// =============================================================================
// NodeClass / AttributeId
// =============================================================================

/// Class of an address-space node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    /// Object (folders, devices).
    Object,
    /// Variable carrying a value.
    Variable,
}

impl NodeClass {
    /// Returns the standard enumeration value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Object => 1,
            Self::Variable => 2,
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => f.write_str("Object"),
            Self::Variable => f.write_str("Variable"),
        }
    }
}

/// Node attribute addressed by a read or write item.
///
/// Serialized as its numeric id, so unknown ids survive decoding and are
/// rejected per item with `BadAttributeIdInvalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeId(pub u32);

impl AttributeId {
    /// NodeId attribute.
    pub const NODE_ID: Self = Self(1);
    /// NodeClass attribute.
    pub const NODE_CLASS: Self = Self(2);
    /// BrowseName attribute.
    pub const BROWSE_NAME: Self = Self(3);
    /// DisplayName attribute.
    pub const DISPLAY_NAME: Self = Self(4);
    /// Value attribute.
    pub const VALUE: Self = Self(13);
    /// DataType attribute.
    pub const DATA_TYPE: Self = Self(14);
    /// AccessLevel attribute.
    pub const ACCESS_LEVEL: Self = Self(17);
    /// UserAccessLevel attribute.
    pub const USER_ACCESS_LEVEL: Self = Self(18);
    /// MinimumSamplingInterval attribute.
    pub const MINIMUM_SAMPLING_INTERVAL: Self = Self(19);

    /// Returns `true` if this is the Value attribute.
    #[inline]
    pub const fn is_value(&self) -> bool {
        self.0 == Self::VALUE.0
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::NODE_ID => "NodeId",
            Self::NODE_CLASS => "NodeClass",
            Self::BROWSE_NAME => "BrowseName",
            Self::DISPLAY_NAME => "DisplayName",
            Self::VALUE => "Value",
            Self::DATA_TYPE => "DataType",
            Self::ACCESS_LEVEL => "AccessLevel",
            Self::USER_ACCESS_LEVEL => "UserAccessLevel",
            Self::MINIMUM_SAMPLING_INTERVAL => "MinimumSamplingInterval",
            Self(other) => return write!(f, "Attribute({other})"),
        };
        f.write_str(name)
    }
}

impl Default for AttributeId {
    fn default() -> Self {
        Self::VALUE
    }
}

// =============================================================================
// AccessLevel
// =============================================================================

/// Read/write permission flags of a Variable node.
///
/// A node carries two of these: the "current" access level and the "user"
/// access level. Both must allow an operation for it to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct AccessLevel(u8);

impl AccessLevel {
    /// No access.
    pub const NONE: Self = Self(0);
    /// The value may be read.
    pub const CURRENT_READ: Self = Self(0x01);
    /// The value may be written.
    pub const CURRENT_WRITE: Self = Self(0x02);
    /// Read-only.
    pub const READ_ONLY: Self = Self::CURRENT_READ;
    /// Read and write.
    pub const READ_WRITE: Self = Self(0x03);

    /// Creates from raw bits.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[inline]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Returns `true` if every flag in `other` is set.
    #[inline]
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if the read flag is set.
    #[inline]
    pub const fn can_read(&self) -> bool {
        self.contains(Self::CURRENT_READ)
    }

    /// Returns `true` if the write flag is set.
    #[inline]
    pub const fn can_write(&self) -> bool {
        self.contains(Self::CURRENT_WRITE)
    }
}

impl std::ops::BitOr for AccessLevel {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.can_read(), self.can_write()) {
            (true, true) => f.write_str("ReadWrite"),
            (true, false) => f.write_str("ReadOnly"),
            (false, true) => f.write_str("WriteOnly"),
            (false, false) => f.write_str("None"),
        }
    }
}

// =============================================================================
// SecurityMode
// =============================================================================

/// Message security mode of a secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// Messages are neither signed nor encrypted.
    #[default]
    None,
    /// Messages are signed.
    Sign,
    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

impl SecurityMode {
    /// Returns `true` if this mode signs messages.
    #[inline]
    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Sign | Self::SignAndEncrypt)
    }

    /// Returns `true` if this mode encrypts messages.
    #[inline]
    pub const fn is_encrypted(&self) -> bool {
        matches!(self, Self::SignAndEncrypt)
    }

    /// Returns `true` if a peer certificate must be validated for this mode.
    #[inline]
    pub const fn requires_certificate(&self) -> bool {
        self.is_signed()
    }

    /// Returns the display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Sign => "Sign",
            Self::SignAndEncrypt => "SignAndEncrypt",
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SecurityMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "none" => Ok(Self::None),
            "sign" => Ok(Self::Sign),
            "signandencrypt" => Ok(Self::SignAndEncrypt),
            _ => Err(ParseError::new("security mode", s, "expected None, Sign or SignAndEncrypt")),
        }
    }
}

// =============================================================================
// SecurityPolicy
// =============================================================================

/// Cryptographic policy of a secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicy {
    /// No security.
    #[default]
    None,
    /// Basic128Rsa15 (deprecated).
    Basic128Rsa15,
    /// Basic256 (deprecated).
    Basic256,
    /// Basic256Sha256.
    Basic256Sha256,
    /// Aes128_Sha256_RsaOaep.
    Aes128Sha256RsaOaep,
    /// Aes256_Sha256_RsaPss.
    Aes256Sha256RsaPss,
}

impl SecurityPolicy {
    /// Returns the policy URI advertised in endpoint descriptions.
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::None => "http://opcfoundation.org/UA/SecurityPolicy#None",
            Self::Basic128Rsa15 => "http://opcfoundation.org/UA/SecurityPolicy#Basic128Rsa15",
            Self::Basic256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256",
            Self::Basic256Sha256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
            Self::Aes128Sha256RsaOaep => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes128_Sha256_RsaOaep"
            }
            Self::Aes256Sha256RsaPss => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes256_Sha256_RsaPss"
            }
        }
    }

    /// Returns the short name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Basic128Rsa15 => "Basic128Rsa15",
            Self::Basic256 => "Basic256",
            Self::Basic256Sha256 => "Basic256Sha256",
            Self::Aes128Sha256RsaOaep => "Aes128Sha256RsaOaep",
            Self::Aes256Sha256RsaPss => "Aes256Sha256RsaPss",
        }
    }

    /// Returns `true` for the `None` policy.
    #[inline]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns `true` if this policy is deprecated.
    #[inline]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::Basic128Rsa15 | Self::Basic256)
    }

    /// Parses a policy URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let fragment = uri.rsplit_once('#').map(|(_, f)| f)?;
        match fragment {
            "None" => Some(Self::None),
            "Basic128Rsa15" => Some(Self::Basic128Rsa15),
            "Basic256" => Some(Self::Basic256),
            "Basic256Sha256" => Some(Self::Basic256Sha256),
            "Aes128_Sha256_RsaOaep" => Some(Self::Aes128Sha256RsaOaep),
            "Aes256_Sha256_RsaPss" => Some(Self::Aes256Sha256RsaPss),
            _ => None,
        }
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SecurityPolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(policy) = Self::from_uri(s) {
            return Ok(policy);
        }
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "none" => Ok(Self::None),
            "basic128rsa15" => Ok(Self::Basic128Rsa15),
            "basic256" => Ok(Self::Basic256),
            "basic256sha256" => Ok(Self::Basic256Sha256),
            "aes128sha256rsaoaep" => Ok(Self::Aes128Sha256RsaOaep),
            "aes256sha256rsapss" => Ok(Self::Aes256Sha256RsaPss),
            _ => Err(ParseError::new("security policy", s, "unknown policy")),
        }
    }
}

/// An advertised or requested (mode, policy) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SecurityPair {
    /// Security mode.
    pub mode: SecurityMode,
    /// Security policy.
    pub policy: SecurityPolicy,
}

impl SecurityPair {
    /// Creates a pair.
    pub const fn new(mode: SecurityMode, policy: SecurityPolicy) -> Self {
        Self { mode, policy }
    }

    /// The unsecured pair.
    pub const fn none() -> Self {
        Self::new(SecurityMode::None, SecurityPolicy::None)
    }

    /// Returns `true` when mode and policy agree on whether security is used.
    pub const fn is_consistent(&self) -> bool {
        matches!(self.mode, SecurityMode::None) == self.policy.is_none()
    }
}

impl fmt::Display for SecurityPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.mode, self.policy)
    }
}

// =============================================================================
// UserIdentity
// =============================================================================

/// Identity token presented when creating or activating a session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserIdentity {
    /// Anonymous access.
    #[default]
    Anonymous,
    /// Username and password.
    UserName {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },
}

impl UserIdentity {
    /// Creates a username/password identity.
    pub fn user_name(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UserName {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns `true` for the anonymous identity.
    #[inline]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns a log-safe label (never the password).
    pub fn label(&self) -> String {
        match self {
            Self::Anonymous => "anonymous".to_string(),
            Self::UserName { username, .. } => format!("user:{username}"),
        }
    }
}

impl fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::UserName { username, .. } => f
                .debug_struct("UserName")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

// =============================================================================
// EndpointDescription
// =============================================================================

/// Build and product identity of a server application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDescription {
    /// Application URI.
    pub application_uri: String,
    /// Product URI.
    pub product_uri: String,
    /// Human readable application name.
    pub application_name: String,
    /// Product name from the build info.
    pub product_name: String,
    /// Build number from the build info.
    pub build_number: String,
}

/// An endpoint advertised by the server. Immutable once published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescription {
    /// Endpoint URL (`opc.tcp://host:port/path`).
    pub endpoint_url: String,
    /// Security mode.
    pub security_mode: SecurityMode,
    /// Security policy URI.
    pub security_policy_uri: String,
    /// Server application identity.
    pub server: ApplicationDescription,
}

impl EndpointDescription {
    /// Returns the security policy, if the URI is recognised.
    pub fn security_policy(&self) -> Option<SecurityPolicy> {
        SecurityPolicy::from_uri(&self.security_policy_uri)
    }

    /// Returns the (mode, policy) pair, if the policy URI is recognised.
    pub fn security_pair(&self) -> Option<SecurityPair> {
        self.security_policy()
            .map(|policy| SecurityPair::new(self.security_mode, policy))
    }
}

// =============================================================================
// Serde helpers
// =============================================================================

/// Serde adapter for `Duration` in humantime form (`"30s"`, `"1500ms"`).
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Serializes a duration as a humantime string.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime::format_duration(*duration)
            .to_string()
            .serialize(serializer)
    }

    /// Deserializes a duration from a humantime string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Duration` as integer milliseconds, used on the wire.
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serializes a duration as milliseconds.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    /// Deserializes a duration from milliseconds.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // NodeId Tests
    // =========================================================================

    #[test]
    fn test_node_id_parse_string() {
        let node: NodeId = "ns=1;s=Temperature".parse().unwrap();
        assert_eq!(node.namespace_index, 1);
        assert!(node.is_string());
        assert_eq!(node.to_string(), "ns=1;s=Temperature");
    }

    #[test]
    fn test_node_id_parse_numeric_default_namespace() {
        let node: NodeId = "i=85".parse().unwrap();
        assert_eq!(node, NodeId::objects_folder());
        assert_eq!(node.to_string(), "i=85");
    }

    #[test]
    fn test_node_id_parse_guid() {
        let uuid = Uuid::new_v4();
        let node: NodeId = format!("ns=3;g={uuid}").parse().unwrap();
        assert_eq!(node, NodeId::guid(3, uuid));
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=1".parse::<NodeId>().is_err());
        assert!("ns=x;s=A".parse::<NodeId>().is_err());
        assert!("ns=1;q=A".parse::<NodeId>().is_err());
        assert!("ns=1;s=".parse::<NodeId>().is_err());
        assert!("i=abc".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_id_namespace_matters() {
        assert_ne!(NodeId::string(1, "Temperature"), NodeId::string(2, "Temperature"));
    }

    // =========================================================================
    // Type Tests
    // =========================================================================

    #[test]
    fn test_data_type_parse() {
        assert_eq!("Double".parse::<DataType>().unwrap(), DataType::Double);
        assert_eq!("uint32".parse::<DataType>().unwrap(), DataType::UInt32);
        assert!("Complex".parse::<DataType>().is_err());
        assert!(DataType::UInt32.is_integer());
        assert!(DataType::Double.is_float());
        assert!(!DataType::String.is_numeric());
    }

    #[test]
    fn test_access_level_flags() {
        assert!(AccessLevel::READ_WRITE.can_write());
        assert!(AccessLevel::READ_WRITE.can_read());
        assert!(!AccessLevel::READ_ONLY.can_write());
        assert_eq!(
            AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE,
            AccessLevel::READ_WRITE
        );
        assert_eq!(AccessLevel::READ_ONLY.to_string(), "ReadOnly");
    }

    #[test]
    fn test_attribute_id_display() {
        assert_eq!(AttributeId::VALUE.to_string(), "Value");
        assert_eq!(AttributeId(99).to_string(), "Attribute(99)");
        assert!(AttributeId::default().is_value());
    }

    // =========================================================================
    // Security Tests
    // =========================================================================

    #[test]
    fn test_security_mode_parse() {
        assert_eq!("None".parse::<SecurityMode>().unwrap(), SecurityMode::None);
        assert_eq!(
            "sign_and_encrypt".parse::<SecurityMode>().unwrap(),
            SecurityMode::SignAndEncrypt
        );
        assert!(SecurityMode::Sign.requires_certificate());
        assert!(!SecurityMode::None.requires_certificate());
    }

    #[test]
    fn test_security_policy_uri_roundtrip() {
        for policy in [
            SecurityPolicy::None,
            SecurityPolicy::Basic256Sha256,
            SecurityPolicy::Aes256Sha256RsaPss,
        ] {
            assert_eq!(SecurityPolicy::from_uri(policy.uri()), Some(policy));
        }
        assert_eq!(SecurityPolicy::from_uri("urn:nothing"), None);
    }

    #[test]
    fn test_security_pair_consistency() {
        assert!(SecurityPair::none().is_consistent());
        assert!(SecurityPair::new(SecurityMode::Sign, SecurityPolicy::Basic256Sha256).is_consistent());
        assert!(!SecurityPair::new(SecurityMode::None, SecurityPolicy::Basic256Sha256).is_consistent());
        assert!(!SecurityPair::new(SecurityMode::Sign, SecurityPolicy::None).is_consistent());
    }

    #[test]
    fn test_user_identity_debug_hides_password() {
        let identity = UserIdentity::user_name("operator", "secret");
        let debug = format!("{identity:?}");
        assert!(debug.contains("operator"));
        assert!(!debug.contains("secret"));
        assert_eq!(identity.label(), "user:operator");
    }
}
