// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Tagged values and value/status pairs.
//!
//! A [`Variant`] carries both a data type tag and its payload. A
//! [`DataValue`] is what a read returns: an optional variant, a status code
//! and timestamps.
//!
//! # Coercion
//!
//! [`Variant::coerce_to`] is the single place where a written value is
//! converted to a node's declared type. The accepted conversions are:
//!
//! | declared type | accepted variants |
//! |---------------|-------------------|
//! | `Double`      | any integer, `Float`, `Double`, a string that parses as a finite float |
//! | `Float`       | as `Double`, if the result is finite in `f32` |
//! | integer types | any integer whose value fits the target range |
//! | others        | the identical tag only |
//!
//! # Wire format
//!
//! Finite floats travel as JSON numbers. `NaN`, `Infinity` and `-Infinity`
//! travel as strings, since JSON has no literal for them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::StatusCode;
use crate::types::DataType;

// =============================================================================
// Variant
// =============================================================================

/// A value tagged with its data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Variant {
    /// Boolean value.
    Boolean(bool),
    /// Signed byte.
    SByte(i8),
    /// Unsigned byte.
    Byte(u8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 16-bit unsigned integer.
    UInt16(u16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 32-bit unsigned integer.
    UInt32(u32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit unsigned integer.
    UInt64(u64),
    /// 32-bit float.
    Float(#[serde(with = "float_wire")] f32),
    /// 64-bit float.
    Double(#[serde(with = "double_wire")] f64),
    /// String value.
    String(String),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// No value.
    Empty,
}

impl Variant {
    /// Returns the data type tag, or `None` for [`Variant::Empty`].
    pub fn data_type(&self) -> Option<DataType> {
        let ty = match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::SByte(_) => DataType::SByte,
            Self::Byte(_) => DataType::Byte,
            Self::Int16(_) => DataType::Int16,
            Self::UInt16(_) => DataType::UInt16,
            Self::Int32(_) => DataType::Int32,
            Self::UInt32(_) => DataType::UInt32,
            Self::Int64(_) => DataType::Int64,
            Self::UInt64(_) => DataType::UInt64,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::String(_) => DataType::String,
            Self::DateTime(_) => DataType::DateTime,
            Self::Empty => return None,
        };
        Some(ty)
    }

    /// Returns `true` for [`Variant::Empty`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the value as an `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::SByte(v) => Some(f64::from(*v)),
            Self::Byte(v) => Some(f64::from(*v)),
            Self::Int16(v) => Some(f64::from(*v)),
            Self::UInt16(v) => Some(f64::from(*v)),
            Self::Int32(v) => Some(f64::from(*v)),
            Self::UInt32(v) => Some(f64::from(*v)),
            Self::Int64(v) => Some(*v as f64),
            Self::UInt64(v) => Some(*v as f64),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an `i128` if it is an integer.
    fn as_integer(&self) -> Option<i128> {
        match self {
            Self::SByte(v) => Some(i128::from(*v)),
            Self::Byte(v) => Some(i128::from(*v)),
            Self::Int16(v) => Some(i128::from(*v)),
            Self::UInt16(v) => Some(i128::from(*v)),
            Self::Int32(v) => Some(i128::from(*v)),
            Self::UInt32(v) => Some(i128::from(*v)),
            Self::Int64(v) => Some(i128::from(*v)),
            Self::UInt64(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    /// Returns the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts this value to `target`, or returns `None` if no conversion
    /// is permitted.
    pub fn coerce_to(&self, target: DataType) -> Option<Variant> {
        if self.data_type() == Some(target) {
            return Some(self.clone());
        }

        match target {
            DataType::Double => self.float_source().map(Variant::Double),
            DataType::Float => self
                .float_source()
                .map(|v| v as f32)
                .filter(|v| v.is_finite())
                .map(Variant::Float),
            t if t.is_integer() => {
                let v = self.as_integer()?;
                let coerced = match t {
                    DataType::SByte => Variant::SByte(i8::try_from(v).ok()?),
                    DataType::Byte => Variant::Byte(u8::try_from(v).ok()?),
                    DataType::Int16 => Variant::Int16(i16::try_from(v).ok()?),
                    DataType::UInt16 => Variant::UInt16(u16::try_from(v).ok()?),
                    DataType::Int32 => Variant::Int32(i32::try_from(v).ok()?),
                    DataType::UInt32 => Variant::UInt32(u32::try_from(v).ok()?),
                    DataType::Int64 => Variant::Int64(i64::try_from(v).ok()?),
                    DataType::UInt64 => Variant::UInt64(u64::try_from(v).ok()?),
                    _ => return None,
                };
                Some(coerced)
            }
            _ => None,
        }
    }

    /// Numeric value usable for a floating point target, including numeric
    /// strings.
    fn float_source(&self) -> Option<f64> {
        let value = match self {
            Self::String(s) => s.trim().parse::<f64>().ok()?,
            other => other.as_f64()?,
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::SByte(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Empty => f.write_str("<empty>"),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(v: $ty) -> Self {
                    Variant::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(v.to_string())
    }
}

// =============================================================================
// Float wire encoding
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum FloatRepr {
    Number(f64),
    Text(String),
}

fn non_finite_name(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value.is_sign_negative() {
        "-Infinity"
    } else {
        "Infinity"
    }
}

fn decode_float<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match FloatRepr::deserialize(deserializer)? {
        FloatRepr::Number(v) => Ok(v),
        FloatRepr::Text(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => Err(serde::de::Error::custom(format!(
                "invalid float literal '{other}'"
            ))),
        },
    }
}

mod double_wire {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_str(super::non_finite_name(*value))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        super::decode_float(deserializer)
    }
}

mod float_wire {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f32(*value)
        } else {
            serializer.serialize_str(super::non_finite_name(f64::from(*value)))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        super::decode_float(deserializer).map(|v| v as f32)
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// Result of reading one attribute: value, status and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    /// The value, present when the status is not bad.
    pub value: Option<Variant>,
    /// Item status.
    pub status: StatusCode,
    /// When the server produced the result.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    /// Creates a good result.
    pub fn good(value: Variant) -> Self {
        Self {
            value: Some(value),
            status: StatusCode::GOOD,
            server_timestamp: Some(Utc::now()),
        }
    }

    /// Creates a value/status pair as returned by a value accessor.
    pub fn with_status(value: Variant, status: StatusCode) -> Self {
        Self {
            value: Some(value),
            status,
            server_timestamp: Some(Utc::now()),
        }
    }

    /// Creates a result carrying only a bad status.
    pub fn bad(status: StatusCode) -> Self {
        Self {
            value: None,
            status,
            server_timestamp: Some(Utc::now()),
        }
    }

    /// Returns `true` if the status is good.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }

    /// Returns `true` if the status is bad.
    #[inline]
    pub fn is_bad(&self) -> bool {
        self.status.is_bad()
    }
}
