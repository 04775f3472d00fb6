// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Value accessors bound to Variable nodes.
//!
//! Every Variable owns exactly one [`ValueAccessor`]. Three kinds exist:
//!
//! - [`ReadOnlyValue`]: a stored value that clients cannot change
//! - [`ReadWriteValue`]: a stored value with coercion and optional range check
//! - [`ComputedValue`]: derived from a [`HostSnapshot`] taken at read time
//!
//! Stored values sit behind their own `parking_lot::RwLock`. A lock is held
//! only for the clone or the assignment, never across coercion.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::host::{HostInfo, HostSnapshot};
use crate::status::StatusCode;
use crate::types::DataType;
use crate::variant::{DataValue, Variant};

/// Get/set capability of a Variable node.
pub trait ValueAccessor: Send + Sync + fmt::Debug {
    /// Returns the current value and its status.
    fn get(&self) -> DataValue;

    /// Stores `value`. Implementations coerce and validate, returning a bad
    /// status instead of failing.
    fn set(&self, _value: &Variant) -> StatusCode {
        StatusCode::BAD_NOT_WRITABLE
    }

    /// Returns `true` if [`set`](Self::set) is bound.
    fn is_settable(&self) -> bool {
        false
    }
}

// =============================================================================
// ValueRange
// =============================================================================

/// Inclusive numeric range accepted by a writable variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
}

impl ValueRange {
    /// Creates a range.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns `true` if `value` lies within the range.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Returns `true` if `min < max`.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

// =============================================================================
// ReadOnlyValue
// =============================================================================

/// A constant value.
#[derive(Debug)]
pub struct ReadOnlyValue {
    value: Variant,
}

impl ReadOnlyValue {
    /// Creates an accessor that always returns `value`.
    pub fn new(value: impl Into<Variant>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl ValueAccessor for ReadOnlyValue {
    fn get(&self) -> DataValue {
        DataValue::good(self.value.clone())
    }
}

// =============================================================================
// ReadWriteValue
// =============================================================================

/// A stored value that accepts writes of its declared type.
#[derive(Debug)]
pub struct ReadWriteValue {
    data_type: DataType,
    value: RwLock<Variant>,
    range: Option<ValueRange>,
}

impl ReadWriteValue {
    /// Creates an accessor holding `initial`. The declared type is taken from
    /// the initial value.
    ///
    /// Returns `None` for [`Variant::Empty`].
    pub fn new(initial: impl Into<Variant>) -> Option<Self> {
        let initial = initial.into();
        let data_type = initial.data_type()?;
        Some(Self {
            data_type,
            value: RwLock::new(initial),
            range: None,
        })
    }

    /// Creates a `Double` accessor.
    pub fn double(initial: f64) -> Self {
        Self {
            data_type: DataType::Double,
            value: RwLock::new(Variant::Double(initial)),
            range: None,
        }
    }

    /// Restricts accepted numeric values to `range`.
    pub fn with_range(mut self, range: ValueRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Returns the declared type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

impl ValueAccessor for ReadWriteValue {
    fn get(&self) -> DataValue {
        DataValue::good(self.value.read().clone())
    }

    fn set(&self, value: &Variant) -> StatusCode {
        let Some(coerced) = value.coerce_to(self.data_type) else {
            return StatusCode::BAD_TYPE_MISMATCH;
        };

        if let (Some(range), Some(v)) = (self.range, coerced.as_f64()) {
            if !range.contains(v) {
                return StatusCode::BAD_OUT_OF_RANGE;
            }
        }

        *self.value.write() = coerced;
        StatusCode::GOOD
    }

    fn is_settable(&self) -> bool {
        true
    }
}

// =============================================================================
// ComputedValue
// =============================================================================

/// Projection from a host snapshot to a value.
pub type SnapshotProjection = fn(&HostSnapshot) -> Variant;

/// A read-only value computed from a fresh [`HostSnapshot`] on every read.
pub struct ComputedValue {
    host: Arc<dyn HostInfo>,
    project: SnapshotProjection,
}

impl ComputedValue {
    /// Creates a computed accessor.
    pub fn new(host: Arc<dyn HostInfo>, project: SnapshotProjection) -> Self {
        Self { host, project }
    }

    /// Host name as a `String`.
    pub fn hostname(host: Arc<dyn HostInfo>) -> Self {
        Self::new(host, |s| Variant::String(s.hostname.clone()))
    }

    /// Process uptime in whole seconds as a `UInt32`.
    pub fn uptime_seconds(host: Arc<dyn HostInfo>) -> Self {
        Self::new(host, |s| {
            Variant::UInt32(u32::try_from(s.process_uptime.as_secs()).unwrap_or(u32::MAX))
        })
    }

    /// One-minute load average as a `Double`.
    pub fn load_average(host: Arc<dyn HostInfo>) -> Self {
        Self::new(host, |s| Variant::Double(s.load_average_1m))
    }
}

impl fmt::Debug for ComputedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedValue")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl ValueAccessor for ComputedValue {
    fn get(&self) -> DataValue {
        DataValue::good((self.project)(&self.host.snapshot()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_space::host::FixedHostInfo;
    use std::time::Duration;

    fn host() -> Arc<dyn HostInfo> {
        Arc::new(FixedHostInfo::new(HostSnapshot {
            hostname: "edge-7".into(),
            process_uptime: Duration::from_millis(90_500),
            load_average_1m: 1.25,
        }))
    }

    #[test]
    fn test_read_only_rejects_set() {
        let accessor = ReadOnlyValue::new("fixed");
        assert!(!accessor.is_settable());
        assert_eq!(accessor.set(&Variant::from("x")), StatusCode::BAD_NOT_WRITABLE);
        assert_eq!(accessor.get().value, Some(Variant::from("fixed")));
    }

    #[test]
    fn test_read_write_roundtrip() {
        let accessor = ReadWriteValue::double(25.0);
        assert_eq!(accessor.set(&Variant::Double(27.5)), StatusCode::GOOD);
        assert_eq!(accessor.get().value, Some(Variant::Double(27.5)));
    }

    #[test]
    fn test_read_write_numeric_string() {
        let accessor = ReadWriteValue::double(25.0);
        assert_eq!(accessor.set(&Variant::from("30.25")), StatusCode::GOOD);
        assert_eq!(accessor.get().value, Some(Variant::Double(30.25)));
    }

    #[test]
    fn test_read_write_type_mismatch_keeps_value() {
        let accessor = ReadWriteValue::double(25.0);
        assert_eq!(
            accessor.set(&Variant::Boolean(true)),
            StatusCode::BAD_TYPE_MISMATCH
        );
        assert_eq!(
            accessor.set(&Variant::from("hot")),
            StatusCode::BAD_TYPE_MISMATCH
        );
        assert_eq!(accessor.get().value, Some(Variant::Double(25.0)));
    }

    #[test]
    fn test_read_write_range() {
        let accessor = ReadWriteValue::double(25.0).with_range(ValueRange::new(-20.0, 100.0));
        assert_eq!(accessor.set(&Variant::Double(100.0)), StatusCode::GOOD);
        assert_eq!(
            accessor.set(&Variant::Double(100.5)),
            StatusCode::BAD_OUT_OF_RANGE
        );
        assert_eq!(accessor.get().value, Some(Variant::Double(100.0)));
    }

    #[test]
    fn test_read_write_from_variant() {
        let accessor = ReadWriteValue::new(Variant::Int32(3)).unwrap();
        assert_eq!(accessor.data_type(), DataType::Int32);
        assert!(ReadWriteValue::new(Variant::Empty).is_none());
    }

    #[test]
    fn test_computed_values() {
        assert_eq!(
            ComputedValue::hostname(host()).get().value,
            Some(Variant::from("edge-7"))
        );
        assert_eq!(
            ComputedValue::uptime_seconds(host()).get().value,
            Some(Variant::UInt32(90))
        );
        assert_eq!(
            ComputedValue::load_average(host()).get().value,
            Some(Variant::Double(1.25))
        );
        assert!(!ComputedValue::hostname(host()).is_settable());
    }

    #[test]
    fn test_range_validity() {
        assert!(ValueRange::new(0.0, 100.0).is_valid());
        assert!(!ValueRange::new(5.0, 5.0).is_valid());
        assert!(!ValueRange::new(f64::NAN, 1.0).is_valid());
    }
}
