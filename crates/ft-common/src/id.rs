//! Device and data-point-type identity types.
//!
//! Both ids are shared with the wire protocol that produced the raw readings,
//! so they are plain integers with transparent serde representations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Device identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DeviceId {
    fn from(id: u64) -> Self {
        DeviceId(id)
    }
}

impl FromStr for DeviceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(DeviceId)
    }
}

/// Data-point type identifier.
///
/// Atomic ids usually match the raw field id emitted by the device firmware;
/// composite ids live in the same space but never appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataPointTypeId(pub u32);

impl fmt::Display for DataPointTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DataPointTypeId {
    fn from(id: u32) -> Self {
        DataPointTypeId(id)
    }
}

impl FromStr for DataPointTypeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(DataPointTypeId)
    }
}
