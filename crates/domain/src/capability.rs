//! Capability masks — the device roles a device offers or a template needs.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Bitmask of device roles.
///
/// Devices report the roles they implement; templates declare the roles
/// they can drive. Dynamic binding picks the first connected device whose
/// mask is a superset of what the task requires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityMask(u32);

impl CapabilityMask {
    pub const NONE: Self = Self(0);
    pub const GENERAL: Self = Self(1 << 0);
    pub const TELESCOPE: Self = Self(1 << 1);
    pub const CCD: Self = Self(1 << 2);
    pub const GUIDER: Self = Self(1 << 3);
    pub const FOCUSER: Self = Self(1 << 4);
    pub const FILTER: Self = Self(1 << 5);
    pub const DOME: Self = Self(1 << 6);
    pub const GPS: Self = Self(1 << 7);
    pub const WEATHER: Self = Self(1 << 8);
    pub const DUSTCAP: Self = Self(1 << 10);
    pub const LIGHTBOX: Self = Self(1 << 11);
    pub const ROTATOR: Self = Self(1 << 13);
    pub const AUX: Self = Self(1 << 15);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` when every bit of `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` when at least one bit is shared.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for CapabilityMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CapabilityMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl FromIterator<CapabilityMask> for CapabilityMask {
    fn from_iter<I: IntoIterator<Item = CapabilityMask>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, BitOr::bitor)
    }
}

impl fmt::Display for CapabilityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_contain_subset_when_all_bits_present() {
        let device = CapabilityMask::TELESCOPE | CapabilityMask::GPS;
        assert!(device.contains(CapabilityMask::TELESCOPE));
        assert!(!device.contains(CapabilityMask::TELESCOPE | CapabilityMask::CCD));
    }

    #[test]
    fn should_intersect_when_one_bit_shared() {
        let device = CapabilityMask::CCD | CapabilityMask::GUIDER;
        assert!(device.intersects(CapabilityMask::GUIDER | CapabilityMask::FOCUSER));
        assert!(!device.intersects(CapabilityMask::DOME));
    }

    #[test]
    fn should_fold_iterator_with_bitwise_or() {
        let mask: CapabilityMask = [CapabilityMask::CCD, CapabilityMask::FILTER]
            .into_iter()
            .collect();
        assert_eq!(mask.bits(), (1 << 2) | (1 << 5));
    }

    #[test]
    fn should_serialize_as_plain_integer() {
        let json = serde_json::to_value(CapabilityMask::FOCUSER).unwrap();
        assert_eq!(json, serde_json::json!(16));
    }
}
