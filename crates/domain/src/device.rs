//! Device — a controllable instrument reachable through the property port.

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityMask;

/// What the executor needs to know about a device to bind tasks to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub capabilities: CapabilityMask,
    pub connected: bool,
}

impl Device {
    #[must_use]
    pub fn new(name: impl Into<String>, capabilities: CapabilityMask) -> Self {
        Self {
            name: name.into(),
            capabilities,
            connected: true,
        }
    }

    /// Connected and offering every required role.
    #[must_use]
    pub fn satisfies(&self, required: CapabilityMask) -> bool {
        self.connected && self.capabilities.contains(required)
    }
}

/// First device in enumeration order that satisfies `required`.
#[must_use]
pub fn select_device(devices: &[Device], required: CapabilityMask) -> Option<&Device> {
    devices.iter().find(|device| device.satisfies(required))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_select_first_connected_superset_device() {
        let mut offline = Device::new("Scope A", CapabilityMask::TELESCOPE);
        offline.connected = false;
        let devices = vec![
            offline,
            Device::new("Camera", CapabilityMask::CCD),
            Device::new("Scope B", CapabilityMask::TELESCOPE | CapabilityMask::GPS),
            Device::new("Scope C", CapabilityMask::TELESCOPE),
        ];

        let selected = select_device(&devices, CapabilityMask::TELESCOPE).unwrap();

        assert_eq!(selected.name, "Scope B");
    }

    #[test]
    fn should_return_none_when_no_device_covers_requirement() {
        let devices = vec![Device::new("Camera", CapabilityMask::CCD)];
        assert!(select_device(&devices, CapabilityMask::CCD | CapabilityMask::GUIDER).is_none());
    }
}
