//! Simulated instruments — telescope, camera, focuser.
//!
//! Each instrument owns its property tree. The model decides whether a write
//! is admissible and which sibling properties move once it settles.

mod camera;
mod focuser;
mod telescope;

use taskqueue_domain::capability::CapabilityMask;
use taskqueue_domain::device::Device;
use taskqueue_domain::property::{ElementValue, Property, PropertyState, SwitchRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Model {
    Telescope,
    Camera,
    Focuser,
}

/// One simulated instrument and its current property tree.
#[derive(Debug, Clone)]
pub struct VirtualDevice {
    info: Device,
    model: Model,
    properties: Vec<Property>,
}

impl VirtualDevice {
    /// Mount with park switch and equatorial coordinates.
    #[must_use]
    pub fn telescope(name: impl Into<String>) -> Self {
        Self::build(name, CapabilityMask::TELESCOPE, Model::Telescope)
    }

    /// Imaging camera with guider head, cooler and exposure control.
    #[must_use]
    pub fn camera(name: impl Into<String>) -> Self {
        Self::build(name, CapabilityMask::CCD | CapabilityMask::GUIDER, Model::Camera)
    }

    /// Absolute-position focuser.
    #[must_use]
    pub fn focuser(name: impl Into<String>) -> Self {
        Self::build(name, CapabilityMask::FOCUSER, Model::Focuser)
    }

    fn build(name: impl Into<String>, capabilities: CapabilityMask, model: Model) -> Self {
        let properties = match model {
            Model::Telescope => telescope::properties(),
            Model::Camera => camera::properties(),
            Model::Focuser => focuser::properties(),
        };
        Self {
            info: Device::new(name, capabilities),
            model,
            properties,
        }
    }

    #[must_use]
    pub fn info(&self) -> &Device {
        &self.info
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.info.connected = connected;
    }

    pub(crate) fn set_state(&mut self, property: &str, state: PropertyState) {
        if let Some(found) = self.property_mut(property) {
            found.state = state;
        }
    }

    /// Whether the instrument would carry out the write in its current state.
    pub(crate) fn admits(&self, property: &str, element: &str, value: &ElementValue) -> bool {
        match self.model {
            Model::Telescope => telescope::admits(&self.properties, property, element, value),
            Model::Camera => camera::admits(property, value),
            Model::Focuser => focuser::admits(property, value),
        }
    }

    /// Store a settled write and run the model's follow-up moves.
    ///
    /// Returns the names of every property that changed.
    pub(crate) fn apply(&mut self, property: &str, element: &str, value: ElementValue) -> Vec<String> {
        let Some(target) = self.property_mut(property) else {
            return Vec::new();
        };
        if target.rule == SwitchRule::OneOfMany && value == ElementValue::Switch(true) {
            for sibling in &mut target.elements {
                sibling.value = ElementValue::Switch(false);
            }
        }
        if let Some(found) = target.element_mut(element) {
            found.value = value;
        }
        target.state = PropertyState::Ok;

        let mut changed = vec![property.to_string()];
        let follow_ups = match self.model {
            Model::Telescope => telescope::follow_up(&mut self.properties, property),
            Model::Camera => camera::follow_up(&mut self.properties, property),
            Model::Focuser => Vec::new(),
        };
        changed.extend(follow_ups.into_iter().map(str::to_string));
        changed
    }

    fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.name == name)
    }
}

fn number(properties: &[Property], property: &str, element: &str) -> Option<f64> {
    let found = properties.iter().find(|p| p.name == property)?;
    match found.element(element)?.value {
        ElementValue::Number(n) => Some(n),
        _ => None,
    }
}

fn switch(properties: &[Property], property: &str, element: &str) -> Option<bool> {
    let found = properties.iter().find(|p| p.name == property)?;
    match found.element(element)?.value {
        ElementValue::Switch(on) => Some(on),
        _ => None,
    }
}

fn set_element(properties: &mut [Property], property: &str, element: &str, value: ElementValue) {
    if let Some(found) = properties
        .iter_mut()
        .find(|p| p.name == property)
        .and_then(|p| p.element_mut(element))
    {
        found.value = value;
    }
}
