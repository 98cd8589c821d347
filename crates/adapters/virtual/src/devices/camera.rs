//! Simulated cooled camera.

use taskqueue_domain::property::{ElementValue, Property, PropertyKind, PropertyState, SwitchRule};

use super::{number, set_element, switch};

pub(super) const TEMPERATURE: &str = "CCD_TEMPERATURE";
pub(super) const COOLER: &str = "CCD_COOLER";
pub(super) const EXPOSURE: &str = "CCD_EXPOSURE";

const AMBIENT: f64 = 20.0;
const MIN_TEMPERATURE: f64 = -50.0;

pub(super) fn properties() -> Vec<Property> {
    vec![
        Property::new(TEMPERATURE, PropertyKind::Number)
            .with_state(PropertyState::Ok)
            .with_element("CCD_TEMPERATURE_VALUE", ElementValue::Number(AMBIENT)),
        Property::new(COOLER, PropertyKind::Switch)
            .with_rule(SwitchRule::OneOfMany)
            .with_state(PropertyState::Ok)
            .with_element("COOLER_ON", ElementValue::Switch(false))
            .with_element("COOLER_OFF", ElementValue::Switch(true)),
        Property::new(EXPOSURE, PropertyKind::Number)
            .with_state(PropertyState::Idle)
            .with_element("CCD_EXPOSURE_VALUE", ElementValue::Number(0.0)),
    ]
}

pub(super) fn admits(property: &str, value: &ElementValue) -> bool {
    match (property, value) {
        (TEMPERATURE, ElementValue::Number(t)) => (MIN_TEMPERATURE..=AMBIENT).contains(t),
        (EXPOSURE, ElementValue::Number(seconds)) => *seconds >= 0.0,
        _ => true,
    }
}

/// Cooling below ambient switches the cooler on; switching it off lets the
/// sensor drift back to ambient.
pub(super) fn follow_up(properties: &mut [Property], property: &str) -> Vec<&'static str> {
    match property {
        TEMPERATURE => {
            let cooling = number(properties, TEMPERATURE, "CCD_TEMPERATURE_VALUE")
                .is_some_and(|t| t < AMBIENT);
            if !cooling || switch(properties, COOLER, "COOLER_ON") == Some(true) {
                return Vec::new();
            }
            set_element(properties, COOLER, "COOLER_ON", ElementValue::Switch(true));
            set_element(properties, COOLER, "COOLER_OFF", ElementValue::Switch(false));
            vec![COOLER]
        }
        COOLER if switch(properties, COOLER, "COOLER_OFF") == Some(true) => {
            set_element(
                properties,
                TEMPERATURE,
                "CCD_TEMPERATURE_VALUE",
                ElementValue::Number(AMBIENT),
            );
            vec![TEMPERATURE]
        }
        _ => Vec::new(),
    }
}
