//! Simulated mount. Starts unparked, pointing at the pole.

use taskqueue_domain::property::{ElementValue, Property, PropertyKind, PropertyState, SwitchRule};

use super::{number, set_element, switch};

pub(super) const PARK: &str = "TELESCOPE_PARK";
pub(super) const COORDINATES: &str = "EQUATORIAL_EOD_COORD";

const PARK_RA: f64 = 0.0;
const PARK_DEC: f64 = 90.0;

pub(super) fn properties() -> Vec<Property> {
    vec![
        Property::new(PARK, PropertyKind::Switch)
            .with_rule(SwitchRule::OneOfMany)
            .with_state(PropertyState::Ok)
            .with_element("PARK", ElementValue::Switch(false))
            .with_element("UNPARK", ElementValue::Switch(true)),
        Property::new(COORDINATES, PropertyKind::Number)
            .with_state(PropertyState::Ok)
            .with_element("RA", ElementValue::Number(PARK_RA))
            .with_element("DEC", ElementValue::Number(PARK_DEC)),
    ]
}

/// A parked mount refuses to slew; coordinates must be on the sky.
pub(super) fn admits(
    properties: &[Property],
    property: &str,
    element: &str,
    value: &ElementValue,
) -> bool {
    if property != COORDINATES {
        return true;
    }
    if switch(properties, PARK, "PARK") == Some(true) {
        return false;
    }
    match (element, value) {
        ("RA", ElementValue::Number(ra)) => (0.0..24.0).contains(ra),
        ("DEC", ElementValue::Number(dec)) => (-90.0..=90.0).contains(dec),
        _ => false,
    }
}

/// Parking slews the mount back to the park position.
pub(super) fn follow_up(properties: &mut [Property], property: &str) -> Vec<&'static str> {
    if property != PARK || switch(properties, PARK, "PARK") != Some(true) {
        return Vec::new();
    }
    let at_park = number(properties, COORDINATES, "RA") == Some(PARK_RA)
        && number(properties, COORDINATES, "DEC") == Some(PARK_DEC);
    if at_park {
        return Vec::new();
    }
    set_element(properties, COORDINATES, "RA", ElementValue::Number(PARK_RA));
    set_element(properties, COORDINATES, "DEC", ElementValue::Number(PARK_DEC));
    vec![COORDINATES]
}
