use taskqueue_domain::property::{ElementValue, Property, PropertyKind, PropertyState};

pub(super) const POSITION: &str = "ABS_FOCUS_POSITION";

const MAX_POSITION: f64 = 100_000.0;

pub(super) fn properties() -> Vec<Property> {
    vec![
        Property::new(POSITION, PropertyKind::Number)
            .with_state(PropertyState::Ok)
            .with_element("FOCUS_ABSOLUTE_POSITION", ElementValue::Number(0.0)),
    ]
}

pub(super) fn admits(property: &str, value: &ElementValue) -> bool {
    match (property, value) {
        (POSITION, ElementValue::Number(steps)) => (0.0..=MAX_POSITION).contains(steps),
        _ => true,
    }
}
