//! Device access port — reads, writes and change notifications for device
//! properties.
//!
//! The transport that reaches real instruments lives behind this trait.
//! Adapters report problems with [`DeviceError`] so the action runner can
//! treat them as retry-eligible resource failures.

use std::future::Future;

use tokio::sync::broadcast;

use taskqueue_domain::device::Device;
use taskqueue_domain::error::DeviceError;
use taskqueue_domain::property::{ElementValue, Property, PropertyUpdate};

/// Property-level access to the devices of one runtime.
pub trait DeviceAccess: Send + Sync {
    /// Whether a device runtime is up at all.
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    /// Every known device, in enumeration order.
    fn devices(&self) -> impl Future<Output = Result<Vec<Device>, DeviceError>> + Send;

    /// Look up one device by name.
    fn device(&self, name: &str) -> impl Future<Output = Result<Device, DeviceError>> + Send;

    /// Current snapshot of a property of a connected device.
    fn property(
        &self,
        device: &str,
        property: &str,
    ) -> impl Future<Output = Result<Property, DeviceError>> + Send;

    /// Request a new value for one element. Completion is observed through
    /// the property state, not through this call.
    fn write(
        &self,
        device: &str,
        property: &str,
        element: &str,
        value: ElementValue,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Receive a notification each time any property changes.
    ///
    /// Dropping the receiver detaches the subscription.
    fn subscribe(&self) -> broadcast::Receiver<PropertyUpdate>;
}

impl<T: DeviceAccess> DeviceAccess for std::sync::Arc<T> {
    fn is_available(&self) -> impl Future<Output = bool> + Send {
        (**self).is_available()
    }

    fn devices(&self) -> impl Future<Output = Result<Vec<Device>, DeviceError>> + Send {
        (**self).devices()
    }

    fn device(&self, name: &str) -> impl Future<Output = Result<Device, DeviceError>> + Send {
        (**self).device(name)
    }

    fn property(
        &self,
        device: &str,
        property: &str,
    ) -> impl Future<Output = Result<Property, DeviceError>> + Send {
        (**self).property(device, property)
    }

    fn write(
        &self,
        device: &str,
        property: &str,
        element: &str,
        value: ElementValue,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send {
        (**self).write(device, property, element, value)
    }

    fn subscribe(&self) -> broadcast::Receiver<PropertyUpdate> {
        (**self).subscribe()
    }
}
