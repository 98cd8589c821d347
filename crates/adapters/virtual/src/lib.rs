//! # taskqueue-adapter-virtual
//!
//! Simulated observatory implementing the [`DeviceAccess`] port, for demos
//! and end-to-end tests.
//!
//! ## Provided devices
//!
//! | Device | Roles | Properties |
//! |--------|-------|------------|
//! | Telescope Simulator | `TELESCOPE` | `TELESCOPE_PARK`, `EQUATORIAL_EOD_COORD` |
//! | CCD Simulator | `CCD`, `GUIDER` | `CCD_TEMPERATURE`, `CCD_COOLER`, `CCD_EXPOSURE` |
//! | Focuser Simulator | `FOCUSER` | `ABS_FOCUS_POSITION` |
//!
//! A write turns the property `Busy`; after the settle delay the value is
//! stored and the property returns to `Ok`. Writes the instrument refuses
//! (slewing while parked, values out of range) turn the property `Alert`.
//! Every change is announced on the update channel.
//!
//! ## Dependency rule
//!
//! Depends on `taskqueue-app` (port traits) and `taskqueue-domain` only.

mod devices;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;

use taskqueue_app::ports::DeviceAccess;
use taskqueue_domain::device::Device;
use taskqueue_domain::error::DeviceError;
use taskqueue_domain::property::{ElementValue, Property, PropertyKind, PropertyState, PropertyUpdate};

pub use devices::VirtualDevice;

/// Busy→Ok delay used when none is configured.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

const UPDATE_CAPACITY: usize = 256;

/// In-memory device runtime. Cloning shares the same instruments.
#[derive(Clone)]
pub struct VirtualDevices {
    shared: Arc<Shared>,
}

struct Shared {
    devices: Mutex<Vec<VirtualDevice>>,
    updates: broadcast::Sender<PropertyUpdate>,
    available: AtomicBool,
    settle_delay: Duration,
}

impl Default for VirtualDevices {
    fn default() -> Self {
        Self::observatory(DEFAULT_SETTLE_DELAY)
    }
}

impl VirtualDevices {
    /// A runtime with no instruments.
    #[must_use]
    pub fn empty(settle_delay: Duration) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                devices: Mutex::new(Vec::new()),
                updates,
                available: AtomicBool::new(true),
                settle_delay,
            }),
        }
    }

    /// Telescope, camera and focuser simulators.
    #[must_use]
    pub fn observatory(settle_delay: Duration) -> Self {
        let runtime = Self::empty(settle_delay);
        runtime.register(VirtualDevice::telescope("Telescope Simulator"));
        runtime.register(VirtualDevice::camera("CCD Simulator"));
        runtime.register(VirtualDevice::focuser("Focuser Simulator"));
        runtime
    }

    /// Add an instrument at the end of the enumeration order.
    pub fn register(&self, device: VirtualDevice) {
        tracing::debug!(device = device.name(), "virtual device registered");
        self.lock().push(device);
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        self.shared.settle_delay
    }

    /// Simulate the whole runtime going down or coming back.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// Simulate a device dropping off or reconnecting.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::DeviceNotFound`] for an unknown name.
    pub fn set_connected(&self, name: &str, connected: bool) -> Result<(), DeviceError> {
        let mut devices = self.lock();
        let device = devices
            .iter_mut()
            .find(|d| d.name() == name)
            .ok_or_else(|| DeviceError::DeviceNotFound(name.to_string()))?;
        device.set_connected(connected);
        tracing::info!(device = name, connected, "virtual device connection changed");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<VirtualDevice>> {
        self.shared
            .devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, device: &str, property: &str) {
        let _ = self.shared.updates.send(PropertyUpdate {
            device: device.to_string(),
            property: property.to_string(),
        });
    }

    fn ensure_available(&self) -> Result<(), DeviceError> {
        if self.shared.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DeviceError::Unavailable)
        }
    }

    fn read(&self, device: &str, property: &str) -> Result<Property, DeviceError> {
        self.ensure_available()?;
        let devices = self.lock();
        let found = find_connected(&devices, device)?;
        found
            .property(property)
            .cloned()
            .ok_or_else(|| DeviceError::PropertyNotFound {
                device: device.to_string(),
                property: property.to_string(),
            })
    }

    /// Validate a write and mark the property `Busy`, or `Alert` when the
    /// instrument refuses it. Returns whether the write will settle.
    fn begin_write(
        &self,
        device: &str,
        property: &str,
        element: &str,
        value: &ElementValue,
    ) -> Result<bool, DeviceError> {
        self.ensure_available()?;
        let accepted = {
            let mut devices = self.lock();
            let index = devices
                .iter()
                .position(|d| d.name() == device)
                .ok_or_else(|| DeviceError::DeviceNotFound(device.to_string()))?;
            let target = &mut devices[index];
            if !target.info().connected {
                return Err(DeviceError::NotConnected(device.to_string()));
            }
            let current = target
                .property(property)
                .ok_or_else(|| DeviceError::PropertyNotFound {
                    device: device.to_string(),
                    property: property.to_string(),
                })?;
            if current.element(element).is_none() {
                return Err(DeviceError::ElementNotFound {
                    property: property.to_string(),
                    element: element.to_string(),
                });
            }
            if current.kind == PropertyKind::Light || current.kind != value.kind() {
                return Err(DeviceError::UnsupportedProperty(property.to_string()));
            }
            let accepted = target.admits(property, element, value);
            let state = if accepted {
                PropertyState::Busy
            } else {
                PropertyState::Alert
            };
            target.set_state(property, state);
            accepted
        };
        self.notify(device, property);
        Ok(accepted)
    }

    fn settle(&self, device: &str, property: &str, element: &str, value: ElementValue) {
        let changed = {
            let mut devices = self.lock();
            let Some(target) = devices.iter_mut().find(|d| d.name() == device) else {
                return;
            };
            target.apply(property, element, value)
        };
        tracing::debug!(device, property, element, "virtual write settled");
        for name in &changed {
            self.notify(device, name);
        }
    }
}

fn find_connected<'a>(devices: &'a [VirtualDevice], name: &str) -> Result<&'a VirtualDevice, DeviceError> {
    let found = devices
        .iter()
        .find(|d| d.name() == name)
        .ok_or_else(|| DeviceError::DeviceNotFound(name.to_string()))?;
    if found.info().connected {
        Ok(found)
    } else {
        Err(DeviceError::NotConnected(name.to_string()))
    }
}

impl DeviceAccess for VirtualDevices {
    async fn is_available(&self) -> bool {
        self.shared.available.load(Ordering::SeqCst)
    }

    async fn devices(&self) -> Result<Vec<Device>, DeviceError> {
        self.ensure_available()?;
        Ok(self.lock().iter().map(|d| d.info().clone()).collect())
    }

    async fn device(&self, name: &str) -> Result<Device, DeviceError> {
        self.ensure_available()?;
        self.lock()
            .iter()
            .find(|d| d.name() == name)
            .map(|d| d.info().clone())
            .ok_or_else(|| DeviceError::DeviceNotFound(name.to_string()))
    }

    async fn property(&self, device: &str, property: &str) -> Result<Property, DeviceError> {
        self.read(device, property)
    }

    async fn write(
        &self,
        device: &str,
        property: &str,
        element: &str,
        value: ElementValue,
    ) -> Result<(), DeviceError> {
        if !self.begin_write(device, property, element, &value)? {
            tracing::warn!(device, property, element, %value, "virtual device refused write");
            return Ok(());
        }
        let delay = self.shared.settle_delay;
        if delay.is_zero() {
            self.settle(device, property, element, value);
            return Ok(());
        }
        let runtime = self.clone();
        let (device, property, element) = (device.to_string(), property.to_string(), element.to_string());
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            runtime.settle(&device, &property, &element, value);
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PropertyUpdate> {
        self.shared.updates.subscribe()
    }
}
