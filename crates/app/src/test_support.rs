//! In-memory fakes for the ports, shared by the unit tests of this crate.

use std::collections::HashMap;
use std::future::{Future, ready};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};

use taskqueue_domain::capability::CapabilityMask;
use taskqueue_domain::collection::Collection;
use taskqueue_domain::device::Device;
use taskqueue_domain::error::{DeviceError, ProcessError, TaskQueueError};
use taskqueue_domain::property::{
    ElementValue, Property, PropertyKind, PropertyState, PropertyUpdate, SwitchRule,
};
use taskqueue_domain::queue::QueueSnapshot;

use crate::ports::{
    DeviceAccess, OutputLine, OutputStream, ProcessCommand, ProcessExit, ProcessRunner, QueueStore,
    TemplateDocument, TemplateStore,
};

pub type Write = (String, String, String, ElementValue);

/// How the fake devices react to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBehavior {
    /// Apply the value and report `Ok`.
    Settle,
    /// Keep the value and report `Alert`.
    Alert,
    /// Keep the value and stay `Busy` forever.
    Ignore,
}

struct DeviceState {
    available: bool,
    availability_delay: Option<Duration>,
    devices: Vec<(Device, Vec<Property>)>,
    writes: Vec<Write>,
    write_behavior: WriteBehavior,
}

#[derive(Clone)]
pub struct FakeDevices {
    state: Arc<Mutex<DeviceState>>,
    updates: broadcast::Sender<PropertyUpdate>,
}

impl FakeDevices {
    pub fn empty() -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                available: true,
                availability_delay: None,
                devices: Vec::new(),
                writes: Vec::new(),
                write_behavior: WriteBehavior::Settle,
            })),
            updates,
        }
    }

    /// A parked telescope, a warm camera and a focuser at zero.
    pub fn observatory() -> Self {
        let devices = Self::empty();
        devices.add(
            Device::new("Telescope Simulator", CapabilityMask::TELESCOPE),
            vec![
                Property::new("TELESCOPE_PARK", PropertyKind::Switch)
                    .with_rule(SwitchRule::OneOfMany)
                    .with_state(PropertyState::Ok)
                    .with_element("PARK", ElementValue::Switch(false))
                    .with_element("UNPARK", ElementValue::Switch(true)),
            ],
        );
        devices.add(
            Device::new("CCD Simulator", CapabilityMask::CCD | CapabilityMask::GUIDER),
            vec![
                Property::new("CCD_TEMPERATURE", PropertyKind::Number)
                    .with_state(PropertyState::Ok)
                    .with_element("CCD_TEMPERATURE_VALUE", ElementValue::Number(20.0)),
            ],
        );
        devices.add(
            Device::new("Focuser Simulator", CapabilityMask::FOCUSER),
            vec![
                Property::new("ABS_FOCUS_POSITION", PropertyKind::Number)
                    .with_state(PropertyState::Ok)
                    .with_element("FOCUS_ABSOLUTE_POSITION", ElementValue::Number(0.0)),
            ],
        );
        devices
    }

    pub fn add(&self, device: Device, properties: Vec<Property>) {
        self.state.lock().unwrap().devices.push((device, properties));
    }

    pub fn set_available(&self, available: bool) {
        self.state.lock().unwrap().available = available;
    }

    /// Make the availability check take `delay` before answering.
    pub fn delay_availability(&self, delay: Duration) {
        self.state.lock().unwrap().availability_delay = Some(delay);
    }

    pub fn set_connected(&self, device: &str, connected: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some((found, _)) = state.devices.iter_mut().find(|(d, _)| d.name == device) {
            found.connected = connected;
        }
    }

    pub fn set_write_behavior(&self, behavior: WriteBehavior) {
        self.state.lock().unwrap().write_behavior = behavior;
    }

    pub fn set_element(&self, device: &str, property: &str, element: &str, value: ElementValue) {
        self.modify(device, property, |prop| {
            if let Some(found) = prop.element_mut(element) {
                found.value = value;
            }
        });
    }

    pub fn set_state(&self, device: &str, property: &str, state: PropertyState) {
        self.modify(device, property, |prop| prop.state = state);
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state.lock().unwrap().writes.clone()
    }

    fn modify(&self, device: &str, property: &str, change: impl FnOnce(&mut Property)) {
        {
            let mut state = self.state.lock().unwrap();
            let found = state
                .devices
                .iter_mut()
                .filter(|(d, _)| d.name == device)
                .flat_map(|(_, props)| props.iter_mut())
                .find(|p| p.name == property);
            if let Some(prop) = found {
                change(prop);
            }
        }
        let _ = self.updates.send(PropertyUpdate {
            device: device.to_string(),
            property: property.to_string(),
        });
    }

    fn lookup(&self, device: &str, property: &str) -> Result<Property, DeviceError> {
        let state = self.state.lock().unwrap();
        let (found, properties) = state
            .devices
            .iter()
            .find(|(d, _)| d.name == device)
            .ok_or_else(|| DeviceError::DeviceNotFound(device.to_string()))?;
        if !found.connected {
            return Err(DeviceError::NotConnected(device.to_string()));
        }
        properties
            .iter()
            .find(|p| p.name == property)
            .cloned()
            .ok_or_else(|| DeviceError::PropertyNotFound {
                device: device.to_string(),
                property: property.to_string(),
            })
    }

    fn apply_write(
        &self,
        device: &str,
        property: &str,
        element: &str,
        value: ElementValue,
    ) -> Result<(), DeviceError> {
        let current = self.lookup(device, property)?;
        if current.element(element).is_none() {
            return Err(DeviceError::ElementNotFound {
                property: property.to_string(),
                element: element.to_string(),
            });
        }
        let behavior = {
            let mut state = self.state.lock().unwrap();
            state.writes.push((
                device.to_string(),
                property.to_string(),
                element.to_string(),
                value.clone(),
            ));
            state.write_behavior
        };
        self.modify(device, property, |prop| match behavior {
            WriteBehavior::Settle => {
                if prop.rule == SwitchRule::OneOfMany && value == ElementValue::Switch(true) {
                    for other in &mut prop.elements {
                        other.value = ElementValue::Switch(false);
                    }
                }
                if let Some(found) = prop.element_mut(element) {
                    found.value = value;
                }
                prop.state = PropertyState::Ok;
            }
            WriteBehavior::Alert => prop.state = PropertyState::Alert,
            WriteBehavior::Ignore => prop.state = PropertyState::Busy,
        });
        Ok(())
    }
}

impl DeviceAccess for FakeDevices {
    fn is_available(&self) -> impl Future<Output = bool> + Send {
        let (available, delay) = {
            let state = self.state.lock().unwrap();
            (state.available, state.availability_delay)
        };
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            available
        }
    }

    fn devices(&self) -> impl Future<Output = Result<Vec<Device>, DeviceError>> + Send {
        let state = self.state.lock().unwrap();
        ready(if state.available {
            Ok(state.devices.iter().map(|(d, _)| d.clone()).collect())
        } else {
            Err(DeviceError::Unavailable)
        })
    }

    fn device(&self, name: &str) -> impl Future<Output = Result<Device, DeviceError>> + Send {
        let state = self.state.lock().unwrap();
        ready(
            state
                .devices
                .iter()
                .find(|(d, _)| d.name == name)
                .map(|(d, _)| d.clone())
                .ok_or_else(|| DeviceError::DeviceNotFound(name.to_string())),
        )
    }

    fn property(
        &self,
        device: &str,
        property: &str,
    ) -> impl Future<Output = Result<Property, DeviceError>> + Send {
        ready(self.lookup(device, property))
    }

    fn write(
        &self,
        device: &str,
        property: &str,
        element: &str,
        value: ElementValue,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send {
        ready(self.apply_write(device, property, element, value))
    }

    fn subscribe(&self) -> broadcast::Receiver<PropertyUpdate> {
        self.updates.subscribe()
    }
}

/// What a fake script does once started.
#[derive(Debug, Clone)]
pub enum ScriptBehavior {
    Exit { lines: Vec<String>, exit: ProcessExit },
    /// Never exits on its own.
    Hang,
}

#[derive(Default)]
struct ProcessState {
    scripts: HashMap<PathBuf, ScriptBehavior>,
    checks: HashMap<PathBuf, usize>,
}

#[derive(Clone, Default)]
pub struct FakeProcesses {
    state: Arc<Mutex<ProcessState>>,
    running: Arc<AtomicUsize>,
}

impl FakeProcesses {
    pub fn install(&self, path: impl Into<PathBuf>, behavior: ScriptBehavior) {
        self.state.lock().unwrap().scripts.insert(path.into(), behavior);
    }

    /// How many times `path` was checked before a run.
    pub fn checks(&self, path: impl AsRef<Path>) -> usize {
        self.state
            .lock()
            .unwrap()
            .checks
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }

    /// Processes started and not yet finished or killed.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

struct Running(Arc<AtomicUsize>);

impl Drop for Running {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ProcessRunner for FakeProcesses {
    fn check_executable(&self, path: &Path) -> impl Future<Output = Result<(), ProcessError>> + Send {
        let mut state = self.state.lock().unwrap();
        *state.checks.entry(path.to_path_buf()).or_default() += 1;
        ready(if state.scripts.contains_key(path) {
            Ok(())
        } else {
            Err(ProcessError::NotFound(path.to_path_buf()))
        })
    }

    fn run(
        &self,
        command: &ProcessCommand,
        output: mpsc::UnboundedSender<OutputLine>,
    ) -> impl Future<Output = Result<ProcessExit, ProcessError>> + Send {
        let behavior = self.state.lock().unwrap().scripts.get(&command.program).cloned();
        let program = command.program.clone();
        let running = Arc::clone(&self.running);
        async move {
            running.fetch_add(1, Ordering::SeqCst);
            let _running = Running(running);
            match behavior {
                None => Err(ProcessError::NotFound(program)),
                Some(ScriptBehavior::Exit { lines, exit }) => {
                    for line in lines {
                        let _ = output.send(OutputLine {
                            stream: OutputStream::Stdout,
                            line,
                        });
                    }
                    Ok(exit)
                }
                Some(ScriptBehavior::Hang) => std::future::pending().await,
            }
        }
    }
}

/// Template documents held in memory.
#[derive(Clone, Default)]
pub struct MemoryTemplateStore {
    pub system: Arc<Mutex<Vec<TemplateDocument>>>,
    pub user: Arc<Mutex<Vec<TemplateDocument>>>,
    pub catalog: Arc<Mutex<Option<Value>>>,
    pub removed: Arc<Mutex<Vec<String>>>,
    pub fail_writes: Arc<Mutex<bool>>,
}

impl MemoryTemplateStore {
    pub fn with_system(documents: Vec<Value>) -> Self {
        let store = Self::default();
        *store.system.lock().unwrap() = documents
            .into_iter()
            .enumerate()
            .map(|(index, content)| TemplateDocument {
                source: format!("system-{index}.json"),
                content,
            })
            .collect();
        store
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn system_documents(
        &self,
    ) -> impl Future<Output = Result<Vec<TemplateDocument>, TaskQueueError>> + Send {
        ready(Ok(self.system.lock().unwrap().clone()))
    }

    fn user_documents(
        &self,
    ) -> impl Future<Output = Result<Vec<TemplateDocument>, TaskQueueError>> + Send {
        ready(Ok(self.user.lock().unwrap().clone()))
    }

    fn write_user_catalog(&self, catalog: &Value) -> impl Future<Output = Result<(), TaskQueueError>> + Send {
        let result = if *self.fail_writes.lock().unwrap() {
            Err(TaskQueueError::storage(std::io::Error::other("disk full")))
        } else {
            *self.catalog.lock().unwrap() = Some(catalog.clone());
            Ok(())
        };
        ready(result)
    }

    fn remove_user_template(&self, id: &str) -> impl Future<Output = Result<bool, TaskQueueError>> + Send {
        self.removed.lock().unwrap().push(id.to_string());
        ready(Ok(false))
    }
}

/// Queue files held in memory, keyed by path.
#[derive(Clone, Default)]
pub struct MemoryQueueStore {
    pub queues: Arc<Mutex<HashMap<PathBuf, QueueSnapshot>>>,
    pub collections: Arc<Mutex<HashMap<PathBuf, Collection>>>,
}

impl QueueStore for MemoryQueueStore {
    fn save_queue(
        &self,
        path: &Path,
        snapshot: &QueueSnapshot,
    ) -> impl Future<Output = Result<(), TaskQueueError>> + Send {
        self.queues
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), snapshot.clone());
        ready(Ok(()))
    }

    fn load_queue(&self, path: &Path) -> impl Future<Output = Result<QueueSnapshot, TaskQueueError>> + Send {
        ready(
            self.queues
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| TaskQueueError::storage(std::io::Error::from(std::io::ErrorKind::NotFound))),
        )
    }

    fn load_collection(&self, path: &Path) -> impl Future<Output = Result<Collection, TaskQueueError>> + Send {
        ready(
            self.collections
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| TaskQueueError::storage(std::io::Error::from(std::io::ErrorKind::NotFound))),
        )
    }
}
