use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::codes::{SUCCESS, UNKNOWN_DEVICE};
use crate::error::ConfigError;
use crate::object::{ObjectAddress, Request, Response};
use crate::registers::SERIAL_NUMBER;

/// Number of node slots in a registry. Node identifiers are `0..MAX_NODES`.
pub const MAX_NODES: usize = 16;

/// One virtual controller: a sparse map from register key to value.
///
/// Unwritten registers read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Controller {
    registers: HashMap<u32, u32>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// A controller whose serial-number object reads `serial`.
    pub fn with_serial(serial: u32) -> Self {
        Self::new().with_register(SERIAL_NUMBER, serial)
    }

    pub fn with_register(mut self, address: ObjectAddress, value: u32) -> Self {
        self.write(address, value);
        self
    }

    pub fn read(&self, address: ObjectAddress) -> u32 {
        self.registers.get(&address.key()).copied().unwrap_or(0)
    }

    pub fn write(&mut self, address: ObjectAddress, value: u32) {
        self.registers.insert(address.key(), value);
    }

    /// Number of registers that have been written.
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Written registers in address order.
    pub fn registers(&self) -> Vec<(ObjectAddress, u32)> {
        let mut out: Vec<_> = self
            .registers
            .iter()
            .map(|(&key, &value)| (ObjectAddress::from_key(key), value))
            .collect();
        out.sort_unstable();
        out
    }
}

/// Anything that can answer object requests.
pub trait ObjectStore {
    fn handle(&mut self, request: &Request) -> Response;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &mut S {
    fn handle(&mut self, request: &Request) -> Response {
        (**self).handle(request)
    }
}

/// Fixed table of node slots, each empty or holding a [`Controller`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRegistry {
    nodes: [Option<Controller>; MAX_NODES],
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    /// A registry with every slot empty.
    pub fn new() -> Self {
        Self {
            nodes: std::array::from_fn(|_| None),
        }
    }

    /// Install `controller` at `node`, returning whatever was there.
    pub fn configure(
        &mut self,
        node: u8,
        controller: Controller,
    ) -> Result<Option<Controller>, ConfigError> {
        let slot = self
            .nodes
            .get_mut(usize::from(node))
            .ok_or(ConfigError::NodeOutOfRange {
                node,
                max: (MAX_NODES - 1) as u8,
            })?;
        Ok(slot.replace(controller))
    }

    pub fn controller(&self, node: u8) -> Option<&Controller> {
        self.nodes.get(usize::from(node))?.as_ref()
    }

    pub fn controller_mut(&mut self, node: u8) -> Option<&mut Controller> {
        self.nodes.get_mut(usize::from(node))?.as_mut()
    }

    pub fn is_configured(&self, node: u8) -> bool {
        self.controller(node).is_some()
    }

    /// Identifiers of configured nodes, ascending.
    pub fn nodes(&self) -> impl Iterator<Item = u8> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(node, _)| node as u8)
    }

    /// Read a register, returning `(value, error)`.
    ///
    /// An unconfigured or out-of-range node reads `(0, UNKNOWN_DEVICE)`.
    pub fn read(&self, node: u8, address: ObjectAddress) -> (u32, u32) {
        match self.controller(node) {
            Some(controller) => (controller.read(address), SUCCESS),
            None => {
                debug!(node, %address, "read from unknown device");
                (0, UNKNOWN_DEVICE)
            }
        }
    }

    /// Write a register, returning the error code.
    ///
    /// Writes to an unconfigured node change nothing.
    pub fn write(&mut self, node: u8, address: ObjectAddress, value: u32) -> u32 {
        match self.controller_mut(node) {
            Some(controller) => {
                controller.write(address, value);
                SUCCESS
            }
            None => {
                debug!(node, %address, value, "write to unknown device");
                UNKNOWN_DEVICE
            }
        }
    }
}

impl ObjectStore for DeviceRegistry {
    fn handle(&mut self, request: &Request) -> Response {
        match *request {
            Request::ReadObject { node, address } => {
                let (value, error) = self.read(node, address);
                Response::ReadObject { error, value }
            }
            Request::WriteObject {
                node,
                address,
                value,
            } => Response::WriteObject {
                error: self.write(node, address, value),
            },
        }
    }
}

/// A registry shared between simulator links.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<DeviceRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: DeviceRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Lock the registry. A panic in another holder does not poison it.
    pub fn lock(&self) -> MutexGuard<'_, DeviceRegistry> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current registry contents.
    pub fn snapshot(&self) -> DeviceRegistry {
        self.lock().clone()
    }
}

impl From<DeviceRegistry> for SharedRegistry {
    fn from(registry: DeviceRegistry) -> Self {
        Self::new(registry)
    }
}

impl ObjectStore for SharedRegistry {
    fn handle(&mut self, request: &Request) -> Response {
        self.lock().handle(request)
    }
}
