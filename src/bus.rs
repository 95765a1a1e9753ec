//! Bus-wide state: the controller bindings, the device registry, the delay
//! source and the asynchronous-transfer guard.

use crate::controller::{Delay, HostController};
use crate::device::UsbDevice;
use crate::registry::{DeviceRegistry, SlotId};

/// Handle to a controller attached to the bus.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ControllerId(pub(crate) usize);

impl ControllerId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The one logical thread of control over all attached controllers.
///
/// There is no locking anywhere in this layer: callers drive every operation
/// to completion before starting the next one. The only shared-state
/// discipline is the asynchronous-transfer guard (see
/// [`UsbBus::disable_asynch`]), which callers use to fence off multi-step
/// command sequences from fire-and-forget control transfers.
pub struct UsbBus {
    pub(crate) controllers: Vec<Box<dyn HostController>>,
    pub(crate) devices: DeviceRegistry,
    pub(crate) delay: Box<dyn Delay>,
    pub(crate) asynch_allowed: bool,
    pub(crate) started: bool,
}

impl UsbBus {
    pub fn new(delay: Box<dyn Delay>) -> Self {
        UsbBus {
            controllers: Vec::new(),
            devices: DeviceRegistry::new(),
            delay,
            asynch_allowed: true,
            started: false,
        }
    }

    /// Registers an initialized controller binding with the bus.
    pub fn attach_controller(&mut self, controller: Box<dyn HostController>) -> ControllerId {
        self.controllers.push(controller);
        ControllerId(self.controllers.len() - 1)
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    /// Disables (or re-enables) zero-timeout control transfers and returns
    /// the previous setting so nested callers can restore it on exit.
    ///
    /// A caller that needs several uninterrupted control/bulk steps in a row
    /// disables asynchronous transfers for the duration of the sequence.
    pub fn disable_asynch(&mut self, disable: bool) -> bool {
        let old_value = self.asynch_allowed;
        self.asynch_allowed = !disable;
        old_value
    }

    /// Whether a scan has found at least one device since the last stop.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn device(&self, slot: SlotId) -> Option<&UsbDevice> {
        self.devices.get(slot)
    }

    pub fn device_mut(&mut self, slot: SlotId) -> Option<&mut UsbDevice> {
        self.devices.get_mut(slot)
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }
}
