//! Fixed-capacity table of device records.
//!
//! Addresses derive from slot positions (`slot + 1`), which keeps them unique
//! among live records without any separate allocator. A freed slot is
//! immediately reusable.

use log::debug;

use crate::bus::ControllerId;
use crate::device::UsbDevice;
use crate::error::{Error, Result};

/// Devices the bus will track at once, all controllers included.
pub const USB_MAX_DEVICE: usize = 32;

/// Handle to a slot in the [`DeviceRegistry`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SlotId(pub(crate) u8);

impl SlotId {
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The bus address a device in this slot gets assigned.
    pub fn address(self) -> u8 {
        self.0 + 1
    }
}

pub struct DeviceRegistry {
    slots: Vec<Option<UsbDevice>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::with_capacity(USB_MAX_DEVICE)
    }

    /// `capacity` is clamped to 127 so addresses stay in the USB range.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(127);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        DeviceRegistry { slots }
    }

    /// Reserves the first free slot and creates a fresh record in it.
    pub fn allocate(&mut self, controller: ControllerId) -> Result<SlotId> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::OutOfSpace("device table full"))?;
        let slot = SlotId(index as u8);
        debug!("new device slot {} (address {})", index, slot.address());
        self.slots[index] = Some(UsbDevice::new(controller));
        Ok(slot)
    }

    /// Returns the slot to the free pool. Safe to call on a freed slot.
    pub fn free(&mut self, slot: SlotId) {
        if let Some(entry) = self.slots.get_mut(slot.index()) {
            if entry.take().is_some() {
                debug!("freed device slot {}", slot.index());
            }
        }
    }

    pub fn get(&self, slot: SlotId) -> Option<&UsbDevice> {
        self.slots.get(slot.index())?.as_ref()
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut UsbDevice> {
        self.slots.get_mut(slot.index())?.as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &UsbDevice)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| Some((SlotId(index as u8), entry.as_ref()?)))
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|entry| entry.is_some()).count()
    }

    pub fn clear(&mut self) {
        for entry in &mut self.slots {
            *entry = None;
        }
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
