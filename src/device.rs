//! The per-device record mutated throughout enumeration and transfers.

use crate::bus::ControllerId;
use crate::config::Configuration;
use crate::controller::{Direction, Pipe};
use crate::registry::SlotId;
use crate::usb::DeviceDescriptor;

/// Endpoint numbers run 0..=15 per direction.
pub const USB_MAX_ENDPOINTS: usize = 16;
/// Ports a single hub device can fan out to.
pub const USB_MAX_CHILDREN: usize = 8;

/// Bus speed negotiated at the port.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Speed {
    Low,
    #[default]
    Full,
    High,
    Super,
}

/// Completion state of the most recent transfer submitted for a device.
///
/// The dispatcher sets `Pending` before submission; the controller binding
/// moves it to a final state, either synchronously inside the submit call or
/// from its completion path while the dispatcher polls.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TransferStatus {
    #[default]
    Idle,
    Pending,
    Complete,
    Stalled,
    Failed,
}

/// One attached (or in-progress) USB device.
///
/// Records live in the [`crate::registry::DeviceRegistry`]; a record exists
/// from the moment the enumeration pipeline reserves a slot until the pipeline
/// fails or the device is removed.
#[derive(Debug)]
pub struct UsbDevice {
    /// Current bus address: 0 until SET_ADDRESS succeeds, then `slot + 1`.
    pub address: u8,
    pub speed: Speed,
    /// Host-order copy once enumeration has fetched and converted it.
    pub descriptor: DeviceDescriptor,
    /// Negotiated endpoint-0 max packet size, one of 8, 16, 32 or 64.
    pub ep0_packet_size: u16,
    pub ep_max_packet_in: [u16; USB_MAX_ENDPOINTS],
    pub ep_max_packet_out: [u16; USB_MAX_ENDPOINTS],
    toggle: [u16; 2],
    running: [u16; 2],
    /// Outcome of the last submitted transfer; see [`TransferStatus`].
    pub status: TransferStatus,
    /// Bytes actually moved by the last transfer.
    pub actual_len: usize,
    /// Cached string-descriptor language id. `None` until resolved; zero is a
    /// valid resolved value.
    pub(crate) langid: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial: Option<String>,
    pub(crate) controller: ControllerId,
    pub parent: Option<SlotId>,
    /// 1-based port on the parent hub; 0 for a root-port device.
    pub port: u8,
    pub children: [Option<SlotId>; USB_MAX_CHILDREN],
    /// Selected configuration, committed only after a fully successful parse.
    pub config: Option<Configuration>,
}

fn dir_index(direction: Direction) -> usize {
    match direction {
        Direction::Out => 0,
        Direction::In => 1,
    }
}

impl UsbDevice {
    pub(crate) fn new(controller: ControllerId) -> Self {
        UsbDevice {
            address: 0,
            speed: Speed::default(),
            descriptor: DeviceDescriptor::default(),
            ep0_packet_size: 0,
            ep_max_packet_in: [0; USB_MAX_ENDPOINTS],
            ep_max_packet_out: [0; USB_MAX_ENDPOINTS],
            toggle: [0; 2],
            running: [0; 2],
            status: TransferStatus::Idle,
            actual_len: 0,
            langid: None,
            manufacturer: None,
            product: None,
            serial: None,
            controller,
            parent: None,
            port: 0,
            children: [None; USB_MAX_CHILDREN],
            config: None,
        }
    }

    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    /// Max packet size for the channel a pipe addresses.
    pub fn max_packet(&self, pipe: Pipe) -> u16 {
        let ep = usize::from(pipe.endpoint & 0x0F);
        match pipe.direction {
            Direction::Out => self.ep_max_packet_out[ep],
            Direction::In => self.ep_max_packet_in[ep],
        }
    }

    /// Data-sequence parity of an endpoint; must alternate across transfers.
    pub fn toggle(&self, endpoint: u8, direction: Direction) -> bool {
        self.toggle[dir_index(direction)] >> (endpoint & 0x0F) & 1 != 0
    }

    pub fn set_toggle(&mut self, endpoint: u8, direction: Direction, value: bool) {
        let bit = 1u16 << (endpoint & 0x0F);
        if value {
            self.toggle[dir_index(direction)] |= bit;
        } else {
            self.toggle[dir_index(direction)] &= !bit;
        }
    }

    /// Clears every toggle in both directions, as SET_CONFIGURATION requires.
    pub(crate) fn reset_toggles(&mut self) {
        self.toggle = [0; 2];
    }

    pub fn endpoint_running(&self, endpoint: u8, direction: Direction) -> bool {
        self.running[dir_index(direction)] >> (endpoint & 0x0F) & 1 != 0
    }

    pub fn set_endpoint_running(&mut self, endpoint: u8, direction: Direction, value: bool) {
        let bit = 1u16 << (endpoint & 0x0F);
        if value {
            self.running[dir_index(direction)] |= bit;
        } else {
            self.running[dir_index(direction)] &= !bit;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn toggle_bits_are_per_endpoint_and_direction() {
        let mut dev = UsbDevice::new(ControllerId(0));
        dev.set_toggle(2, Direction::In, true);
        assert!(dev.toggle(2, Direction::In));
        assert!(!dev.toggle(2, Direction::Out));
        assert!(!dev.toggle(3, Direction::In));

        dev.reset_toggles();
        assert!(!dev.toggle(2, Direction::In));
    }

    #[test]
    fn max_packet_follows_pipe_direction() {
        let mut dev = UsbDevice::new(ControllerId(0));
        dev.ep_max_packet_in[1] = 64;
        dev.ep_max_packet_out[1] = 32;
        assert_eq!(dev.max_packet(Pipe::bulk(1, Direction::In)), 64);
        assert_eq!(dev.max_packet(Pipe::bulk(1, Direction::Out)), 32);
    }
}
