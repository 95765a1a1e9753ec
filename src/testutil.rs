//! Shared test scaffolding: a scripted fake device behind a controller
//! binding, a delay source that only counts, and minimal hub/registrar
//! collaborators.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::bus::UsbBus;
use crate::controller::{Delay, DeviceReqData, HostController, IntQueueId, Pipe};
use crate::device::{TransferStatus, UsbDevice};
use crate::enumeration::{DeviceRegistrar, HubSupport};
use crate::error::{Error, Result};
use crate::registry::SlotId;
use crate::usb::Setup;

/// Delay source that records how long it was asked to wait.
#[derive(Clone, Default)]
pub struct SharedDelay {
    total: Rc<Cell<u32>>,
}

impl SharedDelay {
    pub fn total_ms(&self) -> u32 {
        self.total.get()
    }
}

impl Delay for SharedDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.total.set(self.total.get() + ms);
    }
}

/// Fixed behavior for every submission, for dispatcher-level tests.
#[derive(Clone, Copy)]
pub enum StaticOutcome {
    Complete(usize),
    StayPending,
    SubmitError,
    Stall,
}

#[derive(Clone)]
pub struct StaticController {
    outcome: StaticOutcome,
    submissions: Rc<Cell<usize>>,
}

impl StaticController {
    pub fn new(outcome: StaticOutcome) -> Self {
        StaticController {
            outcome,
            submissions: Rc::new(Cell::new(0)),
        }
    }

    pub fn submissions(&self) -> usize {
        self.submissions.get()
    }

    fn apply(&mut self, dev: &mut UsbDevice) -> Result<()> {
        self.submissions.set(self.submissions.get() + 1);
        match self.outcome {
            StaticOutcome::Complete(len) => {
                dev.actual_len = len;
                dev.status = TransferStatus::Complete;
                Ok(())
            }
            StaticOutcome::StayPending => Ok(()),
            StaticOutcome::SubmitError => Err(Error::Io("submission rejected")),
            StaticOutcome::Stall => {
                dev.status = TransferStatus::Stalled;
                Ok(())
            }
        }
    }
}

impl HostController for StaticController {
    fn submit_control(
        &mut self,
        dev: &mut UsbDevice,
        _pipe: Pipe,
        _setup: Setup,
        _data: DeviceReqData<'_>,
    ) -> Result<()> {
        self.apply(dev)
    }

    fn submit_bulk(
        &mut self,
        dev: &mut UsbDevice,
        _pipe: Pipe,
        _data: DeviceReqData<'_>,
    ) -> Result<()> {
        self.apply(dev)
    }

    fn submit_interrupt(
        &mut self,
        dev: &mut UsbDevice,
        _pipe: Pipe,
        _buf: &mut [u8],
        _interval: u8,
    ) -> Result<()> {
        self.apply(dev)
    }

    fn create_int_queue(
        &mut self,
        _dev: &mut UsbDevice,
        _pipe: Pipe,
        _queue_len: usize,
        _element_size: usize,
        _interval: u8,
    ) -> Result<IntQueueId> {
        Ok(IntQueueId(0))
    }

    fn destroy_int_queue(&mut self, _dev: &mut UsbDevice, _queue: IntQueueId) -> Result<()> {
        Ok(())
    }

    fn poll_int_queue(
        &mut self,
        _dev: &mut UsbDevice,
        _queue: IntQueueId,
        _buf: &mut [u8],
    ) -> Result<Option<usize>> {
        Ok(None)
    }
}

/// Scripted device model served by [`FakeController`].
pub struct FakeState {
    /// 18-byte device descriptor, wire order.
    pub device_desc: [u8; 18],
    /// Full configuration blob, wire order, header total matching its length.
    pub config_desc: Vec<u8>,
    /// Raw string descriptor 0 (the language-id table).
    pub langids: Vec<u8>,
    /// Raw string descriptors by index.
    pub strings: Vec<(u8, Vec<u8>)>,
    /// Upcoming string reads (index != 0) that fail before one succeeds.
    pub string_failures: u8,
    /// Serve the configuration header with this total length instead.
    pub config_total_override: Option<u16>,
    pub fail_set_configuration: bool,
    /// Pretend nothing is attached: every submission reports `NoDevice`.
    pub absent: bool,
    /// Behave like a slot-based (xHCI-style) controller.
    pub slot_based: bool,

    pub setups: Vec<Setup>,
    pub alloc_device_calls: usize,
    next_queue: u32,
}

pub type SharedState = Rc<RefCell<FakeState>>;

impl FakeState {
    /// A full-speed stick: one configuration, one interface, two 512-byte
    /// bulk endpoints, manufacturer and product strings at 1 and 2, no
    /// serial.
    pub fn with_descriptors() -> Self {
        let device_desc: [u8; 18] = [
            18, 1, 0x00, 0x02, 0, 0, 0, 64, 0x6b, 0x1d, 0x04, 0x01, 0x01, 0x05, 1, 2, 0, 1,
        ];
        let mut config_desc = vec![9u8, 2, 0, 0, 1, 1, 0, 0x80, 25];
        config_desc.extend_from_slice(&[9, 4, 0, 0, 2, 0x08, 0x06, 0x50, 0]);
        config_desc.extend_from_slice(&[7, 5, 0x81, 0x02, 0x00, 0x02, 0]);
        config_desc.extend_from_slice(&[7, 5, 0x02, 0x02, 0x00, 0x02, 0]);
        let total = (config_desc.len() as u16).to_le_bytes();
        config_desc[2] = total[0];
        config_desc[3] = total[1];

        FakeState {
            device_desc,
            config_desc,
            langids: vec![4, 3, 0x09, 0x04],
            strings: Vec::new(),
            string_failures: 0,
            config_total_override: None,
            fail_set_configuration: false,
            absent: false,
            slot_based: false,
            setups: Vec::new(),
            alloc_device_calls: 0,
            next_queue: 0,
        }
    }
}

/// Raw string descriptor carrying ASCII text as UTF-16LE.
pub fn string_desc(text: &str) -> Vec<u8> {
    let mut desc = vec![(2 + 2 * text.len()) as u8, 3];
    for byte in text.bytes() {
        desc.push(byte);
        desc.push(0);
    }
    desc
}

pub struct FakeController {
    state: SharedState,
}

impl FakeController {
    pub fn new(state: FakeState) -> (Self, SharedState) {
        let shared = Rc::new(RefCell::new(state));
        (
            FakeController {
                state: shared.clone(),
            },
            shared,
        )
    }

    fn complete(dev: &mut UsbDevice, data: DeviceReqData<'_>, src: &[u8]) {
        let copied = match data {
            DeviceReqData::In(buf) => {
                let n = src.len().min(buf.len());
                buf[..n].copy_from_slice(&src[..n]);
                n
            }
            DeviceReqData::Out(buf) => buf.len(),
            DeviceReqData::NoData => 0,
        };
        dev.actual_len = copied;
        dev.status = TransferStatus::Complete;
    }
}

impl HostController for FakeController {
    fn alloc_device(&mut self, _dev: &mut UsbDevice) -> Result<()> {
        self.state.borrow_mut().alloc_device_calls += 1;
        Ok(())
    }

    fn supports_default_address(&self) -> bool {
        !self.state.borrow().slot_based
    }

    fn submit_control(
        &mut self,
        dev: &mut UsbDevice,
        _pipe: Pipe,
        setup: Setup,
        data: DeviceReqData<'_>,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.setups.push(setup);
        if state.absent {
            return Err(Error::NoDevice);
        }
        match setup.request {
            // GET_DESCRIPTOR
            0x06 => {
                let kind = ({ setup.value } >> 8) as u8;
                let index = { setup.value } as u8;
                match kind {
                    1 => {
                        let desc = state.device_desc;
                        Self::complete(dev, data, &desc);
                    }
                    2 => {
                        let mut blob = state.config_desc.clone();
                        if let Some(total) = state.config_total_override {
                            blob[2..4].copy_from_slice(&total.to_le_bytes());
                        }
                        Self::complete(dev, data, &blob);
                    }
                    3 => {
                        if index != 0 && state.string_failures > 0 {
                            state.string_failures -= 1;
                            dev.status = TransferStatus::Failed;
                            return Ok(());
                        }
                        let desc = if index == 0 {
                            Some(state.langids.clone())
                        } else {
                            state
                                .strings
                                .iter()
                                .find(|(i, _)| *i == index)
                                .map(|(_, d)| d.clone())
                        };
                        match desc {
                            Some(desc) => Self::complete(dev, data, &desc),
                            None => dev.status = TransferStatus::Stalled,
                        }
                    }
                    _ => dev.status = TransferStatus::Stalled,
                }
            }
            // SET_CONFIGURATION
            0x09 if state.fail_set_configuration => {
                dev.status = TransferStatus::Stalled;
            }
            _ => Self::complete(dev, data, &[]),
        }
        Ok(())
    }

    fn submit_bulk(
        &mut self,
        dev: &mut UsbDevice,
        _pipe: Pipe,
        data: DeviceReqData<'_>,
    ) -> Result<()> {
        if self.state.borrow().absent {
            return Err(Error::NoDevice);
        }
        let len = data.len();
        dev.actual_len = len;
        dev.status = TransferStatus::Complete;
        Ok(())
    }

    fn submit_interrupt(
        &mut self,
        dev: &mut UsbDevice,
        _pipe: Pipe,
        _buf: &mut [u8],
        _interval: u8,
    ) -> Result<()> {
        dev.status = TransferStatus::Complete;
        Ok(())
    }

    fn create_int_queue(
        &mut self,
        _dev: &mut UsbDevice,
        _pipe: Pipe,
        _queue_len: usize,
        _element_size: usize,
        _interval: u8,
    ) -> Result<IntQueueId> {
        let mut state = self.state.borrow_mut();
        let id = IntQueueId(state.next_queue);
        state.next_queue += 1;
        Ok(id)
    }

    fn destroy_int_queue(&mut self, _dev: &mut UsbDevice, _queue: IntQueueId) -> Result<()> {
        Ok(())
    }

    fn poll_int_queue(
        &mut self,
        _dev: &mut UsbDevice,
        _queue: IntQueueId,
        _buf: &mut [u8],
    ) -> Result<Option<usize>> {
        Ok(None)
    }
}

/// Bus with one fake controller and one allocated device slot.
pub fn fake_bus(state: FakeState) -> (UsbBus, SharedState, SlotId) {
    let mut bus = UsbBus::new(Box::new(SharedDelay::default()));
    let (controller, shared) = FakeController::new(state);
    let id = bus.attach_controller(Box::new(controller));
    let slot = bus.devices.allocate(id).unwrap();
    (bus, shared, slot)
}

/// Hub collaborator that only counts the resets it is asked for.
#[derive(Default)]
pub struct CountingHub {
    pub hub_resets: usize,
    pub root_resets: usize,
}

impl HubSupport for CountingHub {
    fn reset_hub_port(&mut self, _bus: &mut UsbBus, _parent: SlotId, _port: u8) -> Result<()> {
        self.hub_resets += 1;
        Ok(())
    }

    fn reset_root_port(&mut self, _bus: &mut UsbBus, _dev: SlotId) -> Result<()> {
        self.root_resets += 1;
        Ok(())
    }
}

/// Registrar collaborator recording what it was handed.
#[derive(Default)]
pub struct RecordingRegistrar {
    pub accepted: Vec<SlotId>,
    pub reject: bool,
}

impl DeviceRegistrar for RecordingRegistrar {
    fn register(&mut self, _bus: &mut UsbBus, dev: SlotId) -> Result<()> {
        if self.reject {
            return Err(Error::InvalidArgument("no driver wants the device"));
        }
        self.accepted.push(dev);
        Ok(())
    }
}
