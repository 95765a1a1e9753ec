//! The binding between the bus layer and a concrete host-controller driver.
//!
//! Everything here is synchronous: a submit call either finishes the transfer
//! before returning or leaves the device record `Pending` for its completion
//! path to finalize while the dispatcher polls. There is no background task;
//! periodic (interrupt) endpoints are serviced by caller-driven polling of a
//! controller-managed queue.

use std::time::Duration;

use crate::device::{Speed, UsbDevice};
use crate::error::Result;
use crate::usb::{EndpointTy, Setup};

/// Direction of data flow on a pipe, seen from the host.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    Out,
    In,
}

/// One logical channel to a device: endpoint number, direction, transfer type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pipe {
    pub endpoint: u8,
    pub direction: Direction,
    pub ty: EndpointTy,
}

impl Pipe {
    pub const fn control_in(endpoint: u8) -> Self {
        Pipe {
            endpoint,
            direction: Direction::In,
            ty: EndpointTy::Ctrl,
        }
    }

    pub const fn control_out(endpoint: u8) -> Self {
        Pipe {
            endpoint,
            direction: Direction::Out,
            ty: EndpointTy::Ctrl,
        }
    }

    pub const fn bulk(endpoint: u8, direction: Direction) -> Self {
        Pipe {
            endpoint,
            direction,
            ty: EndpointTy::Bulk,
        }
    }

    pub const fn interrupt(endpoint: u8, direction: Direction) -> Self {
        Pipe {
            endpoint,
            direction,
            ty: EndpointTy::Interrupt,
        }
    }
}

/// Buffer argument of a transfer.
pub enum DeviceReqData<'a> {
    In(&'a mut [u8]),
    Out(&'a [u8]),
    NoData,
}

impl DeviceReqData<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::In(buf) => buf.len(),
            Self::Out(buf) => buf.len(),
            Self::NoData => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::In(_) => Direction::In,
            Self::Out(_) | Self::NoData => Direction::Out,
        }
    }
}

/// Handle to a controller-managed polled interrupt queue.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct IntQueueId(pub u32);

/// Millisecond-granularity delay source.
///
/// The dispatcher's busy-wait counts down against this, so tests can run
/// timeout paths without real time passing.
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// Delay source backed by the host clock.
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Operations a controller-family driver provides to the bus layer.
///
/// Implementations report completion through the device record: set
/// [`UsbDevice::status`] and [`UsbDevice::actual_len`], either before the
/// submit call returns or from the completion path the record is shared with.
/// A submit error return means the transfer never started.
pub trait HostController {
    /// Reserves controller-side state for a new device before any transfer.
    ///
    /// A no-op for classic controllers; slot-based families (xHCI) allocate
    /// their device context here.
    fn alloc_device(&mut self, _dev: &mut UsbDevice) -> Result<()> {
        Ok(())
    }

    /// Whether the controller can reach a device still at the default
    /// address. Slot-based families cannot, which makes the enumeration
    /// pipeline skip the early descriptor probe.
    fn supports_default_address(&self) -> bool {
        true
    }

    /// Speed of the device currently behind the root port.
    fn root_port_speed(&self) -> Speed {
        Speed::Full
    }

    fn submit_control(
        &mut self,
        dev: &mut UsbDevice,
        pipe: Pipe,
        setup: Setup,
        data: DeviceReqData<'_>,
    ) -> Result<()>;

    fn submit_bulk(&mut self, dev: &mut UsbDevice, pipe: Pipe, data: DeviceReqData<'_>)
        -> Result<()>;

    fn submit_interrupt(
        &mut self,
        dev: &mut UsbDevice,
        pipe: Pipe,
        buf: &mut [u8],
        interval: u8,
    ) -> Result<()>;

    /// Creates a queue of `queue_len` elements of `element_size` bytes that
    /// the controller fills from the given interrupt pipe.
    fn create_int_queue(
        &mut self,
        dev: &mut UsbDevice,
        pipe: Pipe,
        queue_len: usize,
        element_size: usize,
        interval: u8,
    ) -> Result<IntQueueId>;

    fn destroy_int_queue(&mut self, dev: &mut UsbDevice, queue: IntQueueId) -> Result<()>;

    /// Copies the next completed element into `buf`. `Ok(None)` means the
    /// queue has nothing new; the caller decides its own polling cadence.
    fn poll_int_queue(
        &mut self,
        dev: &mut UsbDevice,
        queue: IntQueueId,
        buf: &mut [u8],
    ) -> Result<Option<usize>>;
}
