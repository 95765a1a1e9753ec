//! Synchronous transfer dispatch and the standard/class request helpers
//! built on it.

use log::debug;

use crate::bus::UsbBus;
use crate::controller::{DeviceReqData, Direction, IntQueueId, Pipe};
use crate::device::TransferStatus;
use crate::error::{Error, Result};
use crate::registry::SlotId;
use crate::usb::setup::{
    SetupReq, USB_DIR_IN, USB_DIR_OUT, USB_FEAT_ENDPOINT_HALT, USB_RECIP_ENDPOINT,
    USB_RECIP_INTERFACE, USB_REQ_GET_REPORT, USB_REQ_SET_IDLE, USB_REQ_SET_PROTOCOL,
    USB_TYPE_CLASS,
};
use crate::usb::{DescriptorKind, Setup};

/// Default bounded wait for a control transfer, in milliseconds.
pub const USB_CNTL_TIMEOUT: u32 = 100;

impl UsbBus {
    /// Submits a control transfer and waits for completion, polling the
    /// device's status at 1 ms granularity for up to `timeout_ms`.
    ///
    /// With `timeout_ms == 0` the transfer is fire-and-forget: the requested
    /// length is returned right after submission and completion is never
    /// awaited. That mode is rejected while asynchronous transfers are
    /// disabled, because a caller is then relying on exclusive synchronous
    /// access to the control pipe.
    ///
    /// Returns the number of bytes actually transferred.
    #[allow(clippy::too_many_arguments)]
    pub fn control_msg(
        &mut self,
        slot: SlotId,
        pipe: Pipe,
        request: u8,
        request_type: u8,
        value: u16,
        index: u16,
        data: DeviceReqData<'_>,
        timeout_ms: u32,
    ) -> Result<usize> {
        if timeout_ms == 0 && !self.asynch_allowed {
            return Err(Error::InvalidArgument(
                "zero-timeout control transfer while asynchronous transfers are disabled",
            ));
        }
        let length = u16::try_from(data.len())
            .map_err(|_| Error::InvalidArgument("transfer buffer larger than 65535 bytes"))?;
        let setup = Setup {
            kind: request_type,
            request,
            value,
            index,
            length,
        };

        let dev = self
            .devices
            .get_mut(slot)
            .ok_or(Error::InvalidArgument("unknown device slot"))?;
        let ctrl = self
            .controllers
            .get_mut(dev.controller.index())
            .ok_or(Error::InvalidArgument("unknown controller"))?;

        dev.status = TransferStatus::Pending;
        ctrl.submit_control(dev, pipe, setup, data)?;

        if timeout_ms == 0 {
            return Ok(usize::from(length));
        }

        let mut remaining = timeout_ms;
        while remaining > 0 {
            if dev.status != TransferStatus::Pending {
                break;
            }
            self.delay.delay_ms(1);
            remaining -= 1;
        }
        if dev.status != TransferStatus::Complete {
            debug!("control transfer failed with status {:?}", dev.status);
            return Err(Error::Io("control transfer did not complete"));
        }
        Ok(dev.actual_len)
    }

    /// Submits a bulk transfer. Completion is observed through the same
    /// status-field convention as the control path; this wrapper does not
    /// poll for it.
    ///
    /// Returns the number of bytes actually transferred.
    pub fn bulk_msg(&mut self, slot: SlotId, pipe: Pipe, data: DeviceReqData<'_>) -> Result<usize> {
        if u16::try_from(data.len()).is_err() {
            return Err(Error::InvalidArgument("transfer buffer larger than 65535 bytes"));
        }
        let dev = self
            .devices
            .get_mut(slot)
            .ok_or(Error::InvalidArgument("unknown device slot"))?;
        let ctrl = self
            .controllers
            .get_mut(dev.controller.index())
            .ok_or(Error::InvalidArgument("unknown controller"))?;

        dev.status = TransferStatus::Pending;
        ctrl.submit_bulk(dev, pipe, data)?;
        Ok(dev.actual_len)
    }

    /// Submits a one-shot interrupt transfer.
    pub fn submit_int_msg(
        &mut self,
        slot: SlotId,
        pipe: Pipe,
        buf: &mut [u8],
        interval: u8,
    ) -> Result<()> {
        let dev = self
            .devices
            .get_mut(slot)
            .ok_or(Error::InvalidArgument("unknown device slot"))?;
        let ctrl = self
            .controllers
            .get_mut(dev.controller.index())
            .ok_or(Error::InvalidArgument("unknown controller"))?;
        ctrl.submit_interrupt(dev, pipe, buf, interval)
    }

    pub fn create_int_queue(
        &mut self,
        slot: SlotId,
        pipe: Pipe,
        queue_len: usize,
        element_size: usize,
        interval: u8,
    ) -> Result<IntQueueId> {
        let dev = self
            .devices
            .get_mut(slot)
            .ok_or(Error::InvalidArgument("unknown device slot"))?;
        let ctrl = self
            .controllers
            .get_mut(dev.controller.index())
            .ok_or(Error::InvalidArgument("unknown controller"))?;
        ctrl.create_int_queue(dev, pipe, queue_len, element_size, interval)
    }

    pub fn destroy_int_queue(&mut self, slot: SlotId, queue: IntQueueId) -> Result<()> {
        let dev = self
            .devices
            .get_mut(slot)
            .ok_or(Error::InvalidArgument("unknown device slot"))?;
        let ctrl = self
            .controllers
            .get_mut(dev.controller.index())
            .ok_or(Error::InvalidArgument("unknown controller"))?;
        ctrl.destroy_int_queue(dev, queue)
    }

    pub fn poll_int_queue(
        &mut self,
        slot: SlotId,
        queue: IntQueueId,
        buf: &mut [u8],
    ) -> Result<Option<usize>> {
        let dev = self
            .devices
            .get_mut(slot)
            .ok_or(Error::InvalidArgument("unknown device slot"))?;
        let ctrl = self
            .controllers
            .get_mut(dev.controller.index())
            .ok_or(Error::InvalidArgument("unknown controller"))?;
        ctrl.poll_int_queue(dev, queue, buf)
    }

    /// GET_DESCRIPTOR on the default control pipe.
    pub fn get_descriptor(
        &mut self,
        slot: SlotId,
        kind: DescriptorKind,
        index: u8,
        buf: &mut [u8],
    ) -> Result<usize> {
        self.control_msg(
            slot,
            Pipe::control_in(0),
            SetupReq::GetDescriptor as u8,
            USB_DIR_IN,
            ((kind as u16) << 8) | u16::from(index),
            0,
            DeviceReqData::In(buf),
            USB_CNTL_TIMEOUT,
        )
    }

    /// GET_DESCRIPTOR addressed to an interface, for class descriptors (HID
    /// report descriptors and the like).
    pub fn get_class_descriptor(
        &mut self,
        slot: SlotId,
        interface: u8,
        kind: u8,
        index: u8,
        buf: &mut [u8],
    ) -> Result<usize> {
        self.control_msg(
            slot,
            Pipe::control_in(0),
            SetupReq::GetDescriptor as u8,
            USB_DIR_IN | USB_RECIP_INTERFACE,
            (u16::from(kind) << 8) | u16::from(index),
            u16::from(interface),
            DeviceReqData::In(buf),
            USB_CNTL_TIMEOUT,
        )
    }

    /// SET_ADDRESS. Issued while the record still carries the default
    /// address; the pipeline assigns the new address only on success.
    pub(crate) fn set_address(&mut self, slot: SlotId, address: u8) -> Result<()> {
        debug!("set address {}", address);
        self.control_msg(
            slot,
            Pipe::control_out(0),
            SetupReq::SetAddress as u8,
            USB_DIR_OUT,
            u16::from(address),
            0,
            DeviceReqData::NoData,
            USB_CNTL_TIMEOUT,
        )?;
        Ok(())
    }

    /// SET_CONFIGURATION, resetting both toggle maps on success.
    pub(crate) fn set_configuration(&mut self, slot: SlotId, configuration: u8) -> Result<()> {
        debug!("set configuration {}", configuration);
        match self.control_msg(
            slot,
            Pipe::control_out(0),
            SetupReq::SetConfiguration as u8,
            USB_DIR_OUT,
            u16::from(configuration),
            0,
            DeviceReqData::NoData,
            USB_CNTL_TIMEOUT,
        ) {
            Ok(_) => {
                if let Some(dev) = self.devices.get_mut(slot) {
                    dev.reset_toggles();
                }
                Ok(())
            }
            Err(_) => Err(Error::Io("failed to set configuration")),
        }
    }

    /// SET_INTERFACE selecting an alternate setting.
    ///
    /// Skipped for interfaces with a single alternate setting: USB 2.0
    /// section 9.4.10 lets such devices STALL the request, and some sticks
    /// never recover from it during bring-up.
    pub fn set_interface(&mut self, slot: SlotId, interface: u8, alternate: u8) -> Result<()> {
        let dev = self
            .devices
            .get(slot)
            .ok_or(Error::InvalidArgument("unknown device slot"))?;
        let config = dev
            .config
            .as_ref()
            .ok_or(Error::InvalidArgument("device is not configured"))?;
        let iface = config
            .interface(interface)
            .ok_or(Error::InvalidArgument("no such interface"))?;
        if iface.alternate_count == 1 {
            return Ok(());
        }
        self.control_msg(
            slot,
            Pipe::control_out(0),
            SetupReq::SetInterface as u8,
            USB_RECIP_INTERFACE,
            u16::from(alternate),
            u16::from(interface),
            DeviceReqData::NoData,
            USB_CNTL_TIMEOUT * 5,
        )?;
        Ok(())
    }

    /// CLEAR_FEATURE(ENDPOINT_HALT) on the endpoint a pipe addresses.
    ///
    /// On success the endpoint is marked running and its toggle cleared.
    /// Deliberately does not read back endpoint status to verify the reset;
    /// some devices lock up on that check.
    pub fn clear_halt(&mut self, slot: SlotId, pipe: Pipe) -> Result<()> {
        let endp = u16::from(pipe.endpoint)
            | match pipe.direction {
                Direction::In => 0x80,
                Direction::Out => 0,
            };
        self.control_msg(
            slot,
            Pipe::control_out(0),
            SetupReq::ClearFeature as u8,
            USB_RECIP_ENDPOINT,
            USB_FEAT_ENDPOINT_HALT,
            endp,
            DeviceReqData::NoData,
            USB_CNTL_TIMEOUT * 3,
        )?;
        let dev = self
            .devices
            .get_mut(slot)
            .ok_or(Error::InvalidArgument("unknown device slot"))?;
        dev.set_endpoint_running(pipe.endpoint, pipe.direction, true);
        dev.set_toggle(pipe.endpoint, pipe.direction, false);
        Ok(())
    }

    /// HID SET_PROTOCOL (boot vs report protocol).
    pub fn set_protocol(&mut self, slot: SlotId, interface: u8, protocol: u16) -> Result<()> {
        self.control_msg(
            slot,
            Pipe::control_out(0),
            USB_REQ_SET_PROTOCOL,
            USB_TYPE_CLASS | USB_RECIP_INTERFACE,
            protocol,
            u16::from(interface),
            DeviceReqData::NoData,
            USB_CNTL_TIMEOUT,
        )?;
        Ok(())
    }

    /// HID SET_IDLE.
    pub fn set_idle(
        &mut self,
        slot: SlotId,
        interface: u8,
        duration: u8,
        report_id: u8,
    ) -> Result<()> {
        self.control_msg(
            slot,
            Pipe::control_out(0),
            USB_REQ_SET_IDLE,
            USB_TYPE_CLASS | USB_RECIP_INTERFACE,
            (u16::from(duration) << 8) | u16::from(report_id),
            u16::from(interface),
            DeviceReqData::NoData,
            USB_CNTL_TIMEOUT,
        )?;
        Ok(())
    }

    /// HID GET_REPORT.
    pub fn get_report(
        &mut self,
        slot: SlotId,
        interface: u8,
        report_type: u8,
        report_id: u8,
        buf: &mut [u8],
    ) -> Result<usize> {
        self.control_msg(
            slot,
            Pipe::control_in(0),
            USB_REQ_GET_REPORT,
            USB_DIR_IN | USB_TYPE_CLASS | USB_RECIP_INTERFACE,
            (u16::from(report_type) << 8) | u16::from(report_id),
            u16::from(interface),
            DeviceReqData::In(buf),
            USB_CNTL_TIMEOUT,
        )
    }
}
