//! The bring-up pipeline: everything between "a port has a device" and "the
//! registrar owns a configured device".
//!
//! Enumeration is strictly sequential and synchronous. Each stage mutates the
//! device record; any stage failing releases the record's slot, so callers
//! never observe a half-enumerated device.

use log::{debug, error, info, warn};

use crate::bus::{ControllerId, UsbBus};
use crate::config::{resolve_max_packets, Configuration, CONFIG_TOTAL_LEN_CAP};
use crate::device::{Speed, USB_MAX_CHILDREN};
use crate::error::{Error, Result};
use crate::registry::SlotId;
use crate::usb::{
    DescriptorKind, DeviceDescriptor, DeviceDescriptor8Byte, CONFIG_DESC_SIZE, DEVICE_DESC_SIZE,
};

/// Quiet period after SET_ADDRESS before the device must answer again.
const SET_ADDRESS_SETTLE_MS: u32 = 10;
/// Bytes requested by the initial descriptor probe; the reply may legally be
/// a single 8-byte packet.
const DESCRIPTOR_PROBE_LEN: usize = 64;

/// Port-reset entry points supplied by the hub module.
///
/// Both calls may reenter the bus (a hub reset sequence issues its own
/// control transfers), which is why they receive it back.
pub trait HubSupport {
    /// Resets the given 1-based port on a parent hub device.
    fn reset_hub_port(&mut self, bus: &mut UsbBus, parent: SlotId, port: u8) -> Result<()>;

    /// Resets the root port behind which `dev` sits.
    fn reset_root_port(&mut self, bus: &mut UsbBus, dev: SlotId) -> Result<()>;
}

/// Upstream owner of finished devices; typically classifies them into class
/// drivers and probes hubs for further devices.
pub trait DeviceRegistrar {
    /// Takes ownership of a fully enumerated device. Rejecting it fails the
    /// enumeration and releases the device's slot.
    fn register(&mut self, bus: &mut UsbBus, dev: SlotId) -> Result<()>;
}

impl UsbBus {
    /// Runs the whole pipeline for one newly discovered device.
    ///
    /// `parent` is `None` for a root-port device, otherwise the hub the
    /// device hangs off together with its 1-based `port`. Returns the slot of
    /// the registered device; on any failure the slot is released and the
    /// error of the failing stage propagates.
    pub fn setup_new_device(
        &mut self,
        controller: ControllerId,
        parent: Option<SlotId>,
        port: u8,
        speed: Speed,
        hub: &mut dyn HubSupport,
        registrar: &mut dyn DeviceRegistrar,
    ) -> Result<SlotId> {
        if controller.index() >= self.controllers.len() {
            return Err(Error::InvalidArgument("unknown controller"));
        }
        let slot = self.devices.allocate(controller)?;
        {
            let dev = self
                .devices
                .get_mut(slot)
                .ok_or(Error::InvalidArgument("unknown device slot"))?;
            dev.speed = speed;
            dev.parent = parent;
            dev.port = port;
        }

        match self.enumerate(slot, parent, port, hub, registrar) {
            Ok(()) => {
                self.link_child(parent, port, slot);
                info!("usb device at address {} ready", slot.address());
                Ok(slot)
            }
            Err(err) => {
                debug!("enumeration failed: {}", err);
                self.devices.free(slot);
                Err(err)
            }
        }
    }

    fn enumerate(
        &mut self,
        slot: SlotId,
        parent: Option<SlotId>,
        port: u8,
        hub: &mut dyn HubSupport,
        registrar: &mut dyn DeviceRegistrar,
    ) -> Result<()> {
        self.prepare_device(slot, parent, port, hub)?;
        self.select_config(slot)?;
        registrar.register(self, slot)
    }

    /// Stages up to and including addressing: device-context reservation,
    /// descriptor probe, port reset, SET_ADDRESS plus settle delay.
    fn prepare_device(
        &mut self,
        slot: SlotId,
        parent: Option<SlotId>,
        port: u8,
        hub: &mut dyn HubSupport,
    ) -> Result<()> {
        let probe = {
            let dev = self
                .devices
                .get_mut(slot)
                .ok_or(Error::InvalidArgument("unknown device slot"))?;
            let ctrl = self
                .controllers
                .get_mut(dev.controller.index())
                .ok_or(Error::InvalidArgument("unknown controller"))?;
            // slot-based controllers reserve their device context up front
            ctrl.alloc_device(dev)?;
            ctrl.supports_default_address()
        };

        self.setup_descriptor(slot, probe)?;

        match parent {
            Some(parent) => hub.reset_hub_port(self, parent, port)?,
            None => hub.reset_root_port(self, slot)?,
        }

        let address = slot.address();
        if let Err(err) = self.set_address(slot, address) {
            warn!("device not accepting address {}: {}", address, err);
            return Err(err);
        }
        if let Some(dev) = self.devices.get_mut(slot) {
            dev.address = address;
        }
        // let SET_ADDRESS settle before talking to the device again
        self.delay.delay_ms(SET_ADDRESS_SETTLE_MS);
        Ok(())
    }

    /// Establishes the endpoint-0 max packet size.
    ///
    /// The provisional value comes from the speed class. When the controller
    /// can talk to an unaddressed device, a 64-byte GET_DESCRIPTOR refines it
    /// from the real bMaxPacketSize0: the descriptor is 18 bytes so the
    /// request ends in a short packet, but before the real packet size is
    /// known only a single packet of at least 8 bytes is guaranteed, and
    /// those 8 bytes are all this stage needs.
    fn setup_descriptor(&mut self, slot: SlotId, probe: bool) -> Result<()> {
        {
            let dev = self
                .devices
                .get_mut(slot)
                .ok_or(Error::InvalidArgument("unknown device slot"))?;
            let provisional: u16 = if dev.speed == Speed::Low { 8 } else { 64 };
            dev.descriptor.packet_size = provisional as u8;
            dev.ep0_packet_size = provisional;
            dev.ep_max_packet_in[0] = provisional;
            dev.ep_max_packet_out[0] = provisional;
        }

        if probe {
            let mut buf = [0u8; DESCRIPTOR_PROBE_LEN];
            let len = self.get_descriptor(slot, DescriptorKind::Device, 0, &mut buf)?;
            if len < 8 {
                warn!("device descriptor short read ({} of 8 bytes)", len);
                return Err(Error::Io("device descriptor short read"));
            }
            let short: &DeviceDescriptor8Byte = plain::from_bytes(&buf[..8])
                .map_err(|_| Error::Io("device descriptor short read"))?;
            let dev = self
                .devices
                .get_mut(slot)
                .ok_or(Error::InvalidArgument("unknown device slot"))?;
            dev.descriptor.length = short.length;
            dev.descriptor.kind = short.kind;
            // multi-byte fields stay wire order until the full fetch
            dev.descriptor.usb = short.usb;
            dev.descriptor.class = short.class;
            dev.descriptor.sub_class = short.sub_class;
            dev.descriptor.protocol = short.protocol;
            dev.descriptor.packet_size = short.packet_size;
        }

        let dev = self
            .devices
            .get_mut(slot)
            .ok_or(Error::InvalidArgument("unknown device slot"))?;
        let packet_size = dev.descriptor.packet_size;
        match packet_size {
            8 | 16 | 32 | 64 => {}
            _ => {
                warn!("invalid endpoint-0 max packet size {}", packet_size);
                return Err(Error::Io("invalid endpoint-0 max packet size"));
            }
        }
        dev.ep0_packet_size = u16::from(packet_size);
        dev.ep_max_packet_in[0] = dev.ep0_packet_size;
        dev.ep_max_packet_out[0] = dev.ep0_packet_size;
        debug!("endpoint-0 max packet size {}", packet_size);
        Ok(())
    }

    /// Post-addressing stages: full descriptor fetch, configuration fetch and
    /// parse, SET_CONFIGURATION, string resolution.
    fn select_config(&mut self, slot: SlotId) -> Result<()> {
        let mut buf = [0u8; DEVICE_DESC_SIZE];
        let len = self.get_descriptor(slot, DescriptorKind::Device, 0, &mut buf)?;
        if len < DEVICE_DESC_SIZE {
            warn!(
                "device descriptor short read (expected {}, got {})",
                DEVICE_DESC_SIZE, len
            );
            return Err(Error::Io("device descriptor short read"));
        }
        let mut desc: DeviceDescriptor = *plain::from_bytes(&buf)
            .map_err(|_| Error::Io("device descriptor short read"))?;
        desc.correct_byte_order();
        let (vendor, product) = (desc.vendor, desc.product);
        if let Some(dev) = self.devices.get_mut(slot) {
            dev.descriptor = desc;
        }

        // only one configuration is supported; drivers wanting another one
        // select it themselves
        let raw = match self.fetch_configuration(slot) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    "cannot read configuration, skipping device {:04x}:{:04x}",
                    vendor, product
                );
                return Err(err);
            }
        };
        let staged = Configuration::parse(&raw)?;
        let configuration_value = staged.configuration_value;
        {
            let dev = self
                .devices
                .get_mut(slot)
                .ok_or(Error::InvalidArgument("unknown device slot"))?;
            resolve_max_packets(dev, &staged);
            dev.config = Some(staged);
        }
        self.set_configuration(slot, configuration_value)?;

        let (manufacturer_str, product_str, serial_str) = {
            let dev = self
                .devices
                .get(slot)
                .ok_or(Error::InvalidArgument("unknown device slot"))?;
            (
                dev.descriptor.manufacturer_str,
                dev.descriptor.product_str,
                dev.descriptor.serial_str,
            )
        };
        debug!(
            "device strings: manufacturer={} product={} serial={}",
            manufacturer_str, product_str, serial_str
        );
        // a zero index means the string does not exist; a failed read is
        // logged by the resolver and the device kept
        let manufacturer = self.optional_string(slot, manufacturer_str);
        let product = self.optional_string(slot, product_str);
        let serial = self.optional_string(slot, serial_str);
        if let Some(dev) = self.devices.get_mut(slot) {
            dev.manufacturer = manufacturer;
            dev.product = product;
            dev.serial = serial;
        }
        Ok(())
    }

    fn optional_string(&mut self, slot: SlotId, index: u8) -> Option<String> {
        if index == 0 {
            return None;
        }
        match self.string(slot, index) {
            Ok(text) => Some(text),
            Err(err) => {
                debug!("string descriptor {} unreadable: {}", index, err);
                None
            }
        }
    }

    /// Fetches the 9-byte configuration header to learn the declared total
    /// length, validates it, then fetches the whole blob at exactly that
    /// size.
    fn fetch_configuration(&mut self, slot: SlotId) -> Result<Vec<u8>> {
        let mut header = [0u8; CONFIG_DESC_SIZE];
        let len = self.get_descriptor(slot, DescriptorKind::Configuration, 0, &mut header)?;
        if len < CONFIG_DESC_SIZE {
            warn!(
                "configuration descriptor too short (expected {}, got {})",
                CONFIG_DESC_SIZE, len
            );
            return Err(Error::Io("configuration descriptor short read"));
        }
        let total = usize::from(u16::from_le_bytes([header[2], header[3]]));
        if total > CONFIG_TOTAL_LEN_CAP {
            warn!("configuration descriptor too long ({} bytes)", total);
            return Err(Error::Io("configuration descriptor too long"));
        }
        let mut raw = vec![0u8; total];
        self.get_descriptor(slot, DescriptorKind::Configuration, 0, &mut raw)?;
        Ok(raw)
    }

    fn link_child(&mut self, parent: Option<SlotId>, port: u8, child: SlotId) {
        let Some(parent) = parent else { return };
        if port == 0 || usize::from(port) > USB_MAX_CHILDREN {
            warn!("hub port {} outside the child table", port);
            return;
        }
        if let Some(dev) = self.devices.get_mut(parent) {
            dev.children[usize::from(port - 1)] = Some(child);
        }
    }

    /// Scans every attached controller for a root device and enumerates what
    /// it finds. Per-controller failures are logged and scanning continues;
    /// finding nothing at all reports `NoDevice`.
    pub fn scan(
        &mut self,
        hub: &mut dyn HubSupport,
        registrar: &mut dyn DeviceRegistrar,
    ) -> Result<usize> {
        if self.controllers.is_empty() {
            error!("no usb controllers attached");
            return Err(Error::NoDevice);
        }
        self.asynch_allowed = true;
        let mut found = 0;
        for index in 0..self.controllers.len() {
            info!("scanning bus {} for devices...", index);
            let speed = self.controllers[index].root_port_speed();
            match self.setup_new_device(ControllerId(index), None, 0, speed, hub, registrar) {
                Ok(_) => found += 1,
                Err(Error::NoDevice) => debug!("no device on controller {}", index),
                Err(err) => warn!("controller {}: enumeration failed: {}", index, err),
            }
        }
        if found == 0 {
            info!("no usb devices found");
            return Err(Error::NoDevice);
        }
        info!("{} usb device(s) found", found);
        self.started = true;
        Ok(found)
    }

    /// Forgets every device and re-enables asynchronous transfers. The
    /// controllers themselves are stopped by their drivers.
    pub fn stop(&mut self) {
        if self.started {
            self.started = false;
            self.asynch_allowed = true;
            self.devices.clear();
        }
    }

    /// Releases a device and its whole subtree, unlinking it from the parent
    /// hub's port table.
    pub fn remove_device(&mut self, slot: SlotId) {
        let Some(dev) = self.devices.get(slot) else {
            return;
        };
        let parent = dev.parent;
        let children: Vec<SlotId> = dev.children.iter().flatten().copied().collect();
        for child in children {
            self.remove_device(child);
        }
        if let Some(parent) = parent {
            if let Some(hub) = self.devices.get_mut(parent) {
                for entry in hub.children.iter_mut() {
                    if *entry == Some(slot) {
                        *entry = None;
                    }
                }
            }
        }
        self.devices.free(slot);
    }
}
