//! Decoding of the fetched configuration blob into a structured tree, and the
//! per-endpoint max-packet tables derived from it.
//!
//! The tree is built in a staging value and only committed to the device
//! record once parsing fully succeeds, so a failed parse never leaves a
//! half-populated record behind.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::device::{UsbDevice, USB_MAX_ENDPOINTS};
use crate::error::{Error, Result};
use crate::usb::{
    ConfigDescriptor, DescriptorKind, EndpointDescriptor, EndpointTy,
    InterfaceAssociationDescriptor, InterfaceDescriptor, SuperSpeedCompanionDescriptor,
    CONFIG_DESC_SIZE, ENDPOINT_DESC_AUDIO_SIZE, ENDPOINT_DESC_SIZE, INTERFACE_ASSOC_DESC_SIZE,
    INTERFACE_DESC_SIZE, SUPERSPEED_COMPANION_DESC_SIZE,
};

/// Interface-descriptor slots per configuration, alternate settings included.
pub const USB_MAX_INTERFACES: usize = 8;
/// Interface-association records kept per configuration.
pub const USB_MAX_INTERFACE_ASSOC: usize = 8;
/// Shared scratch space for concatenated class/vendor-specific records.
pub const CLASS_SPECIFIC_CAPACITY: usize = 512;
/// Largest configuration blob the enumeration pipeline will fetch.
pub const CONFIG_TOTAL_LEN_CAP: usize = 2048;

/// One decoded configuration of a device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Validated total length of the raw blob, host order.
    pub total_length: u16,
    /// bNumInterfaces as the device declared it.
    pub declared_interfaces: u8,
    pub configuration_value: u8,
    pub configuration_str: u8,
    pub attributes: u8,
    pub max_power: u8,
    /// Interface slots in encounter order. An alternate setting occupies its
    /// own slot; [`Interface::alternate_count`] ties the group together.
    pub interfaces: SmallVec<[Interface; 1]>,
    pub associations: SmallVec<[InterfaceAssociation; 1]>,
    /// Class/vendor-specific records, concatenated in encounter order.
    pub class_specific: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub number: u8,
    pub alternate_setting: u8,
    pub class: u8,
    pub sub_class: u8,
    pub protocol: u8,
    pub interface_str: u8,
    /// Alternate settings rooted at this slot: 1 or more on the primary slot
    /// of an interface number, 0 on a slot holding an alternate setting.
    pub alternate_count: u8,
    pub endpoints: SmallVec<[Endpoint; 4]>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Endpoint number in bits 0..=3, direction in bit 7 (1 = IN).
    pub address: u8,
    pub attributes: u8,
    /// Host order; converted from the wire during parsing.
    pub max_packet_size: u16,
    pub interval: u8,
    pub companion: Option<SuperSpeedCompanion>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterfaceAssociation {
    pub first_interface: u8,
    pub interface_count: u8,
    pub function_class: u8,
    pub function_sub_class: u8,
    pub function_protocol: u8,
    pub function_str: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuperSpeedCompanion {
    pub max_burst: u8,
    pub attributes: u8,
    /// Host order; converted from the wire during parsing.
    pub bytes_per_interval: u16,
}

impl From<&InterfaceDescriptor> for Interface {
    fn from(desc: &InterfaceDescriptor) -> Self {
        Interface {
            number: desc.number,
            alternate_setting: desc.alternate_setting,
            class: desc.class,
            sub_class: desc.sub_class,
            protocol: desc.protocol,
            interface_str: desc.interface_str,
            alternate_count: 1,
            endpoints: SmallVec::new(),
        }
    }
}

impl From<&EndpointDescriptor> for Endpoint {
    fn from(desc: &EndpointDescriptor) -> Self {
        Endpoint {
            address: desc.address,
            attributes: desc.attributes,
            max_packet_size: desc.max_packet_size,
            interval: desc.interval,
            companion: None,
        }
    }
}

impl From<&InterfaceAssociationDescriptor> for InterfaceAssociation {
    fn from(desc: &InterfaceAssociationDescriptor) -> Self {
        InterfaceAssociation {
            first_interface: desc.first_interface,
            interface_count: desc.interface_count,
            function_class: desc.function_class,
            function_sub_class: desc.function_sub_class,
            function_protocol: desc.function_protocol,
            function_str: desc.function_str,
        }
    }
}

impl From<&SuperSpeedCompanionDescriptor> for SuperSpeedCompanion {
    fn from(desc: &SuperSpeedCompanionDescriptor) -> Self {
        SuperSpeedCompanion {
            max_burst: desc.max_burst,
            attributes: desc.attributes,
            bytes_per_interval: desc.bytes_per_interval,
        }
    }
}

impl Endpoint {
    pub fn number(&self) -> u8 {
        self.address & crate::usb::ENDP_NUM_MASK
    }

    pub fn is_in(&self) -> bool {
        self.address & crate::usb::ENDP_DIR_BIT != 0
    }

    pub fn ty(&self) -> EndpointTy {
        match self.attributes & crate::usb::ENDP_ATTR_TY_MASK {
            0 => EndpointTy::Ctrl,
            1 => EndpointTy::Isoch,
            2 => EndpointTy::Bulk,
            3 => EndpointTy::Interrupt,
            _ => unreachable!(),
        }
    }
}

impl Configuration {
    /// Decodes a raw configuration blob.
    ///
    /// The walk is bounded by the smaller of the declared total length and
    /// the real buffer, so a lying `wTotalLength` can never cause an
    /// out-of-bounds read. Malformed individual records are skipped; a
    /// zero-length record, an interface or endpoint count past its limit, or
    /// scratch-buffer exhaustion abort the whole parse.
    pub fn parse(buffer: &[u8]) -> Result<Configuration> {
        let header_bytes = buffer
            .get(..CONFIG_DESC_SIZE)
            .ok_or(Error::Protocol("configuration descriptor header truncated"))?;
        let header: &ConfigDescriptor = plain::from_bytes(header_bytes)
            .map_err(|_| Error::Protocol("configuration descriptor header truncated"))?;
        if header.kind != DescriptorKind::Configuration as u8 {
            let kind = header.kind;
            warn!("expected a configuration descriptor, found type {}", kind);
            return Err(Error::Protocol("not a configuration descriptor"));
        }
        if usize::from(header.length) != CONFIG_DESC_SIZE {
            return Err(Error::Protocol("bad configuration descriptor length"));
        }

        let declared = usize::from(u16::from_le(header.total_length));
        let end = declared.min(buffer.len());
        let mut config = Configuration {
            total_length: declared as u16,
            declared_interfaces: header.interfaces,
            configuration_value: header.configuration_value,
            configuration_str: header.configuration_str,
            attributes: header.attributes,
            max_power: header.max_power,
            interfaces: SmallVec::new(),
            associations: SmallVec::new(),
            class_specific: Vec::new(),
        };

        // Slot currently collecting endpoints, the primary slot of the
        // current interface number, and that number itself.
        let mut current: Option<usize> = None;
        let mut primary: Option<usize> = None;
        let mut current_number: Option<u8> = None;

        let mut index = CONFIG_DESC_SIZE;
        while index + 2 <= end {
            let length = usize::from(buffer[index]);
            let kind = buffer[index + 1];
            if length == 0 {
                return Err(Error::Protocol("zero-length descriptor record"));
            }
            match kind {
                k if k == DescriptorKind::Interface as u8 => {
                    if length != INTERFACE_DESC_SIZE {
                        warn!("invalid interface descriptor length {}", length);
                    } else if index + INTERFACE_DESC_SIZE > end {
                        warn!("interface descriptor overflows the buffer");
                    } else {
                        let desc: &InterfaceDescriptor =
                            plain::from_bytes(&buffer[index..index + INTERFACE_DESC_SIZE])
                                .map_err(|_| Error::Protocol("interface descriptor truncated"))?;
                        if config.interfaces.len() >= USB_MAX_INTERFACES {
                            warn!("too many interfaces in configuration");
                            return Err(Error::OutOfSpace("too many interfaces"));
                        }
                        let slot = config.interfaces.len();
                        let number = desc.number;
                        let alternate_setting = desc.alternate_setting;
                        let is_alternate = current_number == Some(number);
                        config.interfaces.push(Interface::from(desc));
                        if is_alternate {
                            config.interfaces[slot].alternate_count = 0;
                            if let Some(p) = primary {
                                config.interfaces[p].alternate_count += 1;
                            }
                            debug!(
                                "alternate setting {} for interface {}",
                                alternate_setting, number
                            );
                        } else {
                            primary = Some(slot);
                            current_number = Some(number);
                        }
                        current = Some(slot);
                    }
                }
                k if k == DescriptorKind::InterfaceAssociation as u8 => {
                    if length < INTERFACE_ASSOC_DESC_SIZE || index + INTERFACE_ASSOC_DESC_SIZE > end
                    {
                        warn!("malformed interface association descriptor");
                    } else if config.associations.len() >= USB_MAX_INTERFACE_ASSOC {
                        // bounded table, record dropped rather than failing the parse
                        warn!("too many interface associations, dropping record");
                    } else {
                        let desc: &InterfaceAssociationDescriptor =
                            plain::from_bytes(&buffer[index..index + INTERFACE_ASSOC_DESC_SIZE])
                                .map_err(|_| {
                                    Error::Protocol("interface association descriptor truncated")
                                })?;
                        config.associations.push(InterfaceAssociation::from(desc));
                    }
                }
                k if k == DescriptorKind::CsInterface as u8
                    || k == DescriptorKind::CsEndpoint as u8 =>
                {
                    if index + length > end {
                        warn!("class-specific descriptor overflows the buffer");
                    } else if config.class_specific.len() + length > CLASS_SPECIFIC_CAPACITY {
                        warn!(
                            "class-specific space exhausted ({} bytes left, {} needed)",
                            CLASS_SPECIFIC_CAPACITY - config.class_specific.len(),
                            length
                        );
                        return Err(Error::OutOfSpace("class-specific descriptor space exhausted"));
                    } else {
                        config
                            .class_specific
                            .extend_from_slice(&buffer[index..index + length]);
                        debug!("class-specific record of {} bytes", length);
                    }
                }
                k if k == DescriptorKind::Endpoint as u8 => {
                    if length != ENDPOINT_DESC_SIZE && length != ENDPOINT_DESC_AUDIO_SIZE {
                        warn!("invalid endpoint descriptor length {}", length);
                    } else if index + length > end {
                        warn!("endpoint descriptor overflows the buffer");
                    } else if let Some(slot) = current {
                        let iface = &mut config.interfaces[slot];
                        if iface.endpoints.len() >= USB_MAX_ENDPOINTS {
                            let number = iface.number;
                            warn!("interface {} has too many endpoints", number);
                            return Err(Error::OutOfSpace("too many endpoints on interface"));
                        }
                        let mut raw = [0u8; ENDPOINT_DESC_AUDIO_SIZE];
                        raw[..length].copy_from_slice(&buffer[index..index + length]);
                        let desc: &EndpointDescriptor = plain::from_bytes(&raw)
                            .map_err(|_| Error::Protocol("endpoint descriptor truncated"))?;
                        let mut endpoint = Endpoint::from(desc);
                        endpoint.max_packet_size = u16::from_le(endpoint.max_packet_size);
                        iface.endpoints.push(endpoint);
                    } else {
                        warn!("endpoint descriptor out of order");
                    }
                }
                k if k == DescriptorKind::SuperSpeedCompanion as u8 => {
                    if length != SUPERSPEED_COMPANION_DESC_SIZE {
                        warn!("invalid endpoint companion descriptor length {}", length);
                    } else if index + length > end {
                        warn!("endpoint companion descriptor overflows the buffer");
                    } else {
                        let target = current
                            .and_then(|slot| config.interfaces[slot].endpoints.last_mut());
                        if let Some(endpoint) = target {
                            let desc: &SuperSpeedCompanionDescriptor =
                                plain::from_bytes(&buffer[index..index + length]).map_err(|_| {
                                    Error::Protocol("endpoint companion descriptor truncated")
                                })?;
                            let mut companion = SuperSpeedCompanion::from(desc);
                            companion.bytes_per_interval =
                                u16::from_le(companion.bytes_per_interval);
                            endpoint.companion = Some(companion);
                        } else {
                            warn!("endpoint companion descriptor out of order");
                        }
                    }
                }
                _ => {
                    debug!("unknown descriptor type {} of length {}", kind, length);
                }
            }
            index += length;
        }
        Ok(config)
    }

    /// The primary slot for an interface number, if the number exists.
    pub fn interface(&self, number: u8) -> Option<&Interface> {
        self.interfaces.iter().find(|iface| iface.number == number)
    }
}

/// Fills the device's per-endpoint max-packet tables from a decoded
/// configuration.
///
/// Control endpoints are bidirectional and set both directions outright.
/// Everything else only raises the entry for its own direction, so endpoints
/// redescribed by alternate settings end up with the largest size any setting
/// asks for.
pub fn resolve_max_packets(dev: &mut UsbDevice, config: &Configuration) {
    for iface in &config.interfaces {
        for endpoint in &iface.endpoints {
            let number = usize::from(endpoint.number());
            debug_assert!(number < USB_MAX_ENDPOINTS);
            let size = endpoint.max_packet_size;
            if endpoint.ty() == EndpointTy::Ctrl {
                dev.ep_max_packet_in[number] = size;
                dev.ep_max_packet_out[number] = size;
            } else if endpoint.is_in() {
                if size > dev.ep_max_packet_in[number] {
                    dev.ep_max_packet_in[number] = size;
                }
            } else if size > dev.ep_max_packet_out[number] {
                dev.ep_max_packet_out[number] = size;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bus::ControllerId;

    // Fixture helpers building raw descriptor records.

    fn config_header(total_length: u16, interfaces: u8, value: u8) -> Vec<u8> {
        let total = total_length.to_le_bytes();
        vec![9, 2, total[0], total[1], interfaces, value, 0, 0xE0, 50]
    }

    fn interface_desc(number: u8, alternate: u8, endpoints: u8) -> Vec<u8> {
        vec![9, 4, number, alternate, endpoints, 0x08, 0x06, 0x50, 0]
    }

    fn endpoint_desc(address: u8, attributes: u8, max_packet: u16) -> Vec<u8> {
        let mps = max_packet.to_le_bytes();
        vec![7, 5, address, attributes, mps[0], mps[1], 0]
    }

    fn assemble(records: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = records.iter().flatten().copied().collect();
        let total = (CONFIG_DESC_SIZE + body.len()) as u16;
        let mut buffer = config_header(total, 1, 1);
        buffer.extend_from_slice(&body);
        buffer
    }

    #[test]
    fn parses_interfaces_and_endpoints() {
        let buffer = assemble(&[
            interface_desc(0, 0, 2),
            endpoint_desc(0x81, 0x02, 512),
            endpoint_desc(0x02, 0x02, 512),
            interface_desc(1, 0, 1),
            endpoint_desc(0x83, 0x03, 8),
        ]);
        let config = Configuration::parse(&buffer).unwrap();
        assert_eq!(config.configuration_value, 1);
        assert_eq!(config.interfaces.len(), 2);
        assert_eq!(config.interfaces[0].endpoints.len(), 2);
        assert_eq!(config.interfaces[1].endpoints.len(), 1);
        assert_eq!(config.interfaces[0].endpoints[0].max_packet_size, 512);
        assert_eq!(config.interfaces[1].endpoints[0].ty(), EndpointTy::Interrupt);
        assert_eq!(config.interface(1).unwrap().endpoints.len(), 1);
        assert!(config.interface(7).is_none());
    }

    #[test]
    fn alternate_settings_share_a_primary_slot() {
        let buffer = assemble(&[
            interface_desc(0, 0, 1),
            endpoint_desc(0x01, 0x02, 32),
            interface_desc(0, 1, 1),
            endpoint_desc(0x01, 0x02, 64),
            interface_desc(1, 0, 0),
        ]);
        let config = Configuration::parse(&buffer).unwrap();
        assert_eq!(config.interfaces.len(), 3);
        // primary slot counts itself plus one alternate
        assert_eq!(config.interfaces[0].alternate_count, 2);
        assert_eq!(config.interfaces[1].alternate_count, 0);
        assert_eq!(config.interfaces[2].alternate_count, 1);
        // endpoints land on the slot that declared them
        assert_eq!(config.interfaces[0].endpoints[0].max_packet_size, 32);
        assert_eq!(config.interfaces[1].endpoints[0].max_packet_size, 64);
    }

    #[test]
    fn zero_length_record_is_protocol_violation() {
        let mut buffer = assemble(&[interface_desc(0, 0, 1)]);
        buffer.extend_from_slice(&[0, 5, 0, 0]);
        buffer[2] = (buffer.len() as u16).to_le_bytes()[0];
        assert_eq!(
            Configuration::parse(&buffer),
            Err(Error::Protocol("zero-length descriptor record"))
        );
    }

    #[test]
    fn lying_total_length_never_reads_past_the_buffer() {
        let mut buffer = assemble(&[interface_desc(0, 0, 1), endpoint_desc(0x81, 0x02, 64)]);
        // claim far more data than the buffer holds
        buffer[2..4].copy_from_slice(&1024u16.to_le_bytes());
        let config = Configuration::parse(&buffer).unwrap();
        assert_eq!(config.total_length, 1024);
        assert_eq!(config.interfaces.len(), 1);
        assert_eq!(config.interfaces[0].endpoints.len(), 1);
    }

    #[test]
    fn truncated_trailing_record_is_skipped() {
        let mut buffer = assemble(&[interface_desc(0, 0, 1)]);
        // an endpoint record whose length runs past the buffer end
        buffer.extend_from_slice(&[7, 5, 0x81]);
        let buffer_len = buffer.len() as u16;
        buffer[2..4].copy_from_slice(&buffer_len.to_le_bytes());
        let config = Configuration::parse(&buffer).unwrap();
        assert!(config.interfaces[0].endpoints.is_empty());
    }

    #[test]
    fn parsing_is_deterministic() {
        let buffer = assemble(&[
            interface_desc(0, 0, 1),
            endpoint_desc(0x81, 0x02, 512),
            vec![5, 0x24, 1, 2, 3],
            interface_desc(0, 1, 1),
            endpoint_desc(0x81, 0x02, 1024),
        ]);
        let first = Configuration::parse(&buffer).unwrap();
        let second = Configuration::parse(&buffer).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn out_of_order_endpoint_is_skipped() {
        let buffer = assemble(&[endpoint_desc(0x81, 0x02, 64), interface_desc(0, 0, 0)]);
        let config = Configuration::parse(&buffer).unwrap();
        assert_eq!(config.interfaces.len(), 1);
        assert!(config.interfaces[0].endpoints.is_empty());
    }

    #[test]
    fn unknown_and_missized_records_are_skipped() {
        let buffer = assemble(&[
            vec![3, 0x7F, 0xAA],              // unknown type
            vec![5, 4, 0, 0, 0],              // interface with bad length
            interface_desc(0, 0, 1),
            vec![4, 5, 0x81, 0x02],           // endpoint with bad length
            endpoint_desc(0x01, 0x02, 64),
        ]);
        let config = Configuration::parse(&buffer).unwrap();
        assert_eq!(config.interfaces.len(), 1);
        assert_eq!(config.interfaces[0].endpoints.len(), 1);
    }

    #[test]
    fn too_many_interfaces_fails_the_parse() {
        let records: Vec<Vec<u8>> = (0..=USB_MAX_INTERFACES as u8)
            .map(|n| interface_desc(n, 0, 0))
            .collect();
        let buffer = assemble(&records);
        assert_eq!(
            Configuration::parse(&buffer),
            Err(Error::OutOfSpace("too many interfaces"))
        );
    }

    #[test]
    fn too_many_endpoints_fails_the_parse() {
        let mut records = vec![interface_desc(0, 0, 17)];
        for _ in 0..=USB_MAX_ENDPOINTS {
            records.push(endpoint_desc(0x81, 0x02, 64));
        }
        let buffer = assemble(&records);
        assert_eq!(
            Configuration::parse(&buffer),
            Err(Error::OutOfSpace("too many endpoints on interface"))
        );
    }

    #[test]
    fn association_overflow_drops_the_record() {
        let iad = vec![8, 11, 0, 2, 0x0E, 3, 0, 0];
        let mut records: Vec<Vec<u8>> = (0..=USB_MAX_INTERFACE_ASSOC).map(|_| iad.clone()).collect();
        records.push(interface_desc(0, 0, 0));
        let buffer = assemble(&records);
        let config = Configuration::parse(&buffer).unwrap();
        // one past the limit was dropped, the parse still succeeded
        assert_eq!(config.associations.len(), USB_MAX_INTERFACE_ASSOC);
        assert_eq!(config.associations[0].function_class, 0x0E);
        assert_eq!(config.interfaces.len(), 1);
    }

    #[test]
    fn class_specific_records_concatenate_in_order() {
        let buffer = assemble(&[
            interface_desc(0, 0, 0),
            vec![5, 0x24, 0xAA, 0xBB, 0xCC],
            vec![3, 0x25, 0xDD],
        ]);
        let config = Configuration::parse(&buffer).unwrap();
        assert_eq!(
            config.class_specific,
            vec![5, 0x24, 0xAA, 0xBB, 0xCC, 3, 0x25, 0xDD]
        );
    }

    #[test]
    fn class_specific_overflow_fails_the_parse() {
        // each record carries 253 payload bytes plus the 2-byte header
        let record = {
            let mut r = vec![255, 0x24];
            r.extend_from_slice(&[0u8; 253]);
            r
        };
        let buffer = assemble(&[record.clone(), record.clone(), record]);
        assert_eq!(
            Configuration::parse(&buffer),
            Err(Error::OutOfSpace("class-specific descriptor space exhausted"))
        );
    }

    #[test]
    fn companion_attaches_to_the_preceding_endpoint() {
        let buffer = assemble(&[
            interface_desc(0, 0, 1),
            endpoint_desc(0x81, 0x02, 1024),
            vec![6, 0x30, 15, 0, 0x00, 0x04],
        ]);
        let config = Configuration::parse(&buffer).unwrap();
        let companion = config.interfaces[0].endpoints[0].companion.unwrap();
        assert_eq!(companion.max_burst, 15);
        assert_eq!(companion.bytes_per_interval, 0x0400);
    }

    #[test]
    fn orphan_companion_is_skipped() {
        let buffer = assemble(&[
            interface_desc(0, 0, 0),
            vec![6, 0x30, 15, 0, 0x00, 0x04],
        ]);
        let config = Configuration::parse(&buffer).unwrap();
        assert!(config.interfaces[0].endpoints.is_empty());
    }

    #[test]
    fn non_config_header_is_rejected() {
        let mut buffer = assemble(&[]);
        buffer[1] = 4;
        assert_eq!(
            Configuration::parse(&buffer),
            Err(Error::Protocol("not a configuration descriptor"))
        );
    }

    #[test]
    fn max_packet_merge_takes_the_maximum() {
        let buffer = assemble(&[
            interface_desc(0, 0, 1),
            endpoint_desc(0x01, 0x02, 32),
            interface_desc(0, 1, 1),
            endpoint_desc(0x01, 0x02, 64),
        ]);
        let config = Configuration::parse(&buffer).unwrap();
        let mut dev = UsbDevice::new(ControllerId(0));
        resolve_max_packets(&mut dev, &config);
        assert_eq!(dev.ep_max_packet_out[1], 64);
        assert_eq!(dev.ep_max_packet_in[1], 0);

        // a smaller later setting must not shrink the entry
        let buffer = assemble(&[
            interface_desc(0, 0, 1),
            endpoint_desc(0x01, 0x02, 64),
            interface_desc(0, 1, 1),
            endpoint_desc(0x01, 0x02, 32),
        ]);
        let config = Configuration::parse(&buffer).unwrap();
        let mut dev = UsbDevice::new(ControllerId(0));
        resolve_max_packets(&mut dev, &config);
        assert_eq!(dev.ep_max_packet_out[1], 64);
    }

    #[test]
    fn control_endpoints_fill_both_directions() {
        let buffer = assemble(&[interface_desc(0, 0, 1), endpoint_desc(0x05, 0x00, 16)]);
        let config = Configuration::parse(&buffer).unwrap();
        let mut dev = UsbDevice::new(ControllerId(0));
        resolve_max_packets(&mut dev, &config);
        assert_eq!(dev.ep_max_packet_in[5], 16);
        assert_eq!(dev.ep_max_packet_out[5], 16);
    }
}
