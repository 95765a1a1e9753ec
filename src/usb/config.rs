//! The Configuration descriptor header (USB 2.0 section 9.6.3).

/// The 9-byte configuration descriptor header, raw wire image.
///
/// `total_length` covers the header plus every interface, endpoint, class-
/// specific and companion descriptor that follows it in the same fetch; it is
/// little-endian on the wire.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfigDescriptor {
    pub length: u8,
    pub kind: u8,
    pub total_length: u16,
    pub interfaces: u8,
    pub configuration_value: u8,
    pub configuration_str: u8,
    pub attributes: u8,
    /// Bus power draw in 2 mA units.
    pub max_power: u8,
}

unsafe impl plain::Plain for ConfigDescriptor {}

bitflags::bitflags! {
    /// bmAttributes of a configuration (USB 2.0 table 9-10). Bit 7 is
    /// reserved-set-to-one and bits 0..=4 are reserved-zero.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct ConfigAttributes: u8 {
        const REMOTE_WAKEUP = 1 << 5;
        const SELF_POWERED = 1 << 6;
    }
}

impl ConfigDescriptor {
    pub fn attribute_flags(&self) -> ConfigAttributes {
        ConfigAttributes::from_bits_truncate(self.attributes)
    }

    pub fn max_power_ma(&self) -> u16 {
        u16::from(self.max_power) * 2
    }
}
