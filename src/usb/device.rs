//! The Device descriptor (USB 2.0 section 9.6.1).

/// The 18-byte device descriptor, raw wire image.
///
/// `usb`, `vendor`, `product` and `release` are little-endian on the wire;
/// [`DeviceDescriptor::correct_byte_order`] converts them once the full
/// descriptor has been fetched.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DeviceDescriptor {
    pub length: u8,
    pub kind: u8,
    /// USB release in binary-coded decimal (0x0200 for USB 2.0).
    pub usb: u16,
    pub class: u8,
    pub sub_class: u8,
    pub protocol: u8,
    /// bMaxPacketSize0, the endpoint-0 max packet size. Only 8, 16, 32 and
    /// 64 are legal for USB 2.0 devices.
    pub packet_size: u8,
    pub vendor: u16,
    pub product: u16,
    /// Device release in binary-coded decimal.
    pub release: u16,
    pub manufacturer_str: u8,
    pub product_str: u8,
    pub serial_str: u8,
    pub configurations: u8,
}

unsafe impl plain::Plain for DeviceDescriptor {}

impl DeviceDescriptor {
    /// Converts the multi-byte fields from wire order to host order.
    pub fn correct_byte_order(&mut self) {
        self.usb = u16::from_le(self.usb);
        self.vendor = u16::from_le(self.vendor);
        self.product = u16::from_le(self.product);
        self.release = u16::from_le(self.release);
    }

    pub fn major_version(&self) -> u8 {
        ({ self.usb } >> 8) as u8
    }

    pub fn minor_version(&self) -> u8 {
        ({ self.usb }) as u8
    }
}

/// The first 8 bytes of the device descriptor.
///
/// During the probe stage only one packet is guaranteed to arrive, so the
/// pipeline initially requests the descriptor knowing it may see just this
/// prefix; `packet_size` is the only field it needs that early.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DeviceDescriptor8Byte {
    pub length: u8,
    pub kind: u8,
    pub usb: u16,
    pub class: u8,
    pub sub_class: u8,
    pub protocol: u8,
    pub packet_size: u8,
}

unsafe impl plain::Plain for DeviceDescriptor8Byte {}
