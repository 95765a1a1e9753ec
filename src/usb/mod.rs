//! Wire-level USB types: descriptors as they appear on the bus, the 8-byte
//! setup record, and the standard request and type codes.
//!
//! Every multi-byte field is little-endian on the wire. The structs here keep
//! the raw wire image; conversion to host order happens at the point a field
//! is actually consumed (the parser and the enumeration pipeline do this).

pub mod config;
pub mod device;
pub mod endpoint;
pub mod interface;
pub mod setup;

pub use self::config::{ConfigAttributes, ConfigDescriptor};
pub use self::device::{DeviceDescriptor, DeviceDescriptor8Byte};
pub use self::endpoint::{
    EndpointDescriptor, EndpointTy, SuperSpeedCompanionDescriptor, ENDP_ATTR_TY_MASK, ENDP_DIR_BIT,
    ENDP_NUM_MASK,
};
pub use self::interface::{InterfaceAssociationDescriptor, InterfaceDescriptor};
pub use self::setup::Setup;

/// Descriptor type tags (USB 2.0 table 9-5, USB 3.2 table 9-6).
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DescriptorKind {
    Device = 1,
    Configuration = 2,
    String = 3,
    Interface = 4,
    Endpoint = 5,
    DeviceQualifier = 6,
    OtherSpeedConfiguration = 7,
    InterfacePower = 8,
    InterfaceAssociation = 11,
    BinaryObjectStorage = 15,
    /// Class-specific interface descriptor (audio, video, CDC, ...).
    CsInterface = 0x24,
    /// Class-specific endpoint descriptor.
    CsEndpoint = 0x25,
    SuperSpeedCompanion = 0x30,
}

// Fixed descriptor sizes, in bytes.
pub const DEVICE_DESC_SIZE: usize = 18;
pub const CONFIG_DESC_SIZE: usize = 9;
pub const INTERFACE_DESC_SIZE: usize = 9;
pub const INTERFACE_ASSOC_DESC_SIZE: usize = 8;
pub const ENDPOINT_DESC_SIZE: usize = 7;
/// Audio-class endpoint descriptors carry two extra bytes.
pub const ENDPOINT_DESC_AUDIO_SIZE: usize = 9;
pub const SUPERSPEED_COMPANION_DESC_SIZE: usize = 6;
