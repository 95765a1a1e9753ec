//! Interface and interface-association descriptors (USB 2.0 section 9.6.5,
//! Interface Association Descriptor ECN).

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct InterfaceDescriptor {
    pub length: u8,
    pub kind: u8,
    pub number: u8,
    /// Alternate settings share `number` and are selected with SET_INTERFACE.
    pub alternate_setting: u8,
    pub endpoints: u8,
    pub class: u8,
    pub sub_class: u8,
    pub protocol: u8,
    pub interface_str: u8,
}

unsafe impl plain::Plain for InterfaceDescriptor {}

/// Groups consecutive interfaces into one function (composite devices).
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct InterfaceAssociationDescriptor {
    pub length: u8,
    pub kind: u8,
    pub first_interface: u8,
    pub interface_count: u8,
    pub function_class: u8,
    pub function_sub_class: u8,
    pub function_protocol: u8,
    pub function_str: u8,
}

unsafe impl plain::Plain for InterfaceAssociationDescriptor {}
