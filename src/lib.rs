//! Host-side USB device enumeration and transfer dispatch.
//!
//! This crate is the controller-agnostic layer of a USB host stack. It takes a
//! device from "electrically present behind a port" to "addressed, configured
//! and characterized", using only synchronous, timeout-bounded transactions.
//! There is no hotplug interrupt handling; devices are picked up by an initial
//! bus scan or an explicit rescan.
//!
//! USB is a tree: the host controller owns the root ports, hubs fan ports out
//! below them, and every other device is a leaf. This crate covers the part of
//! the host side that is common to every controller family:
//!
//! - the [`controller::HostController`] binding that concrete controller
//!   drivers (EHCI, OHCI, xHCI, ...) implement,
//! - the synchronous control/bulk/interrupt dispatch built on top of it,
//! - the enumeration pipeline (address assignment, descriptor bootstrap,
//!   configuration selection),
//! - the configuration-descriptor parser and the per-endpoint max-packet
//!   tables derived from it,
//! - string-descriptor resolution with workarounds for flaky devices,
//! - the fixed-capacity device table.
//!
//! Hub port handling and device classification stay outside, behind the
//! [`enumeration::HubSupport`] and [`enumeration::DeviceRegistrar`] seams.
//!
//! Wire formats follow the Universal Serial Bus Specification revision 2.0
//! (section 9.6 for the descriptors handled here) plus the SuperSpeed endpoint
//! companion descriptor from USB 3.x.

pub mod bus;
pub mod config;
pub mod controller;
pub mod device;
pub mod enumeration;
pub mod error;
pub mod registry;
pub mod transfer;
pub mod usb;

mod strings;

#[cfg(test)]
mod testutil;

pub use bus::{ControllerId, UsbBus};
pub use config::{resolve_max_packets, Configuration, Endpoint, Interface};
pub use controller::{Delay, DeviceReqData, Direction, HostController, IntQueueId, Pipe, StdDelay};
pub use device::{Speed, TransferStatus, UsbDevice};
pub use enumeration::{DeviceRegistrar, HubSupport};
pub use error::{Error, Result};
pub use registry::{DeviceRegistry, SlotId};
