//! String-descriptor resolution.
//!
//! String descriptors are the flakiest corner of enumeration: devices NAK the
//! first read, return zeroed headers, or pad junk past the real text. Reads
//! are retried, a length-prefix fallback covers devices that reject the big
//! read, and a scanning workaround salvages descriptors with a zeroed header.

use log::debug;

use crate::bus::UsbBus;
use crate::controller::{DeviceReqData, Pipe};
use crate::error::{Error, Result};
use crate::registry::SlotId;
use crate::transfer::USB_CNTL_TIMEOUT;
use crate::usb::setup::{SetupReq, USB_DIR_IN};
use crate::usb::DescriptorKind;

/// String descriptors cannot exceed 255 bytes (one-byte length field).
const STRING_BUF_LEN: usize = 255;
/// Whole-read attempts per request, to tolerate flaky devices.
const GET_STRING_TRIES: usize = 3;

impl UsbBus {
    /// Fetches string descriptor `index` and decodes it to text.
    ///
    /// Index 0 is reserved for the language-id table and rejected here;
    /// callers treat a zero index in another descriptor as "no string".
    /// UTF-16 units outside ASCII decode to `'?'`.
    pub fn string(&mut self, slot: SlotId, index: u8) -> Result<String> {
        if index == 0 {
            return Err(Error::InvalidArgument(
                "string index zero holds the language ids",
            ));
        }
        let langid = self.language_id(slot)?;
        let mut buf = [0u8; STRING_BUF_LEN];
        let len = self.string_sub(slot, langid, index, &mut buf)?;
        Ok(decode_string(&buf[..len]))
    }

    /// The device's default language id, fetched once and cached.
    pub fn language_id(&mut self, slot: SlotId) -> Result<u16> {
        let dev = self
            .devices
            .get(slot)
            .ok_or(Error::InvalidArgument("unknown device slot"))?;
        if let Some(id) = dev.langid {
            return Ok(id);
        }
        let mut buf = [0u8; STRING_BUF_LEN];
        if self.string_sub(slot, 0, 0, &mut buf).is_err() {
            return Err(Error::Io("failed to read the language id table"));
        }
        if buf[0] < 4 {
            return Err(Error::Io("language id table too short"));
        }
        // always use the first language listed
        let id = u16::from_le_bytes([buf[2], buf[3]]);
        let address = self
            .devices
            .get(slot)
            .map(|dev| dev.address)
            .unwrap_or_default();
        debug!("device {} default language id {:#06x}", address, id);
        if let Some(dev) = self.devices.get_mut(slot) {
            dev.langid = Some(id);
        }
        Ok(id)
    }

    /// One whole-descriptor read, retried for flaky devices.
    fn get_string(
        &mut self,
        slot: SlotId,
        langid: u16,
        index: u8,
        buf: &mut [u8],
    ) -> Result<usize> {
        let mut result = Err(Error::Io("string descriptor read failed"));
        for _ in 0..GET_STRING_TRIES {
            result = self.control_msg(
                slot,
                Pipe::control_in(0),
                SetupReq::GetDescriptor as u8,
                USB_DIR_IN,
                ((DescriptorKind::String as u16) << 8) | u16::from(index),
                langid,
                DeviceReqData::In(&mut buf[..]),
                USB_CNTL_TIMEOUT,
            );
            if matches!(result, Ok(len) if len > 0) {
                break;
            }
        }
        result
    }

    /// Reads a string descriptor into `buf` and returns its usable length,
    /// header included.
    ///
    /// Tries the maximum read first; if that yields less than a header, reads
    /// the 2-byte length prefix and retries with exactly that size. The
    /// result is clamped to the descriptor's self-reported length and forced
    /// even, since entries are 2-byte code units.
    fn string_sub(
        &mut self,
        slot: SlotId,
        langid: u16,
        index: u8,
        buf: &mut [u8; STRING_BUF_LEN],
    ) -> Result<usize> {
        let mut len = self.get_string(slot, langid, index, &mut buf[..]).unwrap_or(0);
        if len < 2 {
            if self.get_string(slot, langid, index, &mut buf[..2]).unwrap_or(0) == 2 {
                let want = usize::from(buf[0]).min(STRING_BUF_LEN);
                len = self
                    .get_string(slot, langid, index, &mut buf[..want])
                    .unwrap_or(0);
            } else {
                len = 0;
            }
        }
        if len >= 2 {
            if buf[0] == 0 && buf[1] == 0 {
                len = scan_for_plausible_length(buf, len);
            }
            // junk may trail the real descriptor
            if usize::from(buf[0]) < len {
                len = usize::from(buf[0]);
            }
            len &= !1;
        }
        if len < 2 {
            return Err(Error::InvalidArgument("unusable string descriptor"));
        }
        Ok(len)
    }
}

/// Workaround for devices that return a zeroed descriptor header: walk the
/// payload in 2-byte steps while it still looks like UTF-16LE ASCII and
/// synthesize a length from where that stops.
fn scan_for_plausible_length(buf: &mut [u8], length: usize) -> usize {
    let mut scanned = 2;
    while scanned + 1 < length {
        let printable = (0x20..=0x7E).contains(&buf[scanned]);
        if !printable || buf[scanned + 1] != 0 {
            break;
        }
        scanned += 2;
    }
    if scanned > 2 {
        buf[0] = scanned as u8;
        scanned
    } else {
        length
    }
}

/// Decodes the code units after the 2-byte header: low bytes pass through,
/// any unit with a non-zero high byte becomes `'?'`.
fn decode_string(raw: &[u8]) -> String {
    let mut text = String::new();
    let mut index = 2;
    while index + 1 < raw.len() {
        if raw[index + 1] != 0 {
            text.push('?');
        } else {
            text.push(char::from(raw[index]));
        }
        index += 2;
    }
    text
}
