//! Native byte-order probe.
//!
//! Every multi-byte field in a segment is stored in the byte order of the
//! host that wrote it, so a process must know its own order before it can
//! decode anything. The probe writes a known 16-bit pattern through a
//! machine-word view and inspects the byte representation; the result is
//! memoized for the lifetime of the process.

use std::ptr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    pub(crate) fn decode_u32(self, buf: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(buf),
            ByteOrder::Big => u32::from_be_bytes(buf),
        }
    }

    pub(crate) fn encode_u32(self, val: u32) -> [u8; 4] {
        match self {
            ByteOrder::Little => val.to_le_bytes(),
            ByteOrder::Big => val.to_be_bytes(),
        }
    }
}

static NATIVE: OnceLock<ByteOrder> = OnceLock::new();

pub(crate) fn native() -> ByteOrder {
    *NATIVE.get_or_init(detect)
}

fn detect() -> ByteOrder {
    let mut buf = [0u8; 2];
    unsafe { ptr::write_unaligned(buf.as_mut_ptr() as *mut u16, 0xABCD) };
    match buf {
        [0xCD, 0xAB] => ByteOrder::Little,
        [0xAB, 0xCD] => ByteOrder::Big,
        // Fall back to big-endian if the pattern is unrecognizable.
        _ => ByteOrder::Big,
    }
}
