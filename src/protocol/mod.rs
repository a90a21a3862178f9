//! # Frame
//!
//! ```text
//! 0       1       2       3               (BYTE)
//! +-------+-------+-------+-------+-------------------+
//! |src mac|dst mac|  len  |  hdr  |   (level body)    |
//! +-------+-------+-------+-------+-------------------+
//! ```
//!
//! `len` counts the bytes after itself. The top bits of `hdr` select the
//! addressing level.
//!
//! # L0 (short)
//!
//! ```text
//! hdr: 0 R P P P P P P
//! R = 0: request, dst port = P, src port = DEFAULT_PORT
//! R = 1: reply,   src port = P, dst port = DEFAULT_PORT
//! (payload)
//! ```
//!
//! # L1 (extended)
//!
//! ```text
//! hdr: 1 0 M M S 0 0 0
//! +-------+-------+-------+-------+
//! |src net|src mac|dst net|dst mac|   (MM != 0)
//! +-------+-------+-------+-------+
//! |A| seq |                           (S)
//! +-------+-------+-------+-------+
//! |   src port    |   dst port    |
//! +---------------+---------------+
//! (payload)
//! ```
//!
//! # L2 (raw)
//!
//! ```text
//! hdr: 1 1 S F F L L L
//! +-------+
//! |A| seq |                           (S)
//! +-------+
//! (payload)
//! ```
//!
//! `A` is the request-ack bit, `seq` the 7-bit sequence number.
//!
//! # Invariants
//!
//! - L0 never carries a sequence number
//! - multicast and address fields exist on L1 only, fragment flags on L2 only

pub mod addr;
pub mod frame;
pub mod l0;
pub mod l1;
pub mod l2;
pub mod packet;
pub mod port0;

use thiserror::Error;

pub use addr::Address;
pub use frame::Frame;
pub use packet::{Frag, Level, Multi, Packet, PacketBuilder};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodingError {
    #[error("malformed `{field}`")]
    Decoding { field: &'static str },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EncodingError {
    #[error("not enough space in frame")]
    NotEnoughSpace,
    #[error("ports {src:#06x} -> {dst:#06x} not representable at L0")]
    PortRange { src: u16, dst: u16 },
}

/// Encodes `pkt` into `frame` with the codec of its level.
pub fn to_frame(pkt: &Packet, frame: &mut Frame) -> Result<(), EncodingError> {
    match pkt.level {
        Level::L0 => l0::to_frame(pkt, frame),
        Level::L1 => l1::to_frame(pkt, frame),
        Level::L2 => l2::to_frame(pkt, frame),
    }
}

/// Decodes `frame` into `pkt`, picking the codec from the frame's `hdr` byte.
pub fn from_frame(frame: &Frame, pkt: &mut Packet) -> Result<(), DecodingError> {
    let level = frame
        .level()
        .ok_or(DecodingError::Decoding { field: "hdr" })?;
    match level {
        Level::L0 => l0::from_frame(frame, pkt),
        Level::L1 => l1::from_frame(frame, pkt),
        Level::L2 => l2::from_frame(frame, pkt),
    }
}
