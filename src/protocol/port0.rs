//! # Port 0
//!
//! Requests travel `DEFAULT_PORT -> 0`, replies `0 -> DEFAULT_PORT`; the
//! payload length tells the messages apart.
//!
//! ```text
//! request  len  payload
//! query    0
//! set      2    [0x00, seq]
//! ack      1    [next expected seq]
//!
//! reply    len  payload
//! query    1    [expected seq | 0x80 when unknown]
//! set      0
//! ```

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::utils::SeqNum;

use super::packet::{Level, Packet, DEFAULT_PORT};

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
enum P0Cmd {
    SetSeq = 0x00,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum P0Request {
    Query,
    Set(SeqNum),
    Ack(SeqNum),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum P0Reply {
    Query(SeqNum),
    Set,
}

impl P0Request {
    #[must_use]
    pub fn parse(dat: &[u8]) -> Option<Self> {
        match dat {
            [] => Some(P0Request::Query),
            [seq] => Some(P0Request::Ack(SeqNum::from_u8(*seq))),
            [cmd, seq] => match P0Cmd::try_from(*cmd) {
                Ok(P0Cmd::SetSeq) => Some(P0Request::Set(SeqNum::from_u8(*seq))),
                Err(_) => None,
            },
            _ => None,
        }
    }

    /// Turns `pkt` into this request; addressing is left to the caller.
    pub fn write_to(&self, pkt: &mut Packet) {
        pkt.level = Level::L1;
        pkt.seq = false;
        pkt.src_port = DEFAULT_PORT;
        pkt.dst_port = 0;
        match self {
            P0Request::Query => put_dat(pkt, &[]),
            P0Request::Set(seq) => put_dat(pkt, &[P0Cmd::SetSeq.into(), seq.to_u8()]),
            P0Request::Ack(seq) => put_dat(pkt, &[seq.to_u8()]),
        }
    }

    /// Whether `reply` answers this request.
    #[must_use]
    pub fn expects(&self, reply: &P0Reply) -> bool {
        matches!(
            (self, reply),
            (P0Request::Query, P0Reply::Query(_)) | (P0Request::Set(_), P0Reply::Set)
        )
    }
}

impl P0Reply {
    #[must_use]
    pub fn parse(dat: &[u8]) -> Option<Self> {
        match dat {
            [] => Some(P0Reply::Set),
            [seq] => Some(P0Reply::Query(SeqNum::from_u8(*seq))),
            _ => None,
        }
    }

    /// Writes the reply payload; ports and addresses are expected to be
    /// swapped already.
    pub fn write_to(&self, pkt: &mut Packet) {
        match self {
            P0Reply::Query(seq) => put_dat(pkt, &[seq.to_u8()]),
            P0Reply::Set => put_dat(pkt, &[]),
        }
    }
}

/// Port-0 payloads are at most two bytes and always fit.
fn put_dat(pkt: &mut Packet, dat: &[u8]) {
    pkt.dat[..dat.len()].copy_from_slice(dat);
    pkt.len = dat.len();
}
