use std::io::{Cursor, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::utils::SeqNum;

use super::{
    addr::Address,
    frame::Frame,
    packet::{Level, Multi, Packet},
    DecodingError, EncodingError,
};

const HDR_LEVEL: u8 = 0x80;
const HDR_MULTI_SHIFT: u8 = 4;
const HDR_SEQ: u8 = 0x08;
const HDR_RESERVED: u8 = 0x07;
pub(super) const SEQ_REQ_ACK: u8 = 0x80;

pub fn to_frame(pkt: &Packet, frame: &mut Frame) -> Result<(), EncodingError> {
    let mut hdr = HDR_LEVEL | (u8::from(pkt.multi) << HDR_MULTI_SHIFT);
    if pkt.seq {
        hdr |= HDR_SEQ;
    }

    let mut wtr = Cursor::new(frame.dat_buf_mut());
    let no_space = |_e| EncodingError::NotEnoughSpace;
    wtr.write_u8(hdr).map_err(no_space)?;
    if pkt.multi.has_addr() {
        wtr.write_all(&[
            pkt.src_addr.net,
            pkt.src_addr.mac,
            pkt.dst_addr.net,
            pkt.dst_addr.mac,
        ])
        .map_err(no_space)?;
    }
    if pkt.seq {
        wtr.write_u8(seq_byte(pkt)).map_err(no_space)?;
    }
    wtr.write_u16::<BigEndian>(pkt.src_port).map_err(no_space)?;
    wtr.write_u16::<BigEndian>(pkt.dst_port).map_err(no_space)?;
    wtr.write_all(pkt.dat()).map_err(no_space)?;
    let len = wtr.position() as usize;
    frame.set_hdr(pkt.src_mac, pkt.dst_mac, len)
}

pub fn from_frame(frame: &Frame, pkt: &mut Packet) -> Result<(), DecodingError> {
    let mut rdr = Cursor::new(frame.dat());
    let hdr = rdr
        .read_u8()
        .map_err(|_e| DecodingError::Decoding { field: "hdr" })?;
    if hdr & 0xc0 != HDR_LEVEL || hdr & HDR_RESERVED != 0 {
        return Err(DecodingError::Decoding { field: "hdr" });
    }
    let multi = Multi::try_from((hdr >> HDR_MULTI_SHIFT) & 0x03)
        .map_err(|_e| DecodingError::Decoding { field: "multi" })?;

    *pkt = Packet {
        level: Level::L1,
        src_mac: frame.src_mac(),
        dst_mac: frame.dst_mac(),
        multi,
        seq: hdr & HDR_SEQ != 0,
        ..Default::default()
    };
    if multi.has_addr() {
        let mut addrs = [0; 4];
        std::io::Read::read_exact(&mut rdr, &mut addrs)
            .map_err(|_e| DecodingError::Decoding { field: "addr" })?;
        pkt.src_addr = Address::new(addrs[0], addrs[1]);
        pkt.dst_addr = Address::new(addrs[2], addrs[3]);
    }
    if pkt.seq {
        let seq = rdr
            .read_u8()
            .map_err(|_e| DecodingError::Decoding { field: "seq" })?;
        set_seq_byte(pkt, seq);
    }
    pkt.src_port = rdr
        .read_u16::<BigEndian>()
        .map_err(|_e| DecodingError::Decoding { field: "src_port" })?;
    pkt.dst_port = rdr
        .read_u16::<BigEndian>()
        .map_err(|_e| DecodingError::Decoding { field: "dst_port" })?;
    let pos = rdr.position() as usize;
    pkt.set_dat(&frame.dat()[pos..])
        .map_err(|_e| DecodingError::Decoding { field: "dat" })?;
    Ok(())
}

pub(super) fn seq_byte(pkt: &Packet) -> u8 {
    let mut b = pkt.seq_num.to_u8() & !SEQ_REQ_ACK;
    if pkt.req_ack {
        b |= SEQ_REQ_ACK;
    }
    b
}

pub(super) fn set_seq_byte(pkt: &mut Packet, b: u8) {
    pkt.req_ack = b & SEQ_REQ_ACK != 0;
    pkt.seq_num = SeqNum::from_u8(b & !SEQ_REQ_ACK);
}
