use std::io::{Cursor, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use super::{
    frame::Frame,
    l1::{seq_byte, set_seq_byte},
    packet::{Frag, Level, Packet},
    DecodingError, EncodingError,
};

const HDR_LEVEL: u8 = 0xc0;
const HDR_SEQ: u8 = 0x20;
const HDR_FRAG_SHIFT: u8 = 3;
const HDR_FLAG_MASK: u8 = 0x07;

pub fn to_frame(pkt: &Packet, frame: &mut Frame) -> Result<(), EncodingError> {
    let mut hdr = HDR_LEVEL | (u8::from(pkt.frag) << HDR_FRAG_SHIFT) | (pkt.l2_flag & HDR_FLAG_MASK);
    if pkt.seq {
        hdr |= HDR_SEQ;
    }

    let mut wtr = Cursor::new(frame.dat_buf_mut());
    wtr.write_u8(hdr)
        .map_err(|_e| EncodingError::NotEnoughSpace)?;
    if pkt.seq {
        wtr.write_u8(seq_byte(pkt))
            .map_err(|_e| EncodingError::NotEnoughSpace)?;
    }
    wtr.write_all(pkt.dat())
        .map_err(|_e| EncodingError::NotEnoughSpace)?;
    let len = wtr.position() as usize;
    frame.set_hdr(pkt.src_mac, pkt.dst_mac, len)
}

pub fn from_frame(frame: &Frame, pkt: &mut Packet) -> Result<(), DecodingError> {
    let mut rdr = Cursor::new(frame.dat());
    let hdr = rdr
        .read_u8()
        .map_err(|_e| DecodingError::Decoding { field: "hdr" })?;
    if hdr & HDR_LEVEL != HDR_LEVEL {
        return Err(DecodingError::Decoding { field: "hdr" });
    }
    let frag = Frag::try_from((hdr >> HDR_FRAG_SHIFT) & 0x03)
        .map_err(|_e| DecodingError::Decoding { field: "frag" })?;

    *pkt = Packet {
        level: Level::L2,
        src_mac: frame.src_mac(),
        dst_mac: frame.dst_mac(),
        frag,
        l2_flag: hdr & HDR_FLAG_MASK,
        seq: hdr & HDR_SEQ != 0,
        ..Default::default()
    };
    if pkt.seq {
        let seq = rdr
            .read_u8()
            .map_err(|_e| DecodingError::Decoding { field: "seq" })?;
        set_seq_byte(pkt, seq);
    }
    let pos = rdr.position() as usize;
    pkt.set_dat(&frame.dat()[pos..])
        .map_err(|_e| DecodingError::Decoding { field: "dat" })?;
    Ok(())
}
