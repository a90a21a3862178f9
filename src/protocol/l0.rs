use std::io::{Cursor, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use super::{
    frame::Frame,
    packet::{Level, Packet, DEFAULT_PORT},
    DecodingError, EncodingError,
};

const HDR_REPLY: u8 = 0x40;
const HDR_PORT_MASK: u8 = 0x3f;

pub fn to_frame(pkt: &Packet, frame: &mut Frame) -> Result<(), EncodingError> {
    let hdr = if pkt.src_port == DEFAULT_PORT && pkt.dst_port <= HDR_PORT_MASK as u16 {
        pkt.dst_port as u8
    } else if pkt.dst_port == DEFAULT_PORT && pkt.src_port <= HDR_PORT_MASK as u16 {
        HDR_REPLY | pkt.src_port as u8
    } else {
        return Err(EncodingError::PortRange {
            src: pkt.src_port,
            dst: pkt.dst_port,
        });
    };

    let mut wtr = Cursor::new(frame.dat_buf_mut());
    wtr.write_u8(hdr)
        .map_err(|_| EncodingError::NotEnoughSpace)?;
    wtr.write_all(pkt.dat())
        .map_err(|_| EncodingError::NotEnoughSpace)?;
    let len = wtr.position() as usize;
    frame.set_hdr(pkt.src_mac, pkt.dst_mac, len)
}

pub fn from_frame(frame: &Frame, pkt: &mut Packet) -> Result<(), DecodingError> {
    let mut rdr = Cursor::new(frame.dat());
    let hdr = rdr
        .read_u8()
        .map_err(|_e| DecodingError::Decoding { field: "hdr" })?;
    if hdr & 0x80 != 0 {
        return Err(DecodingError::Decoding { field: "hdr" });
    }
    let port = (hdr & HDR_PORT_MASK) as u16;

    *pkt = Packet {
        level: Level::L0,
        src_mac: frame.src_mac(),
        dst_mac: frame.dst_mac(),
        ..Default::default()
    };
    if hdr & HDR_REPLY != 0 {
        pkt.src_port = port;
        pkt.dst_port = DEFAULT_PORT;
    } else {
        pkt.src_port = DEFAULT_PORT;
        pkt.dst_port = port;
    }
    let pos = rdr.position() as usize;
    pkt.set_dat(&frame.dat()[pos..])
        .map_err(|_e| DecodingError::Decoding { field: "dat" })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request() {
        let mut pkt = Packet {
            level: Level::L0,
            src_mac: 1,
            dst_mac: 2,
            src_port: DEFAULT_PORT,
            dst_port: 5,
            ..Default::default()
        };
        pkt.set_dat(&[0xaa, 0xbb]).unwrap();
        let mut frame = Frame::new();
        to_frame(&pkt, &mut frame).unwrap();
        assert_eq!(frame.as_bytes(), &[1, 2, 3, 0x05, 0xaa, 0xbb]);

        let mut decoded = Packet::default();
        from_frame(&frame, &mut decoded).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn reply() {
        let frame = Frame::from_bytes(&[2, 1, 2, 0x45, 0x10]).unwrap();
        let mut pkt = Packet::default();
        from_frame(&frame, &mut pkt).unwrap();
        assert_eq!(pkt.level, Level::L0);
        assert_eq!(pkt.src_port, 5);
        assert_eq!(pkt.dst_port, DEFAULT_PORT);
        assert_eq!(pkt.dat(), &[0x10]);
        assert!(!pkt.seq);
    }

    #[test]
    fn port_out_of_range() {
        let pkt = Packet {
            level: Level::L0,
            src_port: 100,
            dst_port: 200,
            ..Default::default()
        };
        let mut frame = Frame::new();
        assert_eq!(
            to_frame(&pkt, &mut frame),
            Err(EncodingError::PortRange { src: 100, dst: 200 })
        );
    }
}
