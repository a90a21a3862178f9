use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::utils::{SeqNum, Tick};

use super::{
    addr::{Address, MAC_UNSPECIFIED},
    frame::FRAME_DAT_MAX,
    EncodingError,
};

/// Largest payload a packet can hold; the level headers eat into it on encode.
pub const PAYLOAD_MAX: usize = FRAME_DAT_MAX;
/// Port that owns port-0 exchanges on both ends and the implicit L0 peer port.
pub const DEFAULT_PORT: u16 = 0xcdcd;

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Level {
    L0,
    L1,
    L2,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Multi {
    None = 0,
    Net = 1,
    Cast = 2,
    NetCast = 3,
}

impl Multi {
    /// Whether the packet carries explicit network addresses.
    #[must_use]
    #[inline]
    pub fn has_addr(self) -> bool {
        self != Multi::None
    }

    #[must_use]
    #[inline]
    pub fn is_cast(self) -> bool {
        u8::from(self) & u8::from(Multi::Cast) != 0
    }

    #[must_use]
    pub fn without_cast(self) -> Multi {
        match self {
            Multi::Cast | Multi::NetCast => Multi::Net,
            other => other,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Frag {
    None = 0,
    First = 1,
    More = 2,
    Last = 3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub level: Level,
    pub src_mac: u8,
    pub dst_mac: u8,
    pub src_addr: Address,
    pub dst_addr: Address,
    pub multi: Multi,
    pub frag: Frag,
    pub l2_flag: u8,
    pub src_port: u16,
    pub dst_port: u16,
    /// Ask for ordered, acknowledged delivery.
    pub seq: bool,

    pub(crate) len: usize,
    pub(crate) dat: [u8; PAYLOAD_MAX],

    // in flight only
    pub(crate) seq_num: SeqNum,
    pub(crate) req_ack: bool,
    pub(crate) send_time: Tick,
}

impl Default for Packet {
    fn default() -> Self {
        Packet {
            level: Level::L1,
            src_mac: MAC_UNSPECIFIED,
            dst_mac: MAC_UNSPECIFIED,
            src_addr: Address::UNSPECIFIED,
            dst_addr: Address::UNSPECIFIED,
            multi: Multi::None,
            frag: Frag::None,
            l2_flag: 0,
            src_port: 0,
            dst_port: 0,
            seq: false,
            len: 0,
            dat: [0; PAYLOAD_MAX],
            seq_num: SeqNum::UNSYNCED,
            req_ack: false,
            send_time: 0,
        }
    }
}

pub struct PacketBuilder<'a> {
    pub level: Level,
    pub dst: Address,
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: bool,
    pub dat: &'a [u8],
}

impl<'a> PacketBuilder<'a> {
    pub fn build(self) -> Result<Packet, EncodingError> {
        let mut pkt = Packet {
            level: self.level,
            dst_mac: self.dst.mac,
            src_port: self.src_port,
            dst_port: self.dst_port,
            seq: self.seq,
            ..Default::default()
        };
        if self.level == Level::L1 && !self.dst.is_short() {
            pkt.multi = Multi::Net;
            pkt.dst_addr = self.dst;
        }
        pkt.set_dat(self.dat)?;
        pkt.check_rep();
        Ok(pkt)
    }
}

impl Packet {
    #[inline]
    fn check_rep(&self) {
        assert!(self.len <= PAYLOAD_MAX);
    }

    #[must_use]
    #[inline]
    pub fn dat(&self) -> &[u8] {
        &self.dat[..self.len]
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set_dat(&mut self, dat: &[u8]) -> Result<(), EncodingError> {
        if dat.len() > PAYLOAD_MAX {
            return Err(EncodingError::NotEnoughSpace);
        }
        self.dat[..dat.len()].copy_from_slice(dat);
        self.len = dat.len();
        self.check_rep();
        Ok(())
    }

    /// Sequence number stamped by the sender; meaningful when `seq` is set.
    #[must_use]
    #[inline]
    pub fn seq_num(&self) -> SeqNum {
        self.seq_num
    }

    #[must_use]
    #[inline]
    pub fn req_ack(&self) -> bool {
        self.req_ack
    }

    /// Peer identity of the sender as used by sequence records.
    #[must_use]
    pub fn src_peer(&self) -> Address {
        if self.multi.has_addr() {
            self.src_addr
        } else {
            Address::short(self.src_mac)
        }
    }

    /// Peer identity of the receiver as used by sequence records.
    #[must_use]
    pub fn dst_peer(&self) -> Address {
        if self.multi.has_addr() {
            self.dst_addr
        } else {
            Address::short(self.dst_mac)
        }
    }

    /// Addresses the packet to `peer`, the counterpart of [`Packet::dst_peer`].
    pub fn set_dst_peer(&mut self, peer: Address) {
        self.dst_mac = peer.mac;
        if peer.is_short() {
            self.multi = Multi::None;
        } else {
            self.multi = Multi::Net;
            self.dst_addr = peer;
        }
    }

    /// Fills in the source fields from the local address.
    pub fn fill_src(&mut self, local: Address) {
        self.src_mac = local.mac;
        if self.level == Level::L1 && self.multi.has_addr() {
            self.src_addr = local;
        }
    }

    /// Turns a received packet around so it can be sent back to its origin.
    pub fn swap_src_dst(&mut self, local: Address) {
        std::mem::swap(&mut self.src_mac, &mut self.dst_mac);
        if self.src_mac == MAC_UNSPECIFIED {
            self.src_mac = local.mac;
        }
        if self.level == Level::L1 && self.multi.has_addr() {
            std::mem::swap(&mut self.src_addr, &mut self.dst_addr);
            if self.multi.is_cast() {
                self.multi = self.multi.without_cast();
                self.src_addr = local;
            }
        }
        if self.level != Level::L2 {
            std::mem::swap(&mut self.src_port, &mut self.dst_port);
        }
    }

    /// Clears the fields the packet's level cannot carry.
    pub fn normalize(&mut self) {
        if self.level == Level::L0 {
            self.seq = false;
        }
        if self.level != Level::L1 {
            self.multi = Multi::None;
        }
        if self.level != Level::L2 {
            self.frag = Frag::None;
            self.l2_flag = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: Address = Address::new(0, 1);

    #[test]
    fn build_short_and_net() {
        let pkt = PacketBuilder {
            level: Level::L1,
            dst: Address::short(5),
            src_port: DEFAULT_PORT,
            dst_port: 10,
            seq: true,
            dat: &[1, 2, 3],
        }
        .build()
        .unwrap();
        assert_eq!(pkt.multi, Multi::None);
        assert_eq!(pkt.dst_peer(), Address::short(5));
        assert_eq!(pkt.dat(), &[1, 2, 3]);

        let pkt = PacketBuilder {
            level: Level::L1,
            dst: Address::new(2, 5),
            src_port: DEFAULT_PORT,
            dst_port: 10,
            seq: true,
            dat: &[],
        }
        .build()
        .unwrap();
        assert_eq!(pkt.multi, Multi::Net);
        assert_eq!(pkt.dst_peer(), Address::new(2, 5));
    }

    #[test]
    fn payload_too_long() {
        let mut pkt = Packet::default();
        let dat = [0; PAYLOAD_MAX + 1];
        assert_eq!(pkt.set_dat(&dat), Err(EncodingError::NotEnoughSpace));
        assert!(pkt.is_empty());
    }

    #[test]
    fn swap_src_dst_l1_net() {
        let mut pkt = Packet {
            src_mac: 5,
            dst_mac: 1,
            src_addr: Address::new(2, 5),
            dst_addr: LOCAL,
            multi: Multi::Net,
            src_port: DEFAULT_PORT,
            dst_port: 0,
            ..Default::default()
        };
        pkt.swap_src_dst(LOCAL);
        assert_eq!(pkt.src_mac, 1);
        assert_eq!(pkt.dst_peer(), Address::new(2, 5));
        assert_eq!(pkt.src_addr, LOCAL);
        assert_eq!((pkt.src_port, pkt.dst_port), (0, DEFAULT_PORT));
    }

    #[test]
    fn swap_src_dst_broadcast_and_cast() {
        let mut pkt = Packet {
            src_mac: 5,
            dst_mac: MAC_UNSPECIFIED,
            src_addr: Address::new(2, 5),
            dst_addr: Address::new(0, 200),
            multi: Multi::NetCast,
            ..Default::default()
        };
        pkt.swap_src_dst(LOCAL);
        assert_eq!(pkt.src_mac, LOCAL.mac);
        assert_eq!(pkt.multi, Multi::Net);
        assert_eq!(pkt.src_addr, LOCAL);
        assert_eq!(pkt.dst_addr, Address::new(2, 5));
    }

    #[test]
    fn normalize_by_level() {
        let mut pkt = Packet {
            level: Level::L0,
            seq: true,
            multi: Multi::Net,
            frag: Frag::First,
            l2_flag: 3,
            ..Default::default()
        };
        pkt.normalize();
        assert!(!pkt.seq);
        assert_eq!(pkt.multi, Multi::None);
        assert_eq!(pkt.frag, Frag::None);
        assert_eq!(pkt.l2_flag, 0);

        let mut pkt = Packet {
            level: Level::L2,
            seq: true,
            multi: Multi::Net,
            frag: Frag::Last,
            ..Default::default()
        };
        pkt.normalize();
        assert!(pkt.seq);
        assert_eq!(pkt.multi, Multi::None);
        assert_eq!(pkt.frag, Frag::Last);
    }
}
