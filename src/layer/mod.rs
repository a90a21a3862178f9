mod p0;
mod records;
mod rx;
mod seq_rx;
mod seq_tx;

use log::{debug, error, warn};
use thiserror::Error;

use crate::{
    error::{Error as LayerError, Resource},
    protocol::{Address, Packet},
    utils::{Pool, Que, RecencyList, SeqNum, Tick},
};

use self::records::{SeqRxRec, SeqTxRec};

pub const PKT_POOL_LEN: usize = 32;
pub const SEQ_RX_REC_MAX: usize = 3;
pub const SEQ_TX_REC_MAX: usize = 3;
/// Sent but unacknowledged packets per peer.
pub const SEQ_TX_PEND_MAX: usize = 3;
/// Every n-th sequenced packet asks the receiver for an ack.
pub const SEQ_TX_ACK_CNT: usize = 3;
/// Ticks before a pending packet or a port-0 request is considered lost.
pub const SEQ_TIMEOUT: Tick = 500;
pub const SEQ_TX_RETRY_MAX: usize = 3;
/// Packets [`Intf::send`] leaves free for port-0 requests, replies and acks.
pub const PKT_RESERVE: usize = SEQ_TX_REC_MAX + 2;

pub struct IntfBuilder {
    pub name: String,
    pub addr: Address,
    pub pkt_pool_len: usize,
    /// Should be larger than `tx_rec_max`.
    pub pkt_reserve: usize,
    pub rx_rec_max: usize,
    pub tx_rec_max: usize,
    pub tx_pend_max: usize,
    pub tx_ack_cnt: usize,
    pub seq_timeout: Tick,
    pub tx_retry_max: usize,
}

impl IntfBuilder {
    pub fn build(self) -> Result<Intf, BuildError> {
        let non_zero = [
            ("pkt_pool_len", self.pkt_pool_len),
            ("rx_rec_max", self.rx_rec_max),
            ("tx_rec_max", self.tx_rec_max),
            ("tx_pend_max", self.tx_pend_max),
            ("tx_ack_cnt", self.tx_ack_cnt),
            ("seq_timeout", self.seq_timeout as usize),
        ];
        for (field, v) in non_zero {
            if v == 0 {
                return Err(BuildError::Zero { field });
            }
        }
        if self.pkt_pool_len > u16::MAX as usize {
            return Err(BuildError::TooLarge {
                field: "pkt_pool_len",
            });
        }
        if self.pkt_reserve >= self.pkt_pool_len {
            return Err(BuildError::TooLarge {
                field: "pkt_reserve",
            });
        }

        let this = Intf {
            name: self.name,
            addr: self.addr,
            pool: Pool::new(self.pkt_pool_len, Packet::default),
            pkt_reserve: self.pkt_reserve,
            rx_que: Que::new(),
            tx_que: Que::new(),
            direct_que: Que::new(),
            rx_recs: RecencyList::new(self.rx_rec_max, SeqRxRec::default),
            tx_recs: RecencyList::new(self.tx_rec_max, SeqTxRec::default),
            tx_pend_max: self.tx_pend_max,
            tx_ack_cnt: self.tx_ack_cnt,
            seq_timeout: self.seq_timeout,
            tx_retry_max: self.tx_retry_max,
            stat: LocalStat::default(),
            last_error: None,
        };
        this.check_rep();
        debug!("{}: up at {}", this.name, this.addr);
        Ok(this)
    }

    #[must_use]
    pub fn default() -> Self {
        IntfBuilder {
            name: "seqlink".to_string(),
            addr: Address::UNSPECIFIED,
            pkt_pool_len: PKT_POOL_LEN,
            pkt_reserve: PKT_RESERVE,
            rx_rec_max: SEQ_RX_REC_MAX,
            tx_rec_max: SEQ_TX_REC_MAX,
            tx_pend_max: SEQ_TX_PEND_MAX,
            tx_ack_cnt: SEQ_TX_ACK_CNT,
            seq_timeout: SEQ_TIMEOUT,
            tx_retry_max: SEQ_TX_RETRY_MAX,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("`{field}` must not be zero")]
    Zero { field: &'static str },
    #[error("`{field}` is too large")]
    TooLarge { field: &'static str },
}

pub struct SendError<T>(pub T);

/// One network interface: packet pool, queues and sequence records.
///
/// Driven from the outside by [`Intf::poll_receive`] and
/// [`Intf::poll_transmit`]; nothing inside blocks or keeps time on its own.
pub struct Intf {
    name: String,
    addr: Address,

    pool: Pool<Packet>,
    /// Free packets `send` never takes.
    pkt_reserve: usize,
    /// Delivered upwards.
    rx_que: Que,
    /// Accepted from upwards, not yet admitted.
    tx_que: Que,
    /// Sent as-is on the next transmit poll.
    direct_que: Que,

    rx_recs: RecencyList<SeqRxRec>,
    tx_recs: RecencyList<SeqTxRec>,

    // const
    tx_pend_max: usize,
    tx_ack_cnt: usize,
    seq_timeout: Tick,
    tx_retry_max: usize,

    stat: LocalStat,
    last_error: Option<LayerError>,
}

impl Intf {
    #[inline]
    fn check_rep(&self) {
        let queued = self.rx_que.len() + self.tx_que.len() + self.direct_que.len();
        assert!(queued + self.pool.free_len() <= self.pool.capacity());
    }

    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    #[inline]
    pub fn addr(&self) -> Address {
        self.addr
    }

    #[must_use]
    #[inline]
    pub fn free_packets(&self) -> usize {
        self.pool.free_len()
    }

    /// Queues `pkt` for transmission; source fields are filled in from the
    /// interface address.
    ///
    /// Hands `pkt` back once only the reserved packets are left free.
    pub fn send(&mut self, mut pkt: Packet) -> Result<(), SendError<Packet>> {
        if self.pool.free_len() <= self.pkt_reserve {
            self.report(LayerError::ResourceExhausted(Resource::Packet));
            return Err(SendError(pkt));
        }
        let Some(id) = self.pool.acquire() else {
            self.report(LayerError::ResourceExhausted(Resource::Packet));
            return Err(SendError(pkt));
        };
        pkt.fill_src(self.addr);
        *self.pool.get_mut(id) = pkt;
        self.pool.push_back(&mut self.tx_que, id);
        self.check_rep();
        Ok(())
    }

    /// Next packet delivered to the upper layer.
    #[must_use]
    pub fn recv(&mut self) -> Option<Packet> {
        let id = self.pool.pop_front(&mut self.rx_que)?;
        let pkt = std::mem::take(self.pool.get_mut(id));
        self.pool.release(id);
        self.check_rep();
        Some(pkt)
    }

    #[must_use]
    pub fn stat(&self) -> Stat {
        Stat {
            rx_packets: self.stat.rx_packets,
            tx_packets: self.stat.tx_packets,
            acks_sent: self.stat.acks_sent,
            p0_requests: self.stat.p0_requests,
            p0_retries: self.stat.p0_retries,
            decode_errors: self.stat.decode_errors,
            encode_errors: self.stat.encode_errors,
            no_free_packet: self.stat.no_free_packet,
            no_free_frame: self.stat.no_free_frame,
            no_free_record: self.stat.no_free_record,
            sequence_mismatches: self.stat.sequence_mismatches,
            unsupported: self.stat.unsupported,
            late_controls: self.stat.late_controls,
            retry_exhausted: self.stat.retry_exhausted,
            protocol_inconsistencies: self.stat.protocol_inconsistencies,
            free_packets: self.pool.free_len(),
        }
    }

    /// Most recent error seen while polling.
    #[must_use]
    pub fn last_error(&self) -> Option<&LayerError> {
        self.last_error.as_ref()
    }

    /// Transmit-side state kept for `peer`, if it has a record.
    #[must_use]
    pub fn tx_peer(&self, peer: Address) -> Option<TxPeerState> {
        let pos = self.tx_recs.position(|r| r.addr == peer)?;
        let rec = self.tx_recs.get(self.tx_recs.at(pos));
        Some(TxPeerState {
            seq_num: rec.seq_num,
            waiting: rec.wait.len(),
            pending_seqs: self
                .pool
                .iter(&rec.pend)
                .map(|(_, pkt)| pkt.seq_num)
                .collect(),
            p0_outstanding: rec.p0_req.is_some(),
            p0_retries: rec.p0_retry_cnt,
        })
    }

    /// Next sequence number expected from `peer`, if it has a record.
    #[must_use]
    pub fn rx_peer_seq(&self, peer: Address) -> Option<SeqNum> {
        let pos = self.rx_recs.position(|r| r.addr == peer)?;
        Some(self.rx_recs.get(self.rx_recs.at(pos)).seq_num)
    }

    /// Peers with a receive record, most recently used first.
    #[must_use]
    pub fn rx_peers(&self) -> Vec<Address> {
        self.rx_recs
            .iter_order()
            .map(|idx| self.rx_recs.get(idx).addr)
            .filter(|addr| !addr.is_unspecified())
            .collect()
    }

    pub(crate) fn report(&mut self, err: LayerError) {
        match &err {
            LayerError::Decode(_) => {
                self.stat.decode_errors += 1;
                error!("{}: {}", self.name, err);
            }
            LayerError::Encode(_) => {
                self.stat.encode_errors += 1;
                error!("{}: {}", self.name, err);
            }
            LayerError::ResourceExhausted(resource) => {
                match resource {
                    Resource::Packet => self.stat.no_free_packet += 1,
                    Resource::Frame => self.stat.no_free_frame += 1,
                    Resource::Record => self.stat.no_free_record += 1,
                }
                warn!("{}: {}", self.name, err);
            }
            LayerError::SequenceMismatch { .. } => {
                self.stat.sequence_mismatches += 1;
                error!("{}: {}", self.name, err);
            }
            LayerError::UnsupportedFeature(_) => {
                self.stat.unsupported += 1;
                warn!("{}: {}", self.name, err);
            }
            LayerError::LateControlMessage(_) => {
                self.stat.late_controls += 1;
                error!("{}: {}", self.name, err);
            }
            LayerError::RetryExhausted { .. } => {
                self.stat.retry_exhausted += 1;
                error!("{}: {}", self.name, err);
            }
            LayerError::ProtocolInconsistency { .. } => {
                self.stat.protocol_inconsistencies += 1;
                error!("{}: {}", self.name, err);
            }
        }
        self.last_error = Some(err);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxPeerState {
    pub seq_num: SeqNum,
    pub waiting: usize,
    /// Sequence numbers of sent, unacknowledged packets, oldest first.
    pub pending_seqs: Vec<SeqNum>,
    pub p0_outstanding: bool,
    pub p0_retries: usize,
}

#[derive(Debug, Default)]
struct LocalStat {
    rx_packets: u64,
    tx_packets: u64,
    acks_sent: u64,
    p0_requests: u64,
    p0_retries: u64,
    decode_errors: u64,
    encode_errors: u64,
    no_free_packet: u64,
    no_free_frame: u64,
    no_free_record: u64,
    sequence_mismatches: u64,
    unsupported: u64,
    late_controls: u64,
    retry_exhausted: u64,
    protocol_inconsistencies: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub acks_sent: u64,
    pub p0_requests: u64,
    pub p0_retries: u64,
    pub decode_errors: u64,
    pub encode_errors: u64,
    pub no_free_packet: u64,
    pub no_free_frame: u64,
    pub no_free_record: u64,
    pub sequence_mismatches: u64,
    pub unsupported: u64,
    pub late_controls: u64,
    pub retry_exhausted: u64,
    pub protocol_inconsistencies: u64,
    pub free_packets: usize,
}

#[cfg(test)]
mod tests {
    use crate::protocol::{packet::DEFAULT_PORT, Level, PacketBuilder};

    use super::*;

    fn intf(pkt_pool_len: usize) -> Intf {
        IntfBuilder {
            addr: Address::short(1),
            pkt_pool_len,
            pkt_reserve: 0,
            ..IntfBuilder::default()
        }
        .build()
        .unwrap()
    }

    #[test]
    fn build_rejects_zero() {
        let err = IntfBuilder {
            tx_pend_max: 0,
            ..IntfBuilder::default()
        }
        .build()
        .err()
        .unwrap();
        assert_eq!(err, BuildError::Zero { field: "tx_pend_max" });
    }

    #[test]
    fn build_rejects_reserve_of_whole_pool() {
        let err = IntfBuilder {
            pkt_pool_len: 4,
            pkt_reserve: 4,
            ..IntfBuilder::default()
        }
        .build()
        .err()
        .unwrap();
        assert_eq!(err, BuildError::TooLarge { field: "pkt_reserve" });
    }

    fn unseq_pkt() -> Packet {
        PacketBuilder {
            level: Level::L1,
            dst: Address::short(2),
            src_port: DEFAULT_PORT,
            dst_port: 1,
            seq: false,
            dat: &[7],
        }
        .build()
        .unwrap()
    }

    #[test]
    fn send_stops_at_reserve() {
        let mut intf = IntfBuilder {
            addr: Address::short(1),
            pkt_pool_len: 8,
            ..IntfBuilder::default()
        }
        .build()
        .unwrap();
        for _ in 0..(8 - PKT_RESERVE) {
            assert!(intf.send(unseq_pkt()).is_ok());
        }
        assert!(intf.send(unseq_pkt()).is_err());
        assert_eq!(intf.free_packets(), PKT_RESERVE);
        assert_eq!(intf.stat().no_free_packet, 1);
    }

    #[test]
    fn send_hands_back_when_pool_empty() {
        let mut intf = intf(1);
        let pkt = PacketBuilder {
            level: Level::L1,
            dst: Address::short(2),
            src_port: DEFAULT_PORT,
            dst_port: 1,
            seq: false,
            dat: &[7],
        }
        .build()
        .unwrap();
        assert!(intf.send(pkt.clone()).is_ok());
        let SendError(back) = intf.send(pkt).err().unwrap();
        assert_eq!(back.dat(), &[7]);
        assert_eq!(intf.stat().no_free_packet, 1);
        assert_eq!(
            intf.last_error(),
            Some(&LayerError::ResourceExhausted(Resource::Packet))
        );
    }

    #[test]
    fn send_fills_source() {
        let mut intf = intf(2);
        let pkt = PacketBuilder {
            level: Level::L1,
            dst: Address::new(3, 2),
            src_port: DEFAULT_PORT,
            dst_port: 1,
            seq: false,
            dat: &[],
        }
        .build()
        .unwrap();
        intf.send(pkt).ok().unwrap();
        let id = intf.tx_que.front().unwrap();
        let queued = intf.pool.get(id);
        assert_eq!(queued.src_mac, 1);
        assert_eq!(queued.src_addr, Address::short(1));
    }
}
