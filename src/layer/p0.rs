use log::{debug, trace, warn};

use crate::{
    error::{Error, LateControl},
    protocol::{
        port0::{P0Reply, P0Request},
        Address,
    },
    utils::{SeqNum, SlotId},
};

use super::Intf;

impl Intf {
    /// Port-0 request from a peer: an ack for our pending packets, or a
    /// query/set aimed at our receive record for that peer.
    pub(crate) fn p0_request_handle(&mut self, id: SlotId) {
        let pkt = self.pool.get(id);
        let peer = pkt.src_peer();
        match P0Request::parse(pkt.dat()) {
            Some(P0Request::Ack(ack)) => self.p0_ack(id, peer, ack),
            Some(P0Request::Query) => {
                let seq = self
                    .rx_recs
                    .position(|r| r.addr == peer)
                    .map(|pos| self.rx_recs.get(self.rx_recs.at(pos)).seq_num)
                    .unwrap_or(SeqNum::UNSYNCED);
                trace!("{}: p0_rx: query from {}: {}", self.name, peer, seq);
                self.p0_reply(id, P0Reply::Query(seq));
            }
            Some(P0Request::Set(seq)) => {
                match self.rx_recs.position(|r| r.addr == peer) {
                    Some(pos) => {
                        self.rx_recs.get_mut(self.rx_recs.at(pos)).seq_num = seq;
                        self.rx_recs.move_to_front(pos);
                        debug!("{}: p0_rx: set seq rec {}: {}", self.name, peer, seq);
                    }
                    None => {
                        let pos = self.rx_recs.last_pos();
                        let rec = self.rx_recs.get_mut(self.rx_recs.at(pos));
                        rec.addr = peer;
                        rec.seq_num = seq;
                        self.rx_recs.move_to_front(pos);
                        debug!("{}: p0_rx: pick seq rec {}: {}", self.name, peer, seq);
                    }
                }
                self.p0_reply(id, P0Reply::Set);
            }
            None => {
                warn!("{}: p0_rx: unknown request from {}", self.name, peer);
                self.pool.release(id);
            }
        }
    }

    /// Answers a request in place: the request packet becomes the reply.
    fn p0_reply(&mut self, id: SlotId, reply: P0Reply) {
        let local = self.addr;
        let pkt = self.pool.get_mut(id);
        reply.write_to(pkt);
        pkt.swap_src_dst(local);
        self.pool.push_back(&mut self.direct_que, id);
    }

    fn p0_ack(&mut self, id: SlotId, peer: Address, ack: SeqNum) {
        self.pool.release(id);
        let Some(pos) = self.tx_recs.position(|r| r.addr == peer) else {
            self.report(Error::LateControlMessage(LateControl::AckNoRecord(peer)));
            return;
        };
        let idx = self.tx_recs.at(pos);
        if self.tx_recs.get(idx).p0_req.is_some() {
            self.report(Error::LateControlMessage(LateControl::AckDuringRequest(
                peer,
            )));
            return;
        }
        let n = self.evict_acked(idx, ack);
        trace!("{}: p0_rx: ack {} from {}, freed {}", self.name, ack, peer, n);
    }

    /// Frees pending packets from the front up to, not including, the one
    /// stamped `ack`; everything if none is.
    pub(crate) fn evict_acked(&mut self, idx: usize, ack: SeqNum) -> usize {
        let rec = self.tx_recs.get_mut(idx);
        let mut n = 0;
        while let Some(front) = rec.pend.front() {
            if self.pool.get(front).seq_num == ack {
                break;
            }
            if let Some(acked) = self.pool.pop_front(&mut rec.pend) {
                self.pool.release(acked);
                n += 1;
            }
        }
        n
    }

    /// Port-0 reply to one of our own requests.
    pub(crate) fn p0_reply_handle(&mut self, id: SlotId) {
        let pkt = self.pool.get(id);
        let peer = pkt.src_peer();
        let reply = P0Reply::parse(pkt.dat());
        self.pool.release(id);

        let Some(pos) = self.tx_recs.position(|r| r.addr == peer) else {
            self.report(Error::LateControlMessage(LateControl::ReplyNoRecord(peer)));
            return;
        };
        let idx = self.tx_recs.at(pos);
        let Some(req_id) = self.tx_recs.get(idx).p0_req else {
            self.report(Error::LateControlMessage(LateControl::ReplyNoRequest(peer)));
            return;
        };
        let req = P0Request::parse(self.pool.get(req_id).dat());
        let reply = match (req, reply) {
            (Some(req), Some(reply)) if req.expects(&reply) => reply,
            _ => {
                self.report(Error::LateControlMessage(LateControl::ReplyMismatch(peer)));
                return;
            }
        };

        match reply {
            P0Reply::Query(seq) => {
                self.tx_recs.get_mut(idx).seq_num = seq;
                if seq.is_synced() {
                    self.evict_acked(idx, seq);
                } else {
                    warn!("{}: p0_rx: {} lost our seq state", self.name, peer);
                }
                let rec = self.tx_recs.get_mut(idx);
                if !rec.pend.is_empty() {
                    warn!(
                        "{}: p0_rx: re-send {} pending to {}",
                        self.name,
                        rec.pend.len(),
                        peer
                    );
                    self.pool.splice_front(&mut rec.wait, &mut rec.pend);
                }
            }
            P0Reply::Set => {
                let rec = self.tx_recs.get_mut(idx);
                if !rec.pend.is_empty() {
                    self.pool.release_all(&mut rec.pend);
                    self.report(Error::ProtocolInconsistency {
                        peer,
                        what: "set seq reply with packets pending",
                    });
                }
                debug!("{}: p0_rx: {} synced", self.name, peer);
            }
        }

        let rec = self.tx_recs.get_mut(idx);
        rec.p0_req = None;
        rec.p0_retry_cnt = 0;
        self.pool.release(req_id);
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        layer::IntfBuilder,
        protocol::{packet::DEFAULT_PORT, Level, Packet},
        utils::Que,
    };

    use super::*;

    const LOCAL: Address = Address::short(1);
    const PEER: Address = Address::short(2);

    fn intf() -> Intf {
        IntfBuilder {
            addr: LOCAL,
            ..IntfBuilder::default()
        }
        .build()
        .unwrap()
    }

    fn request_from(intf: &mut Intf, peer: Address, req: P0Request) -> SlotId {
        let id = intf.pool.acquire().unwrap();
        let mut pkt = Packet::default();
        req.write_to(&mut pkt);
        pkt.src_mac = peer.mac;
        pkt.dst_mac = LOCAL.mac;
        *intf.pool.get_mut(id) = pkt;
        id
    }

    fn reply_from(intf: &mut Intf, peer: Address, reply: P0Reply) -> SlotId {
        let id = intf.pool.acquire().unwrap();
        let mut pkt = Packet {
            level: Level::L1,
            src_mac: peer.mac,
            dst_mac: LOCAL.mac,
            src_port: 0,
            dst_port: DEFAULT_PORT,
            ..Default::default()
        };
        reply.write_to(&mut pkt);
        *intf.pool.get_mut(id) = pkt;
        id
    }

    /// Puts a tx record for PEER at the front with pending packets stamped `seqs`.
    fn tx_rec_with_pending(intf: &mut Intf, seqs: &[u8]) -> usize {
        let pos = intf.tx_recs.last_pos();
        let idx = intf.tx_recs.at(pos);
        intf.tx_recs.get_mut(idx).reset(PEER);
        intf.tx_recs.get_mut(idx).seq_num = SeqNum::from_u8(seqs.last().map_or(0, |s| s + 1));
        intf.tx_recs.move_to_front(pos);
        for &seq in seqs {
            let id = intf.pool.acquire().unwrap();
            intf.pool.get_mut(id).seq = true;
            intf.pool.get_mut(id).seq_num = SeqNum::from_u8(seq);
            let rec = intf.tx_recs.get_mut(idx);
            intf.pool.push_back(&mut rec.pend, id);
        }
        idx
    }

    fn direct_front(intf: &Intf) -> &Packet {
        intf.pool.get(intf.direct_que.front().unwrap())
    }

    #[test]
    fn query_without_record() {
        let mut intf = intf();
        let id = request_from(&mut intf, PEER, P0Request::Query);
        intf.p0_request_handle(id);
        let reply = direct_front(&intf);
        assert_eq!(reply.dat(), &[0x80]);
        assert_eq!(reply.dst_mac, PEER.mac);
        assert_eq!((reply.src_port, reply.dst_port), (0, DEFAULT_PORT));
    }

    #[test]
    fn set_then_query() {
        let mut intf = intf();
        let id = request_from(&mut intf, PEER, P0Request::Set(SeqNum::from_u8(9)));
        intf.p0_request_handle(id);
        assert!(direct_front(&intf).dat().is_empty());
        assert_eq!(intf.rx_peer_seq(PEER), Some(SeqNum::from_u8(9)));

        let id = request_from(&mut intf, PEER, P0Request::Query);
        intf.p0_request_handle(id);
        let mut que = Que::new();
        std::mem::swap(&mut que, &mut intf.direct_que);
        let replies: Vec<_> = intf.pool.iter(&que).map(|(_, p)| p.dat().to_vec()).collect();
        assert_eq!(replies, vec![vec![], vec![9]]);
    }

    #[test]
    fn set_recycles_least_recent() {
        let mut intf = intf();
        for mac in 2..=4 {
            let id = request_from(&mut intf, Address::short(mac), P0Request::Set(SeqNum::ZERO));
            intf.p0_request_handle(id);
        }
        // touch 2 so that 3 is the least recent
        let id = request_from(&mut intf, Address::short(2), P0Request::Set(SeqNum::ZERO));
        intf.p0_request_handle(id);
        let id = request_from(&mut intf, Address::short(5), P0Request::Set(SeqNum::ZERO));
        intf.p0_request_handle(id);
        assert_eq!(
            intf.rx_peers(),
            vec![Address::short(5), Address::short(2), Address::short(4)]
        );
    }

    #[test]
    fn cumulative_ack() {
        let mut intf = intf();
        tx_rec_with_pending(&mut intf, &[0, 1, 2, 3, 4]);
        let id = request_from(&mut intf, PEER, P0Request::Ack(SeqNum::from_u8(3)));
        intf.p0_request_handle(id);
        let state = intf.tx_peer(PEER).unwrap();
        assert_eq!(state.pending_seqs, vec![SeqNum::from_u8(3), SeqNum::from_u8(4)]);
    }

    #[test]
    fn ack_past_everything_empties_pending() {
        let mut intf = intf();
        tx_rec_with_pending(&mut intf, &[0, 1]);
        let id = request_from(&mut intf, PEER, P0Request::Ack(SeqNum::from_u8(2)));
        intf.p0_request_handle(id);
        assert!(intf.tx_peer(PEER).unwrap().pending_seqs.is_empty());
    }

    #[test]
    fn stray_ack() {
        let mut intf = intf();
        let free = intf.free_packets();
        let id = request_from(&mut intf, PEER, P0Request::Ack(SeqNum::ZERO));
        intf.p0_request_handle(id);
        assert_eq!(intf.stat().late_controls, 1);
        assert_eq!(intf.free_packets(), free);
    }

    #[test]
    fn ack_during_request_is_late() {
        let mut intf = intf();
        let idx = tx_rec_with_pending(&mut intf, &[0, 1]);
        let req = intf.pool.acquire().unwrap();
        intf.tx_recs.get_mut(idx).p0_req = Some(req);
        let id = request_from(&mut intf, PEER, P0Request::Ack(SeqNum::from_u8(1)));
        intf.p0_request_handle(id);
        assert_eq!(
            intf.last_error(),
            Some(&Error::LateControlMessage(LateControl::AckDuringRequest(PEER)))
        );
        assert_eq!(intf.tx_peer(PEER).unwrap().pending_seqs.len(), 2);
    }

    #[test]
    fn query_reply_requeues_unacked() {
        let mut intf = intf();
        let idx = tx_rec_with_pending(&mut intf, &[4, 5, 6]);
        let req = request_from(&mut intf, PEER, P0Request::Query);
        intf.tx_recs.get_mut(idx).p0_req = Some(req);

        let id = reply_from(&mut intf, PEER, P0Reply::Query(SeqNum::from_u8(5)));
        intf.p0_reply_handle(id);

        let state = intf.tx_peer(PEER).unwrap();
        assert!(!state.p0_outstanding);
        assert_eq!(state.seq_num, SeqNum::from_u8(5));
        assert!(state.pending_seqs.is_empty());
        assert_eq!(state.waiting, 2);
    }

    #[test]
    fn query_reply_unsynced_keeps_all() {
        let mut intf = intf();
        let idx = tx_rec_with_pending(&mut intf, &[4, 5]);
        let req = request_from(&mut intf, PEER, P0Request::Query);
        intf.tx_recs.get_mut(idx).p0_req = Some(req);

        let id = reply_from(&mut intf, PEER, P0Reply::Query(SeqNum::UNSYNCED));
        intf.p0_reply_handle(id);

        let state = intf.tx_peer(PEER).unwrap();
        assert_eq!(state.seq_num, SeqNum::UNSYNCED);
        assert_eq!(state.waiting, 2);
    }

    #[test]
    fn set_reply_with_pending_is_inconsistent() {
        let mut intf = intf();
        let idx = tx_rec_with_pending(&mut intf, &[0]);
        let req = request_from(&mut intf, PEER, P0Request::Set(SeqNum::ZERO));
        intf.tx_recs.get_mut(idx).p0_req = Some(req);
        let id = reply_from(&mut intf, PEER, P0Reply::Set);
        intf.p0_reply_handle(id);
        assert_eq!(intf.stat().protocol_inconsistencies, 1);
        assert!(!intf.tx_peer(PEER).unwrap().p0_outstanding);
        assert_eq!(intf.free_packets(), intf.pool.capacity());
    }

    #[test]
    fn mismatched_reply_keeps_request() {
        let mut intf = intf();
        let idx = tx_rec_with_pending(&mut intf, &[]);
        let req = request_from(&mut intf, PEER, P0Request::Set(SeqNum::ZERO));
        intf.tx_recs.get_mut(idx).p0_req = Some(req);
        let id = reply_from(&mut intf, PEER, P0Reply::Query(SeqNum::ZERO));
        intf.p0_reply_handle(id);
        assert_eq!(
            intf.last_error(),
            Some(&Error::LateControlMessage(LateControl::ReplyMismatch(PEER)))
        );
        assert!(intf.tx_peer(PEER).unwrap().p0_outstanding);
    }

    #[test]
    fn reply_without_request() {
        let mut intf = intf();
        tx_rec_with_pending(&mut intf, &[]);
        let id = reply_from(&mut intf, PEER, P0Reply::Set);
        intf.p0_reply_handle(id);
        assert_eq!(
            intf.last_error(),
            Some(&Error::LateControlMessage(LateControl::ReplyNoRequest(PEER)))
        );
    }
}
