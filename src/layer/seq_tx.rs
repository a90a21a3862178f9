use log::{debug, trace, warn};

use crate::{
    error::{Error, Resource, Unsupported},
    protocol::{self, addr::MAC_UNSPECIFIED, port0::P0Request, Packet},
    transport::FrameTransport,
    utils::{SeqNum, SlotId, Tick},
};

use super::Intf;

/// The transport had no free frame; nothing more can go out this poll.
struct NoFrame;

enum Delivery {
    Submitted,
    /// Could not be encoded and will never be.
    Dropped,
}

impl Intf {
    /// Admits queued packets, sends direct traffic and then runs every
    /// active transmit record once.
    ///
    /// `now` is the caller's tick counter; it is only compared by
    /// wrapping difference.
    pub fn poll_transmit(&mut self, transport: &mut impl FrameTransport, now: Tick) {
        self.admit();
        if self.drain_direct(transport).is_err() {
            return;
        }
        for pos in 0..self.tx_recs.len() {
            let idx = self.tx_recs.at(pos);
            if self.tx_recs.get(idx).addr.is_unspecified() {
                break;
            }
            if self.tx_cycle(transport, idx, now).is_err() {
                return;
            }
        }
        self.check_rep();
    }

    /// Moves packets from the upper-layer queue to the direct queue or to a
    /// peer's wait queue.
    fn admit(&mut self) {
        while let Some(id) = self.pool.pop_front(&mut self.tx_que) {
            let pkt = self.pool.get_mut(id);
            pkt.normalize();
            if pkt.seq && (pkt.dst_mac == MAC_UNSPECIFIED || pkt.multi.is_cast()) {
                let feature = if pkt.multi.is_cast() {
                    Unsupported::SeqMulticast
                } else {
                    Unsupported::SeqBroadcast
                };
                pkt.seq = false;
                self.report(Error::UnsupportedFeature(feature));
            }

            let pkt = self.pool.get(id);
            let peer = pkt.dst_peer();
            let seq = pkt.seq;
            if peer.is_unspecified() || pkt.multi.is_cast() {
                self.pool.push_back(&mut self.direct_que, id);
                continue;
            }

            if let Some(pos) = self.tx_recs.position(|r| r.addr == peer) {
                let rec = self.tx_recs.get_mut(self.tx_recs.at(pos));
                // keep order behind sequenced traffic still in flight
                if seq || rec.is_in_use() {
                    self.pool.push_back(&mut rec.wait, id);
                    self.tx_recs.move_to_front(pos);
                    continue;
                }
            }
            if !seq {
                self.pool.push_back(&mut self.direct_que, id);
                continue;
            }

            let pos = self.tx_recs.last_pos();
            let rec = self.tx_recs.get_mut(self.tx_recs.at(pos));
            if rec.is_in_use() {
                self.pool.push_front(&mut self.tx_que, id);
                self.report(Error::ResourceExhausted(Resource::Record));
                break;
            }
            if !rec.addr.is_unspecified() {
                debug!("{}: seq_tx: recycle rec {} for {}", self.name, rec.addr, peer);
            } else {
                debug!("{}: seq_tx: pick rec for {}", self.name, peer);
            }
            rec.reset(peer);
            self.pool.push_back(&mut rec.wait, id);
            self.tx_recs.move_to_front(pos);
        }
    }

    fn drain_direct(&mut self, transport: &mut impl FrameTransport) -> Result<(), NoFrame> {
        while let Some(id) = self.direct_que.front() {
            self.send_pkt(transport, id)?;
            let _ = self.pool.pop_front(&mut self.direct_que);
            self.pool.release(id);
        }
        Ok(())
    }

    fn send_pkt(
        &mut self,
        transport: &mut impl FrameTransport,
        id: SlotId,
    ) -> Result<Delivery, NoFrame> {
        let Some(mut frame) = transport.acquire_tx_frame() else {
            self.report(Error::ResourceExhausted(Resource::Frame));
            return Err(NoFrame);
        };
        if let Err(e) = protocol::to_frame(self.pool.get(id), &mut frame) {
            transport.release_frame(frame);
            self.report(Error::Encode(e));
            return Ok(Delivery::Dropped);
        }
        transport.submit_tx_frame(frame);
        self.stat.tx_packets += 1;
        Ok(Delivery::Submitted)
    }

    /// One step of the per-peer state machine. Exactly one of: wait on or
    /// retry the outstanding port-0 request, synchronize, check the oldest
    /// pending packet, or send from the wait queue.
    fn tx_cycle(
        &mut self,
        transport: &mut impl FrameTransport,
        idx: usize,
        now: Tick,
    ) -> Result<(), NoFrame> {
        let rec = self.tx_recs.get(idx);

        if let Some(req_id) = rec.p0_req {
            let retry = rec.p0_retry_cnt;
            let timeout = self.seq_timeout.saturating_mul(retry as Tick + 1);
            if now.wrapping_sub(self.pool.get(req_id).send_time) <= timeout {
                return Ok(());
            }
            warn!(
                "{}: seq_tx: p0 request to {} timed out, retry {}",
                self.name, rec.addr, retry
            );
            if retry >= self.tx_retry_max {
                self.flush(idx);
                return Ok(());
            }
            if let Ok(Delivery::Submitted) = self.send_pkt(transport, req_id) {
                self.pool.get_mut(req_id).send_time = now;
                self.tx_recs.get_mut(idx).p0_retry_cnt += 1;
                self.stat.p0_retries += 1;
            }
            return Ok(());
        }

        if !rec.seq_num.is_synced() && (!rec.wait.is_empty() || !rec.pend.is_empty()) {
            let Some(req_id) = self.new_p0_req(idx, P0Request::Set(SeqNum::ZERO)) else {
                return Ok(());
            };
            self.tx_recs.get_mut(idx).seq_num = SeqNum::ZERO;
            debug!("{}: seq_tx: set seq to {}", self.name, self.tx_recs.get(idx).addr);
            // no frame: retried once the back-dated request times out
            let _ = self.send_p0_req(transport, req_id, now);
            return Ok(());
        }

        if let Some(front) = rec.pend.front() {
            if now.wrapping_sub(self.pool.get(front).send_time) > self.seq_timeout {
                trace!("{}: seq_tx: pending timeout to {}", self.name, rec.addr);
                let Some(req_id) = self.new_p0_req(idx, P0Request::Query) else {
                    return Ok(());
                };
                self.tx_recs.get_mut(idx).send_cnt = 0;
                // the reply may move pending back to wait, so no drain this cycle
                return self.send_p0_req(transport, req_id, now);
            }
        }

        self.drain_wait(transport, idx, now)
    }

    /// Builds a port-0 request to the record's peer and parks it on the record.
    fn new_p0_req(&mut self, idx: usize, req: P0Request) -> Option<SlotId> {
        let Some(req_id) = self.pool.acquire() else {
            self.report(Error::ResourceExhausted(Resource::Packet));
            return None;
        };
        let local = self.addr;
        let rec = self.tx_recs.get_mut(idx);
        let pkt = self.pool.get_mut(req_id);
        *pkt = Packet::default();
        req.write_to(pkt);
        pkt.set_dst_peer(rec.addr);
        pkt.fill_src(local);
        rec.p0_req = Some(req_id);
        self.stat.p0_requests += 1;
        Some(req_id)
    }

    fn send_p0_req(
        &mut self,
        transport: &mut impl FrameTransport,
        req_id: SlotId,
        now: Tick,
    ) -> Result<(), NoFrame> {
        let sent = self.send_pkt(transport, req_id);
        self.pool.get_mut(req_id).send_time = match sent {
            Ok(_) => now,
            Err(NoFrame) => now.wrapping_sub(self.seq_timeout),
        };
        sent.map(|_| ())
    }

    /// Gives up on the peer: every queued packet is dropped and the record
    /// goes back to unsynchronized.
    fn flush(&mut self, idx: usize) {
        let rec = self.tx_recs.get_mut(idx);
        let dropped = rec.wait.len() + rec.pend.len();
        self.pool.release_all(&mut rec.pend);
        self.pool.release_all(&mut rec.wait);
        if let Some(req_id) = rec.p0_req.take() {
            self.pool.release(req_id);
        }
        rec.p0_retry_cnt = 0;
        rec.send_cnt = 0;
        rec.seq_num = SeqNum::UNSYNCED;
        let peer = rec.addr;
        self.report(Error::RetryExhausted { peer, dropped });
    }

    /// Sends from the wait queue while the pending window has room.
    fn drain_wait(
        &mut self,
        transport: &mut impl FrameTransport,
        idx: usize,
        now: Tick,
    ) -> Result<(), NoFrame> {
        loop {
            let rec = self.tx_recs.get(idx);
            if rec.pend.len() >= self.tx_pend_max {
                break;
            }
            let Some(id) = rec.wait.front() else {
                break;
            };
            let seq_num = rec.seq_num;
            let send_cnt = rec.send_cnt + 1;
            let ack_due = send_cnt == self.tx_ack_cnt;

            let pkt = self.pool.get_mut(id);
            let seq = pkt.seq;
            if seq {
                pkt.seq_num = seq_num;
                pkt.req_ack = ack_due;
            }
            let sent = self.send_pkt(transport, id)?;

            let rec = self.tx_recs.get_mut(idx);
            let _ = self.pool.pop_front(&mut rec.wait);
            if seq {
                rec.send_cnt = if ack_due { 0 } else { send_cnt };
            }
            match sent {
                Delivery::Submitted if seq => {
                    rec.seq_num.increment();
                    self.pool.get_mut(id).send_time = now;
                    self.pool.push_back(&mut rec.pend, id);
                }
                _ => self.pool.release(id),
            }
        }
        Ok(())
    }
}
