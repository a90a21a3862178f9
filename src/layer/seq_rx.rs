use log::trace;

use crate::{
    error::{Error, Resource},
    protocol::{port0::P0Request, Packet},
    utils::{SeqNum, SlotId},
};

use super::Intf;

impl Intf {
    /// Accepts a sequenced packet only if it carries exactly the number the
    /// peer's receive record expects.
    pub(crate) fn seq_rx_handle(&mut self, id: SlotId) {
        let pkt = self.pool.get(id);
        let peer = pkt.src_peer();
        let got = pkt.seq_num();
        let req_ack = pkt.req_ack();

        let pos = self.rx_recs.position(|r| r.addr == peer);
        let expected = pos.map(|pos| self.rx_recs.get(self.rx_recs.at(pos)).seq_num);
        let Some(pos) = pos.filter(|_| expected == Some(got)) else {
            self.pool.release(id);
            self.report(Error::SequenceMismatch {
                peer,
                expected,
                got,
            });
            return;
        };

        let next = got.next();
        self.rx_recs.get_mut(self.rx_recs.at(pos)).seq_num = next;
        if req_ack {
            self.send_ack(id, next);
        }
        self.rx_recs.move_to_front(pos);
        trace!("{}: seq_rx: {} from {}", self.name, got, peer);
        self.pool.push_back(&mut self.rx_que, id);
    }

    /// Queues an ack telling the origin of packet `id` what we expect next.
    fn send_ack(&mut self, id: SlotId, next: SeqNum) {
        let Some(ack_id) = self.pool.acquire() else {
            self.report(Error::ResourceExhausted(Resource::Packet));
            return;
        };
        let pkt = self.pool.get(id);
        let mut ack = Packet {
            level: pkt.level,
            src_mac: pkt.src_mac,
            dst_mac: pkt.dst_mac,
            src_addr: pkt.src_addr,
            dst_addr: pkt.dst_addr,
            multi: pkt.multi,
            ..Default::default()
        };
        ack.swap_src_dst(self.addr);
        P0Request::Ack(next).write_to(&mut ack);
        *self.pool.get_mut(ack_id) = ack;
        self.pool.push_back(&mut self.direct_que, ack_id);
        self.stat.acks_sent += 1;
        trace!("{}: seq_rx: ack {} to {}", self.name, next, self.pool.get(ack_id).dst_peer());
    }
}
