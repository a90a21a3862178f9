use log::trace;

use crate::{
    error::{Error, Resource, Unsupported},
    protocol::{self, packet::DEFAULT_PORT, Level},
    transport::FrameTransport,
    utils::SlotId,
};

use super::Intf;

impl Intf {
    /// Drains received frames from `transport` and routes every packet.
    ///
    /// Returns when the transport has nothing more or the packet pool is
    /// empty; frames left behind are picked up by the next call.
    pub fn poll_receive(&mut self, transport: &mut impl FrameTransport) {
        loop {
            if self.pool.free_len() == 0 {
                self.report(Error::ResourceExhausted(Resource::Packet));
                return;
            }
            let Some(frame) = transport.acquire_rx_frame() else {
                return;
            };
            let Some(id) = self.pool.acquire() else {
                transport.release_frame(frame);
                return;
            };

            let pkt = self.pool.get_mut(id);
            let decoded = protocol::from_frame(&frame, pkt);
            pkt.normalize();
            transport.release_frame(frame);

            if let Err(e) = decoded {
                self.pool.release(id);
                self.report(Error::Decode(e));
                continue;
            }
            self.stat.rx_packets += 1;
            self.dispatch(id);
        }
    }

    fn dispatch(&mut self, id: SlotId) {
        let pkt = self.pool.get(id);
        if pkt.multi.is_cast() {
            self.pool.release(id);
            self.report(Error::UnsupportedFeature(Unsupported::MulticastRx));
            return;
        }

        if pkt.level != Level::L2 {
            if pkt.dst_port == 0 && pkt.src_port >= DEFAULT_PORT {
                self.p0_request_handle(id);
                return;
            }
            if pkt.src_port == 0 && pkt.dst_port == DEFAULT_PORT {
                self.p0_reply_handle(id);
                return;
            }
        }
        if pkt.seq {
            self.seq_rx_handle(id);
            return;
        }

        trace!("{}: rx: {} -> port {}", self.name, pkt.src_peer(), pkt.dst_port);
        self.pool.push_back(&mut self.rx_que, id);
    }
}
