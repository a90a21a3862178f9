use crate::{
    protocol::Address,
    utils::{Que, SeqNum, SlotId},
};

/// What we expect next from one sending peer.
pub(crate) struct SeqRxRec {
    pub addr: Address,
    pub seq_num: SeqNum,
}

impl Default for SeqRxRec {
    fn default() -> Self {
        SeqRxRec {
            addr: Address::UNSPECIFIED,
            seq_num: SeqNum::UNSYNCED,
        }
    }
}

/// Transmit state towards one receiving peer.
pub(crate) struct SeqTxRec {
    pub addr: Address,
    /// Stamped on the next sequenced packet.
    pub seq_num: SeqNum,
    /// Sequenced packets sent since the last ack request.
    pub send_cnt: usize,
    /// Outstanding port-0 request, held here rather than on a queue.
    pub p0_req: Option<SlotId>,
    pub p0_retry_cnt: usize,
    /// Admitted, not sent yet.
    pub wait: Que,
    /// Sent, not acknowledged yet.
    pub pend: Que,
}

impl Default for SeqTxRec {
    fn default() -> Self {
        SeqTxRec {
            addr: Address::UNSPECIFIED,
            seq_num: SeqNum::UNSYNCED,
            send_cnt: 0,
            p0_req: None,
            p0_retry_cnt: 0,
            wait: Que::new(),
            pend: Que::new(),
        }
    }
}

impl SeqTxRec {
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        !self.wait.is_empty() || !self.pend.is_empty() || self.p0_req.is_some()
    }

    /// Takes the record over for `addr`; only valid while not in use.
    pub fn reset(&mut self, addr: Address) {
        assert!(!self.is_in_use());
        *self = SeqTxRec {
            addr,
            ..SeqTxRec::default()
        };
    }
}
