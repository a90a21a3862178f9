use std::collections::VecDeque;

use crate::protocol::Frame;

use super::FrameTransport;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Side {
    A,
    B,
}

impl Side {
    #[must_use]
    pub fn peer(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

/// In-memory point-to-point link between two interfaces.
///
/// Each direction is a FIFO holding at most `depth` frames; a sender facing a
/// full FIFO gets no free frame. Frames are only lost when a test or driver
/// drops them explicitly.
pub struct Wire {
    /// `in_flight[side]` holds frames travelling towards `side`.
    in_flight: [VecDeque<Frame>; 2],
    depth: usize,
}

pub struct WireBuilder {
    pub depth: usize,
}

impl WireBuilder {
    #[must_use]
    pub fn build(self) -> Wire {
        let this = Wire {
            in_flight: [VecDeque::new(), VecDeque::new()],
            depth: self.depth,
        };
        this.check_rep();
        this
    }

    #[must_use]
    pub fn default() -> Self {
        WireBuilder { depth: 16 }
    }
}

impl Wire {
    fn check_rep(&self) {
        for que in &self.in_flight {
            assert!(que.len() <= self.depth);
        }
    }

    /// The transport as seen by the interface on `side`.
    #[must_use]
    pub fn end(&mut self, side: Side) -> WireEnd<'_> {
        WireEnd { wire: self, side }
    }

    /// Frames on their way to `to`.
    #[must_use]
    pub fn in_flight(&self, to: Side) -> &VecDeque<Frame> {
        &self.in_flight[to.index()]
    }

    /// Drops every frame heading to `to` for which `pred` holds; returns how many.
    pub fn drop_where(&mut self, to: Side, mut pred: impl FnMut(&Frame) -> bool) -> usize {
        let que = &mut self.in_flight[to.index()];
        let before = que.len();
        que.retain(|frame| !pred(frame));
        before - que.len()
    }

    /// Drops everything heading to `to`.
    pub fn drop_all(&mut self, to: Side) -> usize {
        self.drop_where(to, |_| true)
    }

    /// Places a hand-made frame on the way to `to`.
    pub fn inject(&mut self, to: Side, frame: Frame) {
        self.in_flight[to.index()].push_back(frame);
    }
}

pub struct WireEnd<'a> {
    wire: &'a mut Wire,
    side: Side,
}

impl<'a> FrameTransport for WireEnd<'a> {
    fn acquire_rx_frame(&mut self) -> Option<Frame> {
        self.wire.in_flight[self.side.index()].pop_front()
    }

    fn release_frame(&mut self, _frame: Frame) {}

    fn acquire_tx_frame(&mut self) -> Option<Frame> {
        if self.wire.in_flight[self.side.peer().index()].len() >= self.wire.depth {
            return None;
        }
        Some(Frame::new())
    }

    fn submit_tx_frame(&mut self, frame: Frame) {
        self.wire.in_flight[self.side.peer().index()].push_back(frame);
        self.wire.check_rep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_cross_over() {
        let mut wire = WireBuilder { depth: 2 }.build();
        {
            let mut a = wire.end(Side::A);
            let frame = a.acquire_tx_frame().unwrap();
            a.submit_tx_frame(frame);
            assert!(a.acquire_rx_frame().is_none());
        }
        assert_eq!(wire.in_flight(Side::B).len(), 1);
        let mut b = wire.end(Side::B);
        assert!(b.acquire_rx_frame().is_some());
        assert!(b.acquire_rx_frame().is_none());
    }

    #[test]
    fn full_direction_has_no_free_frame() {
        let mut wire = WireBuilder { depth: 1 }.build();
        let mut a = wire.end(Side::A);
        let frame = a.acquire_tx_frame().unwrap();
        a.submit_tx_frame(frame);
        assert!(a.acquire_tx_frame().is_none());
        assert_eq!(wire.drop_all(Side::B), 1);
        assert!(wire.end(Side::A).acquire_tx_frame().is_some());
    }
}
