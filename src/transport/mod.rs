mod wire;

pub use wire::*;

use crate::protocol::Frame;

/// Link-layer frame source and sink.
///
/// Every call returns immediately; `None` from an acquire means "nothing
/// right now" and the caller retries on a later poll.
pub trait FrameTransport {
    /// Next received frame, if any.
    fn acquire_rx_frame(&mut self) -> Option<Frame>;
    /// Hands a frame back once the caller is done with it.
    fn release_frame(&mut self, frame: Frame);
    /// A free frame to encode into, if one is available.
    fn acquire_tx_frame(&mut self) -> Option<Frame>;
    /// Queues an encoded frame for transmission.
    fn submit_tx_frame(&mut self, frame: Frame);
}
