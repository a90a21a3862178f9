use thiserror::Error;

use crate::{
    protocol::{Address, DecodingError, EncodingError},
    utils::SeqNum,
};

/// Everything the interface can run into while polling.
///
/// None of these leave the poll entry points; they are logged and counted
/// by [`crate::layer::Intf`] at the place they happen.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("rx: from frame: {0}")]
    Decode(#[from] DecodingError),

    #[error("tx: to frame: {0}")]
    Encode(#[from] EncodingError),

    #[error("no free {0}")]
    ResourceExhausted(Resource),

    #[error("seq_rx: wrong seq from {peer}: got {got}, expected {}", expected_str(.expected))]
    SequenceMismatch {
        peer: Address,
        expected: Option<SeqNum>,
        got: SeqNum,
    },

    #[error("not supported: {0}")]
    UnsupportedFeature(Unsupported),

    #[error("p0: {0}")]
    LateControlMessage(LateControl),

    #[error("tx: retries exhausted for {peer}, dropped {dropped} packets")]
    RetryExhausted { peer: Address, dropped: usize },

    #[error("p0: {peer}: {what}")]
    ProtocolInconsistency { peer: Address, what: &'static str },
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum Resource {
    #[error("packet")]
    Packet,
    #[error("frame")]
    Frame,
    #[error("seq record")]
    Record,
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum Unsupported {
    #[error("multicast reception")]
    MulticastRx,
    #[error("sequenced broadcast, sent unsequenced")]
    SeqBroadcast,
    #[error("sequenced multicast, sent unsequenced")]
    SeqMulticast,
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum LateControl {
    #[error("no record found for ack from {0}")]
    AckNoRecord(Address),
    #[error("late ack from {0}, request outstanding")]
    AckDuringRequest(Address),
    #[error("no record found for reply from {0}")]
    ReplyNoRecord(Address),
    #[error("late reply from {0}, nothing outstanding")]
    ReplyNoRequest(Address),
    #[error("wrong reply from {0}")]
    ReplyMismatch(Address),
}

fn expected_str(expected: &Option<SeqNum>) -> String {
    match expected {
        Some(seq) => seq.to_string(),
        None => "no record".to_string(),
    }
}
