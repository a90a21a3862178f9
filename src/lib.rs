//! Reliable, ordered delivery between peers of a small packet network.
//!
//! An [`layer::Intf`] owns a fixed pool of packets. The caller feeds it
//! frames through a [`transport::FrameTransport`] and drives it with
//! [`layer::Intf::poll_receive`] and [`layer::Intf::poll_transmit`].

pub mod error;
pub mod layer;
pub mod protocol;
pub mod transport;
pub mod utils;
