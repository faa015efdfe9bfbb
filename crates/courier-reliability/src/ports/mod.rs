//! Ports layer for reliability channels.
//!
//! Outbound (driven) ports: the clock and the downstream consumer a channel
//! delivers released messages to.

pub mod outbound;

pub use outbound::*;
