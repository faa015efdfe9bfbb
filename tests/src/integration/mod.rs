//! Cross-crate integration tests.

pub mod channel_flows;
pub mod properties;
pub mod scenarios;
pub mod send_path;
