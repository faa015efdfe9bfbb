//! Adapters layer: the tokio driver that owns a channel, and an in-memory sink.

pub mod channel_driver;
pub mod memory_sink;

pub use channel_driver::{
    ChannelDriver, ChannelHandle, DriverError, Receipt, DEFAULT_COMMAND_BUFFER,
};
pub use memory_sink::MemorySink;
