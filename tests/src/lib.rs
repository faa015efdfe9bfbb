//! # Courier Test Suite
//!
//! Unified test crate exercising the envelope, reliability and telemetry
//! crates together through their public APIs.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # Message builders shared by every module
//! └── integration/
//!     ├── scenarios.rs   # Reference scenarios for each primitive
//!     ├── properties.rs  # proptest invariants
//!     ├── send_path.rs   # sender ↔ receiver over the wire format
//!     └── channel_flows.rs # tokio channel drivers end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p courier-tests
//!
//! # By category
//! cargo test -p courier-tests integration::properties::
//! cargo test -p courier-tests integration::channel_flows::
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
