//! Helpers shared by the crate's unit and integration tests.
//!
//! Compiled for unit tests and when the `test-util` feature is enabled.

pub mod mock_endpoint;

pub use mock_endpoint::{CapturedRequest, refused_addr, spawn_endpoint};
