//! Test doubles and fixtures.
//!
//! Compiled into the library so integration tests in dependent crates can
//! drive the full stack without a running transmission daemon.

mod mock_engine;

pub mod fixtures;

pub use mock_engine::MockEngineClient;
