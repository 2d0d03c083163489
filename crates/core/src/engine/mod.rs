//! Download engine abstraction.
//!
//! This module provides an `EngineClient` trait for talking to the external
//! download daemon that actually moves torrent data. The daemon owns live
//! transfer state; this system never persists it.

mod transmission;
mod types;

pub use transmission::TransmissionEngine;
pub use types::*;
