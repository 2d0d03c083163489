//! Prometheus metrics for core components.
//!
//! Counters for the lifecycle coordinator and the token service. The server
//! crate owns the registry and calls [`register`] at startup.

use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, Opts, Registry};

/// Torrent add operations by outcome.
pub static TORRENT_ADDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("driftwood_torrent_adds_total", "Total torrent add operations"),
        &["outcome"], // "created", "already_exists", "failed"
    )
    .unwrap()
});

/// Torrent remove operations by outcome.
pub static TORRENT_REMOVALS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "driftwood_torrent_removals_total",
            "Total torrent remove operations",
        ),
        &["outcome"], // "removed", "not_found", "failed"
    )
    .unwrap()
});

/// Capability tokens issued by scope.
pub static TOKENS_ISSUED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "driftwood_tokens_issued_total",
            "Total capability tokens issued",
        ),
        &["scope"], // "file", "item"
    )
    .unwrap()
});

/// Token verification rejections by reason.
pub static TOKEN_REJECTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "driftwood_token_rejections_total",
            "Total capability token verification rejections",
        ),
        &["reason"], // "malformed", "signature_mismatch", "expired", "signing"
    )
    .unwrap()
});

/// Register all core collectors with the given registry.
pub fn register(registry: &Registry) {
    let _ = registry.register(Box::new(TORRENT_ADDS_TOTAL.clone()));
    let _ = registry.register(Box::new(TORRENT_REMOVALS_TOTAL.clone()));
    let _ = registry.register(Box::new(TOKENS_ISSUED_TOTAL.clone()));
    let _ = registry.register(Box::new(TOKEN_REJECTIONS_TOTAL.clone()));
}
