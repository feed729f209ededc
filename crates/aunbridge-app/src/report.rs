//! Error logging by class.

use aunbridge_core::{BridgeError, BridgeStats, ErrorClass};
use tracing::{debug, error, warn};

/// Count `err` and log it at the level its class calls for.
pub(crate) fn report(stats: &BridgeStats, err: &BridgeError) {
    stats.record_error(err);
    match err.class() {
        ErrorClass::Malformed => debug!(error = %err, "dropped malformed input"),
        ErrorClass::RoutingMiss => warn!(error = %err, "no route, dropped"),
        ErrorClass::Transport | ErrorClass::Exhausted => warn!(error = %err, "transmission failed"),
        ErrorClass::Internal => error!(error = %err, "bridge tables inconsistent"),
    }
}
