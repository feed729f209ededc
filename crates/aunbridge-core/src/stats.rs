//! Bridge traffic counters.
//!
//! Both I/O tasks update the same [`BridgeStats`] through relaxed atomics.
//! Counters are monotonic; a [`StatsSnapshot`] is a point-in-time copy for
//! logging.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{BridgeError, ErrorClass};

/// Counter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Outbound transactions started
    Tx,
    /// Resends after a timeout or stale acknowledgment
    TxRetry,
    /// Outbound transactions abandoned
    TxAbort,
    /// Datagrams that failed to send
    TxError,
    /// Acks (and immediate replies) sent
    TxAck,
    /// Nacks sent
    TxNack,
    /// Bridge-control packets sent
    TxBridgeControl,
    /// Broadcasts sent
    TxBroadcast,
    /// Immediate packets received
    RxImmediate,
    /// Data packets received
    RxData,
    /// Acks received
    RxAck,
    /// Nacks received
    RxNack,
    /// Packets of unexpected type received
    RxUnknown,
    /// Bridge-control packets received
    RxBridgeControl,
    /// Broadcasts received
    RxBroadcast,
    /// Deliveries whose sequence went backwards
    RxOutOfOrder,
    /// Unparseable input
    Malformed,
    /// Traffic with no route
    RoutingMiss,
    /// Trunk envelopes that failed to open or seal
    EnvelopeFailure,
    /// Table inconsistencies
    InternalError,
}

const COUNTERS: usize = 20;

/// Shared atomic counters.
#[derive(Debug, Default)]
pub struct BridgeStats {
    counters: [AtomicU64; COUNTERS],
}

impl BridgeStats {
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to `counter`.
    pub fn incr(&self, counter: Counter) {
        self.counters[counter as usize].fetch_add(1, Ordering::Relaxed);
    }

    /// Current value of `counter`.
    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter as usize].load(Ordering::Relaxed)
    }

    /// Count an error in the counter for its class.
    ///
    /// Exhaustion is counted by the retry loop itself, and a send failure
    /// already bumped [`Counter::TxError`].
    pub fn record_error(&self, error: &BridgeError) {
        match (error.class(), error) {
            (ErrorClass::Malformed, _) => self.incr(Counter::Malformed),
            (ErrorClass::RoutingMiss, _) => self.incr(Counter::RoutingMiss),
            (ErrorClass::Transport, BridgeError::Envelope(_)) => {
                self.incr(Counter::EnvelopeFailure);
            },
            (ErrorClass::Internal, _) => self.incr(Counter::InternalError),
            (ErrorClass::Transport | ErrorClass::Exhausted, _) => {},
        }
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tx_count: self.get(Counter::Tx),
            tx_retry_count: self.get(Counter::TxRetry),
            tx_abort_count: self.get(Counter::TxAbort),
            tx_error_count: self.get(Counter::TxError),
            tx_ack_count: self.get(Counter::TxAck),
            tx_nack_count: self.get(Counter::TxNack),
            tx_bridge_control: self.get(Counter::TxBridgeControl),
            tx_broadcast_count: self.get(Counter::TxBroadcast),
            rx_imm_count: self.get(Counter::RxImmediate),
            rx_data_count: self.get(Counter::RxData),
            rx_ack_count: self.get(Counter::RxAck),
            rx_nack_count: self.get(Counter::RxNack),
            rx_unknown_count: self.get(Counter::RxUnknown),
            rx_bridge_control: self.get(Counter::RxBridgeControl),
            rx_broadcast_count: self.get(Counter::RxBroadcast),
            rx_out_of_order_count: self.get(Counter::RxOutOfOrder),
            malformed_count: self.get(Counter::Malformed),
            routing_miss_count: self.get(Counter::RoutingMiss),
            envelope_failure_count: self.get(Counter::EnvelopeFailure),
            internal_error_count: self.get(Counter::InternalError),
        }
    }
}

/// Point-in-time copy of [`BridgeStats`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub tx_count: u64,
    pub tx_retry_count: u64,
    pub tx_abort_count: u64,
    pub tx_error_count: u64,
    pub tx_ack_count: u64,
    pub tx_nack_count: u64,
    pub tx_bridge_control: u64,
    pub tx_broadcast_count: u64,
    pub rx_imm_count: u64,
    pub rx_data_count: u64,
    pub rx_ack_count: u64,
    pub rx_nack_count: u64,
    pub rx_unknown_count: u64,
    pub rx_bridge_control: u64,
    pub rx_broadcast_count: u64,
    pub rx_out_of_order_count: u64,
    pub malformed_count: u64,
    pub routing_miss_count: u64,
    pub envelope_failure_count: u64,
    pub internal_error_count: u64,
}

impl StatsSnapshot {
    /// Emit every counter as one structured log line.
    pub fn log(&self, context: &str) {
        tracing::info!(
            context,
            tx = self.tx_count,
            tx_retry = self.tx_retry_count,
            tx_abort = self.tx_abort_count,
            tx_error = self.tx_error_count,
            tx_ack = self.tx_ack_count,
            tx_nack = self.tx_nack_count,
            tx_bridge_control = self.tx_bridge_control,
            tx_broadcast = self.tx_broadcast_count,
            rx_imm = self.rx_imm_count,
            rx_data = self.rx_data_count,
            rx_ack = self.rx_ack_count,
            rx_nack = self.rx_nack_count,
            rx_unknown = self.rx_unknown_count,
            rx_bridge_control = self.rx_bridge_control,
            rx_broadcast = self.rx_broadcast_count,
            rx_out_of_order = self.rx_out_of_order_count,
            malformed = self.malformed_count,
            routing_miss = self.routing_miss_count,
            envelope_failure = self.envelope_failure_count,
            internal_error = self.internal_error_count,
            "bridge statistics"
        );
    }
}
