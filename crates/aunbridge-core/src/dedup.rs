//! Duplicate suppression for inbound deliveries.
//!
//! UDP may deliver the same packet more than once, and a sender that missed
//! our acknowledgment retransmits. Each sender keeps the sequence number and
//! bus result of the last delivery. A repeat of an acknowledged sequence is
//! answered from that record instead of being sent to the bus again.
//!
//! Only the most recent sequence is remembered. Out-of-order arrivals are
//! reported by [`DedupState::is_out_of_order`] but still delivered, and a
//! sender that wraps its counter onto the remembered value will see one
//! delivery suppressed.

/// How the local bus answered a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryResult {
    /// The destination station accepted the frame
    Ack,
    /// The frame was not accepted
    Nack,
    /// The destination answered an immediate operation
    ImmediateReply,
}

/// What to do with an inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    /// Put the frame on the bus
    Deliver,
    /// Already delivered; answer with the recorded result
    Repeat(DeliveryResult),
}

/// Per-sender record of the last delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupState {
    last_acked_seq: Option<u32>,
    last_result: Option<DeliveryResult>,
}

impl DedupState {
    /// A sender we have never heard from.
    pub const fn new() -> Self {
        Self { last_acked_seq: None, last_result: None }
    }

    /// Decide whether a packet with `sequence` must reach the bus.
    ///
    /// Redelivers when the sequence is new, or when the previous attempt
    /// did not end in a plain acknowledgment.
    pub fn check(&self, sequence: u32) -> DedupDecision {
        match (self.last_acked_seq, self.last_result) {
            (Some(last), Some(DeliveryResult::Ack)) if last == sequence => {
                DedupDecision::Repeat(DeliveryResult::Ack)
            },
            _ => DedupDecision::Deliver,
        }
    }

    /// Remember the outcome of a delivery.
    pub fn record(&mut self, sequence: u32, result: DeliveryResult) {
        self.last_acked_seq = Some(sequence);
        self.last_result = Some(result);
    }

    /// True when `sequence` is behind the last delivery.
    ///
    /// Sequences are compared with wrapping arithmetic, so a counter that
    /// rolls over past `u32::MAX` still reads as moving forward. Forward
    /// jumps are normal because a sender numbers every transaction it starts,
    /// whatever the destination.
    pub fn is_out_of_order(&self, sequence: u32) -> bool {
        self.last_acked_seq
            .is_some_and(|last| sequence != last && sequence.wrapping_sub(last) > u32::MAX / 2)
    }
}
