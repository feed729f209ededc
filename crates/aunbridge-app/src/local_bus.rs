//! Local-bus task: frames from the bus out to IP.
//!
//! Waits for a scout, then for its data frame, then runs one outbound
//! transaction to completion before looking at the bus again. A new scout
//! that turns up while a data frame is awaited replaces the old one.

use std::{pin::pin, sync::Arc, time::Duration};

use aunbridge_core::{
    AckSignal, BridgeError, BridgeStats, Counter, Environment, LinkEvent, Outbound, Routes, SignalOutcome,
    StationRegistry, Transmission, TrunkInfo, transport::DatagramSocket,
};
use aunbridge_proto::{LocalFrame, Scout};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{report::report, sockets::Sockets};

/// Everything the local-bus task owns while it runs.
pub(crate) struct LocalBusTask<E, S> {
    pub(crate) env: E,
    pub(crate) events: mpsc::Receiver<LinkEvent>,
    pub(crate) outbound: Outbound,
    pub(crate) stations: Arc<StationRegistry>,
    pub(crate) trunks: Arc<[TrunkInfo]>,
    pub(crate) sockets: Arc<Sockets<S>>,
    pub(crate) routes: watch::Receiver<Routes>,
    pub(crate) acks: mpsc::Receiver<AckSignal>,
    pub(crate) stats: Arc<BridgeStats>,
    pub(crate) ack_timeout: Duration,
    pub(crate) data_frame_timeout: Duration,
}

enum DataWait {
    Frame(Vec<u8>),
    Scout(Vec<u8>),
    LineFault(&'static str),
    Shutdown,
}

impl<E: Environment, S: DatagramSocket> LocalBusTask<E, S> {
    /// Run until a shutdown sentinel arrives. Returns the event receiver so
    /// the next configuration can reuse it.
    pub(crate) async fn run(mut self) -> mpsc::Receiver<LinkEvent> {
        debug!("local-bus task started");
        while let Some(event) = self.events.recv().await {
            match event {
                LinkEvent::Scout(bytes) => {
                    if !self.on_scout(bytes).await {
                        break;
                    }
                },
                LinkEvent::Data(bytes) => {
                    debug!(len = bytes.len(), "data frame without scout, ignored");
                },
                LinkEvent::Idle => {},
                LinkEvent::Shutdown => break,
            }
        }
        debug!("local-bus task stopped");
        self.events
    }

    /// Handle one scout. Returns `false` when the task should stop.
    async fn on_scout(&mut self, mut bytes: Vec<u8>) -> bool {
        let (scout, data) = loop {
            let scout = match Scout::parse(&bytes) {
                Ok(scout) => scout,
                Err(e) => {
                    report(&self.stats, &BridgeError::from(e));
                    return true;
                },
            };

            match self.await_data_frame().await {
                DataWait::Frame(data) => break (scout, data),
                DataWait::Scout(next) => {
                    debug!(address = %scout.address, "scout superseded before its data frame");
                    bytes = next;
                },
                DataWait::LineFault(reason) => {
                    warn!(address = %scout.address, reason, "line fault, scout abandoned");
                    return true;
                },
                DataWait::Shutdown => return false,
            }
        };

        let frame = match LocalFrame::from_pair(&scout, &data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(address = %scout.address, error = %e, "line fault, data frame rejected");
                report(&self.stats, &BridgeError::from(e));
                return true;
            },
        };

        self.forward(&frame).await;
        true
    }

    async fn await_data_frame(&mut self) -> DataWait {
        let mut deadline = pin!(self.env.sleep(self.data_frame_timeout));
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(LinkEvent::Data(data)) => return DataWait::Frame(data),
                    Some(LinkEvent::Idle) => {},
                    Some(LinkEvent::Scout(next)) => return DataWait::Scout(next),
                    Some(LinkEvent::Shutdown) | None => return DataWait::Shutdown,
                },
                () = &mut deadline => return DataWait::LineFault("no data frame"),
            }
        }
    }

    /// Route `frame` and run its transaction.
    async fn forward(&mut self, frame: &LocalFrame) {
        let routes = self.routes.borrow().clone();
        let mut transmission =
            match self.outbound.prepare(frame, &*self.stations, &routes, &self.trunks, &self.env) {
                Ok(transmission) => transmission,
                Err(e) => {
                    report(&self.stats, &e);
                    return;
                },
            };
        self.stats.incr(Counter::Tx);

        // Signals left over from an abandoned transaction must not count
        // against this one.
        while self.acks.try_recv().is_ok() {}

        self.drive(&mut transmission).await;
    }

    async fn drive(&mut self, transmission: &mut Transmission<E::Instant>) {
        loop {
            if transmission.begin_attempt().is_none() {
                self.stats.incr(Counter::TxAbort);
                report(&self.stats, &transmission.exhausted());
                return;
            }
            if transmission.attempts() > 1 {
                self.stats.incr(Counter::TxRetry);
            }

            // A failed send still costs the attempt its full wait.
            if let Err(e) = self.sockets.send(transmission.datagram()).await {
                self.stats.incr(Counter::TxError);
                report(&self.stats, &e);
                self.env.sleep(self.ack_timeout).await;
                continue;
            }

            let signal = tokio::select! {
                signal = self.acks.recv() => signal,
                () = self.env.sleep(self.ack_timeout) => None,
            };

            match signal.map(|s| (s, transmission.on_signal(s))) {
                Some((_, SignalOutcome::Complete(kind))) => {
                    let elapsed = self.env.now() - transmission.started();
                    info!(
                        sequence = transmission.sequence(),
                        attempts = transmission.attempts(),
                        ?kind,
                        ?elapsed,
                        "transaction complete"
                    );
                    return;
                },
                Some((stale, SignalOutcome::Stale)) => {
                    warn!(
                        expected = transmission.sequence(),
                        received = stale.sequence,
                        "stale acknowledgment"
                    );
                },
                None => {
                    debug!(sequence = transmission.sequence(), attempt = transmission.attempts(), "ack timeout");
                },
            }
        }
    }
}
