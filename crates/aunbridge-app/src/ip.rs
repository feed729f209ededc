//! IP task: datagrams from every socket in to the bus.
//!
//! Multiplexes receives across all bound sockets with the housekeeping tick
//! and the shutdown signal. Each received datagram is processed to
//! completion, including any bus delivery, before the next one.

use std::{sync::Arc, time::Duration};

use aunbridge_core::{
    AckSignal, BridgeStats, Counter, Datagram, Environment, Inbound, InboundAction, LinkLayer,
    Routes, transport::DatagramSocket,
};
use futures::{StreamExt, stream::FuturesUnordered};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot, watch,
};
use tracing::{debug, warn};

use crate::{
    report::report,
    sockets::{RECV_BUFFER_SIZE, Received, Sockets, receive},
};

/// Everything the IP task owns while it runs.
pub(crate) struct IpTask<E, S, L> {
    pub(crate) env: E,
    pub(crate) link: L,
    pub(crate) inbound: Inbound,
    pub(crate) sockets: Arc<Sockets<S>>,
    pub(crate) routes: watch::Sender<Routes>,
    pub(crate) acks: mpsc::Sender<AckSignal>,
    pub(crate) shutdown: oneshot::Receiver<()>,
    pub(crate) stats: Arc<BridgeStats>,
    pub(crate) tick: Duration,
}

impl<E: Environment, S: DatagramSocket, L: LinkLayer> IpTask<E, S, L> {
    /// Run until shutdown is signalled. Returns the link layer so the next
    /// configuration can reuse it.
    pub(crate) async fn run(mut self) -> L {
        let clock = self.env.clone();
        let mut receiving: FuturesUnordered<_> = self
            .sockets
            .bound()
            .into_iter()
            .map(|(endpoint, socket)| receive(endpoint, socket, vec![0; RECV_BUFFER_SIZE]))
            .collect();
        let mut next_tick = Box::pin(clock.sleep(self.tick));
        debug!(sockets = receiving.len(), "IP task started");

        loop {
            tokio::select! {
                _ = &mut self.shutdown => break,
                () = &mut next_tick => {
                    next_tick = Box::pin(clock.sleep(self.tick));
                    for advert in self.inbound.tick(&self.env) {
                        send(&self.sockets, &self.stats, &advert).await;
                    }
                },
                Some(received) = receiving.next() => {
                    let Received { endpoint, socket, buffer, result } = received;
                    match result {
                        Ok((len, from)) => {
                            match self.inbound.handle(endpoint, from, &buffer[..len], &self.env) {
                                Ok(action) => self.execute(action).await,
                                Err(e) => report(&self.stats, &e),
                            }
                        },
                        Err(e) => warn!(?endpoint, error = %e, "receive failed"),
                    }
                    receiving.push(receive(endpoint, socket, buffer));
                },
            }
        }

        debug!("IP task stopped");
        self.link
    }

    async fn execute(&mut self, action: InboundAction) {
        match action {
            InboundAction::Signal(signal) => match self.acks.try_send(signal) {
                Ok(()) => {},
                Err(TrySendError::Full(signal)) => {
                    warn!(sequence = signal.sequence, "acknowledgment queue full, signal dropped");
                },
                Err(TrySendError::Closed(_)) => debug!("local-bus task gone, signal dropped"),
            },
            InboundAction::Deliver(delivery) => {
                let reply = self.link.transmit(&delivery.frame).await;
                if delivery.frame.is_broadcast() {
                    self.stats.incr(Counter::TxBroadcast);
                }
                match self.inbound.complete(delivery, reply, &self.env) {
                    Ok(datagram) => send(&self.sockets, &self.stats, &datagram).await,
                    Err(e) => report(&self.stats, &e),
                }
            },
            InboundAction::Send(datagram) => send(&self.sockets, &self.stats, &datagram).await,
            InboundAction::RoutesChanged(routes) => {
                self.link.set_accepted_networks(&routes.aggregate()).await;
                self.routes.send_replace(routes);
            },
            InboundAction::Ignore => {},
        }
    }
}

/// Send, counting a failure as a transmit error.
async fn send<S: DatagramSocket>(sockets: &Sockets<S>, stats: &BridgeStats, datagram: &Datagram) {
    if let Err(e) = sockets.send(datagram).await {
        stats.incr(Counter::TxError);
        report(stats, &e);
    }
}
