//! Bridge controller: start, stop and reconfigure.
//!
//! The controller owns the link layer and the link-event receiver while the
//! bridge is stopped and lends them to the tasks while it runs. Tables,
//! sockets and channels are rebuilt from configuration on every start, so
//! reconfiguration is a stop followed by a start.

use std::sync::Arc;

use aunbridge_core::{
    BridgeConfig, BridgeStats, Environment, Inbound, LinkEvent, LinkLayer, NetworkSet, Outbound,
    Routes, StationRegistry, StatsSnapshot, TrunkInfo, transport::DatagramTransport,
};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{error::RuntimeError, ip::IpTask, local_bus::LocalBusTask, sockets::Sockets};

/// Depth of the acknowledgment queue between the tasks.
pub const ACK_QUEUE_DEPTH: usize = 10;

/// Depth of the link-event queue feeding the local-bus task.
pub const LINK_EVENT_QUEUE_DEPTH: usize = 32;

struct Running<L> {
    local_bus: JoinHandle<mpsc::Receiver<LinkEvent>>,
    ip: JoinHandle<L>,
    ip_shutdown: oneshot::Sender<()>,
}

/// The running bridge.
///
/// # Lifecycle
///
/// ```text
/// new ──start──▶ running ──stop──▶ stopped ──start──▶ running
///                   │                 ▲
///                   └──reconfigure────┘ (stop + start)
/// ```
pub struct Bridge<E, T: DatagramTransport, L> {
    env: E,
    transport: T,
    stats: Arc<BridgeStats>,
    events_tx: mpsc::Sender<LinkEvent>,
    idle: Option<(L, mpsc::Receiver<LinkEvent>)>,
    running: Option<Running<L>>,
}

impl<E, T, L> Bridge<E, T, L>
where
    E: Environment,
    T: DatagramTransport,
    L: LinkLayer,
{
    /// A stopped bridge.
    ///
    /// The bus driver feeds [`LinkEvent`]s through the sender returned by
    /// [`Bridge::link_events`].
    pub fn new(env: E, transport: T, link: L) -> Self {
        let (events_tx, events_rx) = mpsc::channel(LINK_EVENT_QUEUE_DEPTH);
        Self {
            env,
            transport,
            stats: Arc::new(BridgeStats::new()),
            events_tx,
            idle: Some((link, events_rx)),
            running: None,
        }
    }

    /// Sender for events from the bus driver.
    pub fn link_events(&self) -> mpsc::Sender<LinkEvent> {
        self.events_tx.clone()
    }

    /// Counters, shared with the running tasks.
    pub fn stats(&self) -> Arc<BridgeStats> {
        Arc::clone(&self.stats)
    }

    /// Whether the tasks are running.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Build tables and sockets from `config` and start both tasks.
    ///
    /// Endpoints whose socket cannot be bound are logged and left out; the
    /// rest of the bridge runs.
    pub async fn start(&mut self, config: &BridgeConfig) -> Result<(), RuntimeError> {
        if self.running.is_some() {
            return Err(RuntimeError::AlreadyRunning);
        }
        config.validate()?;
        let (mut link, events) = self.idle.take().ok_or(RuntimeError::Unavailable)?;

        let our_net = config.our_network();
        let stations = Arc::new(StationRegistry::from_config(config));
        let trunks: Arc<[TrunkInfo]> = TrunkInfo::from_config(config).into();
        let sockets =
            Arc::new(Sockets::bind(&self.transport, config.bind_address, &stations, &trunks).await);

        link.clear_accepted_stations().await;
        for remote in stations.remotes() {
            link.accept_station(remote.station).await;
        }
        link.set_accepted_networks(&NetworkSet::new()).await;

        let (routes_tx, routes_rx) = watch::channel(Routes::new(our_net, trunks.len()));
        let (acks_tx, acks_rx) = mpsc::channel(ACK_QUEUE_DEPTH);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let inbound = Inbound::new(
            Arc::clone(&stations),
            Arc::clone(&trunks),
            our_net,
            config.timing.advertise_interval_ticks,
            Arc::clone(&self.stats),
        );
        let ip = IpTask {
            env: self.env.clone(),
            link,
            inbound,
            sockets: Arc::clone(&sockets),
            routes: routes_tx,
            acks: acks_tx,
            shutdown: shutdown_rx,
            stats: Arc::clone(&self.stats),
            tick: config.timing.tick(),
        };

        let local_bus = LocalBusTask {
            env: self.env.clone(),
            events,
            outbound: Outbound::new(trunks.len(), config.timing.max_attempts),
            stations: Arc::clone(&stations),
            trunks: Arc::clone(&trunks),
            sockets,
            routes: routes_rx,
            acks: acks_rx,
            stats: Arc::clone(&self.stats),
            ack_timeout: config.timing.ack_timeout(),
            data_frame_timeout: config.timing.data_frame_timeout(),
        };

        self.running = Some(Running {
            local_bus: tokio::spawn(local_bus.run()),
            ip: tokio::spawn(ip.run()),
            ip_shutdown: shutdown_tx,
        });

        info!(
            network = our_net,
            local_stations = stations.locals().len(),
            remote_stations = stations.remotes().len(),
            trunks = trunks.len(),
            "bridge started"
        );
        Ok(())
    }

    /// Stop both tasks and wait for them to finish.
    ///
    /// The local-bus task finishes any transaction in progress before the IP
    /// task is told to stop.
    pub async fn stop(&mut self) -> Result<StatsSnapshot, RuntimeError> {
        let running = self.running.take().ok_or(RuntimeError::NotRunning)?;

        if self.events_tx.send(LinkEvent::Shutdown).await.is_err() {
            warn!("local-bus task already gone");
        }
        let local_bus = running.local_bus.await;

        // The IP task keeps delivering acknowledgments until the local-bus
        // task has finished its last transaction.
        if running.ip_shutdown.send(()).is_err() {
            warn!("IP task already gone");
        }
        let ip = running.ip.await;

        let events = local_bus
            .map_err(|e| RuntimeError::TaskFailed { task: "local-bus", reason: e.to_string() })?;
        let link = ip.map_err(|e| RuntimeError::TaskFailed { task: "IP", reason: e.to_string() })?;
        self.idle = Some((link, events));

        let snapshot = self.stats.snapshot();
        snapshot.log("bridge stopped");
        Ok(snapshot)
    }

    /// Replace the configuration.
    ///
    /// The new configuration is validated first; an invalid one leaves the
    /// bridge as it was.
    pub async fn reconfigure(&mut self, config: &BridgeConfig) -> Result<(), RuntimeError> {
        config.validate()?;
        if self.running.is_some() {
            self.stop().await?;
        }
        self.start(config).await?;
        self.stats.snapshot().log("bridge reconfigured");
        Ok(())
    }
}
