//! One socket per local station and per trunk.

use std::{
    io,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use aunbridge_core::{
    BridgeError, Datagram, Endpoint, StationRegistry, TrunkInfo,
    transport::{DatagramSocket, DatagramTransport},
};
use futures::{FutureExt, future::BoxFuture};
use tracing::{error, info};

/// Receive buffer size. Holds a full-MTU trunk envelope with room to spare.
pub(crate) const RECV_BUFFER_SIZE: usize = 2048;

/// Sockets bound at configuration time. A slot is `None` when its bind
/// failed; that endpoint is out of service until the next reconfiguration.
pub(crate) struct Sockets<S> {
    stations: Vec<Option<Arc<S>>>,
    trunks: Vec<Option<Arc<S>>>,
}

impl<S: DatagramSocket> Sockets<S> {
    /// Bind every configured endpoint.
    ///
    /// Local stations bind their listen port. Trunks bind their listen port
    /// or, without one, an ephemeral port.
    pub(crate) async fn bind<T>(
        transport: &T,
        bind_address: IpAddr,
        stations: &StationRegistry,
        trunks: &[TrunkInfo],
    ) -> Self
    where
        T: DatagramTransport<Socket = S>,
    {
        let mut bound = Self { stations: Vec::new(), trunks: Vec::new() };

        for (index, station) in stations.locals().iter().enumerate() {
            let addr = SocketAddr::new(bind_address, station.listen_port);
            bound.stations.push(bind_one(transport, addr, Endpoint::Station(index)).await);
        }
        for (index, trunk) in trunks.iter().enumerate() {
            let addr = SocketAddr::new(bind_address, trunk.listen_port.unwrap_or(0));
            bound.trunks.push(bind_one(transport, addr, Endpoint::Trunk(index)).await);
        }

        bound
    }

    fn get(&self, endpoint: Endpoint) -> Option<&Arc<S>> {
        match endpoint {
            Endpoint::Station(index) => self.stations.get(index),
            Endpoint::Trunk(index) => self.trunks.get(index),
        }
        .and_then(Option::as_ref)
    }

    /// Send `datagram` from its endpoint's socket.
    pub(crate) async fn send(&self, datagram: &Datagram) -> Result<(), BridgeError> {
        let socket = self
            .get(datagram.endpoint)
            .ok_or_else(|| BridgeError::Send(format!("{:?} has no socket", datagram.endpoint)))?;
        socket
            .send_to(&datagram.bytes, datagram.target)
            .await
            .map_err(|e| BridgeError::Send(e.to_string()))?;
        Ok(())
    }

    /// Every bound socket with its endpoint.
    pub(crate) fn bound(&self) -> Vec<(Endpoint, Arc<S>)> {
        let stations = self
            .stations
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (Endpoint::Station(i), Arc::clone(s))));
        let trunks = self
            .trunks
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (Endpoint::Trunk(i), Arc::clone(s))));
        stations.chain(trunks).collect()
    }
}

async fn bind_one<T: DatagramTransport>(
    transport: &T,
    addr: SocketAddr,
    label: Endpoint,
) -> Option<Arc<T::Socket>> {
    match transport.bind(addr).await {
        Ok(socket) => {
            let local = socket.local_addr().ok();
            info!(endpoint = ?label, ?local, "socket bound");
            Some(Arc::new(socket))
        },
        Err(e) => {
            error!(endpoint = ?label, %addr, error = %e, "bind failed, endpoint disabled");
            None
        },
    }
}

/// A completed receive, with the socket and buffer to re-arm it.
pub(crate) struct Received<S> {
    pub(crate) endpoint: Endpoint,
    pub(crate) socket: Arc<S>,
    pub(crate) buffer: Vec<u8>,
    pub(crate) result: io::Result<(usize, SocketAddr)>,
}

/// Receive one datagram on `socket`.
pub(crate) fn receive<S: DatagramSocket>(
    endpoint: Endpoint,
    socket: Arc<S>,
    mut buffer: Vec<u8>,
) -> BoxFuture<'static, Received<S>> {
    async move {
        let result = socket.recv_from(&mut buffer).await;
        Received { endpoint, socket, buffer, result }
    }
    .boxed()
}
