//! Configured station tables.
//!
//! Tables are small and fixed at configuration time, so lookup is a linear
//! scan. Callers depend on [`StationLookup`] rather than on the concrete
//! table.

use std::net::SocketAddr;

use tracing::warn;

use crate::config::{BridgeConfig, MAX_LOCAL_STATIONS, MAX_REMOTE_STATIONS};

/// A station on our bus, reachable over AUN on its own UDP port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStation {
    /// Station number on the bus. The network is always 0 (this network).
    pub station: u8,
    /// UDP port AUN hosts send to
    pub listen_port: u16,
}

/// An AUN host that appears as a station on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStation {
    /// Station number it appears as
    pub station: u8,
    /// Network number it appears on
    pub network: u8,
    /// Where its datagrams come from and where ours go
    pub endpoint: SocketAddr,
}

/// Station lookups used by the bridging engine.
pub trait StationLookup {
    /// Local station by number, with its table index.
    fn local_station_by_id(&self, station: u8) -> Option<(usize, &LocalStation)>;

    /// Remote station by number, with its table index.
    fn remote_station_by_id(&self, station: u8) -> Option<(usize, &RemoteStation)>;

    /// Remote station whose endpoint uses UDP port `port`.
    fn remote_station_by_source_port(&self, port: u16) -> Option<(usize, &RemoteStation)>;
}

/// Local and remote station tables.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    locals: Vec<LocalStation>,
    remotes: Vec<RemoteStation>,
}

impl StationRegistry {
    /// Build tables from configuration, dropping entries beyond capacity.
    pub fn from_config(config: &BridgeConfig) -> Self {
        if config.local_stations.len() > MAX_LOCAL_STATIONS {
            warn!(
                configured = config.local_stations.len(),
                max = MAX_LOCAL_STATIONS,
                "too many local stations, ignoring the rest"
            );
        }
        if config.remote_stations.len() > MAX_REMOTE_STATIONS {
            warn!(
                configured = config.remote_stations.len(),
                max = MAX_REMOTE_STATIONS,
                "too many remote stations, ignoring the rest"
            );
        }

        let locals = config
            .local_stations
            .iter()
            .take(MAX_LOCAL_STATIONS)
            .map(|c| LocalStation { station: c.station, listen_port: c.listen_port })
            .collect();
        let remotes = config
            .remote_stations
            .iter()
            .take(MAX_REMOTE_STATIONS)
            .map(|c| RemoteStation { station: c.station, network: c.network, endpoint: c.endpoint() })
            .collect();

        Self { locals, remotes }
    }

    /// Local stations in configuration order.
    pub fn locals(&self) -> &[LocalStation] {
        &self.locals
    }

    /// Remote stations in configuration order.
    pub fn remotes(&self) -> &[RemoteStation] {
        &self.remotes
    }
}

impl StationLookup for StationRegistry {
    fn local_station_by_id(&self, station: u8) -> Option<(usize, &LocalStation)> {
        self.locals.iter().enumerate().find(|(_, s)| s.station == station)
    }

    fn remote_station_by_id(&self, station: u8) -> Option<(usize, &RemoteStation)> {
        self.remotes.iter().enumerate().find(|(_, s)| s.station == station)
    }

    fn remote_station_by_source_port(&self, port: u16) -> Option<(usize, &RemoteStation)> {
        self.remotes.iter().enumerate().find(|(_, s)| s.endpoint.port() == port)
    }
}
