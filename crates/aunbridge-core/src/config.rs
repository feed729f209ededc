//! Bridge configuration model.
//!
//! The server reads this from a JSON file. Everything has a default except
//! the tables themselves, which are empty unless configured.

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use aunbridge_crypto::KEY_SIZE;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::ConfigError;

/// Network number used when none is configured.
pub const DEFAULT_NETWORK: u8 = 88;

/// Local stations beyond this count are ignored.
pub const MAX_LOCAL_STATIONS: usize = 16;

/// Remote stations beyond this count are ignored.
pub const MAX_REMOTE_STATIONS: usize = 32;

/// Trunks beyond this count are ignored.
pub const MAX_TRUNKS: usize = 3;

/// Top-level bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Our network number. Zero selects [`DEFAULT_NETWORK`].
    #[serde(default)]
    pub network: u8,

    /// Address every local socket binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Stations on the local bus reachable over AUN
    #[serde(default)]
    pub local_stations: Vec<LocalStationConfig>,

    /// AUN hosts that local stations talk to
    #[serde(default)]
    pub remote_stations: Vec<RemoteStationConfig>,

    /// Encrypted links to other bridges
    #[serde(default)]
    pub trunks: Vec<TrunkConfig>,

    /// Retry and timer tuning
    #[serde(default)]
    pub timing: TimingConfig,
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            network: 0,
            bind_address: default_bind_address(),
            local_stations: Vec::new(),
            remote_stations: Vec::new(),
            trunks: Vec::new(),
            timing: TimingConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Effective network number.
    pub const fn our_network(&self) -> u8 {
        if self.network == 0 { DEFAULT_NETWORK } else { self.network }
    }

    /// Reject configurations the bridge cannot run.
    ///
    /// Surplus table entries are not an error; they are dropped with a
    /// warning when the tables are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network == 0xFF {
            return Err(ConfigError::BroadcastNetwork);
        }

        for (i, local) in self.local_stations.iter().enumerate() {
            if local.station == 0 || local.station == 0xFF {
                return Err(ConfigError::InvalidStation(local.station));
            }
            if local.listen_port == 0 {
                return Err(ConfigError::ZeroPort { what: "local station", id: local.station });
            }
            let earlier = &self.local_stations[..i];
            if earlier.iter().any(|other| other.station == local.station) {
                return Err(ConfigError::DuplicateStation(local.station));
            }
            if earlier.iter().any(|other| other.listen_port == local.listen_port) {
                return Err(ConfigError::DuplicatePort(local.listen_port));
            }
        }

        // Inbound senders are told apart by source port.
        for (i, remote) in self.remote_stations.iter().enumerate() {
            if remote.station == 0 || remote.station == 0xFF {
                return Err(ConfigError::InvalidStation(remote.station));
            }
            if remote.port == 0 {
                return Err(ConfigError::ZeroPort { what: "remote station", id: remote.station });
            }
            let earlier = &self.remote_stations[..i];
            if earlier.iter().any(|other| other.station == remote.station) {
                return Err(ConfigError::DuplicateRemoteStation(remote.station));
            }
            if earlier.iter().any(|other| other.port == remote.port) {
                return Err(ConfigError::DuplicateRemotePort(remote.port));
            }
        }

        for (i, trunk) in self.trunks.iter().enumerate() {
            if trunk.port == 0 {
                return Err(ConfigError::ZeroPort { what: "trunk", id: i as u8 });
            }
        }

        self.timing.validate()
    }
}

/// A station on our bus that AUN hosts can reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalStationConfig {
    /// Station number on the bus
    pub station: u8,
    /// UDP port that AUN hosts send to for this station
    pub listen_port: u16,
}

/// An AUN host that appears as a station on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteStationConfig {
    /// Station number the host appears as
    pub station: u8,
    /// Network number the host appears on
    #[serde(default)]
    pub network: u8,
    /// Host address
    pub address: IpAddr,
    /// Host UDP port
    pub port: u16,
}

impl RemoteStationConfig {
    /// Socket address of the host.
    pub const fn endpoint(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// An encrypted link to another bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrunkConfig {
    /// Far bridge address
    pub address: IpAddr,
    /// Far bridge UDP port
    pub port: u16,
    /// Local port to bind. An ephemeral port is used when absent.
    #[serde(default)]
    pub listen_port: Option<u16>,
    /// Pre-shared AES-256 key, as 64 hex digits
    pub key: TrunkKey,
}

impl TrunkConfig {
    /// Socket address of the far bridge.
    pub const fn endpoint(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// A 256-bit trunk key.
///
/// Debug output never shows the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct TrunkKey([u8; KEY_SIZE]);

impl TrunkKey {
    /// Wrap raw key bytes.
    pub const fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse 64 hex digits.
    pub fn from_hex(text: &str) -> Result<Self, ConfigError> {
        let bytes = hex::decode(text.trim()).map_err(|_| ConfigError::InvalidKey)?;
        let key = <[u8; KEY_SIZE]>::try_from(bytes.as_slice()).map_err(|_| ConfigError::InvalidKey)?;
        Ok(Self(key))
    }

    /// Raw key bytes.
    pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for TrunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TrunkKey(..)")
    }
}

impl Serialize for TrunkKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for TrunkKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(de::Error::custom)
    }
}

/// Retry and timer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// How long to wait for an Ack or Nack before resending
    pub ack_timeout_ms: u64,
    /// Sends per outbound transaction, including the first
    pub max_attempts: u32,
    /// How long to wait for the data frame after a scout
    pub data_frame_timeout_ms: u64,
    /// Housekeeping tick period
    pub tick_ms: u64,
    /// Ticks between reachability advertisements on each trunk
    pub advertise_interval_ticks: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 200,
            max_attempts: 5,
            data_frame_timeout_ms: 10_000,
            tick_ms: 1_000,
            advertise_interval_ticks: 10,
        }
    }
}

impl TimingConfig {
    /// Ack wait per attempt.
    pub const fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Scout-to-data wait.
    pub const fn data_frame_timeout(&self) -> Duration {
        Duration::from_millis(self.data_frame_timeout_ms)
    }

    /// Tick period.
    pub const fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidTiming("max_attempts must be at least 1"));
        }
        if self.ack_timeout_ms == 0 {
            return Err(ConfigError::InvalidTiming("ack_timeout_ms must be positive"));
        }
        if self.data_frame_timeout_ms == 0 {
            return Err(ConfigError::InvalidTiming("data_frame_timeout_ms must be positive"));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::InvalidTiming("tick_ms must be positive"));
        }
        if self.advertise_interval_ticks == 0 {
            return Err(ConfigError::InvalidTiming("advertise_interval_ticks must be at least 1"));
        }
        Ok(())
    }
}
