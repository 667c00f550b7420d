//! Application configuration
//!
//! TOML-backed configuration with defaults matching the firmware
//! constants. Missing file or missing fields fall back to defaults.

use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub audio: AudioConfig,
    pub buttons: ButtonConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            audio: AudioConfig::default(),
            buttons: ButtonConfig::default(),
        }
    }
}

/// Peer address and socket tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host the stream is sent to (fixed peer, not negotiated)
    pub host: String,
    /// TCP port on both ends
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub send_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 3000,
            send_timeout_ms: 2000,
        }
    }
}

impl NetworkConfig {
    /// Resolve the configured peer to a socket address
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| Error::Config(format!("cannot resolve {}:{}: {}", self.host, self.port, e)))?
            .next()
            .ok_or_else(|| Error::Config(format!("no address for {}:{}", self.host, self.port)))
    }
}

/// Transfer sizes and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Largest single hardware request, in samples
    pub chunk_samples: usize,
    /// Whole-transfer size used by the button actions, in samples
    pub default_samples: usize,
    pub transfer_timeout_ms: u64,
    pub chunk_timeout_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            chunk_samples: CHUNK_SAMPLES,
            default_samples: DEFAULT_SAMPLES,
            transfer_timeout_ms: TRANSFER_TIMEOUT_MS,
            chunk_timeout_ms: CHUNK_TIMEOUT_MS,
        }
    }
}

/// Button dispatch tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub debounce_ms: u64,
    pub queue_depth: usize,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            queue_depth: BUTTON_QUEUE_DEPTH,
        }
    }
}

impl AppConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "button-audio-streamer")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)?;
                let config = toml::from_str(&raw)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                tracing::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Write the current configuration to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()
            .ok_or_else(|| Error::Config("no config directory available".to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(&path, raw)?;
        Ok(())
    }
}
