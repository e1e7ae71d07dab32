//! Network availability boundary

use core::fmt;
use serde::{Deserialize, Serialize};

/// Process-wide network signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkState {
    Available,
    Unavailable,
    /// Unknown for now; connections wait and retry once it settles
    Suppressed,
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkState::Available => "available",
            NetworkState::Unavailable => "unavailable",
            NetworkState::Suppressed => "suppressed",
        };
        f.write_str(name)
    }
}

/// Source of the current network signal
///
/// Constructed once and shared by every reconciler in the process.
pub trait NetworkMonitor: Send + Sync {
    fn state(&self) -> NetworkState;
}

/// Monitor that always reports the network as available
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAvailable;

impl NetworkMonitor for AlwaysAvailable {
    fn state(&self) -> NetworkState {
        NetworkState::Available
    }
}
