//! Switchable network monitor

use parking_lot::RwLock;
use tether_core::{NetworkMonitor, NetworkState};

/// Network monitor whose state is flipped by the test
#[derive(Debug)]
pub struct MockNetwork {
    state: RwLock<NetworkState>,
}

impl MockNetwork {
    pub fn new(state: NetworkState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn available() -> Self {
        Self::new(NetworkState::Available)
    }

    pub fn set(&self, state: NetworkState) {
        *self.state.write() = state;
    }
}

impl NetworkMonitor for MockNetwork {
    fn state(&self) -> NetworkState {
        *self.state.read()
    }
}
