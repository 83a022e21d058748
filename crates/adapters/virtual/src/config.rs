//! Virtual CVM configuration.

use serde::Deserialize;

/// Behaviour of the simulated controller.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VirtualConfig {
    /// Username the simulated device accepts.
    pub username: String,
    /// Password the simulated device accepts.
    pub password: String,
    /// When `false`, every connection attempt is refused.
    pub reachable: bool,
    /// Number of position reports emitted while a motor travels.
    pub travel_steps: u8,
}

impl Default for VirtualConfig {
    fn default() -> Self {
        Self {
            username: "csidealer".to_string(),
            password: "4212color".to_string(),
            reachable: true,
            travel_steps: 4,
        }
    }
}
