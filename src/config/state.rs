// Application state module
// Read-only state shared by every connection

use std::net::SocketAddr;

use super::root::StaticRoot;
use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
    pub static_root: StaticRoot,
    /// Origin used for `link` entries when a request has no Host header
    pub fallback_origin: String,
}

impl AppState {
    pub fn new(config: Config, static_root: StaticRoot, local_addr: SocketAddr) -> Self {
        Self {
            config,
            static_root,
            fallback_origin: format!("http://{local_addr}"),
        }
    }
}
