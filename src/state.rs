//! Shared handler state

use std::sync::Arc;
use std::time::Duration;

use crate::ble::{BleCentral, PlatformCentral};
use crate::config::Config;
use crate::desk::{DeskControl, IdasenDesk};

/// Immutable per-process state. Nothing here tracks devices or
/// connections; each request resolves its peripheral from scratch.
#[derive(Clone)]
pub struct AppState {
    pub central: Arc<dyn BleCentral>,
    pub desk: Arc<dyn DeskControl>,
    pub scan_timeout: Duration,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            central: Arc::new(PlatformCentral::new(&config.ble)),
            desk: Arc::new(IdasenDesk::new(&config.ble, &config.desk)),
            scan_timeout: config.ble.scan_timeout(),
        }
    }
}
