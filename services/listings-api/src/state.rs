use crate::config::{Config, WsConfig};
use crate::notify::{self, Notifier, NotifyError};
use crate::registry::ConnectionRegistry;
use crate::store::ListingStore;
use std::sync::Arc;
use std::time::Duration;

/// Shared state handed to every handler.
///
/// Built once at startup; the store and registry are only reachable
/// through their own operations.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ListingStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub notifier: Arc<dyn Notifier>,
    pub notify_timeout: Duration,
    pub ws: WsConfig,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, NotifyError> {
        let notifier = notify::from_config(&config.telegram, config.notify_timeout)?;
        Ok(Self::with_notifier(config, notifier))
    }

    /// Same as `new` but with a caller-supplied sink.
    pub fn with_notifier(config: &Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: Arc::new(ListingStore::new()),
            registry: Arc::new(ConnectionRegistry::new(config.ws.outbound_buffer)),
            notifier,
            notify_timeout: config.notify_timeout,
            ws: config.ws.clone(),
        }
    }
}
