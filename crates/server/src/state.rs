use std::sync::Arc;
use gatelink_core::{Authenticator, CallbackGateway, Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    gateway: Arc<CallbackGateway>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        gateway: Arc<CallbackGateway>,
    ) -> Self {
        Self {
            config,
            authenticator,
            gateway,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn gateway(&self) -> &CallbackGateway {
        self.gateway.as_ref()
    }
}
