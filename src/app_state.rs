use crate::{config::Config, services::IAPService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub iap_service: Arc<IAPService>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            iap_service: Arc::new(IAPService::from_config(config)),
        }
    }

    /// State around an already assembled service
    pub fn with_service(iap_service: IAPService) -> Self {
        Self {
            iap_service: Arc::new(iap_service),
        }
    }
}
