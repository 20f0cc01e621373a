//! Business logic services

pub mod books;
pub mod circulation;
pub mod fees;
pub mod settings;

use std::sync::Arc;

use crate::{
    config::CirculationConfig,
    repository::{CirculationStore, SettingsStore},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub circulation: circulation::CirculationService,
    pub settings: settings::SettingsService,
    store: Arc<dyn CirculationStore>,
}

impl Services {
    /// Create all services over the given stores
    pub fn new(
        store: Arc<dyn CirculationStore>,
        settings_store: Arc<dyn SettingsStore>,
        circulation_config: &CirculationConfig,
    ) -> Self {
        let settings = settings::SettingsService::new(settings_store);
        Self {
            books: books::BooksService::new(store.clone()),
            circulation: circulation::CirculationService::new(
                store.clone(),
                settings.clone(),
                circulation_config,
            ),
            settings,
            store,
        }
    }

    /// Whether the backing store answers
    pub async fn is_ready(&self) -> bool {
        self.store.ping().await.is_ok()
    }
}
