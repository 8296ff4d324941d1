use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{SeaOrmTokenService, TokenService};

/// Application context passed explicitly to handlers and the sweeper instead
/// of living in process-wide globals.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub token_service: Arc<dyn TokenService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let token_service =
            Arc::new(SeaOrmTokenService::new(store.clone())) as Arc<dyn TokenService>;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            token_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
