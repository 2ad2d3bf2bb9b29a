// storefront/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::flows;
use crate::services::mail::Mailer;
use crate::services::media::MediaStore;
use sqlx::PgPool;
use std::sync::Arc;
use storeflow::Registry;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub flows: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub mailer: Arc<dyn Mailer>,
  pub media: Arc<dyn MediaStore>,
}

impl AppState {
  /// Builds the state and registers every business flow.
  pub fn new(db_pool: PgPool, config: Arc<AppConfig>, mailer: Arc<dyn Mailer>, media: Arc<dyn MediaStore>) -> Self {
    let registry = Registry::<AppError>::new();
    flows::register_all_flows(&registry);
    Self {
      db_pool,
      flows: Arc::new(registry),
      config,
      mailer,
      media,
    }
  }
}
