// storefront/src/main.rs

use audio_store::config::AppConfig;
use audio_store::db;
use audio_store::services::mail::{LogMailer, Mailer, SmtpMailer};
use audio_store::services::media::{CloudinaryStore, MediaStore};
use audio_store::state::AppState;
use audio_store::web::configure_app_routes;

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

fn init_tracing() {
  let builder = tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE);

  // LOG_FORMAT=json for log shippers.
  if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
    builder.json().init();
  } else {
    builder.init();
  }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
  tracing::error!(error = %err, "{}", context);
  std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  dotenvy::dotenv().ok();
  init_tracing();
  tracing::info!("Starting storefront server...");

  let app_config = Arc::new(AppConfig::from_env().map_err(|e| startup_error("Failed to load application configuration", e))?);

  let db_pool = db::connect(&app_config)
    .await
    .map_err(|e| startup_error("Failed to connect to the database", e))?;

  if app_config.run_migrations {
    db::run_migrations(&db_pool)
      .await
      .map_err(|e| startup_error("Failed to run database migrations", e))?;
  }

  if app_config.seed_db {
    match db::seed::seed_catalog(&db_pool).await {
      Ok(true) => tracing::info!("Demo catalog seeded."),
      Ok(false) => tracing::info!("Catalog already present, seeding skipped."),
      Err(e) => tracing::error!(error = %e, "Failed to seed database."),
    }
  }

  let mailer: Arc<dyn Mailer> = match &app_config.smtp {
    Some(smtp) => Arc::new(
      SmtpMailer::new(smtp, &app_config.mail_from_address).map_err(|e| startup_error("Invalid SMTP configuration", e))?,
    ),
    None => {
      tracing::warn!("SMTP_HOST not set; outgoing mail is only logged.");
      Arc::new(LogMailer::new())
    }
  };
  let media: Arc<dyn MediaStore> = Arc::new(CloudinaryStore::new(app_config.cloudinary.clone()));

  let app_state = AppState::new(db_pool, app_config.clone(), mailer, media);

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
