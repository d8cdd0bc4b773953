use std::sync::Arc;

use colored::Colorize;
use couch_collab::{
    Collab, Database, DatabaseError, LogNotifier, MemoryDatabase, Notifier, PgDatabase,
    StripeGateway, WebhookNotifier,
};
use couch_server::{create_context, run_server, spawn_sweeper, ServerError};
use log::{error, info, warn, LevelFilter};
use settings::{Settings, SettingsError};
use thiserror::Error;
use tokio::runtime;

mod logging;
mod settings;

#[derive(Debug, Error)]
enum CouchError {
    #[error("Invalid configuration: {0}")]
    Settings(#[from] SettingsError),

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Server(#[from] ServerError),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl CouchError {
    fn hint(&self) -> String {
        match self {
            CouchError::Settings(_) => "Check the COUCH_* environment variables, then try again.".to_string(),
            CouchError::Database(_) => "This is a database error. Make sure COUCH_DATABASE_URL points to a running PostgreSQL instance, or unset it to keep rooms in memory.".to_string(),
            CouchError::Server(ServerError::Bind { .. }) => "Another process may be using the port. Set COUCH_PORT to use another one.".to_string(),
            CouchError::Server(_) => "The server stopped while running, which should not happen.".to_string(),
            CouchError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn run(settings: Settings) -> Result<(), CouchError> {
    info!("Building async runtime...");
    let main_runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("couch-async")
        .build()
        .map_err(|e| CouchError::Fatal(e.to_string()))?;

    main_runtime.block_on(start(settings))
}

async fn start(settings: Settings) -> Result<(), CouchError> {
    match &settings.database_url {
        Some(url) => {
            info!("Connecting to database...");
            let database = PgDatabase::new(url).await?;

            serve(database, settings).await
        }
        None => {
            warn!("COUCH_DATABASE_URL is not set, rooms will not survive a restart");
            serve(MemoryDatabase::default(), settings).await
        }
    }
}

async fn serve<Db: Database>(database: Db, settings: Settings) -> Result<(), CouchError> {
    let notifier: Arc<dyn Notifier> =
        if settings.error_webhook.is_some() || settings.feedback_webhook.is_some() {
            Arc::new(WebhookNotifier::new(
                settings.error_webhook.clone(),
                settings.feedback_webhook.clone(),
            ))
        } else {
            Arc::new(LogNotifier)
        };

    let context = create_context(|websockets| {
        let collab = Collab::new(database, websockets, notifier);

        match settings.stripe_key.clone() {
            Some(key) => collab.with_payments(Arc::new(StripeGateway::new(
                key,
                settings.payment_product.clone(),
            ))),
            None => collab,
        }
    });

    spawn_sweeper(context.collab.clone(), settings.sweep_interval);

    info!("Initialized successfully.");
    run_server(context, settings.port).await?;

    Ok(())
}

fn main() {
    // Read first so the log level applies from the start, but reported once logging works
    let settings = Settings::from_env();
    logging::init_logger(
        settings
            .as_ref()
            .map_or(LevelFilter::Info, |settings| settings.log_level),
    );

    if let Err(error) = settings.map_err(CouchError::from).and_then(run) {
        error!("{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.", "couch failed to start!".bold().red());
        error!("{}", error);
        error!(
            "{}",
            format!("Hint: {}", error.hint())
                .dimmed()
                .italic()
        );
    }
}
