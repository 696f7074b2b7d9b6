use crate::{
    media::{CloudinaryClient, CloudinaryConfig, MediaError},
    server::{ServerLimits, ServerState},
};
use readit_db::client::{DbClient, DbError, DbOptions};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod media;
mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error connecting to database: {0}")]
    Database(DbError),
    #[error("Error establishing database schema: {0}")]
    Migrate(DbError),
    #[error("Error building media host client: {0}")]
    Media(#[from] MediaError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    #[serde(default = "default_database_max_connections")]
    database_max_connections: u32,
    #[serde(default = "default_database_acquire_timeout_secs")]
    database_acquire_timeout_secs: u64,
    #[serde(default = "default_database_statement_timeout_ms")]
    database_statement_timeout_ms: u64,
    cloudinary_cloud_name: String,
    cloudinary_api_key: String,
    cloudinary_api_secret: String,
    #[serde(default = "default_cloudinary_folder")]
    cloudinary_folder: String,
    #[serde(default = "default_media_timeout_secs")]
    media_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_max_body_bytes")]
    max_body_bytes: usize,
}

fn default_database_max_connections() -> u32 {
    10
}

fn default_database_acquire_timeout_secs() -> u64 {
    5
}

fn default_database_statement_timeout_ms() -> u64 {
    5000
}

fn default_cloudinary_folder() -> String {
    "readit".to_owned()
}

fn default_media_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl Env {
    fn db_options(&self) -> DbOptions {
        DbOptions {
            url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            acquire_timeout: Duration::from_secs(self.database_acquire_timeout_secs),
            statement_timeout: Duration::from_millis(self.database_statement_timeout_ms),
        }
    }

    fn server_limits(&self) -> ServerLimits {
        ServerLimits {
            max_body_bytes: self.max_body_bytes,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    fn cloudinary_config(&self) -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: self.cloudinary_cloud_name.clone(),
            api_key: self.cloudinary_api_key.clone(),
            api_secret: self.cloudinary_api_secret.clone(),
            root_folder: self.cloudinary_folder.clone(),
            timeout: Duration::from_secs(self.media_timeout_secs),
        }
    }
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "readit_api=debug,\
                readit_db=debug,\
                readit_common=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let db_client = DbClient::connect(&env.db_options())
        .await
        .map_err(InitError::Database)?;
    db_client.migrate().await.map_err(InitError::Migrate)?;
    info!("Database schema is up to date");

    let media = CloudinaryClient::new(env.cloudinary_config())?;

    let state = ServerState {
        store: Arc::new(db_client),
        media: Arc::new(media),
    };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::app(state, env.server_limits())
        .layer(CorsLayer::permissive())
        .layer(tracing_layer);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
