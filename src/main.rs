use std::sync::Arc;

use argon2::Argon2;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::map_response_with_state,
};
use clap::Parser;
use log::{info, warn};
use tower_http::cors::CorsLayer;

mod api;
mod config;
mod crypto;
mod error;
mod objects;
mod presence;
mod schema;
mod store;
#[cfg(test)]
mod testing;
mod utils;

use config::{Config, ConfigBuilder};
use error::Error;
use presence::{DisabledPresence, PresenceSync, StreamPresence};
use store::{MemoryStore, PgStore, Store};

/// Backend for the lingo language exchange
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = String::from("/etc/lingo/config.toml"))]
    config: String,
    /// Keep everything in memory instead of PostgreSQL, data is lost on exit
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub presence: Arc<dyn PresenceSync>,
    pub config: Config,
    pub argon2: Argon2<'static>,
}

pub fn app(app_state: Arc<AppState>) -> Result<Router, Error> {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_str(
            app_state.config.web.frontend_url.origin().ascii_serialization().as_str(),
        ).map_err(|error| Error::ConfigError(format!("web.frontend_url: {error}")))?)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api", api::router(app_state.clone()))
        .layer(map_response_with_state(
            app_state.clone(),
            error::expose_internal_detail,
        ))
        .with_state(app_state)
        .layer(cors))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = ConfigBuilder::load(args.config).await?.build()?;

    let store: Arc<dyn Store> = if args.in_memory {
        warn!("using in-memory storage, nothing will be persisted");
        Arc::new(MemoryStore::default())
    } else {
        Arc::new(PgStore::connect(&config.database).await?)
    };

    let presence: Arc<dyn PresenceSync> = match &config.stream {
        Some(stream) => Arc::new(StreamPresence::new(stream.clone())?),
        None => {
            warn!("no [stream] section configured, chat and video are disabled");
            Arc::new(DisabledPresence)
        }
    };

    let web = config.web.clone();

    let app_state = Arc::new(AppState {
        store,
        presence,
        config,
        argon2: Argon2::default(),
    });

    let listener = tokio::net::TcpListener::bind((web.ip.as_str(), web.port)).await?;

    info!("listening on {}:{}", web.ip, web.port);

    axum::serve(listener, app(app_state)?).await?;

    Ok(())
}
