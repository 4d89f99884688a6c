pub use crate::common::RouteResult;

use std::{env, error, fmt, future::Future, sync::Arc};

use axum::{extract::FromRef, Router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir};
use water_supply::{
    backend::SharedBackend,
    collections::{Collections, FinanceCollections},
    config::ClientConfig,
    poller::Poller,
    store::Store,
};

pub mod api;
pub mod common;

pub type OperationsStore = Store<SharedBackend, Collections>;
pub type FinanceStore = Store<SharedBackend, FinanceCollections>;

#[derive(Clone, FromRef)]
pub struct WebState {
    pub operations: Arc<OperationsStore>,
    pub finance: Arc<FinanceStore>,
    pub search_radius_km: f64,
}

impl WebState {
    pub fn new(backend: SharedBackend, config: &ClientConfig) -> Self {
        Self {
            operations: Arc::new(Store::new(backend.clone())),
            finance: Arc::new(Store::new(backend)),
            search_radius_km: config.search_radius_km,
        }
    }

    /// Starts refreshing both stores every `config.refresh_interval()`.
    pub fn spawn_pollers(&self, config: &ClientConfig) -> Vec<Poller> {
        vec![
            Poller::spawn("operations", self.operations.clone(), config.refresh_interval()),
            Poller::spawn("finance", self.finance.clone(), config.refresh_interval()),
        ]
    }
}

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_WWW: &str = "./resources/www/";

#[derive(Debug)]
pub enum WebConfigError {
    InvalidDemoFlag(String),
}

impl error::Error for WebConfigError {}

impl fmt::Display for WebConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDemoFlag(value) => {
                write!(f, "AQUA_DEMO must be true or false, got '{}'", value)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebConfig {
    pub bind: String,
    /// Serve the bundled demo data instead of talking to the api.
    pub demo: bool,
    /// Directory with the static dashboard pages.
    pub www: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            demo: false,
            www: DEFAULT_WWW.to_owned(),
        }
    }
}

impl WebConfig {
    pub fn from_env() -> Result<Self, WebConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, WebConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let demo = match get("AQUA_DEMO").map(|value| value.to_lowercase()) {
            None => false,
            Some(value) => match value.as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(WebConfigError::InvalidDemoFlag(value)),
            },
        };
        Ok(Self {
            bind: get("AQUA_BIND").unwrap_or_else(|| DEFAULT_BIND.to_owned()),
            demo,
            www: get("AQUA_WWW").unwrap_or_else(|| DEFAULT_WWW.to_owned()),
        })
    }
}

pub fn app(state: WebState, www: &str) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state).layer(CorsLayer::permissive()))
        .fallback_service(ServeDir::new(www))
}

pub async fn start_web_server(
    state: WebState,
    config: &WebConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let routes = app(state, &config.www);

    let listener = TcpListener::bind(&config.bind).await?;
    log::info!("Serving the dashboard on http://{}.", listener.local_addr()?);
    axum::serve(listener, routes.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
