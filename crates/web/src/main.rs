use std::{error::Error, sync::Arc};

use water_supply::{
    backend::{HttpBackend, SharedBackend},
    config::ClientConfig,
    demo,
};
use web::{start_web_server, WebConfig, WebState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // configuration
    let web_config = WebConfig::from_env()?;
    let client_config = ClientConfig::from_env()?;

    // backend
    let backend: SharedBackend = if web_config.demo {
        log::info!("Serving the bundled demo data.");
        Arc::new(demo::backend())
    } else {
        let backend = HttpBackend::new(&client_config)?;
        if client_config.csrf_token.is_none() {
            if let Some(page) = &client_config.csrf_page {
                match backend.discover_csrf_token(page).await {
                    Ok(true) => log::info!("Using the csrf token from '{}'.", page),
                    Ok(false) => {}
                    Err(why) => log::warn!("Could not load '{}' for a csrf token: {}", page, why),
                }
            }
        }
        log::info!("Reading from {}.", client_config.api_url);
        Arc::new(backend)
    };

    // stores and pollers
    let state = WebState::new(backend, &client_config);
    let pollers = state.spawn_pollers(&client_config);

    // web server
    let shutdown = async {
        if let Err(why) = tokio::signal::ctrl_c().await {
            log::error!("Could not listen for ctrl-c: {}", why);
            std::future::pending::<()>().await;
        }
    };
    let served = start_web_server(state, &web_config, shutdown).await;

    for poller in pollers {
        poller.stop().await;
    }
    Ok(served?)
}
