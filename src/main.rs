use log::{error, info};
use std::net::{SocketAddr, TcpListener};
use warp::Filter;

use living_snow_api::config::{self, Config};
use living_snow_api::db_pool::{create_db_pool, DbPool};
use living_snow_api::handlers_health::build_health_routes;
use living_snow_api::handlers_photo::build_photo_routes;
use living_snow_api::handlers_records::build_record_routes;
use living_snow_api::warp_helpers::{cors, handle_rejection};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let addr = SocketAddr::new(config.host, config.port);

    info!("Starting {} on {}", config::LOGGER_NAME, addr);
    info!("Database: {}", config.db_path);

    // Check if port is available BEFORE opening the database
    if !is_addr_available(addr) {
        error!("Address {} is already in use", addr);
        return Err(format!("Address {} is already in use", addr).into());
    }

    // No schema, no service: a failure here aborts startup
    let db_pool = create_db_pool(&config.db_path, config.max_connections).await?;
    info!("Database initialized successfully");

    let routes = build_routes(db_pool.clone(), config.max_photo_bytes)
        .with(cors())
        .with(warp::log(config::LOGGER_NAME))
        .recover(handle_rejection);

    info!("Server started successfully, listening on http://{}", addr);

    warp::serve(routes).run(addr).await;

    db_pool.close().await;

    Ok(())
}

fn is_addr_available(addr: SocketAddr) -> bool {
    TcpListener::bind(addr).is_ok()
}

fn build_routes(
    db_pool: DbPool,
    max_photo_bytes: u64,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    build_health_routes(db_pool.clone())
        .or(build_record_routes(db_pool.clone()))
        .or(build_photo_routes(db_pool, max_photo_bytes))
}
