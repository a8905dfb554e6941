use poll_rooms::config::Config;
use poll_rooms::routes::build_router;
use poll_rooms::startup::AppState;
use poll_rooms::store::{MemoryStore, PgStore, Store};
use std::sync::Arc;

#[macro_use]
extern crate tracing;

#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "INFO");
        }
    }
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => match PgStore::connect(url).await {
            Ok(store) => {
                store.spawn_health_check();
                Arc::new(store)
            }
            Err(e) => {
                error!("Database initialization failed: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            warn!("DATABASE_URL not set, rooms are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let addr = config.bind_addr;
    let app_state = AppState::new(store, config);
    let app = build_router(app_state);

    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Unable to spawn tcp listener");

    axum::serve(listener, app).await.unwrap();
}
