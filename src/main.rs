//! Voice trivia binary entrypoint wiring the dialog engine, lock backend and HTTP layers.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use futures::future::{self, BoxFuture};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voice_trivia_back::{
    config::{self, AppConfig, LockBackend},
    dao::{
        lock_store::{GameLock, MemoryGameLock},
        session_store::MemorySessionStore,
        storage::StorageResult,
    },
    routes,
    services::lock_supervisor,
    state::{AppState, SharedState, dialog::DialogEngine},
};

type Connector = Box<dyn FnMut() -> BoxFuture<'static, StorageResult<Arc<dyn GameLock>>> + Send>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_config = AppConfig::load();
    let backend = LockBackend::from_env().context("reading LOCK_STORE")?;
    let connector = lock_connector(backend, app_config.game_id.clone())?;

    let engine = DialogEngine::new(
        Arc::new(app_config.bank),
        app_config.default_team,
        app_config.lock_timeout,
    );
    let app_state = AppState::new(engine, Arc::new(MemorySessionStore::new()));

    info!(?backend, game_id = %app_config.game_id, "starting game lock supervisor");
    tokio::spawn(lock_supervisor::run(app_state.clone(), connector));

    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config::server_port()));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the closure the supervisor calls to (re)connect the selected backend.
fn lock_connector(backend: LockBackend, game_id: String) -> anyhow::Result<Connector> {
    match backend {
        LockBackend::Memory => {
            let lock = MemoryGameLock::new();
            Ok(Box::new(move || -> BoxFuture<'static, StorageResult<Arc<dyn GameLock>>> {
                let connected: StorageResult<Arc<dyn GameLock>> = Ok(Arc::new(lock.clone()));
                Box::pin(future::ready(connected))
            }))
        }
        #[cfg(feature = "mongo-store")]
        LockBackend::Mongo => Ok(Box::new(
            move || -> BoxFuture<'static, StorageResult<Arc<dyn GameLock>>> {
                Box::pin(connect_mongo(game_id.clone()))
            },
        )),
        #[cfg(feature = "couch-store")]
        LockBackend::Couch => Ok(Box::new(
            move || -> BoxFuture<'static, StorageResult<Arc<dyn GameLock>>> {
                Box::pin(connect_couch(game_id.clone()))
            },
        )),
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("lock backend {other:?} is not compiled into this build"),
    }
}

#[cfg(feature = "mongo-store")]
async fn connect_mongo(game_id: String) -> StorageResult<Arc<dyn GameLock>> {
    use voice_trivia_back::dao::lock_store::mongodb::{MongoConfig, MongoGameLock};

    let config = MongoConfig::from_env().await?;
    let lock = MongoGameLock::connect(config, game_id).await?;
    Ok(Arc::new(lock))
}

#[cfg(feature = "couch-store")]
async fn connect_couch(game_id: String) -> StorageResult<Arc<dyn GameLock>> {
    use voice_trivia_back::dao::lock_store::couchdb::{CouchConfig, CouchGameLock};

    let config = CouchConfig::from_env();
    let lock = CouchGameLock::connect(config, &game_id).await?;
    Ok(Arc::new(lock))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
