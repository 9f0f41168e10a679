//! Demo server wiring the session registry, pruner, and HTTP surface.
//!
//! Run with: cargo run -p web-server-demo
//!
//! Create a session:   curl -i -X POST 'http://localhost:3000/sessions?host=a'
//! Fetch a page:       curl -i 'http://localhost:3000/sessions?id=<id>&page=0'
//!
//! A demo producer publishes a heartbeat record to every open session, so
//! repeated page fetches show the paging protocol end to end.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, RwLock},
    time::Duration,
};

use logtap_core::{Field, Level, LogRecord, RecordSink, SessionId, SessionRegistrar, Tag};
use logtap_session::{Pruner, SessionConfig, SessionRegistry};
use logtap_transport::session_router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fans demo records out to every open session.
struct Broadcaster {
    sinks: RwLock<HashMap<SessionId, Arc<dyn RecordSink>>>,
}

impl Broadcaster {
    fn new() -> Self {
        Self {
            sinks: RwLock::new(HashMap::new()),
        }
    }

    fn broadcast(&self, record: &LogRecord) {
        for sink in self.sinks.read().unwrap().values() {
            sink.publish(record.clone());
        }
    }
}

impl SessionRegistrar for Broadcaster {
    fn register(&self, id: SessionId, tags: &[Tag], sink: Arc<dyn RecordSink>) {
        tracing::info!(%id, ?tags, "routing demo records to new session");
        self.sinks.write().unwrap().insert(id, sink);
    }

    fn deregister(&self, id: SessionId) {
        self.sinks.write().unwrap().remove(&id);
        tracing::info!(%id, "session closed");
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = SessionConfig::default()
        .with_page_size(env_u64("LOGTAP_PAGE_SIZE", 10) as usize)
        .with_ttl(Duration::from_secs(env_u64("LOGTAP_TTL_SECS", 20)));

    let broadcaster = Arc::new(Broadcaster::new());
    let registry = Arc::new(SessionRegistry::with_registrar(
        config,
        Arc::clone(&broadcaster) as Arc<dyn SessionRegistrar>,
    ));

    let pruner = Pruner::spawn(
        Arc::clone(&registry),
        Duration::from_secs(env_u64("LOGTAP_PRUNE_SECS", 5)),
    );

    // Demo producer: one heartbeat record per tick for every open session.
    let producer = tokio::spawn({
        let broadcaster = Arc::clone(&broadcaster);
        async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(500));
            let mut beat: i64 = 0;
            loop {
                ticker.tick().await;
                beat += 1;
                broadcaster.broadcast(
                    &LogRecord::new(Level::Info, "heartbeat")
                        .with_fields(vec![Field::int("beat", beat)]),
                );
            }
        }
    });

    let app = session_router(Arc::clone(&registry))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!(
        page_size = registry.config().page_size,
        ttl_secs = registry.config().ttl.as_secs(),
        "server listening on http://{addr}"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    producer.abort();
    pruner.shutdown().await;
    registry.close()?;

    Ok(())
}
