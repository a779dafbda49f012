use arke::agent::Agent;
use arke::api::{AppState, build_router};
use arke::metrics::ServiceMetrics;
use arke::pipeline::RagService;
use arke::safety::{LexiconClassifier, SafetyGate};
use arke::session::InMemorySessionStore;
use arke::{config, logging};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_config();
    logging::init_tracing();

    let metrics = Arc::new(ServiceMetrics::new());
    let rag = Arc::new(RagService::from_config(metrics)?);
    rag.ensure_collection().await?;

    let agent = Agent::new(
        SafetyGate::new(Box::new(LexiconClassifier::default())),
        rag,
        Arc::new(InMemorySessionStore::new()),
    );
    let app = build_router(AppState {
        agent: Arc::new(agent),
    });

    let (listener, port) = bind_listener().await?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    let config = config::get_config();
    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 8000..=8099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 8000-8099",
    ))
}
