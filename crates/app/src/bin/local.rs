// Runnerq - Local Development Server
//
// Serves the webhook intake and runs the consumer loop against the same
// queue. Point AWS_ENDPOINT_URL at LocalStack to run without AWS.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use runnerq_app::{CommandProcessor, Consumer};
use runnerq_common::{initialize, Config};
use runnerq_jobs::Datastore;
use runnerq_sqs::{QueueConfig, QueueDatastore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .pretty()
        .init();

    info!("Starting Runnerq local development server");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");

    let runtime = initialize(&config.init_config()).await.map_err(|e| {
        error!("Failed to initialize runtime: {}", e);
        e
    })?;

    let queue = QueueConfig::from_env()?;
    let datastore: Arc<dyn Datastore> = Arc::new(QueueDatastore::connect(queue).await.map_err(|e| {
        error!("Failed to connect to queue: {}", e);
        anyhow::anyhow!("Queue connection failed: {}", e)
    })?);

    info!("Queue connection established");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let consumer = Consumer::new(
        datastore.clone(),
        Arc::new(
            CommandProcessor::new(&config.processor_command)
                .with_credentials(runtime.credentials().cloned()),
        ),
        config.poll_interval,
    );
    let mut consumer_rx = shutdown_rx.clone();
    let consumer_task = tokio::spawn(async move {
        consumer
            .run(async move {
                let _ = consumer_rx.wait_for(|stop| *stop).await;
            })
            .await
    });

    let app = runnerq_app::create_app(datastore).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .into_inner(),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Server starting on http://{}", addr);
    info!("Health check available at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);

    let mut server_rx = shutdown_rx;
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = server_rx.wait_for(|stop| *stop).await;
    });

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    match consumer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Consumer stopped with error: {}", e),
        Err(e) => error!("Consumer task failed: {}", e),
    }

    runtime.teardown().await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
