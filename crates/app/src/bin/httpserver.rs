//! Runnerq webhook intake - AWS Lambda Runtime

use std::sync::Arc;

use lambda_http::{run, Error};
use tower_http::trace::TraceLayer;
use tracing::info;

use runnerq_app::create_app;
use runnerq_common::{initialize, Config};
use runnerq_sqs::{QueueConfig, QueueDatastore};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .without_time()
        .init();

    info!("Initializing Runnerq webhook Lambda");

    let config = Config::from_env().map_err(|e| Error::from(format!("Config error: {}", e)))?;
    initialize(&config.init_config())
        .await
        .map_err(|e| Error::from(format!("Initialization error: {}", e)))?;

    let queue = QueueConfig::from_env().map_err(|e| Error::from(e.to_string()))?;
    let datastore = QueueDatastore::connect(queue)
        .await
        .map_err(|e| Error::from(format!("Queue store error: {}", e)))?;

    let app = create_app(Arc::new(datastore)).layer(TraceLayer::new_for_http());

    info!("Runnerq webhook Lambda ready to serve requests");

    run(app).await
}
