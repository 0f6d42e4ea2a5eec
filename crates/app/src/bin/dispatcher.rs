//! Runnerq queue dispatcher - AWS Lambda Runtime
//!
//! Invoked by the SQS event source mapping. Failed records are returned as
//! batch item failures; everything else in the batch is deleted by Lambda.

use std::sync::Arc;

use aws_lambda_events::event::sqs::{SqsBatchResponse, SqsEvent};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

use runnerq_app::{dispatch, CommandProcessor, JobProcessor};
use runnerq_common::{initialize, Config};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .without_time()
        .init();

    info!("Initializing Runnerq dispatcher Lambda");

    let config = Config::from_env().map_err(|e| Error::from(format!("Config error: {}", e)))?;
    let runtime = initialize(&config.init_config())
        .await
        .map_err(|e| Error::from(format!("Initialization error: {}", e)))?;

    let processor: Arc<dyn JobProcessor> = Arc::new(
        CommandProcessor::new(&config.processor_command)
            .with_credentials(runtime.credentials().cloned()),
    );

    info!(processor = %config.processor_command.display(), "Runnerq dispatcher Lambda ready");

    run(service_fn(move |event: LambdaEvent<SqsEvent>| {
        let processor = processor.clone();
        async move {
            let summary = dispatch(processor.as_ref(), event.payload).await;
            Ok::<SqsBatchResponse, Error>(summary.batch_response())
        }
    }))
    .await
}
