//! Runnerq application composition root
//!
//! Wires the queue-backed datastore into its collaborators: the webhook
//! intake that enqueues jobs, the Lambda dispatcher that receives them, and
//! the long-running consumer loop used outside Lambda.

pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod mock;
pub mod processor;
pub mod webhook;

use std::sync::Arc;

use axum::Router;
use runnerq_jobs::Datastore;

pub use consumer::{Consumer, PollSummary};
pub use dispatcher::{dispatch, DispatchSummary};
pub use error::AppError;
pub use processor::{CommandProcessor, JobProcessor, ProcessError};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub datastore: Arc<dyn Datastore>,
}

/// Create the main application router
pub fn create_app(datastore: Arc<dyn Datastore>) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(webhook::routes())
        .with_state(AppState { datastore })
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
