//! AWS SQS Transport Implementation
//!
//! Publishes and polls job messages on an SQS FIFO queue, with support for
//! the LocalStack testing environment.

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use aws_sdk_sqs::config::SharedCredentialsProvider;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_sqs::Client as SqsClient;

use crate::transport::{OutboundMessage, QueueTransport, ReceivedMessage};
use crate::{QueueConfig, StoreError};

/// AWS SQS transport
#[derive(Debug, Clone)]
pub struct SqsTransport {
    client: SqsClient,
    queue_url: String,
}

impl SqsTransport {
    /// Build an SQS client for the configured queue. Fails with
    /// `Initialization` when no AWS credentials can be resolved.
    pub async fn new(config: &QueueConfig) -> Result<Self, StoreError> {
        config.validate()?;

        let aws_config = match config.endpoint_url.as_ref() {
            Some(endpoint_url) => {
                tracing::info!("Using custom AWS endpoint: {}", endpoint_url);

                // For LocalStack, use dummy credentials
                let credentials = Credentials::new(
                    "test-access-key",
                    "test-secret-key",
                    None,
                    None,
                    "localstack-sqs-provider",
                );

                aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .endpoint_url(endpoint_url)
                    .credentials_provider(SharedCredentialsProvider::new(credentials))
                    .load()
                    .await
            }
            None => {
                aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await
            }
        };

        // The default chain is always installed; resolving it is the check
        let provider = aws_config.credentials_provider().ok_or_else(|| {
            StoreError::Initialization(format!(
                "no AWS credentials provider for region {}",
                config.region
            ))
        })?;
        provider.provide_credentials().await.map_err(|e| {
            StoreError::Initialization(format!(
                "failed to resolve AWS credentials: {}",
                DisplayErrorContext(&e)
            ))
        })?;

        let client = SqsClient::new(&aws_config);

        Ok(Self {
            client,
            queue_url: config.queue_url.clone(),
        })
    }

    /// Queue this transport addresses
    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// Check that the queue is reachable. Failure is logged, not fatal.
    pub async fn probe(&self) -> bool {
        match self
            .client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
        {
            Ok(output) => {
                let depth = output
                    .attributes()
                    .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
                    .cloned()
                    .unwrap_or_default();
                tracing::info!(queue_url = %self.queue_url, depth = %depth, "Connected to SQS queue");
                true
            }
            Err(e) => {
                tracing::warn!(
                    queue_url = %self.queue_url,
                    "Failed to reach SQS queue (may be expected in LocalStack): {}",
                    DisplayErrorContext(&e)
                );
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl QueueTransport for SqsTransport {
    async fn send(&self, message: OutboundMessage) -> Result<(), StoreError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message.body)
            .message_group_id(message.group_id)
            .message_deduplication_id(&message.deduplication_id)
            .send()
            .await
            .map_err(|e| StoreError::Publish(format!("SendMessage: {}", DisplayErrorContext(&e))))?;

        tracing::debug!(
            deduplication_id = %message.deduplication_id,
            message_id = output.message_id().unwrap_or_default(),
            "Message sent to SQS"
        );

        Ok(())
    }

    async fn receive(
        &self,
        max_messages: i32,
        wait_time_seconds: i32,
    ) -> Result<Vec<ReceivedMessage>, StoreError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_time_seconds)
            .send()
            .await
            .map_err(|e| StoreError::Poll(format!("ReceiveMessage: {}", DisplayErrorContext(&e))))?;

        output
            .messages()
            .iter()
            .map(|m| {
                let receipt_handle = m.receipt_handle().ok_or_else(|| {
                    StoreError::Poll(format!(
                        "ReceiveMessage: message {} has no receipt handle",
                        m.message_id().unwrap_or("<unknown>")
                    ))
                })?;
                Ok(ReceivedMessage {
                    message_id: m.message_id().map(str::to_string),
                    body: m.body().unwrap_or_default().to_string(),
                    receipt_handle: receipt_handle.to_string(),
                })
            })
            .collect()
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), StoreError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| StoreError::Delete(format!("DeleteMessage: {}", DisplayErrorContext(&e))))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    async fn test_sqs_transport_creation_with_local_endpoint() {
        let mut config = QueueConfig::new(
            "http://localhost:4566/000000000000/jobs.fifo",
            "us-east-1",
        );
        config.endpoint_url = Some("http://localhost:4566".to_string());

        // Client construction does not touch the network
        let transport = SqsTransport::new(&config).await.unwrap();
        assert_eq!(
            transport.queue_url(),
            "http://localhost:4566/000000000000/jobs.fifo"
        );
    }

    const CREDENTIAL_VARS: &[&str] = &[
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
        "AWS_SESSION_TOKEN",
        "AWS_PROFILE",
        "AWS_WEB_IDENTITY_TOKEN_FILE",
        "AWS_ROLE_ARN",
        "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI",
        "AWS_CONTAINER_CREDENTIALS_FULL_URI",
    ];

    #[tokio::test]
    #[serial]
    async fn test_sqs_transport_without_credentials_is_initialization_error() {
        let saved: Vec<_> = CREDENTIAL_VARS
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();
        for key in CREDENTIAL_VARS {
            std::env::remove_var(key);
        }
        std::env::set_var("AWS_CONFIG_FILE", "/nonexistent/runnerq/config");
        std::env::set_var("AWS_SHARED_CREDENTIALS_FILE", "/nonexistent/runnerq/credentials");
        std::env::set_var("AWS_EC2_METADATA_DISABLED", "true");

        let config = QueueConfig::new(
            "https://sqs.us-east-1.amazonaws.com/000000000000/jobs.fifo",
            "us-east-1",
        );
        let result = SqsTransport::new(&config).await;

        for key in ["AWS_CONFIG_FILE", "AWS_SHARED_CREDENTIALS_FILE", "AWS_EC2_METADATA_DISABLED"] {
            std::env::remove_var(key);
        }
        for (key, value) in saved {
            if let Some(value) = value {
                std::env::set_var(key, value);
            }
        }

        assert!(matches!(result, Err(StoreError::Initialization(_))));
    }

    #[tokio::test]
    async fn test_sqs_transport_rejects_invalid_config() {
        let config = QueueConfig::new("", "us-east-1");
        let err = SqsTransport::new(&config).await.unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }
}
