//! Queue transport abstraction
//!
//! The store only needs three primitives from a queue: send with a
//! deduplication key, receive a batch with a visibility timeout, and delete
//! by delivery handle.

use runnerq_jobs::StoreError;

/// Message to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub body: String,
    /// Partition tag; ordering is only guaranteed within a group
    pub group_id: String,
    /// Duplicate sends sharing this id within the dedup window are dropped
    pub deduplication_id: String,
}

/// Message handed out by a receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: Option<String>,
    pub body: String,
    /// Delivery handle; valid only for this receive
    pub receipt_handle: String,
}

/// At-least-once queue transport
#[async_trait::async_trait]
pub trait QueueTransport: Send + Sync {
    /// Publish one message. Failures map to `StoreError::Publish`.
    async fn send(&self, message: OutboundMessage) -> Result<(), StoreError>;

    /// Receive up to `max_messages`, waiting up to `wait_time_seconds` for
    /// the first to arrive. Received messages stay hidden from other
    /// receivers for the visibility timeout. Failures map to
    /// `StoreError::Poll`.
    async fn receive(
        &self,
        max_messages: i32,
        wait_time_seconds: i32,
    ) -> Result<Vec<ReceivedMessage>, StoreError>;

    /// Delete the message behind a delivery handle. Failures map to
    /// `StoreError::Delete`.
    async fn delete(&self, receipt_handle: &str) -> Result<(), StoreError>;
}
