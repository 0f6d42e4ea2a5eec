//! Mock Queue Transport Implementation
//!
//! In-memory FIFO queue with a deduplication window and a visibility
//! timeout, for tests and local development. Thread-safe via `Arc<Mutex<>>`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::transport::{OutboundMessage, QueueTransport, ReceivedMessage};
use crate::StoreError;

/// SQS FIFO deduplication interval
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(300);

/// SQS default visibility timeout
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: String,
    group_id: String,
    receipt_handle: Option<String>,
    invisible_until: Option<Instant>,
}

impl StoredMessage {
    fn is_visible(&self, now: Instant) -> bool {
        self.invisible_until.is_none_or(|until| until <= now)
    }
}

#[derive(Debug, Default)]
struct MockQueueState {
    messages: Vec<StoredMessage>,
    dedup: HashMap<String, Instant>,
    sent: Vec<OutboundMessage>,
    next_id: u64,
    receive_calls: usize,
    deleted: usize,
    fail_next_send: Option<String>,
    fail_next_receive: Option<String>,
    fail_next_delete: Option<String>,
}

/// Mock queue transport that keeps messages in memory
#[derive(Debug, Clone)]
pub struct MockQueueTransport {
    state: Arc<Mutex<MockQueueState>>,
    visibility_timeout: Duration,
    dedup_window: Duration,
}

impl MockQueueTransport {
    /// Create a mock queue with SQS default timings
    pub fn new() -> Self {
        Self::with_timings(DEFAULT_VISIBILITY_TIMEOUT, DEFAULT_DEDUP_WINDOW)
    }

    /// Create a mock queue with custom visibility timeout and dedup window
    pub fn with_timings(visibility_timeout: Duration, dedup_window: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockQueueState::default())),
            visibility_timeout,
            dedup_window,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockQueueState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Poll(format!("mock queue lock poisoned: {e}")))
    }

    fn state(&self) -> MutexGuard<'_, MockQueueState> {
        self.state
            .lock()
            .expect("mock queue lock poisoned; a prior test panicked")
    }

    /// Every accepted send, including deduplicated ones
    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.state().sent.clone()
    }

    /// Messages currently held by the queue, visible or not
    pub fn depth(&self) -> usize {
        self.state().messages.len()
    }

    /// Bodies of messages currently held, in enqueue order
    pub fn bodies(&self) -> Vec<String> {
        self.state()
            .messages
            .iter()
            .map(|m| m.body.clone())
            .collect()
    }

    /// Group ids of messages currently held, in enqueue order
    pub fn group_ids(&self) -> Vec<String> {
        self.state()
            .messages
            .iter()
            .map(|m| m.group_id.clone())
            .collect()
    }

    /// Number of receive calls served
    pub fn receive_calls(&self) -> usize {
        self.state().receive_calls
    }

    /// Number of successful deletes
    pub fn deleted_count(&self) -> usize {
        self.state().deleted
    }

    /// Put every in-flight message back in view, as if the visibility
    /// timeout elapsed
    pub fn expire_visibility(&self) {
        for message in self.state().messages.iter_mut() {
            message.invisible_until = None;
            message.receipt_handle = None;
        }
    }

    /// Place a raw body on the queue, bypassing deduplication
    pub fn push_raw(&self, body: impl Into<String>) {
        let mut state = self.state();
        let message_id = next_message_id(&mut state);
        state.messages.push(StoredMessage {
            message_id,
            body: body.into(),
            group_id: crate::DEFAULT_MESSAGE_GROUP_ID.to_string(),
            receipt_handle: None,
            invisible_until: None,
        });
    }

    /// Fail the next send with a publish error
    pub fn fail_next_send(&self, reason: impl Into<String>) {
        self.state().fail_next_send = Some(reason.into());
    }

    /// Fail the next receive with a poll error
    pub fn fail_next_receive(&self, reason: impl Into<String>) {
        self.state().fail_next_receive = Some(reason.into());
    }

    /// Fail the next delete with a delete error
    pub fn fail_next_delete(&self, reason: impl Into<String>) {
        self.state().fail_next_delete = Some(reason.into());
    }

    /// Drop all messages and counters
    pub fn reset(&self) {
        *self.state() = MockQueueState::default();
    }
}

impl Default for MockQueueTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn next_message_id(state: &mut MockQueueState) -> String {
    state.next_id += 1;
    format!("mock-message-{}", state.next_id)
}

#[async_trait::async_trait]
impl QueueTransport for MockQueueTransport {
    async fn send(&self, message: OutboundMessage) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if let Some(reason) = state.fail_next_send.take() {
            return Err(StoreError::Publish(format!("SendMessage: {reason}")));
        }

        let now = Instant::now();
        let window = self.dedup_window;
        state.dedup.retain(|_, sent_at| now.duration_since(*sent_at) < window);

        state.sent.push(message.clone());
        if state.dedup.contains_key(&message.deduplication_id) {
            tracing::debug!(
                deduplication_id = %message.deduplication_id,
                "Mock queue: duplicate send suppressed"
            );
            return Ok(());
        }

        state.dedup.insert(message.deduplication_id.clone(), now);
        let message_id = next_message_id(&mut state);
        state.messages.push(StoredMessage {
            message_id,
            body: message.body,
            group_id: message.group_id,
            receipt_handle: None,
            invisible_until: None,
        });
        Ok(())
    }

    async fn receive(
        &self,
        max_messages: i32,
        _wait_time_seconds: i32,
    ) -> Result<Vec<ReceivedMessage>, StoreError> {
        let mut state = self.lock()?;
        state.receive_calls += 1;
        if let Some(reason) = state.fail_next_receive.take() {
            return Err(StoreError::Poll(format!("ReceiveMessage: {reason}")));
        }

        let now = Instant::now();
        let limit = usize::try_from(max_messages.max(0)).unwrap_or_default();
        let visibility_timeout = self.visibility_timeout;
        let mut next_id = state.next_id;

        let received: Vec<ReceivedMessage> = state
            .messages
            .iter_mut()
            .filter(|m| m.is_visible(now))
            .take(limit)
            .map(|m| {
                next_id += 1;
                let handle = format!("mock-receipt-{next_id}");
                m.receipt_handle = Some(handle.clone());
                m.invisible_until = Some(now + visibility_timeout);
                ReceivedMessage {
                    message_id: Some(m.message_id.clone()),
                    body: m.body.clone(),
                    receipt_handle: handle,
                }
            })
            .collect();

        state.next_id = next_id;
        tracing::debug!(count = received.len(), "Mock queue: messages received");
        Ok(received)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if let Some(reason) = state.fail_next_delete.take() {
            return Err(StoreError::Delete(format!("DeleteMessage: {reason}")));
        }

        let before = state.messages.len();
        state
            .messages
            .retain(|m| m.receipt_handle.as_deref() != Some(receipt_handle));
        if state.messages.len() < before {
            state.deleted += 1;
        }
        Ok(())
    }
}
