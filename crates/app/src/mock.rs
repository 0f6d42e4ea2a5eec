//! Mock Job Processor
//!
//! Records processed jobs in memory and fails selected ones. Thread-safe
//! via `Arc<Mutex<>>`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use runnerq_jobs::Job;
use uuid::Uuid;

use crate::processor::{JobProcessor, ProcessError};

#[derive(Debug, Default)]
struct MockProcessorState {
    processed: Vec<Job>,
    failing: HashSet<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct MockJobProcessor {
    state: Arc<Mutex<MockProcessorState>>,
}

impl MockJobProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockProcessorState> {
        self.state
            .lock()
            .expect("mock processor lock poisoned; a prior test panicked")
    }

    /// Make processing of `id` fail until cleared
    pub fn fail_job(&self, id: Uuid) {
        self.state().failing.insert(id);
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    /// Jobs processed successfully, in order
    pub fn processed(&self) -> Vec<Job> {
        self.state().processed.clone()
    }

    pub fn processed_ids(&self) -> Vec<Uuid> {
        self.state().processed.iter().map(|j| j.id).collect()
    }

    pub fn count(&self) -> usize {
        self.state().processed.len()
    }
}

#[async_trait::async_trait]
impl JobProcessor for MockJobProcessor {
    async fn process(&self, job: &Job) -> Result<(), ProcessError> {
        let mut state = self.state();
        if state.failing.contains(&job.id) {
            return Err(ProcessError::Failed {
                status: "exit status: 1".to_string(),
                stderr: format!("mock failure for {}", job.id),
            });
        }
        state.processed.push(job.clone());
        Ok(())
    }
}
