//! Job processing seam
//!
//! Whatever launches a runner for a job sits behind `JobProcessor`. The
//! default implementation hands the job to an external executable (the
//! runtime asset copied at startup) as wire JSON on stdin.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use chrono::Utc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use runnerq_common::GitHubAppCredentials;
use runnerq_jobs::Job;
use runnerq_sqs::JobEnvelope;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to start processor: {0}")]
    Spawn(String),

    #[error("Failed to mint App token: {0}")]
    Credentials(String),

    #[error("Processor I/O error: {0}")]
    Io(String),

    #[error("Processor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Handles one job, e.g. by launching a runner for it
#[async_trait::async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: &Job) -> Result<(), ProcessError>;
}

/// Runs an executable per job.
///
/// With App credentials attached, each invocation also gets a freshly
/// minted `GITHUB_APP_JWT` and the `GITHUB_APP_ID` it was issued for.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    program: PathBuf,
    args: Vec<String>,
    credentials: Option<GitHubAppCredentials>,
}

impl CommandProcessor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            credentials: None,
        }
    }

    /// Hand an App JWT to every invocation
    pub fn with_credentials(mut self, credentials: Option<GitHubAppCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Append arguments passed on every invocation
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

#[async_trait::async_trait]
impl JobProcessor for CommandProcessor {
    async fn process(&self, job: &Job) -> Result<(), ProcessError> {
        let body = JobEnvelope::from(job)
            .to_body()
            .map_err(|e| ProcessError::Io(e.to_string()))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("RUNNERQ_JOB_ID", job.id.to_string())
            .env("RUNNERQ_REPOSITORY", &job.repository)
            .env("RUNNERQ_TARGET_ID", job.target_id.to_string());

        if let Some(credentials) = &self.credentials {
            let token = credentials
                .app_jwt(Utc::now())
                .map_err(|e| ProcessError::Credentials(e.to_string()))?;
            command
                .env("GITHUB_APP_ID", credentials.app_id().to_string())
                .env("GITHUB_APP_JWT", token);
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::Spawn(format!("{}: {}", self.program.display(), e)))?;

        // Feed stdin while waiting: a child may exit without reading it
        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(body.as_bytes()).await {
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    tracing::debug!(job_id = %job.id, "Processor closed stdin early");
                    Ok(())
                }
                result => result,
            }
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output =
            output.map_err(|e| ProcessError::Io(format!("waiting for processor: {}", e)))?;

        if !output.status.success() {
            return Err(ProcessError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        fed.map_err(|e| ProcessError::Io(format!("writing job to stdin: {}", e)))?;

        tracing::info!(job_id = %job.id, program = %self.program.display(), "Job processed");
        Ok(())
    }
}
