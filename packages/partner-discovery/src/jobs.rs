//! In-process log of discovery runs.
//!
//! Keeps the latest runs per client, newest first, so an operator can see
//! what the last discovery for a client did and why it stopped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

use crate::error::{DiscoveryError, Result};
use crate::pipeline::{DiscoveryOutcome, TerminationReason};
use crate::trace::{ErrorInfo, TraceEntry};
use crate::types::config::{DiscoveryConfig, DiscoveryMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Complete,
    Failed,
}

/// One logged discovery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobLogEntry {
    pub job_id: String,
    pub client_name: String,
    pub mode: DiscoveryMode,
    pub config: DiscoveryConfig,
    pub trace: Vec<TraceEntry>,
    pub status: JobStatus,
    pub partner_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<TerminationReason>,
    pub created_at: DateTime<Utc>,
}

impl JobLogEntry {
    /// A run that has started but not finished.
    pub fn running(
        client_name: impl Into<String>,
        mode: DiscoveryMode,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            client_name: client_name.into(),
            mode,
            config,
            trace: Vec::new(),
            status: JobStatus::Running,
            partner_count: 0,
            termination_reason: None,
            created_at: Utc::now(),
        }
    }

    /// A completed run.
    pub fn from_outcome(
        client_name: impl Into<String>,
        mode: DiscoveryMode,
        config: DiscoveryConfig,
        outcome: &DiscoveryOutcome,
    ) -> Self {
        Self {
            job_id: outcome.job_id.clone(),
            trace: outcome.trace.clone(),
            status: JobStatus::Complete,
            partner_count: outcome.results.len(),
            termination_reason: Some(outcome.termination_reason),
            ..Self::running(client_name, mode, config)
        }
    }

    /// A run that aborted with an error.
    pub fn failed(
        client_name: impl Into<String>,
        mode: DiscoveryMode,
        config: DiscoveryConfig,
        error: &DiscoveryError,
    ) -> Self {
        Self {
            trace: error_trace(error),
            status: JobStatus::Failed,
            ..Self::running(client_name, mode, config)
        }
    }
}

fn error_trace(error: &DiscoveryError) -> Vec<TraceEntry> {
    vec![TraceEntry::Error(ErrorInfo {
        message: error.to_string(),
    })]
}

/// Partial update merged into an existing entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub trace: Option<Vec<TraceEntry>>,
    pub partner_count: Option<usize>,
    pub termination_reason: Option<TerminationReason>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_trace(mut self, trace: Vec<TraceEntry>) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_partner_count(mut self, count: usize) -> Self {
        self.partner_count = Some(count);
        self
    }

    pub fn with_termination_reason(mut self, reason: TerminationReason) -> Self {
        self.termination_reason = Some(reason);
        self
    }

    /// Everything a finished run reports.
    pub fn completed(outcome: &DiscoveryOutcome) -> Self {
        Self::new()
            .with_status(JobStatus::Complete)
            .with_trace(outcome.trace.clone())
            .with_partner_count(outcome.results.len())
            .with_termination_reason(outcome.termination_reason)
    }

    /// A run that aborted; the trace is replaced by the error.
    pub fn failed(error: &DiscoveryError) -> Self {
        Self::new()
            .with_status(JobStatus::Failed)
            .with_trace(error_trace(error))
    }
}

/// Newest-first run log.
#[derive(Debug, Default)]
pub struct JobLog {
    entries: RwLock<Vec<JobLogEntry>>,
}

impl JobLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, entry: JobLogEntry) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(0, entry);
    }

    /// Merge an update into the entry with `job_id`. Returns false if no
    /// such entry exists.
    pub fn update(&self, job_id: &str, update: JobUpdate) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = entries.iter_mut().find(|e| e.job_id == job_id) else {
            return false;
        };

        if let Some(status) = update.status {
            entry.status = status;
        }
        if let Some(trace) = update.trace {
            entry.trace = trace;
        }
        if let Some(count) = update.partner_count {
            entry.partner_count = count;
        }
        if let Some(reason) = update.termination_reason {
            entry.termination_reason = Some(reason);
        }
        true
    }

    /// Log a run as running, await it, then record how it ended.
    ///
    /// Returns the log entry's id alongside the run's own result.
    pub async fn track(
        &self,
        client_name: &str,
        mode: DiscoveryMode,
        config: DiscoveryConfig,
        run: impl Future<Output = Result<DiscoveryOutcome>>,
    ) -> (String, Result<DiscoveryOutcome>) {
        let entry = JobLogEntry::running(client_name, mode, config);
        let job_id = entry.job_id.clone();
        self.add(entry);

        let result = run.await;
        let update = match &result {
            Ok(outcome) => JobUpdate::completed(outcome),
            Err(e) => JobUpdate::failed(e),
        };
        self.update(&job_id, update);
        (job_id, result)
    }

    /// Most recent run for a client.
    pub fn latest_for_client(&self, client_name: &str) -> Option<JobLogEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.client_name == client_name)
            .cloned()
    }

    pub fn get(&self, job_id: &str) -> Option<JobLogEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.job_id == job_id)
            .cloned()
    }

    /// All entries, newest first.
    pub fn entries(&self) -> Vec<JobLogEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
