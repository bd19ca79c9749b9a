// src/submit/mod.rs
//! Session state and the sequential submission loop.
//!
//! A [`Session`] holds what the operator has imported, whether a run is in
//! progress, and the log of everything the run reported. Log lines are
//! pushed to every subscriber as they are appended so a front end can
//! render them live. Subscriber channels are unbounded: no line is dropped
//! for a slow reader.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::campaign::{valid_records, CampaignRequest, CreateCampaignsBody, Layout};
use crate::import::{ImportedSheet, Record};

pub mod client;

pub use client::{CampaignClient, CreateResponse, SubmitError, Task};

pub const NO_VALID_CAMPAIGNS: &str =
    "Error: No valid campaigns available after filtering null data.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("a run is already in progress")]
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOptions {
    pub user_id: u64,
    pub batch_size: usize,
    pub dry_run: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            user_id: 1,
            batch_size: 1,
            dry_run: false,
        }
    }
}

/// Counts are in campaigns, not requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Records dropped by the completeness filter.
    pub skipped: usize,
    /// Payloads logged instead of sent.
    pub dry_run: usize,
}

#[derive(Debug, Default)]
struct SessionState {
    headers: Vec<String>,
    layout: Layout,
    records: Vec<Record>,
    log: Vec<String>,
    subscribers: Vec<mpsc::UnboundedSender<String>>,
}

pub struct Session {
    state: Mutex<SessionState>,
    running: AtomicBool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the running flag when the run ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            running: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // state is plain data; a panic elsewhere leaves nothing half-written
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the imported records. The log is kept.
    pub fn load(&self, sheet: ImportedSheet) {
        let mut state = self.state();
        state.headers = sheet.headers;
        state.layout = sheet.layout;
        state.records = sheet.records;
    }

    pub fn headers(&self) -> Vec<String> {
        self.state().headers.clone()
    }

    pub fn layout(&self) -> Layout {
        self.state().layout
    }

    pub fn records(&self) -> Vec<Record> {
        self.state().records.clone()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.state().log.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Receive every log line appended from now on. The channel closes
    /// when the session is dropped.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state().subscribers.push(tx);
        rx
    }

    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        debug!(line = %line, "session log");
        let mut state = self.state();
        // forget receivers that have gone away
        state.subscribers.retain(|tx| tx.send(line.clone()).is_ok());
        state.log.push(line);
    }

    /// Submit every complete record, one request at a time, logging each
    /// outcome before the next request is made. A failed request never
    /// stops the loop.
    #[instrument(level = "info", skip(self, client, opts), fields(batch_size = opts.batch_size, dry_run = opts.dry_run))]
    pub async fn run(
        &self,
        client: &CampaignClient,
        opts: &SubmitOptions,
    ) -> Result<RunSummary, RunError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("run requested while another is in progress");
            return Err(RunError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        self.log("Running operation...");

        let (campaigns, skipped) = {
            let state = self.state();
            let valid = valid_records(&state.records);
            let skipped = state.records.len() - valid.len();
            let campaigns: Vec<CampaignRequest> = valid
                .into_iter()
                .map(|r| CampaignRequest::from_record(r, state.layout))
                .collect();
            (campaigns, skipped)
        };

        let mut summary = RunSummary {
            skipped,
            ..RunSummary::default()
        };

        if campaigns.is_empty() {
            self.log(NO_VALID_CAMPAIGNS);
            return Ok(summary);
        }

        info!(campaigns = campaigns.len(), skipped, "submitting");

        for chunk in campaigns.chunks(opts.batch_size.max(1)) {
            let label = chunk
                .iter()
                .map(|c| c.sku.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let body = CreateCampaignsBody {
                user_id: opts.user_id,
                campaigns: chunk.to_vec(),
            };
            let payload = serde_json::to_string(&body).unwrap_or_default();
            debug!(payload = %payload, "campaign data");

            if opts.dry_run {
                self.log(format!("Dry run for SKU {}: {}", label, payload));
                summary.dry_run += chunk.len();
                continue;
            }

            summary.submitted += chunk.len();

            // own task so a panic in the request path is contained to this record
            let outcome = tokio::spawn({
                let client = client.clone();
                async move { client.create_campaigns(&body).await }
            })
            .await;

            let ok = match outcome {
                Ok(result) => self.log_outcome(&label, result),
                Err(e) => {
                    warn!(sku = %label, error = %e, "submission task failed");
                    self.log(format!("Unknown error occurred for SKU {}", label));
                    false
                }
            };

            if ok {
                summary.succeeded += chunk.len();
            } else {
                summary.failed += chunk.len();
            }
        }

        info!(
            submitted = summary.submitted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            dry_run = summary.dry_run,
            "run finished"
        );
        Ok(summary)
    }

    fn log_outcome(&self, sku: &str, result: Result<CreateResponse, SubmitError>) -> bool {
        match result {
            Ok(resp) => {
                self.log(format!("Response for SKU {}: Status {}", sku, resp.status));
                match resp.tasks.first() {
                    Some(task) => self.log(format!(
                        "Task Created: {} - Status: {} - Message: {}",
                        task.campaign_name, task.status, task.raw
                    )),
                    None => self.log(format!("No task information available for SKU {}.", sku)),
                }
                true
            }
            Err(SubmitError::Status(code)) => {
                self.log(format!(
                    "Error: Failed to create campaign for SKU {} (Status: {})",
                    sku, code
                ));
                false
            }
            Err(SubmitError::NotJson(text)) => {
                let quoted = serde_json::to_string(&text).unwrap_or(text);
                self.log(format!(
                    "Error: Expected JSON but received for SKU {}: {}",
                    sku, quoted
                ));
                false
            }
            Err(e @ (SubmitError::Transport(_) | SubmitError::Decode(_))) => {
                self.log(format!("Error for SKU {}: {}", sku, e));
                false
            }
        }
    }
}
