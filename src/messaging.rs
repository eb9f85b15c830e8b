//! # Messaging
//!
//! Asks the assistant one question: append a user message to the thread,
//! start a run, poll the run at a fixed interval until it completes, then read
//! the newest message of the thread.
//!
//! A run that ends in any other terminal status (`failed`, `cancelled`,
//! `expired`, `incomplete`) fails the call with the run's error. Without a
//! timeout, a run that never leaves `queued`/`in_progress` keeps the caller
//! waiting.

use crate::{
    api::AssistantApi,
    config::VimAssistConfig,
    models::{is_terminal, message_text},
};
use async_openai::types::RunStatus;
use std::{error::Error, time::Duration};
use tokio::time::{Instant, sleep};
use tracing::debug;

/// How a run is waited for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            interval: Duration::from_millis(50),
            timeout: None,
        }
    }
}

impl From<&VimAssistConfig> for PollSettings {
    fn from(config: &VimAssistConfig) -> Self {
        PollSettings {
            interval: config.poll_interval(),
            timeout: config.run_timeout(),
        }
    }
}

/// Send `message` to the assistant on `thread_id` and return its answer.
///
/// # Errors
/// Fails if either id is empty, if any remote call fails, if the run ends in
/// a status other than `completed`, if the timeout elapses, or if the newest
/// message carries no text.
pub async fn send_message<A: AssistantApi>(
    api: &A,
    assistant_id: &str,
    thread_id: &str,
    message: &str,
    run_instructions: Option<&str>,
    poll: &PollSettings,
) -> Result<String, Box<dyn Error>> {
    if assistant_id.is_empty() {
        return Err("Assistant is not set".into());
    }
    if thread_id.is_empty() {
        return Err("Thread is not set".into());
    }

    api.create_message(thread_id, message)
        .await
        .map_err(|e| format!("Error adding message to thread: {e}"))?;

    let mut run = api
        .create_run(thread_id, assistant_id, run_instructions)
        .await
        .map_err(|e| format!("Error running assistant: {e}"))?;
    debug!("Started run {} on thread {}", run.id, thread_id);

    let started = Instant::now();
    while run.status != RunStatus::Completed {
        if is_terminal(&run.status) {
            let reason = run
                .last_error
                .as_ref()
                .map(|e| format!("{:?}: {}", e.code, e.message))
                .unwrap_or_else(|| "no error reported".to_string());
            return Err(format!("Run {} ended as {:?} ({})", run.id, run.status, reason).into());
        }
        if let Some(timeout) = poll.timeout {
            if started.elapsed() >= timeout {
                return Err(format!(
                    "Run {} still {:?} after {:?}",
                    run.id, run.status, timeout
                )
                .into());
            }
        }

        sleep(poll.interval).await;

        run = api
            .retrieve_run(thread_id, &run.id)
            .await
            .map_err(|e| format!("Error retrieving run: {e}"))?;
        debug!("Run {} is {:?}", run.id, run.status);
    }

    let messages = api
        .list_messages(thread_id, 1)
        .await
        .map_err(|e| format!("Error retrieving messages: {e}"))?;

    let latest = messages
        .first()
        .ok_or_else(|| format!("Thread {thread_id} has no messages"))?;
    let answer = message_text(latest)
        .ok_or_else(|| format!("Message {} has no text content", latest.id))?;
    Ok(answer.to_string())
}
