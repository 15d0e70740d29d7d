//! Shared agent invocation contract and bounded-retry helper
//! (`SPEC_FULL.md` §4.4: "the orchestrator retries a failed agent call a
//! small bounded number of times before surfacing the error").

use crate::error::{AgentError, Result};

/// Default number of retries the orchestrator allows an agent on a
/// retryable failure (schema drift, model flakiness, a transient CT
/// resolution failure) before giving up and surfacing the error.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// One model- or rule-driven step of the pipeline. `invoke` does the
/// whole unit of work — prompt construction, model call (if any),
/// schema parsing, and domain validation — so a retry is simply calling
/// it again.
pub trait Agent {
    type Output;

    fn name(&self) -> &'static str;

    fn invoke(&self) -> Result<Self::Output>;
}

/// Runs `agent.invoke()`, retrying up to `max_retries` additional times
/// if the failure is [`AgentError::is_retryable`]. Every attempt is
/// logged so a run's `tracing` output shows exactly how many tries an
/// agent took, mirroring the `info_span!`/duration-logging convention
/// used for pipeline stages.
pub fn run_with_retries<A: Agent>(agent: &A, max_retries: u32) -> Result<A::Output> {
    let mut attempt: u32 = 0;
    loop {
        let started = std::time::Instant::now();
        match agent.invoke() {
            Ok(output) => {
                tracing::info!(
                    agent = agent.name(),
                    attempt,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "agent call succeeded"
                );
                return Ok(output);
            }
            Err(err) if err.is_retryable() && attempt < max_retries => {
                tracing::warn!(
                    agent = agent.name(),
                    attempt,
                    error = %err,
                    "agent call failed, retrying"
                );
                attempt += 1;
            }
            Err(err) => {
                tracing::error!(agent = agent.name(), attempt, error = %err, "agent call failed, giving up");
                return Err(err);
            }
        }
    }
}
