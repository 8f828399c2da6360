//! Share command execution boundary.
//!
//! [`ShareExecutor`] is the only place a privileged OS process is invoked.
//! It is injected into the engine as a capability so core logic and tests
//! never touch a real process; see [`net::NetShareExecutor`] for the real
//! implementation.
//!
//! Contract: executor methods never return `Result` – failure to launch,
//! non-zero exit, and timeout all collapse into a [`ShareOutcome`] with
//! `success = false`, distinguished only by diagnostic text and exit code.
//! Callers branch on the outcome value, never on thrown control flow.

pub mod net;

/// Result of one share create/remove invocation. Not persisted.
#[derive(Debug, Clone)]
pub struct ShareOutcome {
    /// Share name the operation used.
    pub share_name: String,
    pub success: bool,
    /// Captured stdout + stderr, or the launch/timeout diagnostic.
    pub output: String,
    /// Exit code when the process ran to completion; `None` when it never
    /// started or was killed on timeout.
    pub exit_code: Option<i32>,
}

impl ShareOutcome {
    pub fn succeeded(share_name: impl Into<String>, output: String, exit_code: Option<i32>) -> Self {
        Self { share_name: share_name.into(), success: true, output, exit_code }
    }

    pub fn failed(share_name: impl Into<String>, output: String, exit_code: Option<i32>) -> Self {
        Self { share_name: share_name.into(), success: false, output, exit_code }
    }
}

/// Trait for the privileged share create/remove operations.
pub trait ShareExecutor: Send + Sync + 'static {
    /// Expose `path` on the network under `share_name`.
    fn create_share(
        &self,
        path: &str,
        share_name: &str,
    ) -> impl std::future::Future<Output = ShareOutcome> + Send;

    /// Remove the network share named `share_name`.
    fn remove_share(
        &self,
        share_name: &str,
    ) -> impl std::future::Future<Output = ShareOutcome> + Send;
}
