//! [`ShareExecutor`] backed by the platform share tool (`net share`).

use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use super::{ShareExecutor, ShareOutcome};
use crate::config::Config;

/// Invokes the external share tool and captures its output.
///
/// The tool is expected to require elevated privileges; a refused elevation
/// shows up as a spawn error or non-zero exit and is reported through the
/// same failure outcome either way.
#[derive(Debug, Clone)]
pub struct NetShareExecutor {
    tool: String,
    timeout: Duration,
}

impl NetShareExecutor {
    pub fn new(tool: impl Into<String>, timeout: Duration) -> Self {
        Self { tool: tool.into(), timeout }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.share_tool, Duration::from_secs(cfg.share_timeout_secs))
    }

    async fn run(&self, args: &[String], share_name: &str) -> ShareOutcome {
        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&self.tool).args(args).kill_on_drop(true).output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&stderr);
                }
                let exit_code = output.status.code();
                if output.status.success() {
                    info!(tool = %self.tool, share_name = %share_name, "share command succeeded");
                    ShareOutcome::succeeded(share_name, text, exit_code)
                } else {
                    warn!(tool = %self.tool, share_name = %share_name, ?exit_code, "share command failed");
                    ShareOutcome::failed(share_name, text, exit_code)
                }
            }
            Ok(Err(e)) => {
                warn!(tool = %self.tool, share_name = %share_name, error = %e, "share command failed to launch");
                ShareOutcome::failed(
                    share_name,
                    format!("failed to launch '{}': {e}", self.tool),
                    None,
                )
            }
            // Inconclusive: the child may still be mid-operation when killed,
            // so the caller must not mutate persisted state.
            Err(_) => {
                warn!(tool = %self.tool, share_name = %share_name, timeout = ?self.timeout, "share command timed out");
                ShareOutcome::failed(
                    share_name,
                    format!("'{}' timed out after {:?}", self.tool, self.timeout),
                    None,
                )
            }
        }
    }
}

impl ShareExecutor for NetShareExecutor {
    async fn create_share(&self, path: &str, share_name: &str) -> ShareOutcome {
        let args = vec!["share".to_owned(), format!("{share_name}={path}")];
        self.run(&args, share_name).await
    }

    async fn remove_share(&self, share_name: &str) -> ShareOutcome {
        let args = vec![
            "share".to_owned(),
            share_name.to_owned(),
            "/delete".to_owned(),
            "/y".to_owned(),
        ];
        self.run(&args, share_name).await
    }
}
