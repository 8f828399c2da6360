use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::SharedDirectory;
use crate::engine::{BulkFailure, BulkReport, Transition};

#[derive(Deserialize, ToSchema)]
pub struct OpenShareRequest {
    /// Browse path of a cataloged directory.
    pub path: String,
    #[serde(rename = "shareName")]
    pub share_name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CloseShareRequest {
    #[serde(rename = "shareName")]
    pub share_name: String,
}

/// `{message, output}` body for a successful open/close.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShareActionResponse {
    pub message: String,
    /// Captured share-tool output.
    pub output: String,
}

impl ShareActionResponse {
    pub fn from_transition(message: impl Into<String>, t: Transition) -> Self {
        Self { message: message.into(), output: t.output }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SharedDirectoryResponse {
    pub id: i64,
    pub name: String,
    pub browse: String,
    #[serde(rename = "shareName")]
    pub share_name: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl SharedDirectory {
    pub fn to_response(&self) -> SharedDirectoryResponse {
        SharedDirectoryResponse {
            id: self.directory_id,
            name: self.name.clone(),
            browse: self.browse.clone(),
            share_name: self.share_name.clone(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BulkFailureResponse {
    #[serde(rename = "directoryId")]
    pub directory_id: i64,
    pub name: String,
    pub error: String,
}

/// Aggregate report for open-all / close-all. Always returned with HTTP 200;
/// partial failure is report data, not a transport error.
#[derive(Serialize, ToSchema)]
pub struct BulkReportResponse {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<BulkFailureResponse>,
}

impl BulkReport {
    pub fn to_response(&self) -> BulkReportResponse {
        BulkReportResponse {
            succeeded: self.succeeded,
            failed: self.failed,
            failures: self
                .failures
                .iter()
                .map(|f: &BulkFailure| BulkFailureResponse {
                    directory_id: f.directory_id,
                    name: f.name.clone(),
                    error: f.error.clone(),
                })
                .collect(),
        }
    }
}
