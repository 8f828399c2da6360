use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::DirectoryRecord;

#[derive(Deserialize, ToSchema)]
pub struct CreateDirectoryRequest {
    /// Display name; also the seed for derived share names.
    pub name: String,
    /// Absolute filesystem path, unique within the catalog.
    pub browse: String,
}

#[derive(Serialize, ToSchema)]
pub struct DirectoryResponse {
    pub id: i64,
    pub name: String,
    pub browse: String,
    pub created_at: String,
}

impl DirectoryRecord {
    pub fn to_response(&self) -> DirectoryResponse {
        DirectoryResponse {
            id: self.id,
            name: self.name.clone(),
            browse: self.browse.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
