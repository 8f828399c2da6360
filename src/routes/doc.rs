use utoipa::OpenApi;

use crate::routes::{directory, health, share};

#[derive(OpenApi)]
#[openapi(info(
    title = "shareward",
    description = "Directory catalog and network-share synchronization API",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(directory::DirectoryApi::openapi());
    root.merge(share::ShareApi::openapi());
    root
}
