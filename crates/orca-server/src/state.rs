use std::sync::Arc;

use orca_content::ContentCache;
use orca_storage::Storage;

/// Shared handles every HTTP handler needs.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub content: Arc<ContentCache>,
}
