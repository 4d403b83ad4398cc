mod auth;
mod bookmarks;
mod docs;
mod documents;
mod error;

pub use auth::{AuthService, AuthUser};
pub use docs::{DocsService, SqliteDocsService};
pub use documents::normalize_path;
pub use error::ServiceError;

use std::sync::Arc;

use crate::types::Dependencies;

#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub docs: Arc<dyn DocsService>,
}

impl Services {
    pub fn new(deps: Arc<Dependencies>) -> Self {
        Self {
            auth: AuthService::new(deps.clone()),
            docs: Arc::new(SqliteDocsService::new(deps)),
        }
    }

    /// Swap the document store, keeping the auth gate.
    pub fn with_docs(mut self, docs: Arc<dyn DocsService>) -> Self {
        self.docs = docs;
        self
    }
}
