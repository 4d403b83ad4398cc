use std::sync::Arc;

use async_trait::async_trait;

use crate::services::ServiceError;
use crate::types::{Bookmark, Dependencies, Document, DocumentPatch, NewDocument};

/// Document store consumed by the HTTP layer.
#[async_trait]
pub trait DocsService: Send + Sync {
    async fn get_all_docs(&self) -> Result<Vec<Document>, ServiceError>;

    async fn get_categories(&self) -> Result<Vec<String>, ServiceError>;

    async fn get_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>, ServiceError>;

    async fn add_bookmark(
        &self,
        user_id: &str,
        document_id: &str,
        notes: Option<String>,
    ) -> Result<Bookmark, ServiceError>;

    async fn remove_bookmark(&self, user_id: &str, document_id: &str) -> Result<(), ServiceError>;

    async fn update_bookmark_order(
        &self,
        user_id: &str,
        bookmark_ids: &[String],
    ) -> Result<Vec<Bookmark>, ServiceError>;

    /// `Ok(None)` when no document has this id.
    async fn get_doc_by_id(&self, id: &str) -> Result<Option<Document>, ServiceError>;

    async fn update_doc_by_id(
        &self,
        id: &str,
        patch: DocumentPatch,
    ) -> Result<Document, ServiceError>;

    async fn get_doc(&self, path: &str) -> Result<Document, ServiceError>;

    async fn create_doc(&self, doc: NewDocument) -> Result<Document, ServiceError>;

    async fn update_doc(&self, path: &str, patch: DocumentPatch)
    -> Result<Document, ServiceError>;
}

#[derive(Clone)]
pub struct SqliteDocsService {
    pub(super) deps: Arc<Dependencies>,
}

impl SqliteDocsService {
    pub fn new(deps: Arc<Dependencies>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl DocsService for SqliteDocsService {
    async fn get_all_docs(&self) -> Result<Vec<Document>, ServiceError> {
        self.list_documents().await
    }

    async fn get_categories(&self) -> Result<Vec<String>, ServiceError> {
        self.list_categories().await
    }

    async fn get_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>, ServiceError> {
        self.list_bookmarks(user_id).await
    }

    async fn add_bookmark(
        &self,
        user_id: &str,
        document_id: &str,
        notes: Option<String>,
    ) -> Result<Bookmark, ServiceError> {
        self.upsert_bookmark(user_id, document_id, notes).await
    }

    async fn remove_bookmark(&self, user_id: &str, document_id: &str) -> Result<(), ServiceError> {
        self.delete_bookmark(user_id, document_id).await
    }

    async fn update_bookmark_order(
        &self,
        user_id: &str,
        bookmark_ids: &[String],
    ) -> Result<Vec<Bookmark>, ServiceError> {
        self.reorder_bookmarks(user_id, bookmark_ids).await
    }

    async fn get_doc_by_id(&self, id: &str) -> Result<Option<Document>, ServiceError> {
        self.find_document_by_id(id).await
    }

    async fn update_doc_by_id(
        &self,
        id: &str,
        patch: DocumentPatch,
    ) -> Result<Document, ServiceError> {
        let existing = self
            .find_document_by_id(id)
            .await?
            .ok_or_else(ServiceError::document_not_found)?;
        self.apply_patch(existing, patch).await
    }

    async fn get_doc(&self, path: &str) -> Result<Document, ServiceError> {
        self.find_document_by_path(path)
            .await?
            .ok_or_else(ServiceError::document_not_found)
    }

    async fn create_doc(&self, doc: NewDocument) -> Result<Document, ServiceError> {
        self.insert_document(doc).await
    }

    async fn update_doc(
        &self,
        path: &str,
        patch: DocumentPatch,
    ) -> Result<Document, ServiceError> {
        let existing = self
            .find_document_by_path(path)
            .await?
            .ok_or_else(ServiceError::document_not_found)?;
        self.apply_patch(existing, patch).await
    }
}
