use serde_json::{Map, Value};
use sqlx::FromRow;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;
use uuid::Uuid;

use crate::services::{ServiceError, SqliteDocsService};
use crate::types::{Document, DocumentPatch, NewDocument, RESERVED_FIELDS};

#[derive(FromRow)]
struct DocumentRow {
    id: String,
    path: String,
    title: String,
    category: Option<String>,
    content: String,
    fields: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<DocumentRow> for Document {
    type Error = ServiceError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let fields: Map<String, Value> = serde_json::from_str(&row.fields)?;
        Ok(Document {
            id: row.id,
            path: row.path,
            title: row.title,
            category: row.category,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
            fields,
        })
    }
}

const SELECT_DOCUMENT: &str = r#"
    SELECT id, path, title, category, content, fields, created_at, updated_at
    FROM documents
"#;

/// Canonical form of a document path: a leading `/`, single separators, no
/// trailing slash. Returns `None` when no segments remain.
pub fn normalize_path(raw: &str) -> Option<String> {
    let segments: Vec<&str> = raw
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(format!("/{}", segments.join("/")))
}

pub(super) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

fn strip_reserved(fields: &mut Map<String, Value>) {
    fields.retain(|key, _| !RESERVED_FIELDS.contains(&key.as_str()));
}

fn clean_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn require_title(title: &str) -> Result<String, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::InvalidInput("title must not be empty".into()));
    }
    Ok(title.to_string())
}

fn require_path(raw: &str) -> Result<String, ServiceError> {
    let path = normalize_path(raw)
        .ok_or_else(|| ServiceError::InvalidInput(format!("invalid document path: {:?}", raw)))?;
    if shadowed_by_route(&path) {
        return Err(ServiceError::InvalidInput(format!(
            "document path is reserved by the API: {}",
            path
        )));
    }
    Ok(path)
}

/// Paths whose GET is answered by a fixed route instead of the path lookup.
fn shadowed_by_route(path: &str) -> bool {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    matches!(
        segments.as_slice(),
        ["categories"] | ["bookmarks"] | ["bookmarks", "order"] | ["by-id", _]
    )
}

fn path_conflict(path: &str) -> ServiceError {
    ServiceError::Conflict(format!("Document already exists for path: {}", path))
}

/// A concurrent writer can claim the path between the ownership check and the
/// write; the UNIQUE constraint reports it.
fn map_path_violation(err: sqlx::Error, path: &str) -> ServiceError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => path_conflict(path),
        other => ServiceError::Database(other),
    }
}

impl SqliteDocsService {
    pub(super) async fn list_documents(&self) -> Result<Vec<Document>, ServiceError> {
        let rows: Vec<DocumentRow> = sqlx::query_as(&format!("{} ORDER BY path", SELECT_DOCUMENT))
            .fetch_all(&self.deps.db)
            .await?;

        info!("documents listed: {}", rows.len());
        rows.into_iter().map(Document::try_from).collect()
    }

    pub(super) async fn list_categories(&self) -> Result<Vec<String>, ServiceError> {
        let categories: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT category
            FROM documents
            WHERE category IS NOT NULL AND category <> ''
            ORDER BY category
            "#,
        )
        .fetch_all(&self.deps.db)
        .await?;

        Ok(categories)
    }

    pub(super) async fn find_document_by_id(
        &self,
        id: &str,
    ) -> Result<Option<Document>, ServiceError> {
        let row: Option<DocumentRow> =
            sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_DOCUMENT))
                .bind(id)
                .fetch_optional(&self.deps.db)
                .await?;

        row.map(Document::try_from).transpose()
    }

    pub(super) async fn find_document_by_path(
        &self,
        path: &str,
    ) -> Result<Option<Document>, ServiceError> {
        // Nothing can be stored under a path with no segments.
        let Some(path) = normalize_path(path) else {
            return Ok(None);
        };

        let row: Option<DocumentRow> =
            sqlx::query_as(&format!("{} WHERE path = ?1", SELECT_DOCUMENT))
                .bind(&path)
                .fetch_optional(&self.deps.db)
                .await?;

        row.map(Document::try_from).transpose()
    }

    async fn path_owner(&self, path: &str) -> Result<Option<String>, ServiceError> {
        let owner: Option<String> = sqlx::query_scalar("SELECT id FROM documents WHERE path = ?1")
            .bind(path)
            .fetch_optional(&self.deps.db)
            .await?;
        Ok(owner)
    }

    pub(super) async fn insert_document(&self, doc: NewDocument) -> Result<Document, ServiceError> {
        let path = require_path(&doc.path)?;
        let title = require_title(&doc.title)?;
        let category = clean_category(doc.category);
        let mut fields = doc.fields;
        strip_reserved(&mut fields);

        if self.path_owner(&path).await?.is_some() {
            return Err(path_conflict(&path));
        }

        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO documents (id, path, title, category, content, fields, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&id)
        .bind(&path)
        .bind(&title)
        .bind(category.as_deref())
        .bind(&doc.content)
        .bind(serde_json::to_string(&fields)?)
        .bind(&now)
        .execute(&self.deps.db)
        .await
        .map_err(|err| map_path_violation(err, &path))?;

        info!("document created: id={} path={}", id, path);
        Ok(Document {
            id,
            path,
            title,
            category,
            content: doc.content,
            created_at: now.clone(),
            updated_at: now,
            fields,
        })
    }

    pub(super) async fn apply_patch(
        &self,
        existing: Document,
        patch: DocumentPatch,
    ) -> Result<Document, ServiceError> {
        let mut doc = existing;

        if let Some(raw_path) = patch.path.as_deref() {
            let path = require_path(raw_path)?;
            if path != doc.path {
                if let Some(owner) = self.path_owner(&path).await? {
                    if owner != doc.id {
                        return Err(path_conflict(&path));
                    }
                }
                doc.path = path;
            }
        }
        if let Some(title) = patch.title.as_deref() {
            doc.title = require_title(title)?;
        }
        if let Some(category) = patch.category {
            doc.category = clean_category(category);
        }
        if let Some(content) = patch.content {
            doc.content = content;
        }

        let mut incoming = patch.fields;
        strip_reserved(&mut incoming);
        for (key, value) in incoming {
            if value.is_null() {
                doc.fields.remove(&key);
            } else {
                doc.fields.insert(key, value);
            }
        }

        doc.updated_at = now_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET path = ?1, title = ?2, category = ?3, content = ?4, fields = ?5, updated_at = ?6
            WHERE id = ?7
            "#,
        )
        .bind(&doc.path)
        .bind(&doc.title)
        .bind(doc.category.as_deref())
        .bind(&doc.content)
        .bind(serde_json::to_string(&doc.fields)?)
        .bind(&doc.updated_at)
        .bind(&doc.id)
        .execute(&self.deps.db)
        .await
        .map_err(|err| map_path_violation(err, &doc.path))?;

        if result.rows_affected() == 0 {
            info!("document update missing row after select: id={}", doc.id);
            return Err(ServiceError::document_not_found());
        }

        info!("document updated: id={} path={}", doc.id, doc.path);
        Ok(doc)
    }
}
