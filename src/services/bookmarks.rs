use std::collections::HashSet;

use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use super::documents::now_rfc3339;
use crate::services::{ServiceError, SqliteDocsService};
use crate::types::{Bookmark, DocumentSummary};

#[derive(FromRow)]
struct BookmarkRow {
    id: String,
    user_id: String,
    document_id: String,
    notes: Option<String>,
    position: i64,
    created_at: String,
    updated_at: String,
    document_path: String,
    document_title: String,
    document_category: Option<String>,
}

impl From<BookmarkRow> for Bookmark {
    fn from(row: BookmarkRow) -> Self {
        Bookmark {
            document: DocumentSummary {
                id: row.document_id.clone(),
                path: row.document_path,
                title: row.document_title,
                category: row.document_category,
            },
            id: row.id,
            user_id: row.user_id,
            document_id: row.document_id,
            notes: row.notes,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_BOOKMARK: &str = r#"
    SELECT b.id, b.user_id, b.document_id, b.notes, b.position, b.created_at, b.updated_at,
           d.path AS document_path, d.title AS document_title, d.category AS document_category
    FROM bookmarks b
    JOIN documents d ON d.id = b.document_id
"#;

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

impl SqliteDocsService {
    pub(super) async fn list_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>, ServiceError> {
        let rows: Vec<BookmarkRow> = sqlx::query_as(&format!(
            "{} WHERE b.user_id = ?1 ORDER BY b.position, b.created_at",
            SELECT_BOOKMARK
        ))
        .bind(user_id)
        .fetch_all(&self.deps.db)
        .await?;

        info!("bookmarks listed: user={} count={}", user_id, rows.len());
        Ok(rows.into_iter().map(Bookmark::from).collect())
    }

    async fn find_bookmark(
        &self,
        user_id: &str,
        document_id: &str,
    ) -> Result<Option<Bookmark>, ServiceError> {
        let row: Option<BookmarkRow> = sqlx::query_as(&format!(
            "{} WHERE b.user_id = ?1 AND b.document_id = ?2",
            SELECT_BOOKMARK
        ))
        .bind(user_id)
        .bind(document_id)
        .fetch_optional(&self.deps.db)
        .await?;

        Ok(row.map(Bookmark::from))
    }

    /// Adds the document to the end of the user's order, or updates the notes
    /// of an existing bookmark in place. Absent notes leave existing notes alone.
    pub(super) async fn upsert_bookmark(
        &self,
        user_id: &str,
        document_id: &str,
        notes: Option<String>,
    ) -> Result<Bookmark, ServiceError> {
        let notes = clean_notes(notes);

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM documents WHERE id = ?1")
            .bind(document_id)
            .fetch_optional(&self.deps.db)
            .await?;
        if exists.is_none() {
            info!("bookmark target missing: user={} document={}", user_id, document_id);
            return Err(ServiceError::document_not_found());
        }

        // One statement, so concurrent adds of the same document collapse into
        // a single row and a position is taken under SQLite's write lock.
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO bookmarks (id, user_id, document_id, notes, position, created_at, updated_at)
            VALUES (
                ?1, ?2, ?3, ?4,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM bookmarks WHERE user_id = ?2),
                ?5, ?5
            )
            ON CONFLICT (user_id, document_id) DO UPDATE SET
                notes = COALESCE(excluded.notes, bookmarks.notes),
                updated_at = CASE
                    WHEN excluded.notes IS NULL THEN bookmarks.updated_at
                    ELSE excluded.updated_at
                END
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(document_id)
        .bind(notes.as_deref())
        .bind(&now)
        .execute(&self.deps.db)
        .await?;
        info!("bookmark upserted: user={} document={}", user_id, document_id);

        self.find_bookmark(user_id, document_id)
            .await?
            .ok_or_else(ServiceError::bookmark_not_found)
    }

    pub(super) async fn delete_bookmark(
        &self,
        user_id: &str,
        document_id: &str,
    ) -> Result<(), ServiceError> {
        let mut tx = self.deps.db.begin().await?;

        let position: Option<i64> = sqlx::query_scalar(
            "SELECT position FROM bookmarks WHERE user_id = ?1 AND document_id = ?2",
        )
        .bind(user_id)
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(position) = position else {
            info!("bookmark delete not found: user={} document={}", user_id, document_id);
            return Err(ServiceError::bookmark_not_found());
        };

        sqlx::query("DELETE FROM bookmarks WHERE user_id = ?1 AND document_id = ?2")
            .bind(user_id)
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE bookmarks SET position = position - 1 WHERE user_id = ?1 AND position > ?2",
        )
        .bind(user_id)
        .bind(position)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("bookmark removed: user={} document={}", user_id, document_id);
        Ok(())
    }

    /// Rewrites positions to match `bookmark_ids`, which must name every one
    /// of the user's bookmarks exactly once.
    pub(super) async fn reorder_bookmarks(
        &self,
        user_id: &str,
        bookmark_ids: &[String],
    ) -> Result<Vec<Bookmark>, ServiceError> {
        let mut tx = self.deps.db.begin().await?;

        let current: Vec<String> = sqlx::query_scalar("SELECT id FROM bookmarks WHERE user_id = ?1")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

        let current: HashSet<&str> = current.iter().map(String::as_str).collect();
        let requested: HashSet<&str> = bookmark_ids.iter().map(String::as_str).collect();
        if requested.len() != bookmark_ids.len() {
            return Err(ServiceError::InvalidInput(
                "bookmarkIds contains duplicates".into(),
            ));
        }
        if requested != current {
            return Err(ServiceError::InvalidInput(
                "bookmarkIds must list each of the user's bookmarks exactly once".into(),
            ));
        }

        let now = now_rfc3339();
        for (position, id) in bookmark_ids.iter().enumerate() {
            sqlx::query(
                "UPDATE bookmarks SET position = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
            )
            .bind(position as i64)
            .bind(&now)
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("bookmarks reordered: user={} count={}", user_id, bookmark_ids.len());
        self.list_bookmarks(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::services::DocsService;
    use crate::types::{Dependencies, NewDocument};
    use serde_json::json;
    use std::sync::Arc;

    async fn service_with_docs(paths: &[&str]) -> (SqliteDocsService, Vec<String>) {
        let db = db::connect_in_memory().await.unwrap();
        let svc = SqliteDocsService::new(Arc::new(Dependencies {
            db,
            jwt_secret: "unused".into(),
        }));
        let mut ids = Vec::new();
        for path in paths {
            let doc: NewDocument =
                serde_json::from_value(json!({ "path": path, "title": path })).unwrap();
            ids.push(svc.create_doc(doc).await.unwrap().id);
        }
        (svc, ids)
    }

    fn order(bookmarks: &[Bookmark]) -> Vec<(String, i64)> {
        bookmarks
            .iter()
            .map(|b| (b.document_id.clone(), b.position))
            .collect()
    }

    #[tokio::test]
    async fn bookmarks_append_in_order() {
        let (svc, ids) = service_with_docs(&["/a", "/b"]).await;
        let first = svc.add_bookmark("u1", &ids[0], None).await.unwrap();
        let second = svc
            .add_bookmark("u1", &ids[1], Some("read later".into()))
            .await
            .unwrap();

        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);
        assert_eq!(second.notes.as_deref(), Some("read later"));
        assert_eq!(second.document.path, "/b");

        let listed = svc.get_bookmarks("u1").await.unwrap();
        assert_eq!(order(&listed), vec![(ids[0].clone(), 0), (ids[1].clone(), 1)]);
    }

    #[tokio::test]
    async fn adding_twice_updates_notes_in_place() {
        let (svc, ids) = service_with_docs(&["/a"]).await;
        let first = svc.add_bookmark("u1", &ids[0], Some("one".into())).await.unwrap();
        let again = svc.add_bookmark("u1", &ids[0], Some("two".into())).await.unwrap();
        let untouched = svc.add_bookmark("u1", &ids[0], None).await.unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(again.notes.as_deref(), Some("two"));
        assert_eq!(untouched.notes.as_deref(), Some("two"));
        assert_eq!(svc.get_bookmarks("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bookmarking_missing_document_is_not_found() {
        let (svc, _) = service_with_docs(&[]).await;
        let err = svc.add_bookmark("u1", "nope", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn bookmarks_are_scoped_per_user() {
        let (svc, ids) = service_with_docs(&["/a"]).await;
        svc.add_bookmark("u1", &ids[0], None).await.unwrap();

        assert!(svc.get_bookmarks("u2").await.unwrap().is_empty());
        let err = svc.remove_bookmark("u2", &ids[0]).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(svc.get_bookmarks("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn removing_compacts_positions() {
        let (svc, ids) = service_with_docs(&["/a", "/b", "/c"]).await;
        for id in &ids {
            svc.add_bookmark("u1", id, None).await.unwrap();
        }

        svc.remove_bookmark("u1", &ids[1]).await.unwrap();

        let listed = svc.get_bookmarks("u1").await.unwrap();
        assert_eq!(order(&listed), vec![(ids[0].clone(), 0), (ids[2].clone(), 1)]);

        let added = svc.add_bookmark("u1", &ids[1], None).await.unwrap();
        assert_eq!(added.position, 2);
    }

    #[tokio::test]
    async fn reorder_replaces_whole_order() {
        let (svc, ids) = service_with_docs(&["/a", "/b", "/c"]).await;
        let mut bookmark_ids = Vec::new();
        for id in &ids {
            bookmark_ids.push(svc.add_bookmark("u1", id, None).await.unwrap().id);
        }

        bookmark_ids.reverse();
        let reordered = svc.update_bookmark_order("u1", &bookmark_ids).await.unwrap();

        let listed_ids: Vec<String> = reordered.iter().map(|b| b.id.clone()).collect();
        assert_eq!(listed_ids, bookmark_ids);
        assert_eq!(
            reordered.iter().map(|b| b.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[tokio::test]
    async fn reorder_rejects_partial_or_foreign_lists() {
        let (svc, ids) = service_with_docs(&["/a", "/b"]).await;
        let a = svc.add_bookmark("u1", &ids[0], None).await.unwrap().id;
        let b = svc.add_bookmark("u1", &ids[1], None).await.unwrap().id;
        let other = svc.add_bookmark("u2", &ids[0], None).await.unwrap().id;

        for ids in [
            vec![a.clone()],
            vec![a.clone(), b.clone(), other.clone()],
            vec![a.clone(), a.clone()],
            vec![a.clone(), other.clone()],
        ] {
            let err = svc.update_bookmark_order("u1", &ids).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }

        let listed = svc.get_bookmarks("u1").await.unwrap();
        assert_eq!(listed.iter().map(|b| b.id.clone()).collect::<Vec<_>>(), vec![a, b]);
    }

    #[tokio::test]
    async fn reorder_of_empty_set_succeeds() {
        let (svc, _) = service_with_docs(&[]).await;
        assert!(svc.update_bookmark_order("u1", &[]).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_of_one_document_share_a_bookmark() {
        let dir = tempfile::tempdir().unwrap();
        let db = db::connect(&dir.path().join("docs.db")).await.unwrap();
        let svc = SqliteDocsService::new(Arc::new(Dependencies {
            db,
            jwt_secret: "unused".into(),
        }));
        let doc: NewDocument =
            serde_json::from_value(json!({ "path": "/a", "title": "A" })).unwrap();
        let document_id = svc.create_doc(doc).await.unwrap().id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                let document_id = document_id.clone();
                tokio::spawn(async move { svc.add_bookmark("u1", &document_id, None).await })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            let bookmark = handle.await.unwrap().unwrap();
            assert_eq!(bookmark.position, 0);
            ids.insert(bookmark.id);
        }

        assert_eq!(ids.len(), 1);
        assert_eq!(svc.get_bookmarks("u1").await.unwrap().len(), 1);
    }
}
