use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::services::Services;

pub struct Dependencies {
    pub db: SqlitePool,
    pub jwt_secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<Dependencies>,
    pub services: Services,
}

/// Keys owned by the store; never accepted as free-form document fields.
pub const RESERVED_FIELDS: [&str; 7] = [
    "id",
    "path",
    "title",
    "category",
    "content",
    "createdAt",
    "updatedAt",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub path: String,
    pub title: String,
    pub category: Option<String>,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Partial document body. `category: null` clears the category; a `null`
/// extra field removes that key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub path: String,
    pub title: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub document_id: String,
    pub notes: Option<String>,
    pub position: i64,
    pub created_at: String,
    pub updated_at: String,
    pub document: DocumentSummary,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddBookmarkRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBookmarksRequest {
    pub bookmark_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBookmarkResponse {
    pub removed: bool,
    pub document_id: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_distinguishes_null_category_from_absent() {
        let cleared: DocumentPatch = serde_json::from_value(json!({ "category": null })).unwrap();
        assert_eq!(cleared.category, Some(None));

        let untouched: DocumentPatch = serde_json::from_value(json!({ "title": "x" })).unwrap();
        assert_eq!(untouched.category, None);
        assert_eq!(untouched.title.as_deref(), Some("x"));
    }

    #[test]
    fn unknown_keys_land_in_extra_fields() {
        let doc: NewDocument = serde_json::from_value(json!({
            "path": "/guides/intro",
            "title": "Intro",
            "tags": ["a", "b"],
            "order": 3
        }))
        .unwrap();
        assert_eq!(doc.content, "");
        assert_eq!(doc.fields.get("order"), Some(&json!(3)));
        assert!(!doc.fields.contains_key("title"));
    }

    #[test]
    fn document_serializes_extra_fields_inline() {
        let mut fields = Map::new();
        fields.insert("tags".into(), json!(["rust"]));
        let doc = Document {
            id: "1".into(),
            path: "/a".into(),
            title: "A".into(),
            category: None,
            content: "body".into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
            fields,
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["tags"], json!(["rust"]));
        assert_eq!(value["createdAt"], json!("2024-01-01T00:00:00Z"));
    }
}
