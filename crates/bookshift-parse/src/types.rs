//! Core types for Parse objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Acl, USER_CLASS};

/// A Parse pointer to another object.
///
/// Serialized as `{"__type": "Pointer", "className": .., "objectId": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "__type", rename = "Pointer", rename_all = "camelCase")]
pub struct Pointer {
    pub class_name: String,
    pub object_id: String,
}

impl Pointer {
    /// Pointer to a `_User` object.
    pub fn user(object_id: impl Into<String>) -> Self {
        Self {
            class_name: USER_CLASS.to_string(),
            object_id: object_id.into(),
        }
    }

    /// Whether this pointer references the given user.
    pub fn is_user(&self, object_id: &str) -> bool {
        self.class_name == USER_CLASS && self.object_id == object_id
    }
}

impl From<Pointer> for Value {
    fn from(pointer: Pointer) -> Self {
        serde_json::json!({
            "__type": "Pointer",
            "className": pointer.class_name,
            "objectId": pointer.object_id,
        })
    }
}

/// A record of the `books` class.
///
/// Only the fields a migration touches are typed; everything else is carried
/// through `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<Pointer>,
    /// Left untyped: only textual values are candidates for rewriting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_source: Option<String>,
    #[serde(rename = "ACL", default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<Acl>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Book {
    /// Create a book owned by the given user, with no other fields set.
    pub fn new(object_id: impl Into<String>, uploader_id: &str) -> Self {
        Self {
            object_id: object_id.into(),
            uploader: Some(Pointer::user(uploader_id)),
            base_url: None,
            update_source: None,
            acl: None,
            extra: Map::new(),
        }
    }

    /// The base URL, when it is present and textual.
    pub fn base_url_str(&self) -> Option<&str> {
        self.base_url.as_ref().and_then(Value::as_str)
    }

    /// The body sent when saving this book.
    ///
    /// Only the fields a migration may change are included, so concurrent
    /// edits to other fields are never overwritten.
    pub fn changes(&self) -> BookChanges<'_> {
        BookChanges {
            uploader: self.uploader.as_ref(),
            base_url: self.base_url.as_ref(),
            update_source: self.update_source.as_deref(),
            acl: self.acl.as_ref(),
        }
    }
}

/// Subset of a book written back by a save.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookChanges<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<&'a Pointer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_source: Option<&'a str>,
    #[serde(rename = "ACL", skip_serializing_if = "Option::is_none")]
    pub acl: Option<&'a Acl>,
}

/// A `_User` object, reduced to the attributes used for display tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Response from `GET /classes/{class}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindResponse<T> {
    pub results: Vec<T>,
}

/// Response from `PUT /classes/{class}/{objectId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub updated_at: DateTime<Utc>,
}
