//! Course documents.
//!
//! A course is whatever object the client sent, stored as-is next to the
//! server-assigned `_id` and `createdAt`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::CourseSnapshot;

/// Keys the server assigns; a client cannot set them.
const RESERVED_KEYS: [&str; 2] = ["_id", "createdAt"];

/// A course offered on the platform.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Every client-supplied field, values kept with their JSON types
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub created_at: String,
}

impl Course {
    /// The display fields copied into an enrollment.
    pub fn snapshot(&self) -> CourseSnapshot {
        let field = |key: &str| self.fields.get(key).cloned().unwrap_or(Value::Null);
        CourseSnapshot {
            course_title: field("courseTitle"),
            short_description: field("shortDescription"),
            image_url: field("imageUrl"),
            duration: field("duration"),
            category: field("category"),
            instructor: field("instructor"),
            difficulty_level: field("difficultyLevel"),
        }
    }
}

/// Course fields supplied by a client.
///
/// Used for both creation and partial updates: on update, every key present
/// in the body overwrites the stored value, `null` included.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct CourseFields(pub Map<String, Value>);

impl CourseFields {
    /// The writable fields, without the server-assigned keys.
    pub fn writable(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
    }

    /// The writable fields as a JSON object.
    pub fn to_document(&self) -> Map<String, Value> {
        self.writable()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// True when the body carries no field to write.
    pub fn is_empty(&self) -> bool {
        self.writable().next().is_none()
    }
}

impl From<Value> for CourseFields {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// Query parameters for listing courses.
#[derive(Debug, Deserialize)]
pub struct CourseListQuery {
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reserved_keys_are_not_writable() {
        let fields = CourseFields::from(json!({
            "_id": "x",
            "createdAt": "2020-01-01",
            "price": 10
        }));
        assert_eq!(fields.to_document(), json!({ "price": 10 }).as_object().cloned().unwrap());
        assert!(CourseFields::from(json!({ "_id": "x" })).is_empty());
    }

    #[test]
    fn test_snapshot_keeps_value_types() {
        let course = Course {
            id: Uuid::new_v4(),
            fields: CourseFields::from(json!({ "courseTitle": "Rust", "duration": 6 })).0,
            created_at: String::new(),
        };
        let snapshot = course.snapshot();
        assert_eq!(snapshot.course_title, json!("Rust"));
        assert_eq!(snapshot.duration, json!(6));
        assert_eq!(snapshot.category, Value::Null);
    }
}
