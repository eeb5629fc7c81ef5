//! Enrollment documents and the popular-course aggregate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Course display fields copied into an enrollment, with their JSON types.
///
/// Missing course fields are `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSnapshot {
    #[serde(default)]
    pub course_title: Value,
    #[serde(default)]
    pub short_description: Value,
    #[serde(default)]
    pub image_url: Value,
    #[serde(default)]
    pub duration: Value,
    #[serde(default)]
    pub category: Value,
    #[serde(default)]
    pub instructor: Value,
    #[serde(default)]
    pub difficulty_level: Value,
}

/// A user's enrollment in a course, with the course fields copied at
/// enrollment time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_email: String,
    pub course_id: Uuid,
    #[serde(flatten)]
    pub snapshot: CourseSnapshot,
    pub enrolled_at: String,
}

/// Request body for enrolling in a course.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub course_id: Option<String>,
}

/// Response body for a successful enrollment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollResponse {
    pub message: String,
    pub enrolled_id: Uuid,
}

/// Query parameters carrying the acting user's email.
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: Option<String>,
}

/// A course ranked by how many enrollments reference it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularCourse {
    /// The course identifier the enrollments were grouped by
    #[serde(rename = "_id")]
    pub course_id: Uuid,
    pub enrollments: i64,
    #[serde(flatten)]
    pub snapshot: CourseSnapshot,
}
