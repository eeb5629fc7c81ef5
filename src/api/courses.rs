//! Course API endpoints.

use axum::extract::{Path, Query, State};

use super::{success, ApiJson, ApiResult};
use crate::errors::AppError;
use crate::models::{
    parse_id, Course, CourseFields, CourseListQuery, DeleteOutcome, InsertOutcome, UpdateOutcome,
};
use crate::AppState;

/// GET /courses - List the newest courses, optionally filtered by owner email.
pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> ApiResult<Vec<Course>> {
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    success(state.repo.list_courses(email).await?)
}

/// GET /courses/:id - Get a single course.
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Course> {
    let id = parse_id(&id)?;

    match state.repo.get_course(id).await? {
        Some(course) => success(course),
        None => Err(AppError::NotFound("Course not found".to_string())),
    }
}

/// POST /courses - Create a new course.
pub async fn create_course(
    State(state): State<AppState>,
    ApiJson(fields): ApiJson<CourseFields>,
) -> ApiResult<InsertOutcome> {
    let course = state.repo.create_course(&fields).await?;
    tracing::info!("Course {} created", course.id);
    success(InsertOutcome::new(course.id))
}

/// PUT /courses/:id - Merge the supplied fields into a course.
pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(fields): ApiJson<CourseFields>,
) -> ApiResult<UpdateOutcome> {
    let id = parse_id(&id)?;
    success(state.repo.update_course(id, &fields).await?)
}

/// DELETE /courses/:id - Delete a course.
pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteOutcome> {
    let id = parse_id(&id)?;
    success(state.repo.delete_course(id).await?)
}
