//! Enrollment API endpoints.

use axum::extract::{Path, Query, State};

use super::{success, ApiJson, ApiResult};
use crate::db::POPULAR_COURSES_LIMIT;
use crate::errors::AppError;
use crate::models::{
    parse_id, require_field, DeleteOutcome, EmailQuery, EnrollRequest, EnrollResponse,
    Enrollment, PopularCourse,
};
use crate::AppState;

/// GET /enrollments/:courseId?email= - Whether the user is enrolled in the course.
pub async fn check_enrollment(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<bool> {
    let email = require_field(query.email.as_deref(), "email")?;
    let course_id = parse_id(&course_id)?;

    success(state.repo.is_enrolled(email, course_id).await?)
}

/// POST /enroll - Enroll a user in a course.
pub async fn enroll(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EnrollRequest>,
) -> ApiResult<EnrollResponse> {
    let email = require_field(request.user_email.as_deref(), "userEmail")?;
    let course_id = parse_id(require_field(request.course_id.as_deref(), "courseId")?)?;

    let enrollment = state.repo.enroll(email, course_id).await?;

    success(EnrollResponse {
        message: "Enrolled successfully".to_string(),
        enrolled_id: enrollment.id,
    })
}

/// GET /enrollments?email= - List a user's enrollments.
pub async fn list_enrollments(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Vec<Enrollment>> {
    let email = require_field(query.email.as_deref(), "email")?;
    success(state.repo.list_enrollments(email).await?)
}

/// DELETE /enrollments/:id - Remove an enrollment.
pub async fn delete_enrollment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteOutcome> {
    let id = parse_id(&id)?;
    success(state.repo.delete_enrollment(id).await?)
}

/// GET /popular-courses - Courses ranked by enrollment count.
pub async fn popular_courses(State(state): State<AppState>) -> ApiResult<Vec<PopularCourse>> {
    let courses = state.repo.popular_courses(POPULAR_COURSES_LIMIT).await?;
    tracing::debug!("Popular courses: {}", courses.len());

    if courses.is_empty() {
        return Err(AppError::NotFound("No popular courses found".to_string()));
    }

    success(courses)
}
