//! REST API module.
//!
//! Handlers return documents as plain JSON; failures go through `AppError`.

mod courses;
mod discussions;
mod enrollments;

pub use courses::*;
pub use discussions::*;
pub use enrollments::*;

use axum::{extract::FromRequest, Json};

use crate::errors::AppError;

/// JSON body extractor whose rejections answer with the `AppError` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Response type for handlers answering with a JSON document.
pub type ApiResult<T> = Result<Json<T>, AppError>;

/// Wrap a value in a successful JSON response.
pub fn success<T>(data: T) -> ApiResult<T> {
    Ok(Json(data))
}
