use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    middleware,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use super::{
    MessageBody,
    guard::{CurrentStudent, bearer_student, require_api_student},
    json_body,
};
use crate::{
    Error, Result, catalog,
    error::ErrorBody,
    progress::{
        self, Completion,
        aggregate::{CourseProgress, course_progress},
    },
    server::Server,
};

#[derive(Deserialize, ToSchema)]
pub struct CompleteRequest {
    /// Lesson to mark completed. `lessonId` is accepted as well.
    #[serde(rename = "chapterId", alias = "lessonId")]
    pub lesson_id: i64,
}

#[utoipa::path(
    context_path = "/api/progress",
    path = "/complete",
    method(post),
    request_body = CompleteRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Lesson completed, or already was", body = MessageBody),
        (status = 400, description = "Write failed", body = ErrorBody),
        (status = 401, description = "Missing or invalid authorization", body = ErrorBody)
    )
)]
pub async fn complete(
    State(server): State<Arc<Server>>,
    headers: HeaderMap,
    body: std::result::Result<Json<CompleteRequest>, JsonRejection>,
) -> Result<Json<MessageBody>> {
    let student = bearer_student(&server, &headers).await?;
    let CompleteRequest { lesson_id } = json_body(body)?;
    let completion = progress::complete_lesson(&server.database, student.id, lesson_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Error::BadRequest(format!("Lesson {} does not exist", lesson_id))
            }
            e => Error::BadRequest(e.to_string()),
        })?;
    let message = match completion {
        Completion::Recorded => {
            info!("student {} completed lesson {}", student.id, lesson_id);
            "Lesson completed successfully"
        }
        Completion::AlreadyCompleted => "Lesson already completed",
    };
    Ok(Json(MessageBody::new(message)))
}

#[utoipa::path(
    context_path = "/api/progress",
    path = "",
    method(get),
    responses(
        (status = 200, description = "Per-module and overall progress", body = CourseProgress),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    )
)]
pub async fn overview(
    State(server): State<Arc<Server>>,
    Extension(CurrentStudent(student)): Extension<CurrentStudent>,
) -> Result<Json<CourseProgress>> {
    let modules = catalog::get_module_list(&server.database).await?;
    let lessons = catalog::get_lessons_by_module(&server.database).await?;
    let completed = progress::get_completed_lesson_ids(&server.database, student.id).await?;
    Ok(Json(course_progress(
        &modules,
        &lessons,
        &completed,
        server.unlock_policy,
    )))
}

pub fn get_progress_scope(server: Arc<Server>) -> Router<Arc<Server>> {
    Router::new().nest(
        "/progress",
        Router::new()
            .route("/", get(overview))
            .route_layer(middleware::from_fn_with_state(server, require_api_student))
            .route("/complete", post(complete)),
    )
}
