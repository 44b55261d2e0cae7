use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    middleware,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{error, info};
use utoipa::ToSchema;

use super::{
    MessageBody,
    json_body,
    guard::{CurrentStudent, STUDENT_ID_KEY, require_api_student},
};
use crate::{
    Error, Result,
    error::ErrorBody,
    server::Server,
    student::{self, AccessToken, StudentInfo},
};

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub user: StudentInfo,
    pub session: AccessToken,
}

/// Any failed sign-in answers 400. Store and hash failures are logged first.
fn login_failure(e: Error) -> Error {
    match e {
        Error::InvalidCredentials => e,
        e => {
            error!("login failed: {}", e);
            Error::BadRequest("Login failed".to_string())
        }
    }
}

#[utoipa::path(
    context_path = "/api/auth",
    path = "/login",
    method(post),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid credentials or failed sign-in", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(server): State<Arc<Server>>,
    session: Session,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let LoginRequest { email, password } = json_body(body)?;
    let user = student::login(&server.database, &email, &password)
        .await
        .map_err(login_failure)?;
    let token = server.tokens.issue(user.id)?;
    session.cycle_id().await?;
    session.insert(STUDENT_ID_KEY, user.id).await?;
    info!("student {} logged in", user.id);
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user,
        session: token,
    }))
}

#[utoipa::path(
    context_path = "/api/auth",
    path = "/logout",
    method(post),
    responses(
        (status = 200, description = "Logout successful", body = MessageBody),
        (status = 500, description = "Session store failure", body = ErrorBody)
    )
)]
pub async fn logout(session: Session) -> Result<Json<MessageBody>> {
    session.flush().await?;
    Ok(Json(MessageBody::new("Logout successful")))
}

#[utoipa::path(
    context_path = "/api/auth",
    path = "/user",
    method(get),
    responses(
        (status = 200, description = "Signed-in user", body = StudentInfo),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    )
)]
pub async fn user(Extension(CurrentStudent(student)): Extension<CurrentStudent>) -> Json<StudentInfo> {
    Json(student)
}

pub fn get_auth_scope(server: Arc<Server>) -> Router<Arc<Server>> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/user", get(user))
            .route_layer(middleware::from_fn_with_state(server, require_api_student))
            .route("/login", post(login))
            .route("/logout", post(logout)),
    )
}
