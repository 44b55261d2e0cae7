//! Route guard.
//!
//! Protected routes sit behind one of the two middlewares below; handlers get the
//! signed-in student as an explicit [`CurrentStudent`] extension instead of
//! reading it from ambient state.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tower_sessions::Session;
use tracing::warn;

use crate::{
    Error, Result,
    server::Server,
    student::{self, StudentInfo},
};

pub const STUDENT_ID_KEY: &str = "student_id";
pub const LOGIN_PATH: &str = "/login";

/// The student a request was authenticated as.
#[derive(Debug, Clone)]
pub struct CurrentStudent(pub StudentInfo);

/// Student named by a `Bearer` token. Errors tell a missing header from a bad one.
pub async fn bearer_student(server: &Server, headers: &HeaderMap) -> Result<StudentInfo> {
    if !headers.contains_key(AUTHORIZATION) {
        return Err(Error::MissingAuthorization);
    }
    let Some(bearer) = headers.typed_get::<Authorization<Bearer>>() else {
        return Err(Error::InvalidToken);
    };
    let student_id = server.tokens.verify(bearer.token())?;
    student::get_student_info(&server.database, student_id)
        .await?
        .ok_or(Error::InvalidToken)
}

/// Bearer token first, then the cookie session.
pub async fn resolve_student(
    server: &Server,
    headers: &HeaderMap,
    session: &Session,
) -> Option<StudentInfo> {
    if headers.contains_key(AUTHORIZATION) {
        return match bearer_student(server, headers).await {
            Ok(student) => Some(student),
            Err(e) => {
                warn!("rejected bearer token: {}", e);
                None
            }
        };
    }
    let student_id = match session.get::<i64>(STUDENT_ID_KEY).await {
        Ok(Some(id)) => id,
        Ok(None) => return None,
        Err(e) => {
            warn!("failed to read session: {}", e);
            return None;
        }
    };
    match student::get_student_info(&server.database, student_id).await {
        Ok(student) => student,
        Err(e) => {
            warn!("failed to look up student {}: {}", student_id, e);
            None
        }
    }
}

/// Guard for page routes: anonymous requests are sent to the login page.
pub async fn require_page_student(
    State(server): State<Arc<Server>>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Response {
    match resolve_student(&server, req.headers(), &session).await {
        Some(student) => {
            req.extensions_mut().insert(CurrentStudent(student));
            next.run(req).await
        }
        None => Redirect::to(LOGIN_PATH).into_response(),
    }
}

/// Guard for JSON routes: anonymous requests get a 401.
pub async fn require_api_student(
    State(server): State<Arc<Server>>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Response {
    match resolve_student(&server, req.headers(), &session).await {
        Some(student) => {
            req.extensions_mut().insert(CurrentStudent(student));
            next.run(req).await
        }
        None if req.headers().contains_key(AUTHORIZATION) => Error::InvalidToken.into_response(),
        None => Error::MissingAuthorization.into_response(),
    }
}
