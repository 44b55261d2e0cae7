pub mod auth;
pub mod guard;
pub mod pages;
pub mod progress;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use utoipa::{
    Modify, OpenApi, ToSchema,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{Error, Result, config::Config, error::ErrorBody, server::Server};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Unwrap a JSON body, turning a malformed one into a 400 `{error}`.
pub(crate) fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|e| Error::BadRequest(e.body_text()))
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::logout,
        auth::user,
        progress::complete,
        progress::overview,
        pages::modules,
        pages::module,
        pages::lesson,
        pages::resources,
        pages::login_page,
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not found".to_string(),
        }),
    )
}

/// Every route, without the session and transport layers.
pub fn get_router(server: Arc<Server>) -> Router {
    let api = Router::new()
        .merge(auth::get_auth_scope(server.clone()))
        .merge(progress::get_progress_scope(server.clone()));
    Router::new()
        .nest("/api", api)
        .merge(pages::get_page_scope(server.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .with_state(server)
}

/// The full application: routes, cookie sessions stored next to the course data,
/// request timeout and tracing.
pub async fn create_app(server: Server, config: &Config) -> Result<Router> {
    let store = SqliteStore::new(server.database.clone());
    store.migrate().await?;
    let session_layer = SessionManagerLayer::new(store)
        .with_secure(config.tls.is_some())
        .with_expiry(Expiry::OnInactivity(config.session_ttl()));
    Ok(get_router(Arc::new(server))
        .layer(session_layer)
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http()))
}

pub fn get_openapi_json() -> Result<String> {
    ApiDoc::openapi()
        .to_pretty_json()
        .map_err(|e| Error::Config(format!("failed to serialize OpenAPI document: {}", e)))
}
