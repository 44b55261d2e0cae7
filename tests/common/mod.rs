#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use course_server::{
    api::create_app,
    catalog::{NewLesson, create_lesson, create_module},
    config::Config,
    progress::aggregate::UnlockPolicy,
    server::Server,
    student::{TokenKeys, create_student},
    utils::open_database,
};
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tower::ServiceExt;

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct horse";

pub struct TestApp {
    pub app: Router,
    pub database: SqlitePool,
    pub tokens: TokenKeys,
    pub student_id: i64,
}

impl TestApp {
    pub async fn new() -> Self {
        let database = open_database("sqlite::memory:").await.unwrap();
        let tokens = TokenKeys::new(b"integration-secret", time::Duration::hours(1));
        let server = Server::new(database.clone(), tokens.clone(), UnlockPolicy::AnyProgress);
        let app = create_app(server, &Config::default()).await.unwrap();
        let student_id = create_student(&database, "Ada".into(), EMAIL.into(), PASSWORD.into())
            .await
            .unwrap();
        Self {
            app,
            database,
            tokens,
            student_id,
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.tokens.issue(self.student_id).unwrap().access_token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, auth: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, auth: Option<&str>, body: &str) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn module(&self, title: &str, order: i64) -> i64 {
        create_module(&self.database, title.into(), order).await.unwrap()
    }

    pub async fn lesson(&self, module_id: i64, title: &str, order: i64) -> i64 {
        create_lesson(
            &self.database,
            NewLesson {
                module_id,
                title: title.into(),
                order,
                video_url: None,
                content: Some(format!("# {title}")),
            },
        )
        .await
        .unwrap()
    }
}

pub async fn json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` part of the session cookie set by a response.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}
