use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};

mod common;

use common::{EMAIL, PASSWORD, TestApp, json, location, session_cookie};

#[tokio::test]
async fn login_returns_user_and_token() {
    let app = TestApp::new().await;
    let body = format!(r#"{{"email":"{EMAIL}","password":"{PASSWORD}"}}"#);
    let response = app.post_json("/api/auth/login", None, &body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_some());

    let body = json(response).await;
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["email"], EMAIL);
    assert_eq!(body["session"]["token_type"], "bearer");

    let token = body["session"]["access_token"].as_str().unwrap();
    let response = app
        .get("/api/auth/user", Some(&format!("Bearer {token}")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["id"], app.student_id);
}

#[tokio::test]
async fn bad_login_is_400_with_error() {
    let app = TestApp::new().await;
    let body = format!(r#"{{"email":"{EMAIL}","password":"nope"}}"#);
    let response = app.post_json("/api/auth/login", None, &body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "Invalid login credentials");

    let response = app.post_json("/api/auth/login", None, "{not json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json(response).await["error"].is_string());
}

#[tokio::test]
async fn complete_requires_bearer_token() {
    let app = TestApp::new().await;
    let module = app.module("Basics", 1).await;
    let lesson = app.lesson(module, "Hello", 1).await;
    let body = format!(r#"{{"chapterId":{lesson}}}"#);

    let response = app.post_json("/api/progress/complete", None, &body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["error"], "No authorization header");

    let response = app
        .post_json("/api/progress/complete", Some("Bearer forged"), &body)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["error"], "Invalid token");

    let response = app
        .post_json("/api/progress/complete", Some("Basic YWRhOnB3"), &body)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn complete_is_idempotent() {
    let app = TestApp::new().await;
    let module = app.module("Basics", 1).await;
    let lesson = app.lesson(module, "Hello", 1).await;
    let bearer = app.bearer();

    let response = app
        .post_json(
            "/api/progress/complete",
            Some(&bearer),
            &format!(r#"{{"chapterId":{lesson}}}"#),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["message"], "Lesson completed successfully");

    let response = app
        .post_json(
            "/api/progress/complete",
            Some(&bearer),
            &format!(r#"{{"lessonId":{lesson}}}"#),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["message"], "Lesson already completed");

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM progress")
        .fetch_one(&app.database)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn complete_unknown_lesson_is_400() {
    let app = TestApp::new().await;
    let response = app
        .post_json(
            "/api/progress/complete",
            Some(&app.bearer()),
            r#"{"chapterId":12345}"#,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "Lesson 12345 does not exist");

    let response = app
        .post_json("/api/progress/complete", Some(&app.bearer()), r#"{}"#)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pages_redirect_anonymous_to_login() {
    let app = TestApp::new().await;
    for uri in ["/modules", "/modules/1", "/lessons/1", "/resources", "/dashboard"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/login", "{uri}");
    }

    let response = app.get("/api/progress", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["error"], "No authorization header");
}

#[tokio::test]
async fn modules_page_reports_progress_and_unlocks() {
    let app = TestApp::new().await;
    let a = app.module("A", 1).await;
    let b = app.module("B", 2).await;
    let c = app.module("C", 3).await;
    let a1 = app.lesson(a, "a1", 1).await;
    app.lesson(a, "a2", 2).await;
    app.lesson(c, "c1", 1).await;
    let bearer = app.bearer();

    app.post_json(
        "/api/progress/complete",
        Some(&bearer),
        &format!(r#"{{"chapterId":{a1}}}"#),
    )
    .await;

    let response = app.get("/modules", Some(&bearer)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json(response).await;
    let modules = page["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 3);

    assert_eq!(modules[0]["module"]["id"], a);
    assert_eq!(modules[0]["progress"]["progress_percentage"], 50.0);
    assert_eq!(modules[0]["unlocked"], true);

    assert_eq!(modules[1]["module"]["id"], b);
    assert_eq!(modules[1]["progress"]["progress_percentage"], 0.0);
    assert_eq!(modules[1]["unlocked"], true);

    // B has no lessons, so C stays locked
    assert_eq!(modules[2]["unlocked"], false);

    assert_eq!(page["overall"]["total_lessons"], 3);
    assert_eq!(page["overall"]["completed_lessons"], 1);
    assert_eq!(page["user"]["email"], EMAIL);

    let response = app.get("/api/progress", Some(&bearer)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["overall"]["completed_lessons"], 1);
}

#[tokio::test]
async fn module_and_lesson_pages() {
    let app = TestApp::new().await;
    let a = app.module("A", 1).await;
    let b = app.module("B", 2).await;
    let a1 = app.lesson(a, "a1", 1).await;
    let a2 = app.lesson(a, "a2", 2).await;
    let b1 = app.lesson(b, "b1", 1).await;
    let bearer = app.bearer();

    let page = json(app.get(&format!("/modules/{a}"), Some(&bearer)).await).await;
    assert_eq!(page["unlocked"], true);
    assert_eq!(page["lessons"][0]["unlocked"], true);
    assert_eq!(page["lessons"][1]["unlocked"], false);

    let page = json(app.get(&format!("/modules/{b}"), Some(&bearer)).await).await;
    assert_eq!(page["unlocked"], false);

    let page = json(app.get(&format!("/lessons/{a2}"), Some(&bearer)).await).await;
    assert_eq!(page["completed"], false);
    assert_eq!(page["unlocked"], false);
    assert_eq!(page["module"]["id"], a);

    app.post_json(
        "/api/progress/complete",
        Some(&bearer),
        &format!(r#"{{"chapterId":{a1}}}"#),
    )
    .await;

    let page = json(app.get(&format!("/lessons/{a2}"), Some(&bearer)).await).await;
    assert_eq!(page["unlocked"], true);
    let page = json(app.get(&format!("/lessons/{a1}"), Some(&bearer)).await).await;
    assert_eq!(page["completed"], true);
    let page = json(app.get(&format!("/modules/{b}"), Some(&bearer)).await).await;
    assert_eq!(page["unlocked"], true);
    assert_eq!(page["lessons"][0]["lesson"]["id"], b1);
}

#[tokio::test]
async fn missing_entities_redirect_to_modules() {
    let app = TestApp::new().await;
    let bearer = app.bearer();
    for uri in ["/modules/999", "/lessons/999", "/lessons/abc"] {
        let response = app.get(uri, Some(&bearer)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/modules", "{uri}");
    }
}

#[tokio::test]
async fn cookie_session_opens_pages_until_logout() {
    let app = TestApp::new().await;
    let body = format!(r#"{{"email":"{EMAIL}","password":"{PASSWORD}"}}"#);
    let response = app.post_json("/api/auth/login", None, &body).await;
    let cookie = session_cookie(&response).unwrap();

    let request = Request::builder()
        .uri("/resources")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json(response).await["resources"].as_array().unwrap().is_empty());

    let request = Request::builder()
        .uri("/login")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/modules");

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::OK);

    let request = Request::builder()
        .uri("/resources")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn login_page_and_fallbacks() {
    let app = TestApp::new().await;
    let response = app.get("/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/login", Some(&app.bearer())).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/modules");

    let response = app.get("/dashboard", Some(&app.bearer())).await;
    assert_eq!(location(&response), "/modules");

    let response = app.get("/nonexistent/path", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(response).await["error"], "Not found");
}

#[tokio::test]
async fn deleted_student_token_is_rejected() {
    let app = TestApp::new().await;
    let bearer = app.bearer();
    course_server::student::delete_student(&app.database, app.student_id)
        .await
        .unwrap();
    let response = app.get("/api/auth/user", Some(&bearer)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["error"], "Invalid token");
}

#[tokio::test]
async fn failed_page_reads_serve_empty_collections() {
    let app = TestApp::new().await;
    let a = app.module("A", 1).await;
    app.lesson(a, "a1", 1).await;
    let bearer = app.bearer();

    sqlx::query("DROP TABLE resource")
        .execute(&app.database)
        .await
        .unwrap();
    let response = app.get("/resources", Some(&bearer)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json(response).await["resources"].as_array().unwrap().is_empty());

    sqlx::query("DROP TABLE lesson")
        .execute(&app.database)
        .await
        .unwrap();
    let response = app.get("/modules", Some(&bearer)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = json(response).await;
    assert_eq!(page["modules"][0]["module"]["id"], a);
    assert_eq!(page["modules"][0]["progress"]["total_lessons"], 0);
    assert_eq!(page["overall"]["total_lessons"], 0);
    assert_eq!(page["overall"]["progress_percentage"], 0.0);

    let response = app.get(&format!("/modules/{a}"), Some(&bearer)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json(response).await["lessons"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn module_page_lessons_agree_with_its_progress() {
    let app = TestApp::new().await;
    let a = app.module("A", 1).await;
    let a1 = app.lesson(a, "a1", 1).await;
    app.lesson(a, "a2", 2).await;
    app.lesson(a, "a3", 3).await;
    let bearer = app.bearer();
    app.post_json(
        "/api/progress/complete",
        Some(&bearer),
        &format!(r#"{{"chapterId":{a1}}}"#),
    )
    .await;

    let page = json(app.get(&format!("/modules/{a}"), Some(&bearer)).await).await;
    let lessons = page["lessons"].as_array().unwrap();
    let done = lessons.iter().filter(|l| l["completed"] == true).count();
    assert_eq!(lessons.len(), 3);
    assert_eq!(page["progress"]["total_lessons"], 3);
    assert_eq!(page["progress"]["completed_lessons"], done);
    assert_eq!(lessons[0]["lesson"]["id"], a1);
    assert_eq!(lessons[1]["unlocked"], true);
    assert_eq!(lessons[2]["unlocked"], false);
}

#[tokio::test]
async fn logout_reports_session_store_failure() {
    let app = TestApp::new().await;
    let body = format!(r#"{{"email":"{EMAIL}","password":"{PASSWORD}"}}"#);
    let response = app.post_json("/api/auth/login", None, &body).await;
    let cookie = session_cookie(&response).unwrap();

    sqlx::query("DROP TABLE tower_sessions")
        .execute(&app.database)
        .await
        .unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn login_store_failure_is_400() {
    let app = TestApp::new().await;
    sqlx::query("DROP TABLE student")
        .execute(&app.database)
        .await
        .unwrap();
    let body = format!(r#"{{"email":"{EMAIL}","password":"{PASSWORD}"}}"#);
    let response = app.post_json("/api/auth/login", None, &body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "Login failed");
}
