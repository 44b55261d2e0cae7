//! Page routes. Each returns the data its view renders; rendering itself lives
//! in the front end.
//!
//! Read failures are logged and the page is served as if the collection were
//! empty. A missing module or lesson sends the student back to the module list.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    Extension, Json, Router,
    extract::{Path, State, rejection::PathRejection},
    http::HeaderMap,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::error;
use utoipa::ToSchema;

use super::{
    MessageBody,
    guard::{CurrentStudent, require_page_student, resolve_student},
};
use crate::{
    catalog::{self, Lesson, Module, Resource},
    progress::{
        self,
        aggregate::{
            CourseProgress, LessonStatus, ModuleProgress, ModuleStatus, UserProgress, course_progress,
            lesson_statuses,
        },
    },
    server::Server,
    student::StudentInfo,
};

pub const MODULES_PATH: &str = "/modules";

#[derive(Serialize, ToSchema)]
pub struct ModulesPage {
    pub user: StudentInfo,
    pub modules: Vec<ModuleStatus>,
    pub overall: UserProgress,
}

#[derive(Serialize, ToSchema)]
pub struct ModulePage {
    pub module: Module,
    pub lessons: Vec<LessonStatus>,
    pub progress: ModuleProgress,
    pub unlocked: bool,
}

#[derive(Serialize, ToSchema)]
pub struct LessonPage {
    pub lesson: Lesson,
    pub module: Module,
    pub completed: bool,
    pub unlocked: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ResourcesPage {
    pub resources: Vec<Resource>,
}

fn or_empty<T: Default>(result: sqlx::Result<T>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        error!("failed to fetch {}: {}", what, e);
        T::default()
    })
}

async fn completed_ids(server: &Server, student_id: i64) -> HashSet<i64> {
    or_empty(
        progress::get_completed_lesson_ids(&server.database, student_id).await,
        "progress",
    )
}

/// One read of the catalog and the student's completions, with the progress
/// computed from it.
struct CourseSnapshot {
    lessons: HashMap<i64, Vec<Lesson>>,
    completed: HashSet<i64>,
    course: CourseProgress,
}

async fn load_course(server: &Server, student_id: i64) -> CourseSnapshot {
    let modules = or_empty(catalog::get_module_list(&server.database).await, "modules");
    let lessons: HashMap<i64, Vec<Lesson>> =
        or_empty(catalog::get_lessons_by_module(&server.database).await, "lessons");
    let completed = completed_ids(server, student_id).await;
    let course = course_progress(&modules, &lessons, &completed, server.unlock_policy);
    CourseSnapshot {
        lessons,
        completed,
        course,
    }
}

#[utoipa::path(
    get,
    path = "/modules",
    responses(
        (status = 200, description = "All modules with progress and unlock state", body = ModulesPage),
        (status = 303, description = "Not signed in, redirect to /login")
    )
)]
pub async fn modules(
    State(server): State<Arc<Server>>,
    Extension(CurrentStudent(student)): Extension<CurrentStudent>,
) -> Json<ModulesPage> {
    let CourseProgress { modules, overall } = load_course(&server, student.id).await.course;
    Json(ModulesPage {
        user: student,
        modules,
        overall,
    })
}

#[utoipa::path(
    get,
    path = "/modules/{id}",
    params(("id" = i64, Path, description = "Module id")),
    responses(
        (status = 200, description = "Module with its lessons", body = ModulePage),
        (status = 303, description = "Not signed in, or no such module")
    )
)]
pub async fn module(
    State(server): State<Arc<Server>>,
    Extension(CurrentStudent(student)): Extension<CurrentStudent>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Response {
    let Ok(Path(id)) = id else {
        return Redirect::to(MODULES_PATH).into_response();
    };
    let module = match catalog::get_module(&server.database, id).await {
        Ok(Some(module)) => module,
        Ok(None) => return Redirect::to(MODULES_PATH).into_response(),
        Err(e) => {
            error!("failed to fetch module {}: {}", id, e);
            return Redirect::to(MODULES_PATH).into_response();
        }
    };
    let CourseSnapshot {
        lessons,
        completed,
        course,
    } = load_course(&server, student.id).await;
    let (progress, unlocked) = match course.modules.into_iter().find(|m| m.module.id == id) {
        Some(status) => (status.progress, status.unlocked),
        None => return Redirect::to(MODULES_PATH).into_response(),
    };
    let lessons = lessons.get(&id).map(Vec::as_slice).unwrap_or_default();
    Json(ModulePage {
        module,
        lessons: lesson_statuses(lessons, &completed),
        progress,
        unlocked,
    })
    .into_response()
}

#[utoipa::path(
    get,
    path = "/lessons/{id}",
    params(("id" = i64, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson with completion state", body = LessonPage),
        (status = 303, description = "Not signed in, or no such lesson")
    )
)]
pub async fn lesson(
    State(server): State<Arc<Server>>,
    Extension(CurrentStudent(student)): Extension<CurrentStudent>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Response {
    let Ok(Path(id)) = id else {
        return Redirect::to(MODULES_PATH).into_response();
    };
    let lesson = match catalog::get_lesson(&server.database, id).await {
        Ok(Some(lesson)) => lesson,
        Ok(None) => return Redirect::to(MODULES_PATH).into_response(),
        Err(e) => {
            error!("failed to fetch lesson {}: {}", id, e);
            return Redirect::to(MODULES_PATH).into_response();
        }
    };
    let module = match catalog::get_module(&server.database, lesson.module_id).await {
        Ok(Some(module)) => module,
        Ok(None) => return Redirect::to(MODULES_PATH).into_response(),
        Err(e) => {
            error!("failed to fetch module {}: {}", lesson.module_id, e);
            return Redirect::to(MODULES_PATH).into_response();
        }
    };
    let siblings = or_empty(
        catalog::get_module_lessons(&server.database, module.id).await,
        "lessons",
    );
    let completed = completed_ids(&server, student.id).await;
    let status = lesson_statuses(&siblings, &completed)
        .into_iter()
        .find(|status| status.lesson.id == id);
    let (completed, unlocked) = match status {
        Some(status) => (status.completed, status.unlocked),
        None => (completed.contains(&id), false),
    };
    Json(LessonPage {
        lesson,
        module,
        completed,
        unlocked,
    })
    .into_response()
}

#[utoipa::path(
    get,
    path = "/resources",
    responses(
        (status = 200, description = "Course resources, oldest first", body = ResourcesPage),
        (status = 303, description = "Not signed in, redirect to /login")
    )
)]
pub async fn resources(State(server): State<Arc<Server>>) -> Json<ResourcesPage> {
    let resources = or_empty(catalog::get_resource_list(&server.database).await, "resources");
    Json(ResourcesPage { resources })
}

#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Sign-in prompt", body = MessageBody),
        (status = 303, description = "Already signed in, redirect to /modules")
    )
)]
pub async fn login_page(
    State(server): State<Arc<Server>>,
    session: Session,
    headers: HeaderMap,
) -> Response {
    if resolve_student(&server, &headers, &session).await.is_some() {
        return Redirect::to(MODULES_PATH).into_response();
    }
    Json(MessageBody::new("Sign in with POST /api/auth/login")).into_response()
}

async fn to_modules() -> Redirect {
    Redirect::to(MODULES_PATH)
}

pub fn get_page_scope(server: Arc<Server>) -> Router<Arc<Server>> {
    Router::new()
        .route("/", get(to_modules))
        .route("/dashboard", get(to_modules))
        .route("/modules", get(modules))
        .route("/modules/{id}", get(module))
        .route("/lessons/{id}", get(lesson))
        .route("/resources", get(resources))
        .route_layer(middleware::from_fn_with_state(server, require_page_student))
        .route("/login", get(login_page))
}
