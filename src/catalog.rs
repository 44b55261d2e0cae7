use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::utils::utc_now;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Module {
    pub id: i64,
    pub title: String,
    pub order: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Lesson {
    pub id: i64,
    pub module_id: i64,
    pub title: String,
    pub order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Resource {
    pub id: i64,
    pub title: String,
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLesson {
    pub module_id: i64,
    pub title: String,
    pub order: i64,
    pub video_url: Option<String>,
    pub content: Option<String>,
}

/// All modules, ascending by `order`, ties in insertion order.
pub async fn get_module_list(database: &SqlitePool) -> sqlx::Result<Vec<Module>> {
    sqlx::query_as::<_, Module>(
        r#"SELECT id, title, "order", created_at FROM module ORDER BY "order" ASC, id ASC"#,
    )
    .fetch_all(database)
    .await
}

pub async fn get_module(database: &SqlitePool, id: i64) -> sqlx::Result<Option<Module>> {
    sqlx::query_as::<_, Module>(r#"SELECT id, title, "order", created_at FROM module WHERE id = ?"#)
        .bind(id)
        .fetch_optional(database)
        .await
}

pub async fn get_module_lessons(database: &SqlitePool, module_id: i64) -> sqlx::Result<Vec<Lesson>> {
    sqlx::query_as::<_, Lesson>(
        r#"SELECT id, module_id, title, "order", video_url, content, created_at
        FROM lesson WHERE module_id = ? ORDER BY "order" ASC, id ASC"#,
    )
    .bind(module_id)
    .fetch_all(database)
    .await
}

/// Every lesson grouped under its module id, each group in lesson order.
pub async fn get_lessons_by_module(database: &SqlitePool) -> sqlx::Result<HashMap<i64, Vec<Lesson>>> {
    let lessons = sqlx::query_as::<_, Lesson>(
        r#"SELECT id, module_id, title, "order", video_url, content, created_at
        FROM lesson ORDER BY module_id ASC, "order" ASC, id ASC"#,
    )
    .fetch_all(database)
    .await?;
    let mut grouped: HashMap<i64, Vec<Lesson>> = HashMap::new();
    for lesson in lessons {
        grouped.entry(lesson.module_id).or_default().push(lesson);
    }
    Ok(grouped)
}

pub async fn get_lesson(database: &SqlitePool, id: i64) -> sqlx::Result<Option<Lesson>> {
    sqlx::query_as::<_, Lesson>(
        r#"SELECT id, module_id, title, "order", video_url, content, created_at
        FROM lesson WHERE id = ?"#,
    )
    .bind(id)
    .fetch_optional(database)
    .await
}

pub async fn get_resource_list(database: &SqlitePool) -> sqlx::Result<Vec<Resource>> {
    sqlx::query_as::<_, Resource>(
        "SELECT id, title, url, created_at FROM resource ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(database)
    .await
}

pub async fn create_module(database: &SqlitePool, title: String, order: i64) -> sqlx::Result<i64> {
    let module = sqlx::query(r#"INSERT INTO module (title, "order", created_at) VALUES (?, ?, ?)"#)
        .bind(title)
        .bind(order)
        .bind(utc_now())
        .execute(database)
        .await?;
    Ok(module.last_insert_rowid())
}

pub async fn create_lesson(database: &SqlitePool, lesson: NewLesson) -> sqlx::Result<i64> {
    let NewLesson {
        module_id,
        title,
        order,
        video_url,
        content,
    } = lesson;
    let lesson = sqlx::query(
        r#"INSERT INTO lesson (module_id, title, "order", video_url, content, created_at)
        VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(module_id)
    .bind(title)
    .bind(order)
    .bind(video_url)
    .bind(content)
    .bind(utc_now())
    .execute(database)
    .await?;
    Ok(lesson.last_insert_rowid())
}

pub async fn create_resource(database: &SqlitePool, title: String, url: String) -> sqlx::Result<i64> {
    let resource = sqlx::query("INSERT INTO resource (title, url, created_at) VALUES (?, ?, ?)")
        .bind(title)
        .bind(url)
        .bind(utc_now())
        .execute(database)
        .await?;
    Ok(resource.last_insert_rowid())
}

pub async fn delete_module(database: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM module WHERE id = ?")
        .bind(id)
        .execute(database)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_lesson(database: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM lesson WHERE id = ?")
        .bind(id)
        .execute(database)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_resource(database: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM resource WHERE id = ?")
        .bind(id)
        .execute(database)
        .await?;
    Ok(result.rows_affected() > 0)
}
