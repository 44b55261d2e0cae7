pub mod aggregate;

use std::collections::HashSet;

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::utils::utc_now;

/// A student's completion of one lesson.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ProgressRecord {
    pub id: i64,
    pub student_id: i64,
    pub lesson_id: i64,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Recorded,
    AlreadyCompleted,
}

pub async fn get_student_progress(
    database: &SqlitePool,
    student_id: i64,
) -> sqlx::Result<Vec<ProgressRecord>> {
    sqlx::query_as::<_, ProgressRecord>(
        "SELECT id, student_id, lesson_id, completed, completed_at, created_at
        FROM progress WHERE student_id = ? ORDER BY id ASC",
    )
    .bind(student_id)
    .fetch_all(database)
    .await
}

pub async fn get_completed_lesson_ids(
    database: &SqlitePool,
    student_id: i64,
) -> sqlx::Result<HashSet<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT lesson_id FROM progress WHERE student_id = ? AND completed = 1",
    )
    .bind(student_id)
    .fetch_all(database)
    .await?;
    Ok(ids.into_iter().collect())
}

pub async fn is_lesson_completed(
    database: &SqlitePool,
    student_id: i64,
    lesson_id: i64,
) -> sqlx::Result<bool> {
    let completed = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM progress WHERE student_id = ? AND lesson_id = ? AND completed = 1)",
    )
    .bind(student_id)
    .bind(lesson_id)
    .fetch_one(database)
    .await?;
    Ok(completed > 0)
}

/// Mark a lesson completed in one statement.
///
/// The `(student_id, lesson_id)` unique key makes repeated or concurrent calls
/// collapse onto a single row; only the first one stamps `completed_at`.
pub async fn complete_lesson(
    database: &SqlitePool,
    student_id: i64,
    lesson_id: i64,
) -> sqlx::Result<Completion> {
    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO progress (student_id, lesson_id, completed, completed_at, created_at)
        VALUES (?, ?, 1, ?, ?)
        ON CONFLICT (student_id, lesson_id) DO UPDATE
            SET completed = 1, completed_at = excluded.completed_at
            WHERE progress.completed = 0",
    )
    .bind(student_id)
    .bind(lesson_id)
    .bind(now)
    .bind(now)
    .execute(database)
    .await?;
    if result.rows_affected() == 0 {
        Ok(Completion::AlreadyCompleted)
    } else {
        Ok(Completion::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{NewLesson, create_lesson, create_module},
        student::create_student,
        utils::open_database,
    };

    async fn seeded() -> (SqlitePool, i64, i64, i64) {
        let database = open_database("sqlite::memory:").await.unwrap();
        let student = create_student(&database, "Ada".into(), "ada@example.com".into(), "pw".into())
            .await
            .unwrap();
        let module_id = create_module(&database, "Basics".into(), 1).await.unwrap();
        let mut lessons = Vec::new();
        for order in 1..=2 {
            lessons.push(
                create_lesson(
                    &database,
                    NewLesson {
                        module_id,
                        title: format!("Lesson {order}"),
                        order,
                        video_url: None,
                        content: None,
                    },
                )
                .await
                .unwrap(),
            );
        }
        (database, student, lessons[0], lessons[1])
    }

    #[tokio::test]
    async fn completing_twice_keeps_one_record() {
        let (database, student, lesson, _) = seeded().await;

        let first = complete_lesson(&database, student, lesson).await.unwrap();
        let second = complete_lesson(&database, student, lesson).await.unwrap();
        assert_eq!(first, Completion::Recorded);
        assert_eq!(second, Completion::AlreadyCompleted);

        let records = get_student_progress(&database, student).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].completed);
        assert!(records[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn concurrent_completions_collapse() {
        let (database, student, lesson, _) = seeded().await;
        let (a, b) = tokio::join!(
            complete_lesson(&database, student, lesson),
            complete_lesson(&database, student, lesson)
        );
        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|c| *c == Completion::AlreadyCompleted);
        assert_eq!(outcomes, vec![Completion::Recorded, Completion::AlreadyCompleted]);
        assert_eq!(get_student_progress(&database, student).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn completed_ids_are_per_student() {
        let (database, student, first, second) = seeded().await;
        let other = create_student(&database, "Bob".into(), "bob@example.com".into(), "pw".into())
            .await
            .unwrap();
        complete_lesson(&database, student, first).await.unwrap();
        complete_lesson(&database, other, second).await.unwrap();

        assert_eq!(
            get_completed_lesson_ids(&database, student).await.unwrap(),
            HashSet::from([first])
        );
        assert!(is_lesson_completed(&database, student, first).await.unwrap());
        assert!(!is_lesson_completed(&database, student, second).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_lesson_is_rejected() {
        let (database, student, _, _) = seeded().await;
        assert!(complete_lesson(&database, student, 9999).await.is_err());
    }
}
