//! Completion counts, percentages and unlock state for a student's course view.
//!
//! Everything here is a pure function of the catalog and the set of completed
//! lesson ids, recomputed on every request.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::{Lesson, Module};

/// Rule deciding when module `i > 0` opens up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnlockPolicy {
    /// The previous module has any completed lesson.
    #[default]
    AnyProgress,
    /// Every lesson of the previous module is completed.
    FullCompletion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModuleProgress {
    pub module_id: i64,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProgress {
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModuleStatus {
    pub module: Module,
    pub progress: ModuleProgress,
    pub unlocked: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LessonStatus {
    pub lesson: Lesson,
    pub completed: bool,
    pub unlocked: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseProgress {
    pub modules: Vec<ModuleStatus>,
    pub overall: UserProgress,
}

/// `completed / total * 100`, or 0 for an empty total.
pub fn percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

pub fn module_progress(
    module_id: i64,
    lessons: &[Lesson],
    completed_ids: &HashSet<i64>,
) -> ModuleProgress {
    let total_lessons = lessons.len();
    let completed_lessons = lessons
        .iter()
        .filter(|lesson| completed_ids.contains(&lesson.id))
        .count();
    ModuleProgress {
        module_id,
        total_lessons,
        completed_lessons,
        progress_percentage: percentage(completed_lessons, total_lessons),
    }
}

/// Module 0 is always open; module `i` depends on how far module `i - 1` got.
///
/// A module without lessons sits at 0% forever, so under either policy it keeps
/// the module after it locked.
pub fn is_module_unlocked(index: usize, progresses: &[ModuleProgress], policy: UnlockPolicy) -> bool {
    if index == 0 {
        return true;
    }
    let Some(previous) = progresses.get(index - 1) else {
        return false;
    };
    match policy {
        UnlockPolicy::AnyProgress => previous.progress_percentage > 0.0,
        UnlockPolicy::FullCompletion => {
            previous.total_lessons > 0 && previous.completed_lessons == previous.total_lessons
        }
    }
}

/// Lesson 0 is always open; lesson `i` needs lesson `i - 1` completed.
pub fn is_lesson_unlocked(index: usize, lessons: &[Lesson], completed_ids: &HashSet<i64>) -> bool {
    if index == 0 {
        return true;
    }
    lessons
        .get(index - 1)
        .is_some_and(|previous| completed_ids.contains(&previous.id))
}

pub fn lesson_statuses(lessons: &[Lesson], completed_ids: &HashSet<i64>) -> Vec<LessonStatus> {
    let lessons = sorted_lessons(lessons);
    lessons
        .iter()
        .enumerate()
        .map(|(index, lesson)| LessonStatus {
            lesson: lesson.clone(),
            completed: completed_ids.contains(&lesson.id),
            unlocked: is_lesson_unlocked(index, &lessons, completed_ids),
        })
        .collect()
}

pub fn course_progress(
    modules: &[Module],
    lessons_by_module: &HashMap<i64, Vec<Lesson>>,
    completed_ids: &HashSet<i64>,
    policy: UnlockPolicy,
) -> CourseProgress {
    let mut modules = modules.to_vec();
    modules.sort_by_key(|module| module.order);

    let progresses: Vec<ModuleProgress> = modules
        .iter()
        .map(|module| {
            let lessons = lessons_by_module
                .get(&module.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            module_progress(module.id, lessons, completed_ids)
        })
        .collect();

    let total_lessons = progresses.iter().map(|p| p.total_lessons).sum();
    let completed_lessons = progresses.iter().map(|p| p.completed_lessons).sum();
    let overall = UserProgress {
        total_lessons,
        completed_lessons,
        progress_percentage: percentage(completed_lessons, total_lessons),
    };

    let statuses = modules
        .into_iter()
        .zip(progresses.iter().cloned())
        .enumerate()
        .map(|(index, (module, progress))| ModuleStatus {
            unlocked: is_module_unlocked(index, &progresses, policy),
            completed: progress.progress_percentage == 100.0,
            module,
            progress,
        })
        .collect();

    CourseProgress {
        modules: statuses,
        overall,
    }
}

fn sorted_lessons(lessons: &[Lesson]) -> Vec<Lesson> {
    let mut lessons = lessons.to_vec();
    lessons.sort_by_key(|lesson| lesson.order);
    lessons
}
