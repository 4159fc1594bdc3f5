use sqlx::SqlitePool;

use crate::db::models::Exam;

pub(crate) const COLUMNS: &str = "\
    id, title, description, subjects, duration_seconds, total_questions, \
    passing_score, instructions, is_active, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_active(pool: &SqlitePool) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE is_active = 1 ORDER BY title"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) subjects: serde_json::Value,
    pub(crate) duration_seconds: i64,
    pub(crate) passing_score: f64,
    pub(crate) instructions: &'a str,
    pub(crate) is_active: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &SqlitePool,
    exam: CreateExam<'_>,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, description, subjects, duration_seconds, total_questions,
            passing_score, instructions, is_active, created_at, updated_at
        ) VALUES (?,?,?,?,?,0,?,?,?,?,?)
        RETURNING {COLUMNS}",
    ))
    .bind(exam.id)
    .bind(exam.title)
    .bind(exam.description)
    .bind(exam.subjects)
    .bind(exam.duration_seconds)
    .bind(exam.passing_score)
    .bind(exam.instructions)
    .bind(exam.is_active)
    .bind(exam.created_at)
    .bind(exam.created_at)
    .fetch_one(pool)
    .await
}

/// Keep the denormalized question count in step after question CRUD.
pub(crate) async fn refresh_question_count(
    pool: &SqlitePool,
    exam_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exams
         SET total_questions = (SELECT COUNT(*) FROM questions WHERE exam_id = ?),
             updated_at = ?
         WHERE id = ?",
    )
    .bind(exam_id)
    .bind(now)
    .bind(exam_id)
    .execute(pool)
    .await?;
    Ok(())
}
