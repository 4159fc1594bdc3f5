use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::models::ExamResult;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, user_id, session_id, score, total_questions, correct_answers, \
    wrong_answers, skipped_questions, percentage, passed, subject_scores, \
    completed_at";

pub(crate) async fn find_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<ExamResult>, sqlx::Error> {
    sqlx::query_as::<_, ExamResult>(&format!("SELECT {COLUMNS} FROM exam_results WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::SqliteExecutor<'_>,
    result: &ExamResult,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO exam_results (
            id, exam_id, user_id, session_id, score, total_questions,
            correct_answers, wrong_answers, skipped_questions, percentage,
            passed, subject_scores, completed_at
        ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?)",
    )
    .bind(&result.id)
    .bind(&result.exam_id)
    .bind(&result.user_id)
    .bind(&result.session_id)
    .bind(result.score)
    .bind(result.total_questions)
    .bind(result.correct_answers)
    .bind(result.wrong_answers)
    .bind(result.skipped_questions)
    .bind(result.percentage)
    .bind(result.passed)
    .bind(&result.subject_scores)
    .bind(result.completed_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list(
    pool: &SqlitePool,
    user_id: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamResult>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM exam_results"));

    if let Some(user_id) = user_id {
        builder.push(" WHERE user_id = ");
        builder.push_bind(user_id);
    }

    builder.push(" ORDER BY completed_at DESC LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));
    builder.push(" OFFSET ");
    builder.push_bind(skip.max(0));

    builder.build_query_as::<ExamResult>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &SqlitePool,
    user_id: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM exam_results");

    if let Some(user_id) = user_id {
        builder.push(" WHERE user_id = ");
        builder.push_bind(user_id);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}
