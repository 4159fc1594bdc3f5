use crate::db::models::ExamSession;
use crate::db::types::SessionStatus;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, user_id, started_at, ended_at, status, answers, \
    time_spent_seconds, last_saved_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::SqliteExecutor<'_>,
    id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_active(
    executor: impl sqlx::SqliteExecutor<'_>,
    exam_id: &str,
    user_id: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions \
         WHERE exam_id = ? AND user_id = ? AND status = ?"
    ))
    .bind(exam_id)
    .bind(user_id)
    .bind(SessionStatus::InProgress)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn create(
    executor: impl sqlx::SqliteExecutor<'_>,
    session: &ExamSession,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO exam_sessions (
            id, exam_id, user_id, started_at, ended_at, status, answers,
            time_spent_seconds, last_saved_at
        ) VALUES (?,?,?,?,?,?,?,?,?)",
    )
    .bind(&session.id)
    .bind(&session.exam_id)
    .bind(&session.user_id)
    .bind(session.started_at)
    .bind(session.ended_at)
    .bind(session.status)
    .bind(&session.answers)
    .bind(session.time_spent_seconds)
    .bind(session.last_saved_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Overwrite-by-identifier: persists the engine's current view of the
/// session (status, answers, timestamps) in one statement.
pub(crate) async fn update(
    executor: impl sqlx::SqliteExecutor<'_>,
    session: &ExamSession,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exam_sessions
         SET ended_at = ?, status = ?, answers = ?, time_spent_seconds = ?, last_saved_at = ?
         WHERE id = ?",
    )
    .bind(session.ended_at)
    .bind(session.status)
    .bind(&session.answers)
    .bind(session.time_spent_seconds)
    .bind(session.last_saved_at)
    .bind(&session.id)
    .execute(executor)
    .await?;
    Ok(())
}
