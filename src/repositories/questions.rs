use sqlx::SqlitePool;

use crate::db::models::Question;
use crate::db::types::DifficultyLevel;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, subject, prompt, option_a, option_b, option_c, option_d, \
    correct_option, explanation, image_url, difficulty, created_at";

pub(crate) async fn find_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_exam(
    executor: impl sqlx::SqliteExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = ? ORDER BY created_at, id"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) subject: &'a str,
    pub(crate) prompt: &'a str,
    pub(crate) option_a: &'a str,
    pub(crate) option_b: &'a str,
    pub(crate) option_c: &'a str,
    pub(crate) option_d: &'a str,
    pub(crate) correct_option: &'a str,
    pub(crate) explanation: Option<&'a str>,
    pub(crate) image_url: Option<&'a str>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &SqlitePool,
    question: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, exam_id, subject, prompt, option_a, option_b, option_c, option_d,
            correct_option, explanation, image_url, difficulty, created_at
        ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?)
        RETURNING {COLUMNS}",
    ))
    .bind(question.id)
    .bind(question.exam_id)
    .bind(question.subject)
    .bind(question.prompt)
    .bind(question.option_a)
    .bind(question.option_b)
    .bind(question.option_c)
    .bind(question.option_d)
    .bind(question.correct_option)
    .bind(question.explanation)
    .bind(question.image_url)
    .bind(question.difficulty)
    .bind(question.created_at)
    .fetch_one(pool)
    .await
}

#[derive(Default)]
pub(crate) struct UpdateQuestion {
    pub(crate) subject: Option<String>,
    pub(crate) prompt: Option<String>,
    pub(crate) options: Option<[String; 4]>,
    pub(crate) correct_option: Option<String>,
    pub(crate) explanation: Option<Option<String>>,
    pub(crate) difficulty: Option<DifficultyLevel>,
}

pub(crate) async fn update(
    pool: &SqlitePool,
    id: &str,
    changes: UpdateQuestion,
) -> Result<(), sqlx::Error> {
    let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new("UPDATE questions SET id = id");

    if let Some(subject) = changes.subject {
        builder.push(", subject = ");
        builder.push_bind(subject);
    }
    if let Some(prompt) = changes.prompt {
        builder.push(", prompt = ");
        builder.push_bind(prompt);
    }
    if let Some([a, b, c, d]) = changes.options {
        builder.push(", option_a = ");
        builder.push_bind(a);
        builder.push(", option_b = ");
        builder.push_bind(b);
        builder.push(", option_c = ");
        builder.push_bind(c);
        builder.push(", option_d = ");
        builder.push_bind(d);
    }
    if let Some(correct) = changes.correct_option {
        builder.push(", correct_option = ");
        builder.push_bind(correct);
    }
    if let Some(explanation) = changes.explanation {
        builder.push(", explanation = ");
        builder.push_bind(explanation);
    }
    if let Some(difficulty) = changes.difficulty {
        builder.push(", difficulty = ");
        builder.push_bind(difficulty);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(pool).await?;
    Ok(())
}

pub(crate) async fn delete_by_id(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE id = ?").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
