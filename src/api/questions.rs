use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::question::{
    validate_option_label, QuestionCreate, QuestionResponse, QuestionUpdate,
};

pub(crate) fn exam_router() -> Router<AppState> {
    Router::new().route("/:exam_id/questions", get(list_questions).post(add_question))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:question_id", put(update_question).delete(delete_question))
}

async fn list_questions(
    Path(exam_id): Path<String>,
    CurrentAdmin(_user): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let questions = repositories::questions::list_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;

    Ok(Json(questions.into_iter().map(QuestionResponse::from_db).collect()))
}

async fn add_question(
    Path(exam_id): Path<String>,
    CurrentAdmin(user): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exam = repositories::exams::find_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    if exam.is_none() {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    let now = primitive_now_utc();
    let question = repositories::questions::create(
        state.db(),
        repositories::questions::CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            exam_id: &exam_id,
            subject: &payload.subject,
            prompt: &payload.prompt,
            option_a: &payload.options.a,
            option_b: &payload.options.b,
            option_c: &payload.options.c,
            option_d: &payload.options.d,
            correct_option: &payload.correct_option,
            explanation: payload.explanation.as_deref(),
            image_url: payload.image_url.as_deref(),
            difficulty: payload.difficulty,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    repositories::exams::refresh_question_count(state.db(), &exam_id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to refresh question count"))?;

    tracing::info!(user_id = %user.id, exam_id = %exam_id, question_id = %question.id, "Question added");

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question))))
}

async fn update_question(
    Path(question_id): Path<String>,
    CurrentAdmin(_user): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuestionUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if let Some(correct) = &payload.correct_option {
        validate_option_label(correct)
            .map_err(|_| ApiError::BadRequest("correct_option must be A, B, C or D".to_string()))?;
    }

    let existing = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?;

    if existing.is_none() {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }

    repositories::questions::update(
        state.db(),
        &question_id,
        repositories::questions::UpdateQuestion {
            subject: payload.subject,
            prompt: payload.prompt,
            options: payload.options.map(|options| [options.a, options.b, options.c, options.d]),
            correct_option: payload.correct_option,
            explanation: payload.explanation,
            difficulty: payload.difficulty,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update question"))?;

    let updated = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    Ok(Json(QuestionResponse::from_db(updated)))
}

async fn delete_question(
    Path(question_id): Path<String>,
    CurrentAdmin(user): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let existing = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?;

    let Some(question) = existing else {
        return Err(ApiError::NotFound("Question not found".to_string()));
    };

    repositories::questions::delete_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;

    repositories::exams::refresh_question_count(state.db(), &question.exam_id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to refresh question count"))?;

    tracing::info!(user_id = %user.id, question_id = %question_id, "Question deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support;

    fn question_payload() -> serde_json::Value {
        json!({
            "subject": "math",
            "prompt": "2 + 2 = ?",
            "options": { "A": "3", "B": "4", "C": "5", "D": "22" },
            "correct_option": "B",
            "explanation": "Basic addition",
            "difficulty": "easy"
        })
    }

    #[tokio::test]
    async fn admin_manages_questions() {
        let ctx = test_support::setup_test_context().await;
        let exam = test_support::insert_exam(ctx.state.db(), "Math quiz", 900, 60.0).await;
        let admin =
            test_support::insert_user(ctx.state.db(), "admin01", UserRole::Admin, "admin-password")
                .await;
        let token = test_support::bearer_token(&admin.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/exams/{}/questions", exam.id),
                Some(&token),
                Some(question_payload()),
            ))
            .await
            .expect("create question");

        let status = response.status();
        let created = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {created}");
        assert_eq!(created["correct_option"], "B");
        let question_id = created["id"].as_str().expect("question id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PUT,
                &format!("/api/v1/questions/{question_id}"),
                Some(&token),
                Some(json!({ "prompt": "3 + 1 = ?", "correct_option": "B" })),
            ))
            .await
            .expect("update question");

        let status = response.status();
        let updated = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {updated}");
        assert_eq!(updated["prompt"], "3 + 1 = ?");

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/exams/{}/questions", exam.id),
                Some(&token),
                None,
            ))
            .await
            .expect("list questions");
        let listed = test_support::read_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::DELETE,
                &format!("/api/v1/questions/{question_id}"),
                Some(&token),
                None,
            ))
            .await
            .expect("delete question");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/exams/{}", exam.id),
                Some(&token),
                None,
            ))
            .await
            .expect("get exam");
        let fetched = test_support::read_json(response).await;
        assert_eq!(fetched["total_questions"], 0);
    }

    #[tokio::test]
    async fn students_cannot_touch_the_question_bank() {
        let ctx = test_support::setup_test_context().await;
        let exam = test_support::insert_exam(ctx.state.db(), "Math quiz", 900, 60.0).await;
        let student =
            test_support::insert_user(ctx.state.db(), "student10", UserRole::Student, "student-pw")
                .await;
        let token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/exams/{}/questions", exam.id),
                Some(&token),
                Some(question_payload()),
            ))
            .await
            .expect("create question");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/exams/{}/questions", exam.id),
                Some(&token),
                None,
            ))
            .await
            .expect("list questions");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn rejects_invalid_correct_option() {
        let ctx = test_support::setup_test_context().await;
        let exam = test_support::insert_exam(ctx.state.db(), "Math quiz", 900, 60.0).await;
        let admin =
            test_support::insert_user(ctx.state.db(), "admin02", UserRole::Admin, "admin-password")
                .await;
        let token = test_support::bearer_token(&admin.id, ctx.state.settings());

        let mut payload = question_payload();
        payload["correct_option"] = json!("X");

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/exams/{}/questions", exam.id),
                Some(&token),
                Some(payload),
            ))
            .await
            .expect("create question");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
