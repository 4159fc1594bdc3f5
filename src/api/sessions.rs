use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post, put},
    Json, Router,
};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::engine::SessionSnapshot;
use crate::repositories;
use crate::schemas::question::StudentQuestionResponse;
use crate::schemas::result::ResultResponse;
use crate::schemas::session::{AnswerPayload, SessionResponse, StartExamResponse};

pub(crate) fn exam_router() -> Router<AppState> {
    Router::new().route("/:exam_id/sessions", post(start_session))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:session_id", get(get_snapshot))
        .route("/:session_id/answers", put(record_answer))
        .route("/:session_id/autosave", post(autosave))
        .route("/:session_id/submit", post(submit))
        .route("/:session_id/abandon", post(abandon))
        .route("/:session_id/events", get(events))
}

async fn start_session(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StartExamResponse>), ApiError> {
    let outcome = state.engine().start(&exam_id, &user.id).await?;

    let questions = repositories::questions::list_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam questions"))?;

    let status = if outcome.resumed { StatusCode::OK } else { StatusCode::CREATED };
    let questions =
        questions.into_iter().map(StudentQuestionResponse::from_db).collect();

    Ok((status, Json(StartExamResponse::new(outcome, questions))))
}

async fn get_snapshot(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let snapshot = state.engine().snapshot(&session_id).await?;
    require_session_access(&user, &snapshot)?;

    Ok(Json(SessionResponse::from_snapshot(snapshot)))
}

async fn record_answer(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AnswerPayload>,
) -> Result<StatusCode, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    require_session_owner(&user, &state, &session_id).await?;

    state.engine().record_answer(&session_id, &payload.question_id, &payload.option).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn autosave(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    require_session_owner(&user, &state, &session_id).await?;

    state.engine().autosave(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ResultResponse>, ApiError> {
    require_session_owner(&user, &state, &session_id).await?;

    let result = state.engine().submit(&session_id).await?;
    Ok(Json(ResultResponse::from_db(result)))
}

async fn abandon(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    require_session_owner(&user, &state, &session_id).await?;

    state.engine().abandon(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Tick and expiry notifications for one session as Server-Sent Events.
/// The subscription ends when the client disconnects and drops the
/// stream.
async fn events(
    Path(session_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let snapshot = state.engine().snapshot(&session_id).await?;
    require_session_access(&user, &snapshot)?;

    let receiver = state.engine().subscribe();
    let stream = BroadcastStream::new(receiver).filter_map(move |event| match event {
        Ok(event) if event.session_id == session_id => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().data(data)))
        }
        _ => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn require_session_access(user: &User, snapshot: &SessionSnapshot) -> Result<(), ApiError> {
    if snapshot.user_id == user.id || user.role == UserRole::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Session belongs to another user"))
    }
}

async fn require_session_owner(
    user: &User,
    state: &AppState,
    session_id: &str,
) -> Result<(), ApiError> {
    let snapshot = state.engine().snapshot(session_id).await?;
    if snapshot.user_id != user.id {
        return Err(ApiError::Forbidden("Session belongs to another user"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support::{self, TestContext};

    async fn seed_exam(ctx: &TestContext, duration_seconds: i64) -> (String, Vec<String>) {
        let exam = test_support::insert_exam(ctx.state.db(), "Physics final", duration_seconds, 50.0)
            .await;
        let mut question_ids = Vec::new();
        for (subject, correct) in
            [("math", "A"), ("math", "B"), ("physics", "C"), ("physics", "D"), ("chemistry", "A")]
        {
            let question =
                test_support::insert_question(ctx.state.db(), &exam.id, subject, correct).await;
            question_ids.push(question.id);
        }
        (exam.id, question_ids)
    }

    async fn answer(
        ctx: &TestContext,
        token: &str,
        session_id: &str,
        question_id: &str,
        option: &str,
    ) {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PUT,
                &format!("/api/v1/sessions/{session_id}/answers"),
                Some(token),
                Some(json!({ "question_id": question_id, "option": option })),
            ))
            .await
            .expect("record answer");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn full_exam_attempt_flow() {
        let ctx = test_support::setup_test_context().await;
        let (exam_id, questions) = seed_exam(&ctx, 1800).await;
        let student =
            test_support::insert_user(ctx.state.db(), "taker01", UserRole::Student, "pass-word-1")
                .await;
        let token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/exams/{exam_id}/sessions"),
                Some(&token),
                None,
            ))
            .await
            .expect("start session");

        let status = response.status();
        let started = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {started}");
        assert_eq!(started["resumed"], false);
        assert_eq!(started["session"]["status"], "in-progress");
        assert_eq!(started["questions"].as_array().unwrap().len(), 5);
        // The exam-taking view must not leak the answer key.
        assert!(started["questions"][0]["correct_option"].is_null());
        let session_id = started["session"]["id"].as_str().expect("session id").to_string();

        // Re-attach instead of a second attempt.
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/exams/{exam_id}/sessions"),
                Some(&token),
                None,
            ))
            .await
            .expect("restart session");
        let status = response.status();
        let resumed = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resumed["resumed"], true);
        assert_eq!(resumed["session"]["id"], session_id.as_str());

        // 2 correct, 1 wrong, 2 skipped.
        answer(&ctx, &token, &session_id, &questions[0], "A").await;
        answer(&ctx, &token, &session_id, &questions[1], "B").await;
        answer(&ctx, &token, &session_id, &questions[2], "A").await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/sessions/{session_id}"),
                Some(&token),
                None,
            ))
            .await
            .expect("snapshot");
        let snapshot = test_support::read_json(response).await;
        assert_eq!(snapshot["answers"].as_object().unwrap().len(), 3);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/sessions/{session_id}/submit"),
                Some(&token),
                None,
            ))
            .await
            .expect("submit");

        let status = response.status();
        let result = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {result}");
        assert_eq!(result["correct_answers"], 2);
        assert_eq!(result["wrong_answers"], 1);
        assert_eq!(result["skipped_questions"], 2);
        assert_eq!(result["percentage"], 40.0);
        assert_eq!(result["passed"], false);
        assert_eq!(result["subject_scores"]["math"]["correct"], 2);

        // Double submit is a conflict and must not create a second result.
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/sessions/{session_id}/submit"),
                Some(&token),
                None,
            ))
            .await
            .expect("double submit");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/results",
                Some(&token),
                None,
            ))
            .await
            .expect("list results");
        let results = test_support::read_json(response).await;
        assert_eq!(results["total_count"], 1);
        assert_eq!(results["items"][0]["session_id"], session_id.as_str());
    }

    #[tokio::test]
    async fn answers_validate_option_label() {
        let ctx = test_support::setup_test_context().await;
        let (exam_id, questions) = seed_exam(&ctx, 1800).await;
        let student =
            test_support::insert_user(ctx.state.db(), "taker02", UserRole::Student, "pass-word-2")
                .await;
        let token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/exams/{exam_id}/sessions"),
                Some(&token),
                None,
            ))
            .await
            .expect("start session");
        let started = test_support::read_json(response).await;
        let session_id = started["session"]["id"].as_str().expect("session id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PUT,
                &format!("/api/v1/sessions/{session_id}/answers"),
                Some(&token),
                Some(json!({ "question_id": questions[0], "option": "E" })),
            ))
            .await
            .expect("bad answer");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sessions_are_private_to_their_owner() {
        let ctx = test_support::setup_test_context().await;
        let (exam_id, _questions) = seed_exam(&ctx, 1800).await;
        let owner =
            test_support::insert_user(ctx.state.db(), "taker03", UserRole::Student, "pass-word-3")
                .await;
        let intruder =
            test_support::insert_user(ctx.state.db(), "taker04", UserRole::Student, "pass-word-4")
                .await;
        let owner_token = test_support::bearer_token(&owner.id, ctx.state.settings());
        let intruder_token = test_support::bearer_token(&intruder.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/exams/{exam_id}/sessions"),
                Some(&owner_token),
                None,
            ))
            .await
            .expect("start session");
        let started = test_support::read_json(response).await;
        let session_id = started["session"]["id"].as_str().expect("session id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/sessions/{session_id}/submit"),
                Some(&intruder_token),
                None,
            ))
            .await
            .expect("foreign submit");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn abandon_frees_the_attempt() {
        let ctx = test_support::setup_test_context().await;
        let (exam_id, _questions) = seed_exam(&ctx, 1800).await;
        let student =
            test_support::insert_user(ctx.state.db(), "taker05", UserRole::Student, "pass-word-5")
                .await;
        let token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/exams/{exam_id}/sessions"),
                Some(&token),
                None,
            ))
            .await
            .expect("start session");
        let started = test_support::read_json(response).await;
        let session_id = started["session"]["id"].as_str().expect("session id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/sessions/{session_id}/abandon"),
                Some(&token),
                None,
            ))
            .await
            .expect("abandon");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/exams/{exam_id}/sessions"),
                Some(&token),
                None,
            ))
            .await
            .expect("fresh start");
        let status = response.status();
        let restarted = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_ne!(restarted["session"]["id"], session_id.as_str());

        // No result row for the abandoned attempt.
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/results",
                Some(&token),
                None,
            ))
            .await
            .expect("list results");
        let results = test_support::read_json(response).await;
        assert_eq!(results["total_count"], 0);
    }

    #[tokio::test]
    async fn exam_without_questions_cannot_start() {
        let ctx = test_support::setup_test_context().await;
        let exam = test_support::insert_exam(ctx.state.db(), "Empty exam", 1800, 50.0).await;
        let student =
            test_support::insert_user(ctx.state.db(), "taker06", UserRole::Student, "pass-word-6")
                .await;
        let token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/exams/{}/sessions", exam.id),
                Some(&token),
                None,
            ))
            .await
            .expect("start session");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
