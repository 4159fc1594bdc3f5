use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::types::SessionStatus;
use crate::engine::{SessionSnapshot, StartOutcome};
use crate::schemas::question::{validate_option_label, StudentQuestionResponse};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AnswerPayload {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1))]
    pub(crate) question_id: String,
    #[validate(custom(function = validate_option_label))]
    pub(crate) option: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) status: SessionStatus,
    pub(crate) started_at: String,
    pub(crate) ended_at: Option<String>,
    pub(crate) time_left_seconds: u64,
    pub(crate) time_spent_seconds: i64,
    pub(crate) answers: HashMap<String, String>,
}

impl SessionResponse {
    pub(crate) fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            id: snapshot.session_id,
            exam_id: snapshot.exam_id,
            user_id: snapshot.user_id,
            status: snapshot.status,
            started_at: format_primitive(snapshot.started_at),
            ended_at: snapshot.ended_at.map(format_primitive),
            time_left_seconds: snapshot.time_left_seconds,
            time_spent_seconds: snapshot.time_spent_seconds,
            answers: snapshot.answers,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StartExamResponse {
    pub(crate) session: SessionResponse,
    pub(crate) resumed: bool,
    pub(crate) questions: Vec<StudentQuestionResponse>,
}

impl StartExamResponse {
    pub(crate) fn new(outcome: StartOutcome, questions: Vec<StudentQuestionResponse>) -> Self {
        Self {
            session: SessionResponse::from_snapshot(outcome.snapshot),
            resumed: outcome.resumed,
            questions,
        }
    }
}
