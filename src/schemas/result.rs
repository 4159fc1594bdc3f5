use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::{ExamResult, SubjectScore};

#[derive(Debug, Serialize)]
pub(crate) struct ResultResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) session_id: String,
    pub(crate) score: i64,
    pub(crate) total_questions: i64,
    pub(crate) correct_answers: i64,
    pub(crate) wrong_answers: i64,
    pub(crate) skipped_questions: i64,
    pub(crate) percentage: f64,
    pub(crate) passed: bool,
    pub(crate) subject_scores: BTreeMap<String, SubjectScore>,
    pub(crate) completed_at: String,
}

impl ResultResponse {
    pub(crate) fn from_db(result: ExamResult) -> Self {
        Self {
            id: result.id,
            exam_id: result.exam_id,
            user_id: result.user_id,
            session_id: result.session_id,
            score: result.score,
            total_questions: result.total_questions,
            correct_answers: result.correct_answers,
            wrong_answers: result.wrong_answers,
            skipped_questions: result.skipped_questions,
            percentage: result.percentage,
            passed: result.passed,
            subject_scores: result.subject_scores.0,
            completed_at: format_primitive(result.completed_at),
        }
    }
}
