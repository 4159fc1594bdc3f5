use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Exam;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, max = 256))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) subjects: Vec<String>,
    #[serde(alias = "durationSeconds")]
    #[validate(range(min = 1))]
    pub(crate) duration_seconds: i64,
    #[serde(alias = "passingScore")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub(crate) passing_score: f64,
    #[serde(default)]
    pub(crate) instructions: String,
    #[serde(default = "default_true")]
    #[serde(alias = "isActive")]
    pub(crate) is_active: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) subjects: Vec<String>,
    pub(crate) duration_seconds: i64,
    pub(crate) total_questions: i64,
    pub(crate) passing_score: f64,
    pub(crate) instructions: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            subjects: exam.subjects.0,
            duration_seconds: exam.duration_seconds,
            total_questions: exam.total_questions,
            passing_score: exam.passing_score,
            instructions: exam.instructions,
            is_active: exam.is_active,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
        }
    }
}

fn default_true() -> bool {
    true
}
