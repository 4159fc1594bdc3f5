use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{DifficultyLevel, SessionStatus, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) registration_number: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) last_login: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) subjects: Json<Vec<String>>,
    pub(crate) duration_seconds: i64,
    pub(crate) total_questions: i64,
    pub(crate) passing_score: f64,
    pub(crate) instructions: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) subject: String,
    pub(crate) prompt: String,
    pub(crate) option_a: String,
    pub(crate) option_b: String,
    pub(crate) option_c: String,
    pub(crate) option_d: String,
    pub(crate) correct_option: String,
    pub(crate) explanation: Option<String>,
    pub(crate) image_url: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: PrimitiveDateTime,
}

/// One user's single attempt at one exam. The engine owns the in-memory
/// copy of the active session; rows are the durable source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamSession {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) ended_at: Option<PrimitiveDateTime>,
    pub(crate) status: SessionStatus,
    pub(crate) answers: Json<HashMap<String, String>>,
    pub(crate) time_spent_seconds: i64,
    pub(crate) last_saved_at: Option<PrimitiveDateTime>,
}

/// Immutable scored outcome of a completed session; written exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamResult {
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
    pub(crate) subject_scores: Json<BTreeMap<String, SubjectScore>>,
    pub(crate) completed_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SubjectScore {
    pub(crate) total: i64,
    pub(crate) correct: i64,
    pub(crate) percentage: f64,
}
