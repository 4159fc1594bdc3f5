use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Question;
use crate::db::types::DifficultyLevel;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[validate(length(min = 1, max = 128))]
    pub(crate) subject: String,
    #[validate(length(min = 1))]
    pub(crate) prompt: String,
    pub(crate) options: QuestionOptions,
    #[serde(alias = "correctOption")]
    #[validate(custom(function = validate_option_label))]
    pub(crate) correct_option: String,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default)]
    #[serde(alias = "imageUrl")]
    pub(crate) image_url: Option<String>,
    #[serde(default = "default_difficulty")]
    pub(crate) difficulty: DifficultyLevel,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionOptions {
    #[serde(rename = "A")]
    pub(crate) a: String,
    #[serde(rename = "B")]
    pub(crate) b: String,
    #[serde(rename = "C")]
    pub(crate) c: String,
    #[serde(rename = "D")]
    pub(crate) d: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionUpdate {
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default)]
    pub(crate) prompt: Option<String>,
    #[serde(default)]
    pub(crate) options: Option<QuestionOptions>,
    #[serde(default)]
    #[serde(alias = "correctOption")]
    pub(crate) correct_option: Option<String>,
    #[serde(default)]
    pub(crate) explanation: Option<Option<String>>,
    #[serde(default)]
    pub(crate) difficulty: Option<DifficultyLevel>,
}

/// Full question view, including the answer key. Admin-only.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) subject: String,
    pub(crate) prompt: String,
    pub(crate) options: BTreeMap<String, String>,
    pub(crate) correct_option: String,
    pub(crate) explanation: Option<String>,
    pub(crate) image_url: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: String,
}

/// Exam-taking view: no answer key, no explanation.
#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestionResponse {
    pub(crate) id: String,
    pub(crate) subject: String,
    pub(crate) prompt: String,
    pub(crate) options: BTreeMap<String, String>,
    pub(crate) image_url: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
}

fn options_map(question: &Question) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("A".to_string(), question.option_a.clone()),
        ("B".to_string(), question.option_b.clone()),
        ("C".to_string(), question.option_c.clone()),
        ("D".to_string(), question.option_d.clone()),
    ])
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        let options = options_map(&question);
        Self {
            id: question.id,
            exam_id: question.exam_id,
            subject: question.subject,
            prompt: question.prompt,
            options,
            correct_option: question.correct_option,
            explanation: question.explanation,
            image_url: question.image_url,
            difficulty: question.difficulty,
            created_at: format_primitive(question.created_at),
        }
    }
}

impl StudentQuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        let options = options_map(&question);
        Self {
            id: question.id,
            subject: question.subject,
            prompt: question.prompt,
            options,
            image_url: question.image_url,
            difficulty: question.difficulty,
        }
    }
}

pub(crate) fn validate_option_label(value: &str) -> Result<(), validator::ValidationError> {
    if matches!(value, "A" | "B" | "C" | "D") {
        Ok(())
    } else {
        Err(validator::ValidationError::new("option_label"))
    }
}

fn default_difficulty() -> DifficultyLevel {
    DifficultyLevel::Medium
}
