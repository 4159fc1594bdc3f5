use std::collections::{BTreeMap, HashMap};

use crate::db::models::{Question, SubjectScore};
use crate::engine::error::EngineError;

/// Scored outcome of one answer map against one question set. Field
/// layout mirrors the result row; `score` equals `correct_answers` (no
/// partial credit, no negative marking).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreCard {
    pub(crate) score: i64,
    pub(crate) total_questions: i64,
    pub(crate) correct_answers: i64,
    pub(crate) wrong_answers: i64,
    pub(crate) skipped_questions: i64,
    pub(crate) percentage: f64,
    pub(crate) passed: bool,
    pub(crate) subject_scores: BTreeMap<String, SubjectScore>,
}

/// Pure scoring: unanswered questions are skipped, answers are compared
/// case-sensitively against the correct option label. A boundary
/// percentage (exactly the passing score) passes.
///
/// An empty question set has no defined percentage; it is rejected
/// before any arithmetic rather than reported as 0%.
pub(crate) fn score(
    questions: &[Question],
    answers: &HashMap<String, String>,
    passing_score: f64,
) -> Result<ScoreCard, EngineError> {
    if questions.is_empty() {
        return Err(EngineError::EmptyQuestionSet);
    }

    let mut correct_answers = 0i64;
    let mut wrong_answers = 0i64;
    let mut skipped_questions = 0i64;
    let mut subjects: BTreeMap<String, (i64, i64)> = BTreeMap::new();

    for question in questions {
        let entry = subjects.entry(question.subject.clone()).or_insert((0, 0));
        entry.0 += 1;

        match answers.get(&question.id) {
            None => skipped_questions += 1,
            Some(answer) if *answer == question.correct_option => {
                correct_answers += 1;
                entry.1 += 1;
            }
            Some(_) => wrong_answers += 1,
        }
    }

    let total_questions = questions.len() as i64;
    let percentage = correct_answers as f64 / total_questions as f64 * 100.0;

    let subject_scores = subjects
        .into_iter()
        .map(|(subject, (total, correct))| {
            let percentage = correct as f64 / total as f64 * 100.0;
            (subject, SubjectScore { total, correct, percentage })
        })
        .collect();

    Ok(ScoreCard {
        score: correct_answers,
        total_questions,
        correct_answers,
        wrong_answers,
        skipped_questions,
        percentage,
        passed: percentage >= passing_score,
        subject_scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::DifficultyLevel;
    use crate::core::time::primitive_now_utc;

    fn question(id: &str, subject: &str, correct: &str) -> Question {
        Question {
            id: id.to_string(),
            exam_id: "exam-1".to_string(),
            subject: subject.to_string(),
            prompt: format!("prompt {id}"),
            option_a: "a".to_string(),
            option_b: "b".to_string(),
            option_c: "c".to_string(),
            option_d: "d".to_string(),
            correct_option: correct.to_string(),
            explanation: None,
            image_url: None,
            difficulty: DifficultyLevel::Medium,
            created_at: primitive_now_utc(),
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(q, a)| (q.to_string(), a.to_string())).collect()
    }

    #[test]
    fn empty_question_set_is_an_error() {
        let result = score(&[], &HashMap::new(), 50.0);
        assert!(matches!(result, Err(EngineError::EmptyQuestionSet)));
    }

    #[test]
    fn buckets_sum_to_total() {
        let questions =
            vec![question("q1", "math", "A"), question("q2", "math", "B"), question("q3", "physics", "C")];
        let card = score(&questions, &answers(&[("q1", "A"), ("q2", "C")]), 50.0).unwrap();

        assert_eq!(
            card.correct_answers + card.wrong_answers + card.skipped_questions,
            card.total_questions
        );
        assert_eq!(card.correct_answers, 1);
        assert_eq!(card.wrong_answers, 1);
        assert_eq!(card.skipped_questions, 1);
    }

    #[test]
    fn percentage_boundaries() {
        let questions = vec![question("q1", "math", "A"), question("q2", "math", "B")];

        let zero = score(&questions, &HashMap::new(), 50.0).unwrap();
        assert_eq!(zero.percentage, 0.0);
        assert_eq!(zero.correct_answers, 0);

        let full = score(&questions, &answers(&[("q1", "A"), ("q2", "B")]), 50.0).unwrap();
        assert_eq!(full.percentage, 100.0);
        assert_eq!(full.correct_answers, 2);
    }

    #[test]
    fn passing_threshold_boundary_passes() {
        let questions = vec![question("q1", "math", "A"), question("q2", "math", "B")];

        // Exactly at the threshold: 1/2 = 50%.
        let at = score(&questions, &answers(&[("q1", "A"), ("q2", "D")]), 50.0).unwrap();
        assert!(at.passed);

        let below = score(&questions, &answers(&[("q1", "A"), ("q2", "D")]), 50.01).unwrap();
        assert!(!below.passed);
    }

    #[test]
    fn answer_comparison_is_case_sensitive() {
        let questions = vec![question("q1", "math", "A")];
        let card = score(&questions, &answers(&[("q1", "a")]), 50.0).unwrap();

        assert_eq!(card.wrong_answers, 1);
        assert_eq!(card.correct_answers, 0);
    }

    #[test]
    fn three_of_five_answered_scores_forty_percent() {
        let questions = vec![
            question("q1", "math", "A"),
            question("q2", "math", "B"),
            question("q3", "physics", "C"),
            question("q4", "physics", "D"),
            question("q5", "chemistry", "A"),
        ];
        // 2 correct, 1 wrong, 2 skipped.
        let card =
            score(&questions, &answers(&[("q1", "A"), ("q2", "B"), ("q3", "A")]), 50.0).unwrap();

        assert_eq!(card.correct_answers, 2);
        assert_eq!(card.wrong_answers, 1);
        assert_eq!(card.skipped_questions, 2);
        assert_eq!(card.percentage, 40.0);
        assert_eq!(card.score, 2);
        assert!(!card.passed);
    }

    #[test]
    fn subject_breakdown_aggregates_per_subject() {
        let questions = vec![
            question("q1", "math", "A"),
            question("q2", "math", "B"),
            question("q3", "physics", "C"),
        ];
        let card = score(&questions, &answers(&[("q1", "A"), ("q3", "C")]), 50.0).unwrap();

        let math = &card.subject_scores["math"];
        assert_eq!((math.total, math.correct), (2, 1));
        assert_eq!(math.percentage, 50.0);

        let physics = &card.subject_scores["physics"];
        assert_eq!((physics.total, physics.correct), (1, 1));
        assert_eq!(physics.percentage, 100.0);
    }
}
