//! JSON shapes exchanged with the exam bank and the grading service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use exam_core::model::{
    ContentError, ExamId, ExamMeta, OptionCode, Question, QuestionId, QuestionOption,
    QuestionOutcome, SubmissionResult,
};

//
// ─── EXAM CONTENT ──────────────────────────────────────────────────────────────
//

/// Body of `GET /exams/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExamResponse {
    #[serde(default)]
    pub id: Option<ExamId>,
    pub name: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub questions: Vec<QuestionDto>,
}

/// One question with its four option slots. Blank slots are dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionDto {
    pub id: QuestionId,
    #[serde(alias = "question_text", alias = "text")]
    pub question: String,
    #[serde(default)]
    pub option_a: Option<String>,
    #[serde(default)]
    pub option_b: Option<String>,
    #[serde(default)]
    pub option_c: Option<String>,
    #[serde(default)]
    pub option_d: Option<String>,
}

impl QuestionDto {
    /// # Errors
    ///
    /// Returns `ContentError::NoOptions` if every slot is blank.
    pub fn into_question(self) -> Result<Question, ContentError> {
        let slots = [
            (OptionCode::A, self.option_a),
            (OptionCode::B, self.option_b),
            (OptionCode::C, self.option_c),
            (OptionCode::D, self.option_d),
        ];
        let options = slots
            .into_iter()
            .filter_map(|(code, text)| {
                text.filter(|t| !t.trim().is_empty())
                    .map(|t| QuestionOption::new(code, t))
            })
            .collect();
        Question::new(self.id, self.question, options)
    }
}

impl ExamResponse {
    /// Split into metadata and validated questions.
    ///
    /// A missing or zero duration is reported as `None`.
    ///
    /// # Errors
    ///
    /// Returns the first `ContentError` produced by a question.
    pub fn into_parts(self, requested: ExamId) -> Result<(ExamMeta, Vec<Question>), ContentError> {
        let meta = ExamMeta {
            id: self.id.unwrap_or(requested),
            name: self.name,
            duration_secs: self
                .duration_minutes
                .filter(|minutes| *minutes > 0)
                .map(|minutes| minutes.saturating_mul(60)),
        };
        let questions = self
            .questions
            .into_iter()
            .map(QuestionDto::into_question)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((meta, questions))
    }
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// Marker sent for a question left unanswered.
pub const NO_ANSWER: &str = "";

/// Body of `POST /exams/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub exam_id: ExamId,
    pub answers: Vec<AnswerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_id: QuestionId,
    /// Option code, or [`NO_ANSWER`].
    pub selected_option: String,
}

impl AnswerEntry {
    #[must_use]
    pub fn new(question_id: QuestionId, selected: Option<OptionCode>) -> Self {
        Self {
            question_id,
            selected_option: selected.map_or_else(|| NO_ANSWER.to_string(), |c| c.to_string()),
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<OptionCode> {
        self.selected_option.parse().ok()
    }
}

/// Grading response. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionResponse {
    #[serde(default)]
    pub obtained_marks: Option<f64>,
    #[serde(default)]
    pub total_marks: Option<f64>,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub correct_answers: Option<u32>,
    #[serde(default)]
    pub wrong_answers: Option<u32>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub question_results: Vec<QuestionResultDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionResultDto {
    pub question_id: QuestionId,
    #[serde(default)]
    pub selected_option: Option<String>,
    #[serde(default)]
    pub correct_option: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
}

impl SubmissionResponse {
    /// Fill the gaps the grading service may leave.
    ///
    /// Total marks default to the question count, the percentage is derived
    /// from the marks, and a missing completion time becomes `now`.
    #[must_use]
    pub fn into_result(self, question_count: usize, now: DateTime<Utc>) -> SubmissionResult {
        let obtained_marks = self.obtained_marks.unwrap_or(0.0);
        let total_marks = self
            .total_marks
            .unwrap_or_else(|| f64::from(u32::try_from(question_count).unwrap_or(u32::MAX)));
        let percentage = self.percentage.unwrap_or_else(|| {
            if total_marks > 0.0 {
                obtained_marks / total_marks * 100.0
            } else {
                0.0
            }
        });
        let correct_answers = self.correct_answers.unwrap_or(0);
        let wrong_answers = self.wrong_answers.unwrap_or(0);
        let question_results = self
            .question_results
            .into_iter()
            .map(|dto| QuestionOutcome {
                question_id: dto.question_id,
                selected: dto.selected_option.and_then(|raw| raw.parse().ok()),
                correct: dto.correct_option.and_then(|raw| raw.parse().ok()),
                is_correct: dto.is_correct,
            })
            .collect();
        SubmissionResult {
            obtained_marks,
            total_marks,
            percentage,
            correct_answers,
            wrong_answers,
            completed_at: self.completed_at.unwrap_or(now),
            question_results,
        }
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

/// Human-readable detail from an error body.
///
/// Handles `{"detail": "..."}`, a list of `{"msg": ...}` entries, or any other
/// JSON value. Falls back to the raw text.
#[must_use]
pub fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.detail);
    match detail {
        Some(Value::String(text)) => text,
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item.get("msg") {
                Some(Value::String(msg)) => msg.clone(),
                _ => item.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
        None => body.trim().to_string(),
    }
}
