use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{OptionCode, QuestionId};
use crate::state::SubmissionTrigger;

/// Grading outcome for one question, as reported by the grading service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub selected: Option<OptionCode>,
    pub correct: Option<OptionCode>,
    pub is_correct: bool,
}

/// Score summary returned by the grading service after a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub obtained_marks: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub completed_at: DateTime<Utc>,
    pub question_results: Vec<QuestionOutcome>,
}

impl SubmissionResult {
    #[must_use]
    pub fn performance(&self) -> PerformanceLevel {
        PerformanceLevel::from_percentage(self.percentage)
    }
}

/// Coarse banding of a percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl PerformanceLevel {
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Self::Excellent
        } else if percentage >= 75.0 {
            Self::Good
        } else if percentage >= 60.0 {
            Self::Average
        } else {
            Self::NeedsImprovement
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }
}

/// Everything a result screen needs once a session has completed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub exam_name: String,
    pub result: SubmissionResult,
    pub trigger: SubmissionTrigger,
    pub time_used_secs: u32,
    pub time_remaining_secs: u32,
    pub answered: usize,
    pub question_count: usize,
}

impl SessionReport {
    #[must_use]
    pub fn performance(&self) -> PerformanceLevel {
        self.result.performance()
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.trigger == SubmissionTrigger::TimeExpired
    }
}
