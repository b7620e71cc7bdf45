use serde::{Deserialize, Serialize};

use crate::coordinator::types::Answer;

/// One `question_id -> answer_index` pair, the element shape of the
/// `[set-answers]`, `[get-answers]`, and `[check]` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_id: u16,
    pub answer_index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckedAnswer {
    pub question_id: u16,
    pub is_correct: bool,
}

/// Response payload of `[check]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub correct_answers: u64,
    pub total_questions: u64,
    pub answers: Vec<CheckedAnswer>,
}

/// Serialized answer-key element shipped master -> worker: the key for one
/// stage. The full blob is a JSON array of these, restricted to the stages
/// a worker's exam slice actually needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageKey {
    pub stage: i32,
    pub answers: Vec<Answer>,
}
