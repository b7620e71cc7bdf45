//! Scoring Engine
//!
//! Maps one exam plus the installed answer keys to a result record.

use super::answers::AnswerKeyStore;
use crate::coordinator::types::{Exam, ExamScore};

/// Scores an exam against the stage-keyed store.
///
/// Each answer compares against the key for the exam's stage: a match is
/// `correct`, a mismatch is `wrong`, and a question the key does not know
/// (including a whole missing stage) is `unscored`. The three counters
/// always sum to the number of answers. The score is the correct fraction,
/// `0.0` for an exam without answers.
pub fn score_exam(exam: &Exam, keys: &AnswerKeyStore) -> ExamScore {
    let mut correct = 0i32;
    let mut wrong = 0i32;
    let mut unscored = 0i32;

    for answer in &exam.answers {
        match keys.lookup(exam.stage, answer.qst_idx) {
            Some(expected) if expected == answer.ans_idx => correct += 1,
            Some(_) => wrong += 1,
            None => unscored += 1,
        }
    }

    let total = exam.answers.len();
    let score = if total == 0 {
        0.0
    } else {
        f64::from(correct) / total as f64
    };

    ExamScore {
        stage: exam.stage,
        id_exam: exam.id_exam,
        correct,
        wrong,
        unscored,
        score,
    }
}
