//! Answer-Key Stores
//!
//! Two in-memory stores with different lifecycles:
//!
//! - [`AnswerKeyStore`] is stage-keyed and lives on scoring workers. A
//!   review round ships a JSON blob restricted to the stages of the
//!   worker's slice; loading it replaces those stages and keeps the rest,
//!   so a key survives until the next review that covers it.
//! - [`AnswerStore`] is the flat key behind the TCP command surface.
//!   `[set-answers]` replaces it wholesale, so readers either see the old
//!   key or the new one, never a mix.

use std::collections::HashMap;
use std::sync::RwLock;

use dashmap::DashMap;

use super::types::{AnswerEntry, CheckReport, CheckedAnswer, StageKey};
use crate::coordinator::types::Answer;

#[derive(Default)]
pub struct AnswerKeyStore {
    stages: DashMap<i32, HashMap<i32, i32>>,
}

impl AnswerKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs (or replaces) the key for one stage.
    pub fn set_stage(&self, stage: i32, answers: &[Answer]) {
        let key: HashMap<i32, i32> = answers
            .iter()
            .map(|answer| (answer.qst_idx, answer.ans_idx))
            .collect();
        self.stages.insert(stage, key);
    }

    /// Expected answer index for a question, if the stage and question are
    /// known.
    pub fn lookup(&self, stage: i32, qst_idx: i32) -> Option<i32> {
        self.stages
            .get(&stage)
            .and_then(|key| key.get(&qst_idx).copied())
    }

    /// Loads a serialized key blob, replacing exactly the stages it names.
    pub fn load_from_json(&self, blob: &str) -> Result<(), serde_json::Error> {
        let stage_keys: Vec<StageKey> = serde_json::from_str(blob)?;
        for stage_key in stage_keys {
            self.set_stage(stage_key.stage, &stage_key.answers);
        }
        Ok(())
    }

    /// Serializes the keys for the requested stages (deduplicated, first
    /// occurrence first) into the blob format `load_from_json` accepts.
    /// Stages with no installed key are skipped with a warning.
    pub fn serialize_for_stages(&self, stages: &[i32]) -> Result<String, serde_json::Error> {
        let mut requested = Vec::new();
        for &stage in stages {
            if !requested.contains(&stage) {
                requested.push(stage);
            }
        }

        let mut payload = Vec::with_capacity(requested.len());
        for stage in requested {
            let Some(key) = self.stages.get(&stage) else {
                tracing::warn!("No answer key installed for stage {}", stage);
                continue;
            };
            let mut answers: Vec<Answer> = key
                .iter()
                .map(|(&qst_idx, &ans_idx)| Answer { qst_idx, ans_idx })
                .collect();
            answers.sort_by_key(|answer| answer.qst_idx);
            payload.push(StageKey { stage, answers });
        }
        serde_json::to_string(&payload)
    }
}

#[derive(Default)]
pub struct AnswerStore {
    entries: RwLock<HashMap<u16, u16>>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole key in one assignment.
    pub fn replace_all(&self, entries: Vec<AnswerEntry>) {
        let key: HashMap<u16, u16> = entries
            .into_iter()
            .map(|entry| (entry.question_id, entry.answer_index))
            .collect();
        *self.entries.write().expect("answer store lock poisoned") = key;
    }

    /// Current key, sorted by question id for stable output.
    pub fn snapshot(&self) -> Vec<AnswerEntry> {
        let key = self.entries.read().expect("answer store lock poisoned");
        let mut entries: Vec<AnswerEntry> = key
            .iter()
            .map(|(&question_id, &answer_index)| AnswerEntry {
                question_id,
                answer_index,
            })
            .collect();
        entries.sort_by_key(|entry| entry.question_id);
        entries
    }

    /// Grades user answers against the key. Answers for questions the key
    /// does not contain are skipped entirely, so `total_questions` counts
    /// only the graded entries.
    pub fn check(&self, user_answers: &[AnswerEntry]) -> CheckReport {
        let key = self.entries.read().expect("answer store lock poisoned");

        let mut answers = Vec::new();
        let mut correct_answers = 0u64;
        for user_answer in user_answers {
            let Some(&expected) = key.get(&user_answer.question_id) else {
                continue;
            };
            let is_correct = expected == user_answer.answer_index;
            if is_correct {
                correct_answers += 1;
            }
            answers.push(CheckedAnswer {
                question_id: user_answer.question_id,
                is_correct,
            });
        }

        CheckReport {
            correct_answers,
            total_questions: answers.len() as u64,
            answers,
        }
    }
}
