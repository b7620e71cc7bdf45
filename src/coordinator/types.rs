use serde::{Deserialize, Serialize};

/// Identity of a participant on the message bus. Rank 0 is the master;
/// ranks `1..size` are workers. The cohort size is fixed when the fabric
/// is built.
pub type Rank = usize;

pub const MASTER_RANK: Rank = 0;

/// Control command, one byte on the wire. Receiving any other byte is a
/// fatal protocol error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Review = 1,
    Shutdown = 2,
}

impl Command {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Routing selector carried by every frame. Each `(peer, tag)` pair is its
/// own ordered stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Command,
    Answers,
    Exams,
    Results,
}

/// One answered question of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub qst_idx: i32,
    pub ans_idx: i32,
}

/// One exam submission. `stage` selects the answer-key variant; `id_exam`
/// is opaque and echoed in the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub stage: i32,
    pub id_exam: i32,
    pub answers: Vec<Answer>,
}

/// Scoring outcome for one exam. `correct + wrong + unscored` equals the
/// exam's answer count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExamScore {
    pub stage: i32,
    pub id_exam: i32,
    pub correct: i32,
    pub wrong: i32,
    pub unscored: i32,
    pub score: f64,
}
