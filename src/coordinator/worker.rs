//! Worker-Side Round Loop
//!
//! A scoring worker blocks on the master's command stream. `Review` is
//! followed by an answer-key blob (installed into the worker's key store,
//! replacing the shipped stages) and an exam batch; the worker scores the
//! batch and returns one result per exam. `Shutdown` ends the loop. A
//! worker left idle by a round never sees a command for it and simply
//! stays blocked until the shutdown fan-out.

use super::bus::BusEndpoint;
use super::error::CoordinatorError;
use super::protocol;
use super::types::{Command, Exam, ExamScore, Rank, MASTER_RANK};
use crate::grading::answers::AnswerKeyStore;
use crate::grading::engine;

pub struct ScoringWorker {
    bus: BusEndpoint,
    keys: AnswerKeyStore,
}

impl ScoringWorker {
    /// Wraps a worker endpoint with a fresh key store. The master endpoint
    /// is rejected.
    pub fn new(bus: BusEndpoint) -> Result<Self, CoordinatorError> {
        if bus.rank() == MASTER_RANK {
            return Err(CoordinatorError::NotWorker);
        }
        Ok(Self {
            bus,
            keys: AnswerKeyStore::new(),
        })
    }

    pub fn rank(&self) -> Rank {
        self.bus.rank()
    }

    /// Blocks on the next command. Returns `None` on `Shutdown`; on
    /// `Review`, installs the shipped key and returns the exam batch.
    pub fn receive_round(&self) -> Result<Option<Vec<Exam>>, CoordinatorError> {
        match protocol::receive_command(&self.bus, MASTER_RANK)? {
            Command::Shutdown => Ok(None),
            Command::Review => {
                let key_blob = protocol::receive_answer_key(&self.bus, MASTER_RANK)?;
                self.keys.load_from_json(&key_blob)?;
                let exams = protocol::receive_exam_batch(&self.bus, MASTER_RANK)?;
                Ok(Some(exams))
            }
        }
    }

    pub fn send_round(&self, results: &[ExamScore]) -> Result<(), CoordinatorError> {
        tracing::debug!("Sending {} results to master", results.len());
        protocol::send_results(&self.bus, MASTER_RANK, results)
    }

    /// Serves review rounds until the master says shutdown.
    pub fn run(&self) -> Result<(), CoordinatorError> {
        loop {
            let Some(exams) = self.receive_round()? else {
                tracing::info!("Worker {} shutting down", self.bus.rank());
                return Ok(());
            };

            tracing::info!("Worker {} scoring {} exams", self.bus.rank(), exams.len());
            let results: Vec<ExamScore> = exams
                .iter()
                .map(|exam| engine::score_exam(exam, &self.keys))
                .collect();

            self.send_round(&results)?;
        }
    }
}
