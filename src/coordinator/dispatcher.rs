//! Master-Side Dispatcher
//!
//! Partitions an exam batch across the worker ranks, ships each active
//! worker its key and slice, and gathers the results in the order the
//! workers were registered. The active-worker roster is per-round state:
//! cleared at the start of every dispatch, and the sole source of truth
//! for the following gather.

use super::bus::BusEndpoint;
use super::error::CoordinatorError;
use super::protocol;
use super::types::{Command, Exam, ExamScore, Rank, MASTER_RANK};
use crate::grading::answers::AnswerKeyStore;

pub struct Dispatcher {
    bus: BusEndpoint,
    active_workers: Vec<Rank>,
}

impl Dispatcher {
    /// Wraps the master endpoint. Any other rank is rejected.
    pub fn new(bus: BusEndpoint) -> Result<Self, CoordinatorError> {
        if bus.rank() != MASTER_RANK {
            return Err(CoordinatorError::NotMaster(bus.rank()));
        }
        Ok(Self {
            bus,
            active_workers: Vec::new(),
        })
    }

    /// Slices `exams` across the workers and sends each active worker, in
    /// rank order: the `Review` command, the answer key restricted to its
    /// slice's stages, and the exam batch.
    ///
    /// A failure mid-round aborts the round but does not undo sends
    /// already delivered to earlier workers; recovery belongs to the
    /// caller.
    pub fn dispatch(
        &mut self,
        exams: Vec<Exam>,
        keys: &AnswerKeyStore,
    ) -> Result<(), CoordinatorError> {
        let worker_count = self.bus.size().saturating_sub(1);
        let slices = slice_exams(exams, worker_count);

        self.active_workers.clear();

        if slices.is_empty() {
            tracing::warn!("No workers to send exams to");
            return Ok(());
        }

        tracing::info!(
            "Sending work to {} active workers out of {} available",
            slices.len(),
            worker_count
        );

        for (index, slice) in slices.into_iter().enumerate() {
            let worker_rank = index + 1; // rank 0 is the master

            let required_stages: Vec<i32> = slice.iter().map(|exam| exam.stage).collect();
            let key_blob = keys.serialize_for_stages(&required_stages)?;

            tracing::info!("Sending {} exams to worker {}", slice.len(), worker_rank);
            self.active_workers.push(worker_rank);

            protocol::send_command(&self.bus, worker_rank, Command::Review)?;
            protocol::send_answer_key(&self.bus, worker_rank, &key_blob)?;
            protocol::send_exam_batch(&self.bus, worker_rank, &slice)?;
        }
        Ok(())
    }

    /// Receives one result batch per active worker, in registration order,
    /// and concatenates them. Empty when the last dispatch sent nothing.
    pub fn gather(&self) -> Result<Vec<ExamScore>, CoordinatorError> {
        if self.active_workers.is_empty() {
            tracing::warn!("No active workers to receive results from");
            return Ok(Vec::new());
        }

        tracing::info!(
            "Waiting for results from {} active workers",
            self.active_workers.len()
        );

        let mut results = Vec::new();
        for &worker_rank in &self.active_workers {
            tracing::debug!("Receiving results from worker {}", worker_rank);
            results.extend(protocol::receive_results(&self.bus, worker_rank)?);
        }

        tracing::info!(
            "Received {} total results from all active workers",
            results.len()
        );
        Ok(results)
    }

    /// Sends `Shutdown` to every worker rank, idle ones included; this is
    /// what unblocks workers that received no slice this round.
    pub fn shutdown_all(&self) -> Result<(), CoordinatorError> {
        for worker_rank in 1..self.bus.size() {
            protocol::send_command(&self.bus, worker_rank, Command::Shutdown)?;
        }
        Ok(())
    }

    pub fn active_workers(&self) -> &[Rank] {
        &self.active_workers
    }
}

/// Splits `exams` into at most `min(workers, exams)` contiguous slices of
/// `ceil(E / A)` exams each; only the last slice may be smaller, and no
/// slice is ever empty. An empty input (or no workers) yields no slices.
pub(crate) fn slice_exams(exams: Vec<Exam>, workers: usize) -> Vec<Vec<Exam>> {
    let total_exams = exams.len();
    if total_exams == 0 {
        tracing::warn!("No exams to slice");
        return Vec::new();
    }
    if workers == 0 {
        return Vec::new();
    }

    let active_workers = workers.min(total_exams);
    let exams_per_worker = total_exams.div_ceil(active_workers);

    tracing::info!(
        "Distributing {} exams among {} active workers ({} exams per worker)",
        total_exams,
        active_workers,
        exams_per_worker
    );

    let mut slices = Vec::with_capacity(active_workers);
    let mut remaining = exams.into_iter();
    loop {
        let slice: Vec<Exam> = remaining.by_ref().take(exams_per_worker).collect();
        if slice.is_empty() {
            break;
        }
        slices.push(slice);
    }
    slices
}
