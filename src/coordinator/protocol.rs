//! Wire Protocol
//!
//! Frame layouts and the typed send/receive operations built on them. One
//! protocol frame is one bus message:
//!
//! - command: a single byte;
//! - answer key: an `i32` length frame, then the raw bytes;
//! - exam batch: an `i32` batch size, then per exam a 12-byte header
//!   `(stage, id_exam, answers_size)` and, when `answers_size > 0`, a
//!   packed array of 8-byte `(qst_idx, ans_idx)` records;
//! - result batch: an `i32` count, then 28-byte result records
//!   `(stage, id_exam, correct, wrong, unscored, score)`.
//!
//! Integers are native endian (homogeneous cohort). Records are encoded
//! field by field in declared order (an explicit displacement list), never
//! a struct transmute. Receives validate every size before trusting it:
//! outer sizes must be positive (senders skip empty batches entirely), an
//! exam's answer count must be non-negative, and every fixed-size frame
//! must have exactly its expected length.

use super::bus::BusEndpoint;
use super::error::{BusError, CoordinatorError, ProtocolError};
use super::types::{Answer, Command, Exam, ExamScore, Rank, Tag};

const I32_LEN: usize = 4;
const F64_LEN: usize = 8;
const ANSWER_LEN: usize = 2 * I32_LEN;
const EXAM_HEADER_LEN: usize = 3 * I32_LEN;
const RESULT_LEN: usize = 5 * I32_LEN + F64_LEN;

// ------------------------------------------------------------------
// Frame codec
// ------------------------------------------------------------------

pub(crate) fn encode_command(command: Command) -> Vec<u8> {
    vec![command.as_byte()]
}

pub(crate) fn decode_command(frame: &[u8]) -> Result<Command, ProtocolError> {
    expect_len("command", frame, 1)?;
    match frame[0] {
        1 => Ok(Command::Review),
        2 => Ok(Command::Shutdown),
        unknown => Err(ProtocolError::UnknownCommand(unknown)),
    }
}

pub(crate) fn encode_i32(value: i32) -> Vec<u8> {
    value.to_ne_bytes().to_vec()
}

pub(crate) fn decode_positive_i32(
    field: &'static str,
    frame: &[u8],
) -> Result<i32, ProtocolError> {
    expect_len(field, frame, I32_LEN)?;
    let value = read_i32(frame, 0);
    if value <= 0 {
        return Err(ProtocolError::NonPositiveSize { field, value });
    }
    Ok(value)
}

pub(crate) fn encode_exam_header(exam: &Exam) -> Result<Vec<u8>, ProtocolError> {
    let answers_size = frame_size("answers size", exam.answers.len())?;
    let mut frame = Vec::with_capacity(EXAM_HEADER_LEN);
    frame.extend_from_slice(&exam.stage.to_ne_bytes());
    frame.extend_from_slice(&exam.id_exam.to_ne_bytes());
    frame.extend_from_slice(&answers_size.to_ne_bytes());
    Ok(frame)
}

pub(crate) fn decode_exam_header(frame: &[u8]) -> Result<(i32, i32, i32), ProtocolError> {
    expect_len("exam header", frame, EXAM_HEADER_LEN)?;
    let stage = read_i32(frame, 0);
    let id_exam = read_i32(frame, I32_LEN);
    let answers_size = read_i32(frame, 2 * I32_LEN);
    if answers_size < 0 {
        return Err(ProtocolError::NegativeSize {
            field: "answers size",
            value: answers_size,
        });
    }
    Ok((stage, id_exam, answers_size))
}

pub(crate) fn encode_answers(answers: &[Answer]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(answers.len() * ANSWER_LEN);
    for answer in answers {
        frame.extend_from_slice(&answer.qst_idx.to_ne_bytes());
        frame.extend_from_slice(&answer.ans_idx.to_ne_bytes());
    }
    frame
}

pub(crate) fn decode_answers(frame: &[u8], count: usize) -> Result<Vec<Answer>, ProtocolError> {
    expect_len("exam answers", frame, count * ANSWER_LEN)?;
    Ok((0..count)
        .map(|index| {
            let offset = index * ANSWER_LEN;
            Answer {
                qst_idx: read_i32(frame, offset),
                ans_idx: read_i32(frame, offset + I32_LEN),
            }
        })
        .collect())
}

pub(crate) fn encode_result(result: &ExamScore) -> Vec<u8> {
    let mut frame = Vec::with_capacity(RESULT_LEN);
    frame.extend_from_slice(&result.stage.to_ne_bytes());
    frame.extend_from_slice(&result.id_exam.to_ne_bytes());
    frame.extend_from_slice(&result.correct.to_ne_bytes());
    frame.extend_from_slice(&result.wrong.to_ne_bytes());
    frame.extend_from_slice(&result.unscored.to_ne_bytes());
    frame.extend_from_slice(&result.score.to_ne_bytes());
    frame
}

pub(crate) fn decode_result(frame: &[u8]) -> Result<ExamScore, ProtocolError> {
    expect_len("result", frame, RESULT_LEN)?;
    let score_bytes: [u8; F64_LEN] = frame[5 * I32_LEN..]
        .try_into()
        .expect("length checked above");
    Ok(ExamScore {
        stage: read_i32(frame, 0),
        id_exam: read_i32(frame, I32_LEN),
        correct: read_i32(frame, 2 * I32_LEN),
        wrong: read_i32(frame, 3 * I32_LEN),
        unscored: read_i32(frame, 4 * I32_LEN),
        score: f64::from_ne_bytes(score_bytes),
    })
}

fn read_i32(frame: &[u8], offset: usize) -> i32 {
    let bytes: [u8; I32_LEN] = frame[offset..offset + I32_LEN]
        .try_into()
        .expect("length checked by caller");
    i32::from_ne_bytes(bytes)
}

fn expect_len(field: &'static str, frame: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if frame.len() != expected {
        return Err(ProtocolError::FrameLength {
            field,
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}

fn frame_size(field: &'static str, value: usize) -> Result<i32, ProtocolError> {
    i32::try_from(value).map_err(|_| ProtocolError::Oversize { field, value })
}

// ------------------------------------------------------------------
// Typed operations
// ------------------------------------------------------------------

pub fn send_command(
    bus: &BusEndpoint,
    dest: Rank,
    command: Command,
) -> Result<(), CoordinatorError> {
    bus.send(dest, Tag::Command, encode_command(command))
        .map_err(transport("send command"))
}

pub fn receive_command(bus: &BusEndpoint, src: Rank) -> Result<Command, CoordinatorError> {
    let frame = bus
        .recv(src, Tag::Command)
        .map_err(transport("receive command"))?;
    Ok(decode_command(&frame)?)
}

pub fn send_answer_key(
    bus: &BusEndpoint,
    dest: Rank,
    key_blob: &str,
) -> Result<(), CoordinatorError> {
    let size = frame_size("answer key size", key_blob.len())?;
    bus.send(dest, Tag::Answers, encode_i32(size))
        .map_err(transport("send answer key size"))?;
    bus.send(dest, Tag::Answers, key_blob.as_bytes().to_vec())
        .map_err(transport("send answer key"))
}

pub fn receive_answer_key(bus: &BusEndpoint, src: Rank) -> Result<String, CoordinatorError> {
    let size_frame = bus
        .recv(src, Tag::Answers)
        .map_err(transport("receive answer key size"))?;
    let size = decode_positive_i32("answer key size", &size_frame)?;

    let blob = bus
        .recv(src, Tag::Answers)
        .map_err(transport("receive answer key"))?;
    expect_len("answer key", &blob, size as usize)?;
    String::from_utf8(blob).map_err(|_| ProtocolError::InvalidKeyEncoding.into())
}

pub fn send_exam_batch(
    bus: &BusEndpoint,
    dest: Rank,
    exams: &[Exam],
) -> Result<(), CoordinatorError> {
    let batch_size = frame_size("exam batch size", exams.len())?;
    bus.send(dest, Tag::Exams, encode_i32(batch_size))
        .map_err(transport("send exam batch size"))?;
    for exam in exams {
        bus.send(dest, Tag::Exams, encode_exam_header(exam)?)
            .map_err(transport("send exam header"))?;
        if !exam.answers.is_empty() {
            bus.send(dest, Tag::Exams, encode_answers(&exam.answers))
                .map_err(transport("send exam answers"))?;
        }
    }
    Ok(())
}

pub fn receive_exam_batch(bus: &BusEndpoint, src: Rank) -> Result<Vec<Exam>, CoordinatorError> {
    let size_frame = bus
        .recv(src, Tag::Exams)
        .map_err(transport("receive exam batch size"))?;
    let batch_size = decode_positive_i32("exam batch size", &size_frame)?;

    let mut exams = Vec::with_capacity(batch_size as usize);
    for _ in 0..batch_size {
        let header_frame = bus
            .recv(src, Tag::Exams)
            .map_err(transport("receive exam header"))?;
        let (stage, id_exam, answers_size) = decode_exam_header(&header_frame)?;

        let answers = if answers_size > 0 {
            let answers_frame = bus
                .recv(src, Tag::Exams)
                .map_err(transport("receive exam answers"))?;
            decode_answers(&answers_frame, answers_size as usize)?
        } else {
            Vec::new()
        };

        exams.push(Exam {
            stage,
            id_exam,
            answers,
        });
    }
    Ok(exams)
}

pub fn send_results(
    bus: &BusEndpoint,
    dest: Rank,
    results: &[ExamScore],
) -> Result<(), CoordinatorError> {
    let count = frame_size("result count", results.len())?;
    bus.send(dest, Tag::Results, encode_i32(count))
        .map_err(transport("send result count"))?;
    for result in results {
        bus.send(dest, Tag::Results, encode_result(result))
            .map_err(transport("send results"))?;
    }
    Ok(())
}

pub fn receive_results(
    bus: &BusEndpoint,
    src: Rank,
) -> Result<Vec<ExamScore>, CoordinatorError> {
    let count_frame = bus
        .recv(src, Tag::Results)
        .map_err(transport("receive result count"))?;
    let count = decode_positive_i32("result count", &count_frame)?;

    let mut results = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let result_frame = bus
            .recv(src, Tag::Results)
            .map_err(transport("receive results"))?;
        results.push(decode_result(&result_frame)?);
    }
    Ok(results)
}

fn transport(op: &'static str) -> impl FnOnce(BusError) -> CoordinatorError {
    move |source| CoordinatorError::Transport { op, source }
}
