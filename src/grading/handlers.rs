//! TCP Command Handlers
//!
//! Parses and executes the worker's interactive commands. A request is
//! whitespace-trimmed; the first token selects the command and everything
//! after the first space is the single argument, so JSON payloads may
//! contain spaces.
//!
//! Every outcome, success or failure, is wrapped in the response envelope
//! `[response]\r\n<payload>`; failures use the payload `ERROR: <msg>`. The
//! server appends the frame terminator.

use thiserror::Error;

use super::answers::AnswerStore;
use super::types::AnswerEntry;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Empty request")]
    EmptyRequest,
    #[error("Invalid command: {0}")]
    UnknownCommand(String),
    #[error("Echo command requires a message")]
    MissingEchoMessage,
    #[error("{0} command requires JSON data")]
    MissingJsonPayload(&'static str),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The request handler registered with the TCP server.
pub fn process_request(store: &AnswerStore, request: &str) -> String {
    match execute(store, request) {
        Ok(payload) => format_response(&payload),
        Err(error) => format_error(&error),
    }
}

fn execute(store: &AnswerStore, request: &str) -> Result<String, HandlerError> {
    let mut parts = request.trim().splitn(2, ' ');
    let command = parts.next().unwrap_or("");
    if command.is_empty() {
        return Err(HandlerError::EmptyRequest);
    }
    let argument = parts
        .next()
        .map(str::trim)
        .filter(|argument| !argument.is_empty());

    match command {
        "[echo]" => handle_echo(argument),
        "[set-answers]" => handle_set_answers(store, argument),
        "[get-answers]" => handle_get_answers(store),
        "[check]" => handle_check(store, argument),
        unknown => Err(HandlerError::UnknownCommand(unknown.to_string())),
    }
}

fn handle_echo(argument: Option<&str>) -> Result<String, HandlerError> {
    argument
        .map(str::to_string)
        .ok_or(HandlerError::MissingEchoMessage)
}

fn handle_set_answers(
    store: &AnswerStore,
    argument: Option<&str>,
) -> Result<String, HandlerError> {
    let payload = argument.ok_or(HandlerError::MissingJsonPayload("Set-answers"))?;
    let entries: Vec<AnswerEntry> = serde_json::from_str(payload)?;
    store.replace_all(entries);
    Ok("Answers set successfully".to_string())
}

fn handle_get_answers(store: &AnswerStore) -> Result<String, HandlerError> {
    Ok(serde_json::to_string(&store.snapshot())?)
}

fn handle_check(store: &AnswerStore, argument: Option<&str>) -> Result<String, HandlerError> {
    let payload = argument.ok_or(HandlerError::MissingJsonPayload("Check"))?;
    let user_answers: Vec<AnswerEntry> = serde_json::from_str(payload)?;
    Ok(serde_json::to_string(&store.check(&user_answers))?)
}

pub fn format_response(content: &str) -> String {
    format!("[response]\r\n{}", content)
}

pub fn format_error(error: &HandlerError) -> String {
    format_response(&format!("ERROR: {}", error))
}
