use serde_json::{json, Value};

pub const HELLO_COMMAND: &str = "hello";
pub const HELLO_REPLY: &str = "Received hello";
pub const GET_OBSERVATION_COMMAND: &str = "command:get_observation";
pub const EXECUTE_ACTION_PREFIX: &str = "command:execute_action:";
pub const UNKNOWN_COMMAND_REPLY: &str = "Error: Unknown command";

/// The three message shapes the request server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireRequest<'a> {
    Hello,
    GetObservation,
    /// Carries the raw JSON suffix after the prefix.
    ExecuteAction(&'a str),
    Unknown,
}

/// Classify one request frame.
///
/// The greeting and observation commands match case-insensitively; the action
/// prefix is matched exactly since the payload after it is JSON. Frames are
/// compared as sent, without trimming.
pub fn parse_wire_message(input: &str) -> WireRequest<'_> {
    if input.eq_ignore_ascii_case(HELLO_COMMAND) {
        return WireRequest::Hello;
    }
    if input.eq_ignore_ascii_case(GET_OBSERVATION_COMMAND) {
        return WireRequest::GetObservation;
    }
    match input.strip_prefix(EXECUTE_ACTION_PREFIX) {
        Some(payload) => WireRequest::ExecuteAction(payload),
        None => WireRequest::Unknown,
    }
}

/// Build the `command:execute_action:` frame for an action kind and its
/// parameter object.
pub fn execute_action_message(action_type: &str, parameters: &Value) -> String {
    let envelope = json!({
        "action_type": action_type,
        "parameters": parameters,
    });
    format!("{EXECUTE_ACTION_PREFIX}{envelope}")
}
