//! Shared runtime utilities for the AI bridge.
//!
//! This crate re-exports the data contracts from `bridge_schema` and adds the
//! pieces both ends of the socket need without pulling in the simulation
//! side: the typed action vocabulary, its validator, wire-message parsing and
//! the length-prefixed frame codec.

pub use bridge_schema::*;

pub mod actions;
pub mod command_text;
pub mod frame;
pub mod validate;

pub use actions::{
    ActionKind, ActionRequest, DEFAULT_INVENTORY_ACTION, DEFAULT_OBJECT_ACTION, NO_CHILD,
};
pub use command_text::{
    execute_action_message, parse_wire_message, WireRequest, EXECUTE_ACTION_PREFIX,
    GET_OBSERVATION_COMMAND, HELLO_COMMAND, HELLO_REPLY, UNKNOWN_COMMAND_REPLY,
};
pub use frame::{read_frame, write_frame, FrameError, DEFAULT_MAX_FRAME_BYTES};
pub use validate::{
    parse_action_payload, validate, ActionPayloadError, ParamType, ValidatedAction,
    ValidationError,
};
