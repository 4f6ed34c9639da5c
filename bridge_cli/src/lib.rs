//! Agent-side client for the AI bridge request socket.

pub mod client;

pub use client::{error_document, parse_reply, BridgeClient, ClientError};
