use std::time::Duration;

use bridge_runtime::{
    execute_action_message, DEFAULT_MAX_FRAME_BYTES, GET_OBSERVATION_COMMAND, HELLO_COMMAND,
};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out after {0} ms waiting for a reply")]
    Timeout(u64),
    #[error("server closed the connection")]
    Closed,
    #[error("reply of {0} bytes exceeds the frame limit")]
    TooLarge(usize),
}

/// One request-reply connection. Connects lazily and reconnects after any
/// transport failure, since a failed exchange leaves the stream out of step.
pub struct BridgeClient {
    endpoint: String,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl BridgeClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            stream: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one frame and wait for the reply frame.
    pub async fn request(&mut self, message: &str) -> Result<String, ClientError> {
        let timeout_ms = self.timeout.as_millis() as u64;
        let result = match tokio::time::timeout(self.timeout, self.exchange(message)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(timeout_ms)),
        };
        if result.is_err() {
            self.stream = None;
        }
        result
    }

    pub async fn hello(&mut self) -> Result<String, ClientError> {
        self.request(HELLO_COMMAND).await
    }

    /// Observation document, or an error document if the exchange failed.
    pub async fn get_observation(&mut self) -> Value {
        self.request_json(GET_OBSERVATION_COMMAND).await
    }

    pub async fn execute_action(&mut self, action_type: &str, parameters: &Value) -> Value {
        let message = execute_action_message(action_type, parameters);
        self.request_json(&message).await
    }

    async fn request_json(&mut self, message: &str) -> Value {
        match self.request(message).await {
            Ok(reply) => parse_reply(&reply),
            Err(err) => {
                warn!(endpoint = %self.endpoint, error = %err, "request.failed");
                error_document(err.to_string())
            }
        }
    }

    async fn exchange(&mut self, message: &str) -> Result<String, ClientError> {
        if self.stream.is_none() {
            let stream = TcpStream::connect(&self.endpoint)
                .await
                .map_err(|source| ClientError::Connect {
                    endpoint: self.endpoint.clone(),
                    source,
                })?;
            stream.set_nodelay(true)?;
            self.stream = Some(stream);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(ClientError::Closed);
        };

        let len = message.len() as u32;
        let mut frame = Vec::with_capacity(4 + message.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(message.as_bytes());
        stream.write_all(&frame).await?;
        debug!(bytes = message.len(), "request.sent");

        let mut len_buf = [0u8; 4];
        match stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(ClientError::Closed)
            }
            Err(err) => return Err(err.into()),
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        if len > DEFAULT_MAX_FRAME_BYTES {
            return Err(ClientError::TooLarge(len));
        }
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await?;
        debug!(bytes = len, "reply.received");
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }
}

pub fn error_document(message: impl Into<String>) -> Value {
    json!({"status": "error", "message": message.into()})
}

/// Replies that are not JSON are wrapped in an error document that keeps the
/// raw text.
pub fn parse_reply(reply: &str) -> Value {
    match serde_json::from_str(reply) {
        Ok(value) => value,
        Err(err) => json!({
            "status": "error",
            "message": format!("Failed to decode JSON response: {reply}. Error: {err}"),
            "raw_response": reply,
        }),
    }
}
