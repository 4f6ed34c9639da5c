//! Request dispatch: one text frame in, one text frame out.

use std::sync::Arc;
use std::time::Duration;

use bridge_runtime::{
    encode_observation_json, parse_action_payload, parse_wire_message, ActionPayloadError,
    ActionReply, ValidationError, WireRequest, HELLO_REPLY, UNKNOWN_COMMAND_REPLY,
};
use tracing::{info, warn};

use crate::bridge::{BridgeHandle, Job};
use crate::config::ObservationConfig;
use crate::executor::action_unit;
use crate::metrics::BridgeMetrics;
use crate::snapshot::build_observation;

#[derive(Clone)]
pub struct RequestHandler {
    bridge: BridgeHandle,
    limits: ObservationConfig,
    observation_timeout: Duration,
    metrics: Arc<BridgeMetrics>,
}

impl RequestHandler {
    pub fn new(
        bridge: BridgeHandle,
        limits: ObservationConfig,
        observation_timeout: Duration,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            bridge,
            limits,
            observation_timeout,
            metrics,
        }
    }

    pub fn handle(&self, message: &str) -> String {
        self.metrics.record_request();
        match parse_wire_message(message) {
            WireRequest::Hello => HELLO_REPLY.to_string(),
            WireRequest::GetObservation => self.observe(),
            WireRequest::ExecuteAction(payload) => self.execute(payload),
            WireRequest::Unknown => {
                warn!(target: "ai_bridge::server", "request.unknown_command");
                UNKNOWN_COMMAND_REPLY.to_string()
            }
        }
    }

    fn observe(&self) -> String {
        let limits = self.limits.clone();
        let built = self.bridge.call(
            "observation",
            move |client| build_observation(client, &limits),
            self.observation_timeout,
        );
        let snapshot = match built {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => return ActionReply::error(err.to_string()).to_json(),
            Err(err) => {
                warn!(target: "ai_bridge::server", error = %err, "observation.failed");
                return ActionReply::error(format!("Failed to build observation: {err}"))
                    .to_json();
            }
        };
        match encode_observation_json(&snapshot) {
            Ok(encoded) => {
                self.metrics.record_observation();
                encoded
            }
            Err(err) => ActionReply::error(format!("Failed to build observation: {err}")).to_json(),
        }
    }

    fn execute(&self, payload: &str) -> String {
        let validated = match parse_action_payload(payload) {
            Ok(validated) => validated,
            Err(err) => {
                self.metrics.record_rejected();
                warn!(target: "ai_bridge::server", error = %err, "action.invalid");
                return rejection(&err).to_json();
            }
        };

        let kind = validated.request.kind();
        let job = Job::new(
            kind.as_str(),
            action_unit(validated.request, Arc::clone(&self.metrics)),
        );
        match self.bridge.submit(job) {
            Ok(()) => {
                self.metrics.record_submitted();
                info!(target: "ai_bridge::server", %kind, "action.submitted");
                ActionReply::submitted(validated.action_type).to_json()
            }
            Err(err) => {
                self.metrics.record_rejected();
                warn!(target: "ai_bridge::server", %kind, error = %err, "action.rejected");
                ActionReply::error(err.to_string())
                    .with_action_type(validated.action_type)
                    .to_json()
            }
        }
    }
}

fn rejection(err: &ActionPayloadError) -> ActionReply {
    let reply = ActionReply::error(err.to_string());
    match err {
        ActionPayloadError::Invalid {
            source: ValidationError::UnknownKind(_),
            ..
        } => reply,
        _ => match err.action_type() {
            Some(action_type) => reply.with_action_type(action_type),
            None => reply,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{bridge, BridgePump, QueueFullPolicy};
    use crate::headless::HeadlessClient;
    use bridge_runtime::{execute_action_message, ActionKind};
    use serde_json::{json, Value};
    use std::thread;

    fn handler(capacity: usize) -> (RequestHandler, BridgePump, Arc<BridgeMetrics>) {
        let metrics = Arc::new(BridgeMetrics::default());
        let (handle, pump) = bridge(capacity, QueueFullPolicy::Reject, Arc::clone(&metrics));
        let handler = RequestHandler::new(
            handle,
            ObservationConfig::default(),
            Duration::from_secs(5),
            Arc::clone(&metrics),
        );
        (handler, pump, metrics)
    }

    fn reply(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    fn observe_with_pump(
        handler: RequestHandler,
        pump: &mut BridgePump,
        client: &mut HeadlessClient,
    ) -> String {
        let caller = thread::spawn(move || handler.handle("command:get_observation"));
        while !caller.is_finished() {
            pump.run_pending(client);
            thread::sleep(Duration::from_millis(1));
        }
        caller.join().unwrap()
    }

    #[test]
    fn hello_and_unknown_commands() {
        let (handler, _pump, _) = handler(4);
        assert_eq!(handler.handle("hello"), "Received hello");
        assert_eq!(handler.handle("status"), "Error: Unknown command");
    }

    #[test]
    fn missing_required_parameter_never_reaches_the_queue() {
        let (handler, pump, metrics) = handler(16);
        for kind in ActionKind::ALL {
            let text = handler.handle(&execute_action_message(kind.as_str(), &json!({})));
            let reply = reply(&text);
            assert_eq!(reply["status"], "error", "{kind}: {text}");
            assert_eq!(reply["action_type"], kind.as_str());
        }
        assert_eq!(pump.pending(), 0);
        assert_eq!(metrics.snapshot().actions_submitted, 0);
        assert_eq!(
            metrics.snapshot().actions_rejected,
            ActionKind::ALL.len() as u64
        );
    }

    #[test]
    fn envelope_errors_match_the_wire_messages() {
        let (handler, _pump, _) = handler(4);
        let missing_kind = reply(&handler.handle(r#"command:execute_action:{"parameters":{}}"#));
        assert_eq!(missing_kind["message"], "Missing action_type");

        let missing_params =
            reply(&handler.handle(r#"command:execute_action:{"action_type":"walk_to"}"#));
        assert_eq!(
            missing_params["message"],
            "Parameters map is null for action: walk_to"
        );

        let unknown = reply(&handler.handle(&execute_action_message("dance", &json!({}))));
        assert_eq!(unknown["message"], "Unknown action_type: dance");
        assert!(unknown.get("action_type").is_none());

        let broken = reply(&handler.handle("command:execute_action:{not json"));
        assert_eq!(broken["status"], "error");
        assert!(broken["message"]
            .as_str()
            .unwrap()
            .starts_with("Failed to handle action:"));
    }

    #[test]
    fn attack_on_unknown_npc_is_submitted_but_invokes_nothing() {
        let (handler, mut pump, metrics) = handler(4);
        let mut client = HeadlessClient::demo();
        let text = handler.handle(&execute_action_message(
            "attack_npc",
            &json!({"npc_id": 999_999}),
        ));
        assert_eq!(text, r#"{"status":"submitted","action_type":"attack_npc"}"#);
        pump.run_pending(&mut client);
        assert!(client.invocations().is_empty());
        assert_eq!(metrics.snapshot().resolution_misses, 1);
    }

    #[test]
    fn action_type_is_echoed_as_sent() {
        let (handler, _pump, _) = handler(4);
        let text = handler.handle(&execute_action_message(
            "WALK_TO",
            &json!({"x": 3200, "y": 3200}),
        ));
        assert_eq!(text, r#"{"status":"submitted","action_type":"WALK_TO"}"#);
    }

    #[test]
    fn full_queue_is_reported_immediately() {
        let (handler, _pump, metrics) = handler(1);
        let message = execute_action_message("type_string", &json!({"text": "hi"}));
        assert_eq!(reply(&handler.handle(&message))["status"], "submitted");
        let second = reply(&handler.handle(&message));
        assert_eq!(second["status"], "error");
        assert_eq!(second["message"], "simulation queue full");
        assert_eq!(metrics.snapshot().actions_rejected, 1);
    }

    #[test]
    fn observation_runs_on_the_pumping_thread() {
        let (handler, mut pump, metrics) = handler(4);
        let mut client = HeadlessClient::demo();
        let text = observe_with_pump(handler, &mut pump, &mut client);
        let reply = reply(&text);
        assert_eq!(reply["player_location"]["x"], 3222);
        assert_eq!(metrics.snapshot().observations, 1);
    }

    #[test]
    fn observation_while_logged_out_is_an_error() {
        let (handler, mut pump, _) = handler(4);
        let mut client = HeadlessClient::new();
        let text = observe_with_pump(handler, &mut pump, &mut client);
        assert_eq!(
            text,
            r#"{"status":"error","message":"Not logged in. Current state: LOGIN_SCREEN"}"#
        );
    }

    #[test]
    fn observation_times_out_without_a_pump() {
        let metrics = Arc::new(BridgeMetrics::default());
        let (handle, _pump) = bridge(4, QueueFullPolicy::Reject, Arc::clone(&metrics));
        let handler = RequestHandler::new(
            handle,
            ObservationConfig::default(),
            Duration::from_millis(10),
            metrics,
        );
        let reply = reply(&handler.handle("command:get_observation"));
        assert_eq!(reply["status"], "error");
    }
}
