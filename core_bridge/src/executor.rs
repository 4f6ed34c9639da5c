//! Resolve, translate and invoke: the body of every action unit of work.

use std::sync::Arc;

use bridge_runtime::{ActionKind, ActionRequest, WorldPoint};
use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics::BridgeMetrics;
use crate::resolver::{resolve, Resolution};
use crate::translator::{translate, Primitive};
use crate::world::GameClient;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("resolved target does not fit a {kind} action")]
    TargetMismatch { kind: ActionKind },
    #[error("{point} cannot be expressed in scene coordinates")]
    CoordinateOutOfRange { point: WorldPoint },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    Invoked(Primitive),
    TargetNotFound,
}

/// Run one action against the world as it is right now.
pub fn execute_action(
    request: &ActionRequest,
    client: &mut dyn GameClient,
) -> Result<ExecOutcome, ExecError> {
    let target = match resolve(request, client) {
        Resolution::Found(target) => Some(target),
        Resolution::NotNeeded => None,
        Resolution::NotFound => return Ok(ExecOutcome::TargetNotFound),
    };
    let primitive = translate(request, target.as_ref(), client)?;
    primitive.invoke(client);
    Ok(ExecOutcome::Invoked(primitive))
}

/// Wrap an action into a unit of work for the simulation thread. A target
/// miss is logged and counted; it is not an error.
pub fn action_unit(
    request: ActionRequest,
    metrics: Arc<BridgeMetrics>,
) -> impl FnOnce(&mut dyn GameClient) -> Result<(), ExecError> + Send + 'static {
    move |client: &mut dyn GameClient| match execute_action(&request, client)? {
        ExecOutcome::Invoked(primitive) => {
            debug!(
                target: "ai_bridge::exec",
                kind = %request.kind(),
                primitive = ?primitive,
                "action.invoked"
            );
            Ok(())
        }
        ExecOutcome::TargetNotFound => {
            metrics.record_resolution_miss();
            warn!(
                target: "ai_bridge::exec",
                kind = %request.kind(),
                request = ?request,
                "action.target_missing"
            );
            Ok(())
        }
    }
}
