//! Conversion from untyped wire parameters to [`ActionRequest`].
//!
//! Validation is purely structural: presence and JSON type of each field.
//! Whether an id exists in the world is the resolver's problem, later, on the
//! simulation thread.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::actions::{
    ActionKind, ActionRequest, DEFAULT_INVENTORY_ACTION, DEFAULT_OBJECT_ACTION, NO_CHILD,
};
use crate::WorldPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => f.write_str("String"),
            ParamType::Number => f.write_str("Number"),
            ParamType::Boolean => f.write_str("Boolean"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown action_type: {0}")]
    UnknownKind(String),
    #[error("Parameter '{field}' ({expected}) is required for {kind}.")]
    Missing {
        kind: ActionKind,
        field: &'static str,
        expected: ParamType,
    },
    #[error("Parameter '{field}' must be a {expected} for {kind}.")]
    WrongType {
        kind: ActionKind,
        field: &'static str,
        expected: ParamType,
    },
    #[error("Parameter '{field}' is out of range for {kind}.")]
    OutOfRange {
        kind: ActionKind,
        field: &'static str,
    },
}

impl ValidationError {
    /// Name of the offending parameter, if the error concerns one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::UnknownKind(_) => None,
            ValidationError::Missing { field, .. }
            | ValidationError::WrongType { field, .. }
            | ValidationError::OutOfRange { field, .. } => Some(field),
        }
    }
}

/// Validate `params` against the schema of the (case-insensitive) `kind`.
pub fn validate(kind: &str, params: &Map<String, Value>) -> Result<ActionRequest, ValidationError> {
    let kind =
        ActionKind::parse(kind).ok_or_else(|| ValidationError::UnknownKind(kind.to_string()))?;
    let params = Params { kind, map: params };

    let request = match kind {
        ActionKind::TypeString => ActionRequest::TypeString {
            text: params.required_string("text")?,
        },
        ActionKind::AttackNpc => ActionRequest::AttackNpc {
            npc_id: params.required_i32("npc_id")?,
        },
        ActionKind::InteractObject => ActionRequest::InteractObject {
            object_id: params.required_i32("object_id")?,
            action: params
                .optional_string("action")?
                .unwrap_or_else(|| DEFAULT_OBJECT_ACTION.to_string()),
        },
        ActionKind::InteractInventory => ActionRequest::InteractInventory {
            item_id: params.required_i32("item_id")?,
            action: params
                .optional_string("action")?
                .unwrap_or_else(|| DEFAULT_INVENTORY_ACTION.to_string()),
        },
        ActionKind::InteractGroundItem => {
            let item_id = params.required_i32("item_id")?;
            let x = params.optional_i32("x")?;
            let y = params.optional_i32("y")?;
            let plane = params.optional_i32("plane")?;
            let location = match (x, y, plane) {
                (Some(x), Some(y), Some(plane)) => Some(WorldPoint::new(x, y, plane)),
                _ => None,
            };
            ActionRequest::InteractGroundItem { item_id, location }
        }
        ActionKind::ClickWidget => ActionRequest::ClickWidget {
            widget_id: params.required_i32("widget_id")?,
            child_id: params.optional_i32("child_id")?.unwrap_or(NO_CHILD),
        },
        ActionKind::WalkTo => ActionRequest::WalkTo {
            x: params.required_i32("x")?,
            y: params.required_i32("y")?,
            plane: params.optional_i32("plane")?,
        },
        ActionKind::InvokeMenuActionDetailed => ActionRequest::InvokeMenuActionDetailed {
            option: params.required_string("option")?,
            target: params.required_string("target")?,
            id: params.required_i32("id")?,
            opcode: params.required_i32("opcode")?,
            param0: params.required_i32("param0")?,
            param1: params.required_i32("param1")?,
            force_left_click: params.optional_bool("force_left_click")?.unwrap_or(false),
        },
    };

    Ok(request)
}

struct Params<'a> {
    kind: ActionKind,
    map: &'a Map<String, Value>,
}

impl Params<'_> {
    /// `null` counts as absent.
    fn get(&self, field: &str) -> Option<&Value> {
        self.map.get(field).filter(|value| !value.is_null())
    }

    fn missing(&self, field: &'static str, expected: ParamType) -> ValidationError {
        ValidationError::Missing {
            kind: self.kind,
            field,
            expected,
        }
    }

    fn wrong_type(&self, field: &'static str, expected: ParamType) -> ValidationError {
        ValidationError::WrongType {
            kind: self.kind,
            field,
            expected,
        }
    }

    fn required_i32(&self, field: &'static str) -> Result<i32, ValidationError> {
        self.optional_i32(field)?
            .ok_or_else(|| self.missing(field, ParamType::Number))
    }

    fn optional_i32(&self, field: &'static str) -> Result<Option<i32>, ValidationError> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        if !value.is_number() {
            return Err(self.wrong_type(field, ParamType::Number));
        }
        number_to_i32(value)
            .map(Some)
            .ok_or(ValidationError::OutOfRange {
                kind: self.kind,
                field,
            })
    }

    fn required_string(&self, field: &'static str) -> Result<String, ValidationError> {
        self.optional_string(field)?
            .ok_or_else(|| self.missing(field, ParamType::String))
    }

    fn optional_string(&self, field: &'static str) -> Result<Option<String>, ValidationError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(_) => Err(self.wrong_type(field, ParamType::String)),
        }
    }

    fn optional_bool(&self, field: &'static str) -> Result<Option<bool>, ValidationError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(_) => Err(self.wrong_type(field, ParamType::Boolean)),
        }
    }
}

/// Truncates toward zero; `None` if the result does not fit in `i32`.
fn number_to_i32(value: &Value) -> Option<i32> {
    if let Some(int) = value.as_i64() {
        return i32::try_from(int).ok();
    }
    if value.is_u64() {
        return None;
    }
    let float = value.as_f64()?.trunc();
    if float.is_finite() && float >= i32::MIN as f64 && float <= i32::MAX as f64 {
        Some(float as i32)
    } else {
        None
    }
}

/// An action that passed validation, with the kind string exactly as sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAction {
    pub action_type: String,
    pub request: ActionRequest,
}

#[derive(Debug, Error)]
pub enum ActionPayloadError {
    #[error("Failed to handle action: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to handle action: payload is not a JSON object")]
    NotAnObject,
    #[error("Missing action_type")]
    MissingActionType,
    #[error("Parameters map is null for action: {0}")]
    MissingParameters(String),
    #[error("{source}")]
    Invalid {
        action_type: String,
        #[source]
        source: ValidationError,
    },
}

impl ActionPayloadError {
    /// The caller's kind string, when the payload got far enough to carry one.
    pub fn action_type(&self) -> Option<&str> {
        match self {
            ActionPayloadError::MissingParameters(action_type)
            | ActionPayloadError::Invalid { action_type, .. } => Some(action_type),
            _ => None,
        }
    }
}

/// Parse the JSON suffix of `command:execute_action:` into a validated action.
///
/// Expected shape: `{"action_type": "<kind>", "parameters": {...}}`.
pub fn parse_action_payload(payload: &str) -> Result<ValidatedAction, ActionPayloadError> {
    let value: Value = serde_json::from_str(payload)?;
    let Value::Object(envelope) = value else {
        return Err(ActionPayloadError::NotAnObject);
    };

    let action_type = match envelope.get("action_type") {
        Some(Value::String(kind)) => kind.clone(),
        _ => return Err(ActionPayloadError::MissingActionType),
    };
    let Some(Value::Object(parameters)) = envelope.get("parameters") else {
        return Err(ActionPayloadError::MissingParameters(action_type));
    };

    match validate(&action_type, parameters) {
        Ok(request) => Ok(ValidatedAction {
            action_type,
            request,
        }),
        Err(source) => Err(ActionPayloadError::Invalid {
            action_type,
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    /// One complete parameter set per kind, required fields only.
    fn minimal_params(kind: ActionKind) -> Map<String, Value> {
        params(match kind {
            ActionKind::TypeString => json!({"text": "hi"}),
            ActionKind::AttackNpc => json!({"npc_id": 125}),
            ActionKind::InteractObject => json!({"object_id": 1276}),
            ActionKind::InteractInventory => json!({"item_id": 315}),
            ActionKind::InteractGroundItem => json!({"item_id": 526}),
            ActionKind::ClickWidget => json!({"widget_id": 161}),
            ActionKind::WalkTo => json!({"x": 3200, "y": 3200}),
            ActionKind::InvokeMenuActionDetailed => json!({
                "option": "Attack", "target": "Goblin", "id": 3,
                "opcode": 10, "param0": 0, "param1": 0
            }),
        })
    }

    #[test]
    fn minimal_params_validate_for_every_kind() {
        for kind in ActionKind::ALL {
            let request = validate(kind.as_str(), &minimal_params(kind))
                .unwrap_or_else(|err| panic!("{kind} rejected: {err}"));
            assert_eq!(request.kind(), kind);
        }
    }

    #[test]
    fn dropping_any_required_field_names_it() {
        for kind in ActionKind::ALL {
            let full = minimal_params(kind);
            for field in full.keys() {
                let mut partial = full.clone();
                partial.remove(field);
                let err = validate(kind.as_str(), &partial).expect_err("should be rejected");
                assert!(
                    matches!(err, ValidationError::Missing { .. }),
                    "{kind}/{field}: {err:?}"
                );
                assert_eq!(err.field(), Some(field.as_str()));
            }
        }
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let request = validate("interact_object", &params(json!({"object_id": 7}))).unwrap();
        assert_eq!(
            request,
            ActionRequest::InteractObject {
                object_id: 7,
                action: "Interact".into()
            }
        );

        let request = validate("interact_inventory", &params(json!({"item_id": 7}))).unwrap();
        assert_eq!(
            request,
            ActionRequest::InteractInventory {
                item_id: 7,
                action: "Use".into()
            }
        );

        let request = validate("click_widget", &params(json!({"widget_id": 161}))).unwrap();
        assert_eq!(
            request,
            ActionRequest::ClickWidget {
                widget_id: 161,
                child_id: -1
            }
        );

        let request = validate(
            "invoke_menu_action_detailed",
            &minimal_params(ActionKind::InvokeMenuActionDetailed),
        )
        .unwrap();
        assert!(matches!(
            request,
            ActionRequest::InvokeMenuActionDetailed {
                force_left_click: false,
                ..
            }
        ));
    }

    #[test]
    fn walk_to_without_plane_leaves_it_open() {
        let request = validate("walk_to", &params(json!({"x": 3200, "y": 3200}))).unwrap();
        assert_eq!(
            request,
            ActionRequest::WalkTo {
                x: 3200,
                y: 3200,
                plane: None
            }
        );
    }

    #[test]
    fn wrong_typed_optional_is_rejected() {
        let err = validate(
            "interact_object",
            &params(json!({"object_id": 1, "action": 5})),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongType {
                kind: ActionKind::InteractObject,
                field: "action",
                expected: ParamType::String,
            }
        );

        let err = validate(
            "interact_ground_item",
            &params(json!({"item_id": 1, "x": "3200"})),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("x"));

        let mut detailed = minimal_params(ActionKind::InvokeMenuActionDetailed);
        detailed.insert("force_left_click".into(), json!("yes"));
        let err = validate("invoke_menu_action_detailed", &detailed).unwrap_err();
        assert_eq!(err.field(), Some("force_left_click"));
    }

    #[test]
    fn wrong_typed_required_is_rejected() {
        let err = validate("attack_npc", &params(json!({"npc_id": "125"}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parameter 'npc_id' must be a Number for attack_npc."
        );
    }

    #[test]
    fn ground_item_coordinate_needs_the_full_triple() {
        let request = validate(
            "interact_ground_item",
            &params(json!({"item_id": 526, "x": 3200, "y": 3201, "plane": 0})),
        )
        .unwrap();
        assert_eq!(
            request,
            ActionRequest::InteractGroundItem {
                item_id: 526,
                location: Some(WorldPoint::new(3200, 3201, 0))
            }
        );

        let request = validate(
            "interact_ground_item",
            &params(json!({"item_id": 526, "x": 3200})),
        )
        .unwrap();
        assert_eq!(
            request,
            ActionRequest::InteractGroundItem {
                item_id: 526,
                location: None
            }
        );
    }

    #[test]
    fn numbers_truncate_and_range_check() {
        let request = validate("attack_npc", &params(json!({"npc_id": 125.9}))).unwrap();
        assert_eq!(request, ActionRequest::AttackNpc { npc_id: 125 });

        let err = validate("attack_npc", &params(json!({"npc_id": 4_000_000_000u64}))).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn null_optional_is_treated_as_absent() {
        let request = validate(
            "walk_to",
            &params(json!({"x": 1, "y": 2, "plane": null})),
        )
        .unwrap();
        assert_eq!(
            request,
            ActionRequest::WalkTo {
                x: 1,
                y: 2,
                plane: None
            }
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = validate("dance", &Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown action_type: dance");
    }

    #[test]
    fn payload_envelope_errors() {
        let err = parse_action_payload("{not json").unwrap_err();
        assert!(err.to_string().starts_with("Failed to handle action:"));

        let err = parse_action_payload(r#"{"parameters":{}}"#).unwrap_err();
        assert_eq!(err.to_string(), "Missing action_type");
        assert_eq!(err.action_type(), None);

        let err = parse_action_payload(r#"{"action_type":"attack_npc"}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parameters map is null for action: attack_npc"
        );
        assert_eq!(err.action_type(), Some("attack_npc"));

        let err =
            parse_action_payload(r#"{"action_type":"Attack_NPC","parameters":{}}"#).unwrap_err();
        assert_eq!(err.action_type(), Some("Attack_NPC"));
    }

    #[test]
    fn payload_keeps_the_callers_kind_string() {
        let action =
            parse_action_payload(r#"{"action_type":"ATTACK_NPC","parameters":{"npc_id":1}}"#)
                .unwrap();
        assert_eq!(action.action_type, "ATTACK_NPC");
        assert_eq!(action.request, ActionRequest::AttackNpc { npc_id: 1 });
    }
}
