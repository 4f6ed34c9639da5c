//! Data contracts exchanged between the AI bridge and its remote agent.
//!
//! Everything in here is plain serde data: the observation document, the
//! action reply envelope, and the menu-interaction primitive the simulation
//! exposes. No behaviour beyond (de)serialization and small helpers lives here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Absolute world coordinate of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: i32,
    pub y: i32,
    pub plane: i32,
}

impl WorldPoint {
    pub const fn new(x: i32, y: i32, plane: i32) -> Self {
        Self { x, y, plane }
    }

    /// Chebyshev tile distance. Points on different planes are never in range
    /// of each other, so the distance saturates to `i32::MAX`.
    pub fn distance_to(&self, other: &WorldPoint) -> i32 {
        if self.plane != other.plane {
            return i32::MAX;
        }
        let dx = (i64::from(self.x) - i64::from(other.x)).abs();
        let dy = (i64::from(self.y) - i64::from(other.y)).abs();
        i32::try_from(dx.max(dy)).unwrap_or(i32::MAX)
    }
}

impl fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.plane)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcObservation {
    pub id: i32,
    pub name: String,
    pub animation: i32,
    pub location: WorldPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryObservation {
    pub id: i32,
    pub quantity: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundItemObservation {
    pub id: i32,
    pub quantity: i32,
    pub name: String,
    pub location: WorldPoint,
}

/// Point-in-time view of the controlled player and its surroundings.
///
/// Field order is the serialized key order, so two snapshots of an unchanged
/// world encode to identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSnapshot {
    pub player_current_health: i32,
    pub player_max_health: i32,
    pub player_current_prayer: i32,
    pub player_max_prayer: i32,
    pub player_current_special_attack: i32,
    pub player_max_special_attack: i32,
    /// Run energy as a fraction in `[0, 1]`.
    pub player_run_energy_percentage: f64,
    pub player_animation: i32,
    pub player_location: Option<WorldPoint>,
    pub nearby_npcs: Vec<NpcObservation>,
    pub inventory: Vec<InventoryObservation>,
    pub nearby_ground_items: Vec<GroundItemObservation>,
}

pub fn encode_observation_json(snapshot: &ObservationSnapshot) -> serde_json::Result<String> {
    serde_json::to_string(snapshot)
}

pub fn decode_observation_json(data: &str) -> serde_json::Result<ObservationSnapshot> {
    serde_json::from_str(data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Submitted,
    Error,
}

/// Reply envelope for action submissions and for error documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReply {
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionReply {
    pub fn submitted(action_type: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Submitted,
            action_type: Some(action_type.into()),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            action_type: None,
            message: Some(message.into()),
        }
    }

    pub fn with_action_type(mut self, action_type: impl Into<String>) -> Self {
        self.action_type = Some(action_type.into());
        self
    }

    pub fn to_json(&self) -> String {
        // Only strings and a unit enum; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| String::from(r#"{"status":"error"}"#))
    }
}

/// Interaction categories understood by the simulation's menu primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuOpcode {
    GameObjectFirstOption,
    NpcSecondOption,
    GroundItemThirdOption,
    Walk,
    ComponentOp,
}

impl MenuOpcode {
    pub const fn id(self) -> i32 {
        match self {
            MenuOpcode::GameObjectFirstOption => 3,
            MenuOpcode::NpcSecondOption => 10,
            MenuOpcode::GroundItemThirdOption => 20,
            MenuOpcode::Walk => 23,
            MenuOpcode::ComponentOp => 57,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            3 => Some(MenuOpcode::GameObjectFirstOption),
            10 => Some(MenuOpcode::NpcSecondOption),
            20 => Some(MenuOpcode::GroundItemThirdOption),
            23 => Some(MenuOpcode::Walk),
            57 => Some(MenuOpcode::ComponentOp),
            _ => None,
        }
    }
}

/// One call of the simulation's low-level interaction primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuInvocation {
    pub option: String,
    pub target: String,
    pub identifier: i32,
    pub opcode: i32,
    pub param0: i32,
    pub param1: i32,
    /// Item carried by component operations; `-1` when not applicable.
    pub item_id: i32,
    pub force_left_click: bool,
}

impl MenuInvocation {
    pub fn new(
        option: impl Into<String>,
        target: impl Into<String>,
        identifier: i32,
        opcode: MenuOpcode,
        param0: i32,
        param1: i32,
    ) -> Self {
        Self {
            option: option.into(),
            target: target.into(),
            identifier,
            opcode: opcode.id(),
            param0,
            param1,
            item_id: -1,
            force_left_click: false,
        }
    }

    pub fn with_item(mut self, item_id: i32) -> Self {
        self.item_id = item_id;
        self
    }

    pub fn opcode_kind(&self) -> Option<MenuOpcode> {
        MenuOpcode::from_id(self.opcode)
    }
}

/// Packs an interface group and child index into a component id.
pub const fn pack_component_id(group: i32, child: i32) -> i32 {
    (group << 16) | (child & 0xffff)
}

/// Packed component id of the player's inventory container.
pub const INVENTORY_COMPONENT_ID: i32 = pack_component_id(149, 0);
