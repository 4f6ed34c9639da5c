use std::fmt;

use crate::WorldPoint;

/// The fixed action vocabulary accepted by `command:execute_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    TypeString,
    AttackNpc,
    InteractObject,
    InteractInventory,
    InteractGroundItem,
    ClickWidget,
    WalkTo,
    InvokeMenuActionDetailed,
}

impl ActionKind {
    pub const ALL: [ActionKind; 8] = [
        ActionKind::TypeString,
        ActionKind::AttackNpc,
        ActionKind::InteractObject,
        ActionKind::InteractInventory,
        ActionKind::InteractGroundItem,
        ActionKind::ClickWidget,
        ActionKind::WalkTo,
        ActionKind::InvokeMenuActionDetailed,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ActionKind::TypeString => "type_string",
            ActionKind::AttackNpc => "attack_npc",
            ActionKind::InteractObject => "interact_object",
            ActionKind::InteractInventory => "interact_inventory",
            ActionKind::InteractGroundItem => "interact_ground_item",
            ActionKind::ClickWidget => "click_widget",
            ActionKind::WalkTo => "walk_to",
            ActionKind::InvokeMenuActionDetailed => "invoke_menu_action_detailed",
        }
    }

    /// Case-insensitive lookup of a wire kind string.
    pub fn parse(token: &str) -> Option<Self> {
        let lowered = token.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered.as_str())
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_OBJECT_ACTION: &str = "Interact";
pub const DEFAULT_INVENTORY_ACTION: &str = "Use";
/// `child_id` value meaning "the parent element itself".
pub const NO_CHILD: i32 = -1;

/// A structurally valid action. Only [`crate::validate`] builds these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    TypeString {
        text: String,
    },
    AttackNpc {
        npc_id: i32,
    },
    InteractObject {
        object_id: i32,
        action: String,
    },
    InteractInventory {
        item_id: i32,
        action: String,
    },
    InteractGroundItem {
        item_id: i32,
        /// Exact tile to look at first; `None` goes straight to nearest search.
        location: Option<WorldPoint>,
    },
    ClickWidget {
        widget_id: i32,
        child_id: i32,
    },
    WalkTo {
        x: i32,
        y: i32,
        /// `None` means the controlled entity's plane when the action runs.
        plane: Option<i32>,
    },
    InvokeMenuActionDetailed {
        option: String,
        target: String,
        id: i32,
        opcode: i32,
        param0: i32,
        param1: i32,
        force_left_click: bool,
    },
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::TypeString { .. } => ActionKind::TypeString,
            ActionRequest::AttackNpc { .. } => ActionKind::AttackNpc,
            ActionRequest::InteractObject { .. } => ActionKind::InteractObject,
            ActionRequest::InteractInventory { .. } => ActionKind::InteractInventory,
            ActionRequest::InteractGroundItem { .. } => ActionKind::InteractGroundItem,
            ActionRequest::ClickWidget { .. } => ActionKind::ClickWidget,
            ActionRequest::WalkTo { .. } => ActionKind::WalkTo,
            ActionRequest::InvokeMenuActionDetailed { .. } => {
                ActionKind::InvokeMenuActionDetailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ActionKind::parse("ATTACK_NPC"), Some(ActionKind::AttackNpc));
        assert_eq!(ActionKind::parse("Walk_To"), Some(ActionKind::WalkTo));
        assert_eq!(ActionKind::parse("dance"), None);
    }

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::parse(kind.as_str()), Some(kind));
        }
    }
}
