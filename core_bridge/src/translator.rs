//! Mapping resolved actions onto the simulation's interaction primitives.

use bridge_runtime::{ActionRequest, MenuInvocation, MenuOpcode, INVENTORY_COMPONENT_ID};

use crate::executor::ExecError;
use crate::resolver::ResolvedTarget;
use crate::world::GameClient;

pub const ATTACK_OPTION: &str = "Attack";
pub const WALK_OPTION: &str = "Walk here";
pub const TAKE_OPTION: &str = "Take";
pub const SELECT_OPTION: &str = "Select";
const NPC_FALLBACK_LABEL: &str = "NPC";
const ITEM_FALLBACK_LABEL: &str = "Item";

/// One call into the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    Menu(MenuInvocation),
    TypeText(String),
}

impl Primitive {
    pub fn invoke(&self, client: &mut dyn GameClient) {
        match self {
            Primitive::Menu(invocation) => client.invoke_menu_action(invocation),
            Primitive::TypeText(text) => client.type_text(text),
        }
    }
}

/// Build the primitive for `request`. `target` must be what the resolver
/// returned for the same request on this turn (`None` for kinds that need no
/// resolution).
pub fn translate(
    request: &ActionRequest,
    target: Option<&ResolvedTarget>,
    client: &dyn GameClient,
) -> Result<Primitive, ExecError> {
    let invocation = match (request, target) {
        (ActionRequest::TypeString { text }, _) => return Ok(Primitive::TypeText(text.clone())),
        (
            ActionRequest::InvokeMenuActionDetailed {
                option,
                target,
                id,
                opcode,
                param0,
                param1,
                force_left_click,
            },
            _,
        ) => MenuInvocation {
            option: option.clone(),
            target: target.clone(),
            identifier: *id,
            opcode: *opcode,
            param0: *param0,
            param1: *param1,
            item_id: -1,
            force_left_click: *force_left_click,
        },
        (ActionRequest::AttackNpc { .. }, Some(ResolvedTarget::Npc { index, name, .. })) => {
            MenuInvocation::new(
                ATTACK_OPTION,
                name.as_deref().unwrap_or(NPC_FALLBACK_LABEL),
                *index,
                MenuOpcode::NpcSecondOption,
                0,
                0,
            )
        }
        (
            ActionRequest::InteractObject { action, .. },
            Some(ResolvedTarget::TileObject {
                id,
                scene_x,
                scene_y,
                ..
            }),
        ) => {
            let label = client
                .object_name(*id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("<col=ffff>{id}"));
            MenuInvocation::new(
                action.as_str(),
                label,
                *id,
                MenuOpcode::GameObjectFirstOption,
                *scene_x,
                *scene_y,
            )
        }
        (
            ActionRequest::InteractInventory { action, .. },
            Some(ResolvedTarget::InventorySlot { slot, item_id, .. }),
        ) => MenuInvocation::new(
            action.as_str(),
            client.item_name(*item_id).unwrap_or(ITEM_FALLBACK_LABEL),
            1,
            MenuOpcode::ComponentOp,
            *slot as i32,
            INVENTORY_COMPONENT_ID,
        )
        .with_item(*item_id),
        (
            ActionRequest::InteractGroundItem { .. },
            Some(ResolvedTarget::GroundItem {
                id,
                scene_x,
                scene_y,
                ..
            }),
        ) => MenuInvocation::new(
            TAKE_OPTION,
            client.item_name(*id).unwrap_or(ITEM_FALLBACK_LABEL),
            *id,
            MenuOpcode::GroundItemThirdOption,
            *scene_x,
            *scene_y,
        ),
        (ActionRequest::ClickWidget { .. }, Some(ResolvedTarget::Widget(widget))) => {
            let option = widget
                .actions
                .first()
                .map(String::as_str)
                .unwrap_or(SELECT_OPTION);
            let identifier = if widget.item_id != -1 { widget.item_id } else { 1 };
            MenuInvocation::new(
                option,
                widget.name.as_str(),
                identifier,
                MenuOpcode::ComponentOp,
                widget.index,
                widget.id,
            )
        }
        (ActionRequest::WalkTo { .. }, Some(ResolvedTarget::Destination(point))) => {
            let (base_x, base_y) = client.region_origin();
            let scene = point
                .x
                .checked_sub(base_x)
                .zip(point.y.checked_sub(base_y));
            let Some((scene_x, scene_y)) = scene else {
                return Err(ExecError::CoordinateOutOfRange { point: *point });
            };
            MenuInvocation::new(WALK_OPTION, "", 0, MenuOpcode::Walk, scene_x, scene_y)
        }
        (request, _) => {
            return Err(ExecError::TargetMismatch {
                kind: request.kind(),
            })
        }
    };
    Ok(Primitive::Menu(invocation))
}
