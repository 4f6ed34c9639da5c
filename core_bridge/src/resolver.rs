//! Locating concrete world entities for abstract action targets.
//!
//! Every lookup reads the world as it is on the current simulation turn. The
//! returned [`ResolvedTarget`] holds plain ids and coordinates and must not be
//! kept past that turn.

use bridge_runtime::{ActionRequest, WorldPoint, NO_CHILD};
use tracing::warn;

use crate::world::{plane_tiles, tile_at, GameClient, ObjectLayer, Widget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    Npc {
        index: i32,
        id: i32,
        name: Option<String>,
        location: WorldPoint,
    },
    TileObject {
        id: i32,
        layer: ObjectLayer,
        scene_x: i32,
        scene_y: i32,
        location: WorldPoint,
    },
    InventorySlot {
        slot: usize,
        item_id: i32,
        quantity: i32,
    },
    GroundItem {
        id: i32,
        quantity: i32,
        scene_x: i32,
        scene_y: i32,
        location: WorldPoint,
    },
    Widget(Widget),
    Destination(WorldPoint),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedTarget),
    /// The action addresses nothing in the world (typing, raw menu calls).
    NotNeeded,
    NotFound,
}

impl From<Option<ResolvedTarget>> for Resolution {
    fn from(target: Option<ResolvedTarget>) -> Self {
        match target {
            Some(target) => Resolution::Found(target),
            None => Resolution::NotFound,
        }
    }
}

pub fn resolve(request: &ActionRequest, client: &dyn GameClient) -> Resolution {
    match request {
        ActionRequest::TypeString { .. } | ActionRequest::InvokeMenuActionDetailed { .. } => {
            Resolution::NotNeeded
        }
        ActionRequest::AttackNpc { npc_id } => find_npc(client, *npc_id).into(),
        ActionRequest::InteractObject { object_id, .. } => {
            find_tile_object(client, *object_id).into()
        }
        ActionRequest::InteractInventory { item_id, .. } => {
            find_inventory_item(client, *item_id).into()
        }
        ActionRequest::InteractGroundItem { item_id, location } => {
            find_ground_item(client, *item_id, *location).into()
        }
        ActionRequest::ClickWidget {
            widget_id,
            child_id,
        } => find_widget(client, *widget_id, *child_id).into(),
        ActionRequest::WalkTo { x, y, plane } => Resolution::Found(ResolvedTarget::Destination(
            WorldPoint::new(*x, *y, plane.unwrap_or_else(|| client.plane())),
        )),
    }
}

/// First NPC in the active set whose definition id matches.
pub fn find_npc(client: &dyn GameClient, npc_id: i32) -> Option<ResolvedTarget> {
    client
        .npcs()
        .iter()
        .find(|npc| npc.id == npc_id)
        .map(|npc| ResolvedTarget::Npc {
            index: npc.index,
            id: npc.id,
            name: npc.name.clone(),
            location: npc.location,
        })
}

/// First object with `object_id` on the current plane, scanning tiles in
/// raster order and each tile's layers in [`ObjectLayer`] order. Nothing
/// resolves while there is no local player.
pub fn find_tile_object(client: &dyn GameClient, object_id: i32) -> Option<ResolvedTarget> {
    if client.local_player().is_none() {
        warn!(target: "ai_bridge::exec", object_id, "resolve.object.no_local_player");
        return None;
    }
    plane_tiles(client, client.plane()).find_map(|tile| {
        tile.objects()
            .find(|(_, object)| object.id == object_id)
            .map(|(layer, object)| ResolvedTarget::TileObject {
                id: object.id,
                layer,
                scene_x: tile.scene_x,
                scene_y: tile.scene_y,
                location: tile.location,
            })
    })
}

pub fn find_inventory_item(client: &dyn GameClient, item_id: i32) -> Option<ResolvedTarget> {
    client
        .inventory()?
        .iter()
        .enumerate()
        .find_map(|(slot, item)| match item {
            Some(item) if item.id == item_id => Some(ResolvedTarget::InventorySlot {
                slot,
                item_id: item.id,
                quantity: item.quantity,
            }),
            _ => None,
        })
}

/// Ground item with `item_id`, looked up on the exact tile first when one is
/// given, otherwise (or on a miss there) the closest one to the local player.
pub fn find_ground_item(
    client: &dyn GameClient,
    item_id: i32,
    location: Option<WorldPoint>,
) -> Option<ResolvedTarget> {
    if client.local_player().is_none() {
        warn!(target: "ai_bridge::exec", item_id, "resolve.ground_item.no_local_player");
        return None;
    }
    if let Some(point) = location {
        let exact = tile_at(client, point).and_then(|tile| {
            tile.ground_items
                .iter()
                .find(|item| item.id == item_id)
                .map(|item| ResolvedTarget::GroundItem {
                    id: item.id,
                    quantity: item.quantity,
                    scene_x: tile.scene_x,
                    scene_y: tile.scene_y,
                    location: tile.location,
                })
        });
        if exact.is_some() {
            return exact;
        }
    }
    find_nearest_ground_item(client, item_id)
}

pub fn find_nearest_ground_item(client: &dyn GameClient, item_id: i32) -> Option<ResolvedTarget> {
    let Some(origin) = client.local_player().map(|player| player.location) else {
        warn!(target: "ai_bridge::exec", item_id, "resolve.ground_item.no_local_player");
        return None;
    };
    let mut best: Option<(i32, ResolvedTarget)> = None;

    for tile in plane_tiles(client, client.plane()) {
        let Some(item) = tile.ground_items.iter().find(|item| item.id == item_id) else {
            continue;
        };
        let distance = origin.distance_to(&tile.location);
        // Strictly closer only: ties keep the earlier tile in scan order.
        if best.as_ref().map_or(true, |(closest, _)| distance < *closest) {
            best = Some((
                distance,
                ResolvedTarget::GroundItem {
                    id: item.id,
                    quantity: item.quantity,
                    scene_x: tile.scene_x,
                    scene_y: tile.scene_y,
                    location: tile.location,
                },
            ));
        }
    }

    best.map(|(_, target)| target)
}

/// `child_id == -1` addresses the group's parent element. Hidden elements are
/// not clickable and do not resolve.
pub fn find_widget(client: &dyn GameClient, widget_id: i32, child_id: i32) -> Option<ResolvedTarget> {
    let child = (child_id != NO_CHILD).then_some(child_id);
    client
        .widget(widget_id, child)
        .filter(|widget| !widget.hidden)
        .cloned()
        .map(ResolvedTarget::Widget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessClient;
    use crate::world::{Item, Npc};
    use bridge_runtime::pack_component_id;

    fn client() -> HeadlessClient {
        let mut client = HeadlessClient::new();
        client.set_region_origin(3200, 3200);
        client.log_in("tester", WorldPoint::new(3210, 3210, 0));
        client
    }

    fn widget(group: i32, child: i32, hidden: bool) -> Widget {
        Widget {
            id: pack_component_id(group, child),
            name: String::new(),
            actions: Vec::new(),
            hidden,
            item_id: -1,
            index: -1,
        }
    }

    #[test]
    fn npc_lookup_takes_first_match() {
        let mut client = client();
        for index in [4, 9] {
            client.add_npc(Npc {
                index,
                id: 3029,
                name: None,
                animation: -1,
                location: WorldPoint::new(3211, 3211, 0),
            });
        }
        match find_npc(&client, 3029) {
            Some(ResolvedTarget::Npc { index, .. }) => assert_eq!(index, 4),
            other => panic!("unexpected target: {other:?}"),
        }
        assert!(find_npc(&client, 1).is_none());
    }

    #[test]
    fn object_scan_is_raster_then_layer() {
        let mut client = client();
        client.set_decorative_object(WorldPoint::new(3205, 3201, 0), 77);
        client.set_wall_object(WorldPoint::new(3205, 3202, 0), 77);
        client.add_game_object(WorldPoint::new(3206, 3200, 0), 77);
        match find_tile_object(&client, 77) {
            Some(ResolvedTarget::TileObject {
                layer,
                scene_x,
                scene_y,
                ..
            }) => {
                assert_eq!(layer, ObjectLayer::Decorative);
                assert_eq!((scene_x, scene_y), (5, 1));
            }
            other => panic!("unexpected target: {other:?}"),
        }
    }

    #[test]
    fn object_layers_resolve_game_wall_ground_decorative() {
        let point = WorldPoint::new(3204, 3204, 0);
        let layered = |layers: &[ObjectLayer]| {
            let mut client = client();
            for layer in layers {
                match layer {
                    ObjectLayer::Game => client.add_game_object(point, 77),
                    ObjectLayer::Wall => client.set_wall_object(point, 77),
                    ObjectLayer::Ground => client.set_ground_object(point, 77),
                    ObjectLayer::Decorative => client.set_decorative_object(point, 77),
                }
            }
            match find_tile_object(&client, 77) {
                Some(ResolvedTarget::TileObject { layer, .. }) => layer,
                other => panic!("unexpected target: {other:?}"),
            }
        };
        let all = [
            ObjectLayer::Decorative,
            ObjectLayer::Ground,
            ObjectLayer::Wall,
            ObjectLayer::Game,
        ];
        assert_eq!(layered(&all), ObjectLayer::Game);
        assert_eq!(layered(&all[..3]), ObjectLayer::Wall);
        assert_eq!(layered(&all[..2]), ObjectLayer::Ground);
        assert_eq!(layered(&all[..1]), ObjectLayer::Decorative);
    }

    #[test]
    fn nothing_resolves_in_the_scene_without_a_local_player() {
        let mut client = client();
        client.add_game_object(WorldPoint::new(3205, 3205, 0), 77);
        client.add_ground_item(WorldPoint::new(3211, 3210, 0), 526, 1);
        client.clear_player();
        assert!(find_tile_object(&client, 77).is_none());
        assert!(find_nearest_ground_item(&client, 526).is_none());
        assert!(find_ground_item(&client, 526, Some(WorldPoint::new(3211, 3210, 0))).is_none());
    }

    #[test]
    fn ground_item_lookup_tolerates_extreme_coordinates() {
        let mut client = client();
        client.add_ground_item(WorldPoint::new(3211, 3210, 0), 526, 1);
        let target = find_ground_item(&client, 526, Some(WorldPoint::new(i32::MIN, i32::MAX, 0)));
        assert!(matches!(
            target,
            Some(ResolvedTarget::GroundItem {
                scene_x: 11,
                scene_y: 10,
                ..
            })
        ));
    }

    #[test]
    fn object_scan_ignores_other_planes() {
        let mut client = client();
        client.add_game_object(WorldPoint::new(3205, 3205, 1), 77);
        assert!(find_tile_object(&client, 77).is_none());
    }

    #[test]
    fn inventory_lookup_reports_slot() {
        let mut client = client();
        client.set_inventory_slot(3, Item { id: 315, quantity: 2 });
        client.set_inventory_slot(7, Item { id: 315, quantity: 1 });
        assert_eq!(
            find_inventory_item(&client, 315),
            Some(ResolvedTarget::InventorySlot {
                slot: 3,
                item_id: 315,
                quantity: 2
            })
        );
    }

    #[test]
    fn ground_item_prefers_the_closest_tile() {
        let mut client = client();
        client.add_ground_item(WorldPoint::new(3201, 3201, 0), 526, 1);
        client.add_ground_item(WorldPoint::new(3212, 3209, 0), 526, 1);
        match find_ground_item(&client, 526, None) {
            Some(ResolvedTarget::GroundItem { location, .. }) => {
                assert_eq!(location, WorldPoint::new(3212, 3209, 0))
            }
            other => panic!("unexpected target: {other:?}"),
        }
    }

    #[test]
    fn ground_item_ties_keep_scan_order() {
        let mut client = client();
        client.add_ground_item(WorldPoint::new(3212, 3212, 0), 526, 1);
        client.add_ground_item(WorldPoint::new(3208, 3208, 0), 526, 1);
        match find_ground_item(&client, 526, None) {
            Some(ResolvedTarget::GroundItem { location, .. }) => {
                assert_eq!(location, WorldPoint::new(3208, 3208, 0))
            }
            other => panic!("unexpected target: {other:?}"),
        }
    }

    #[test]
    fn ground_item_uses_exact_tile_when_it_matches() {
        let mut client = client();
        client.add_ground_item(WorldPoint::new(3211, 3210, 0), 526, 1);
        client.add_ground_item(WorldPoint::new(3230, 3230, 0), 526, 5);
        let target = find_ground_item(&client, 526, Some(WorldPoint::new(3230, 3230, 0)));
        assert!(matches!(
            target,
            Some(ResolvedTarget::GroundItem { quantity: 5, .. })
        ));
    }

    #[test]
    fn ground_item_falls_back_to_nearest_on_a_miss() {
        let mut client = client();
        client.add_ground_item(WorldPoint::new(3211, 3210, 0), 526, 1);
        let target = find_ground_item(&client, 526, Some(WorldPoint::new(3250, 3250, 0)));
        assert!(matches!(
            target,
            Some(ResolvedTarget::GroundItem {
                scene_x: 11,
                scene_y: 10,
                ..
            })
        ));
    }

    #[test]
    fn widget_without_child_is_the_parent() {
        let mut client = client();
        client.add_widget(161, None, widget(161, 0, false));
        client.add_widget(161, Some(4), widget(161, 4, false));
        match find_widget(&client, 161, NO_CHILD) {
            Some(ResolvedTarget::Widget(found)) => assert_eq!(found.id, pack_component_id(161, 0)),
            other => panic!("unexpected target: {other:?}"),
        }
        match find_widget(&client, 161, 4) {
            Some(ResolvedTarget::Widget(found)) => assert_eq!(found.id, pack_component_id(161, 4)),
            other => panic!("unexpected target: {other:?}"),
        }
    }

    #[test]
    fn hidden_widgets_do_not_resolve() {
        let mut client = client();
        client.add_widget(548, None, widget(548, 0, true));
        assert!(find_widget(&client, 548, NO_CHILD).is_none());
    }

    #[test]
    fn walk_without_plane_uses_current_plane() {
        let mut client = client();
        client.set_plane(2);
        let request = ActionRequest::WalkTo {
            x: 3200,
            y: 3200,
            plane: None,
        };
        assert_eq!(
            resolve(&request, &client),
            Resolution::Found(ResolvedTarget::Destination(WorldPoint::new(3200, 3200, 2)))
        );
    }
}
