//! In-memory [`GameClient`] used by the `server` binary and the tests.
//!
//! It keeps just enough of a world to observe and act on: a local player,
//! NPCs, a scene of tiles, an inventory, compositions and widgets. Menu
//! invocations are recorded; `Walk here` and `Take` also take effect on the
//! next [`HeadlessClient::tick`].

use std::collections::HashMap;

use bridge_runtime::{MenuInvocation, MenuOpcode, WorldPoint};

use crate::world::{
    GameClient, GameState, Item, LocalPlayer, Npc, Skill, Tile, TileItem, TileObject, Widget,
    INVENTORY_SIZE, MAX_Z, SCENE_SIZE,
};

const RUN_STEP: i64 = 2;

#[derive(Debug, Clone)]
pub struct HeadlessClient {
    state: GameState,
    player: Option<LocalPlayer>,
    boosted: HashMap<Skill, i32>,
    real: HashMap<Skill, i32>,
    run_energy: i32,
    special_attack: i32,
    npcs: Vec<Npc>,
    plane: i32,
    base: (i32, i32),
    tiles: Vec<Option<Tile>>,
    inventory: Option<Vec<Option<Item>>>,
    item_names: HashMap<i32, String>,
    object_names: HashMap<i32, String>,
    widgets: HashMap<(i32, Option<i32>), Widget>,
    invocations: Vec<MenuInvocation>,
    typed: Vec<String>,
    destination: Option<WorldPoint>,
    pending_pickup: Option<(i32, i32, i32)>,
    ticks: u64,
}

impl Default for HeadlessClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessClient {
    /// A client sitting on the login screen with an empty scene.
    pub fn new() -> Self {
        Self {
            state: GameState::LoginScreen,
            player: None,
            boosted: HashMap::new(),
            real: HashMap::new(),
            run_energy: 10_000,
            special_attack: 1_000,
            npcs: Vec::new(),
            plane: 0,
            base: (0, 0),
            tiles: vec![None; (MAX_Z * SCENE_SIZE * SCENE_SIZE) as usize],
            inventory: None,
            item_names: HashMap::new(),
            object_names: HashMap::new(),
            widgets: HashMap::new(),
            invocations: Vec::new(),
            typed: Vec::new(),
            destination: None,
            pending_pickup: None,
            ticks: 0,
        }
    }

    /// A small logged-in scene around a fixed spawn point.
    pub fn demo() -> Self {
        let mut client = Self::new();
        client.set_region_origin(3200, 3200);
        client.log_in("agent", WorldPoint::new(3222, 3218, 0));
        client.set_skill(Skill::Hitpoints, 10, 10);
        client.set_skill(Skill::Prayer, 1, 1);

        client.name_item(315, "Shrimps");
        client.name_item(526, "Bones");
        client.name_item(995, "Coins");
        client.name_object(1276, "Tree");
        client.name_object(1530, "Door");

        client.set_inventory_slot(0, Item { id: 315, quantity: 1 });
        client.set_inventory_slot(1, Item { id: 995, quantity: 25 });

        for (index, (x, y)) in [(3226, 3220), (3230, 3215), (3219, 3224)].into_iter().enumerate() {
            client.add_npc(Npc {
                index: index as i32,
                id: 3029,
                name: Some("Goblin".into()),
                animation: -1,
                location: WorldPoint::new(x, y, 0),
            });
        }

        client.add_ground_item(WorldPoint::new(3224, 3219, 0), 526, 1);
        client.add_ground_item(WorldPoint::new(3214, 3211, 0), 995, 10);
        client.add_game_object(WorldPoint::new(3228, 3228, 0), 1276);
        client.set_wall_object(WorldPoint::new(3219, 3218, 0), 1530);

        client.add_widget(
            161,
            None,
            Widget {
                id: bridge_runtime::pack_component_id(161, 0),
                name: "Viewport".into(),
                actions: Vec::new(),
                hidden: false,
                item_id: -1,
                index: -1,
            },
        );
        client
    }

    pub fn log_in(&mut self, name: &str, location: WorldPoint) {
        self.state = GameState::LoggedIn;
        self.plane = location.plane;
        self.player = Some(LocalPlayer {
            name: name.to_string(),
            animation: -1,
            location,
        });
        if self.inventory.is_none() {
            self.inventory = Some(vec![None; INVENTORY_SIZE]);
        }
    }

    pub fn log_out(&mut self) {
        self.state = GameState::LoginScreen;
        self.player = None;
    }

    pub fn set_state(&mut self, state: GameState) {
        self.state = state;
    }

    /// Keeps the session logged in but removes the controlled entity.
    pub fn clear_player(&mut self) {
        self.player = None;
    }

    pub fn set_region_origin(&mut self, base_x: i32, base_y: i32) {
        self.base = (base_x, base_y);
    }

    pub fn set_plane(&mut self, plane: i32) {
        self.plane = plane;
    }

    pub fn set_skill(&mut self, skill: Skill, boosted: i32, real: i32) {
        self.boosted.insert(skill, boosted);
        self.real.insert(skill, real);
    }

    pub fn set_run_energy(&mut self, energy: i32) {
        self.run_energy = energy;
    }

    pub fn set_special_attack_energy(&mut self, energy: i32) {
        self.special_attack = energy;
    }

    pub fn set_player_animation(&mut self, animation: i32) {
        if let Some(player) = self.player.as_mut() {
            player.animation = animation;
        }
    }

    pub fn add_npc(&mut self, npc: Npc) {
        self.npcs.push(npc);
    }

    pub fn name_item(&mut self, item_id: i32, name: &str) {
        self.item_names.insert(item_id, name.to_string());
    }

    pub fn name_object(&mut self, object_id: i32, name: &str) {
        self.object_names.insert(object_id, name.to_string());
    }

    pub fn set_inventory_slot(&mut self, slot: usize, item: Item) {
        let slots = self
            .inventory
            .get_or_insert_with(|| vec![None; INVENTORY_SIZE]);
        if let Some(entry) = slots.get_mut(slot) {
            *entry = Some(item);
        }
    }

    pub fn add_widget(&mut self, group: i32, child: Option<i32>, widget: Widget) {
        self.widgets.insert((group, child), widget);
    }

    pub fn add_ground_item(&mut self, point: WorldPoint, item_id: i32, quantity: i32) {
        if let Some(tile) = self.tile_mut(point) {
            tile.ground_items.push(TileItem {
                id: item_id,
                quantity,
            });
        }
    }

    pub fn add_game_object(&mut self, point: WorldPoint, object_id: i32) {
        if let Some(tile) = self.tile_mut(point) {
            tile.game_objects.push(TileObject { id: object_id });
        }
    }

    pub fn set_wall_object(&mut self, point: WorldPoint, object_id: i32) {
        if let Some(tile) = self.tile_mut(point) {
            tile.wall_object = Some(TileObject { id: object_id });
        }
    }

    pub fn set_ground_object(&mut self, point: WorldPoint, object_id: i32) {
        if let Some(tile) = self.tile_mut(point) {
            tile.ground_object = Some(TileObject { id: object_id });
        }
    }

    pub fn set_decorative_object(&mut self, point: WorldPoint, object_id: i32) {
        if let Some(tile) = self.tile_mut(point) {
            tile.decorative_object = Some(TileObject { id: object_id });
        }
    }

    /// Every menu invocation received so far, oldest first.
    pub fn invocations(&self) -> &[MenuInvocation] {
        &self.invocations
    }

    pub fn typed_text(&self) -> &[String] {
        &self.typed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance the world by one game tick: step toward a walk destination and
    /// complete a pending pickup once standing on its tile.
    pub fn tick(&mut self) {
        self.ticks += 1;
        if let (Some(destination), Some(player)) = (self.destination, self.player.as_mut()) {
            let here = player.location;
            let step = |from: i32, to: i32| {
                let delta = (i64::from(to) - i64::from(from)).clamp(-RUN_STEP, RUN_STEP);
                // lands between `from` and `to`, so it fits in i32
                (i64::from(from) + delta) as i32
            };
            player.location = WorldPoint::new(
                step(here.x, destination.x),
                step(here.y, destination.y),
                here.plane,
            );
            if player.location == destination {
                self.destination = None;
            }
        }
        if self.destination.is_none() {
            if let Some((item_id, scene_x, scene_y)) = self.pending_pickup.take() {
                self.complete_pickup(item_id, scene_x, scene_y);
            }
        }
    }

    fn complete_pickup(&mut self, item_id: i32, scene_x: i32, scene_y: i32) {
        let plane = self.plane;
        let Some(tile) = self.tile_slot_mut(plane, scene_x, scene_y) else {
            return;
        };
        let Some(position) = tile.ground_items.iter().position(|item| item.id == item_id) else {
            return;
        };
        let picked = tile.ground_items.remove(position);
        let slots = self
            .inventory
            .get_or_insert_with(|| vec![None; INVENTORY_SIZE]);
        if let Some(free) = slots.iter_mut().find(|slot| slot.is_none()) {
            *free = Some(Item {
                id: picked.id,
                quantity: picked.quantity,
            });
        }
    }

    fn index(plane: i32, scene_x: i32, scene_y: i32) -> Option<usize> {
        let in_range = (0..MAX_Z).contains(&plane)
            && (0..SCENE_SIZE).contains(&scene_x)
            && (0..SCENE_SIZE).contains(&scene_y);
        in_range.then(|| ((plane * SCENE_SIZE + scene_x) * SCENE_SIZE + scene_y) as usize)
    }

    fn tile_slot_mut(&mut self, plane: i32, scene_x: i32, scene_y: i32) -> Option<&mut Tile> {
        let index = Self::index(plane, scene_x, scene_y)?;
        self.tiles[index].as_mut()
    }

    /// Tile under a world point, created on first use.
    fn tile_mut(&mut self, point: WorldPoint) -> Option<&mut Tile> {
        let scene_x = point.x.checked_sub(self.base.0)?;
        let scene_y = point.y.checked_sub(self.base.1)?;
        let index = Self::index(point.plane, scene_x, scene_y)?;
        Some(self.tiles[index].get_or_insert_with(|| Tile::new(scene_x, scene_y, point)))
    }

    fn scene_to_world(&self, scene_x: i32, scene_y: i32) -> WorldPoint {
        WorldPoint::new(
            self.base.0.saturating_add(scene_x),
            self.base.1.saturating_add(scene_y),
            self.plane,
        )
    }
}

impl GameClient for HeadlessClient {
    fn game_state(&self) -> GameState {
        self.state
    }

    fn local_player(&self) -> Option<&LocalPlayer> {
        self.player.as_ref()
    }

    fn boosted_level(&self, skill: Skill) -> i32 {
        self.boosted.get(&skill).copied().unwrap_or(1)
    }

    fn real_level(&self, skill: Skill) -> i32 {
        self.real.get(&skill).copied().unwrap_or(1)
    }

    fn run_energy(&self) -> i32 {
        self.run_energy
    }

    fn special_attack_energy(&self) -> i32 {
        self.special_attack
    }

    fn npcs(&self) -> &[Npc] {
        &self.npcs
    }

    fn plane(&self) -> i32 {
        self.plane
    }

    fn region_origin(&self) -> (i32, i32) {
        self.base
    }

    fn tile(&self, plane: i32, scene_x: i32, scene_y: i32) -> Option<&Tile> {
        let index = Self::index(plane, scene_x, scene_y)?;
        self.tiles[index].as_ref()
    }

    fn inventory(&self) -> Option<&[Option<Item>]> {
        self.inventory.as_deref()
    }

    fn item_name(&self, item_id: i32) -> Option<&str> {
        self.item_names.get(&item_id).map(String::as_str)
    }

    fn object_name(&self, object_id: i32) -> Option<&str> {
        self.object_names.get(&object_id).map(String::as_str)
    }

    fn widget(&self, group: i32, child: Option<i32>) -> Option<&Widget> {
        self.widgets.get(&(group, child))
    }

    fn invoke_menu_action(&mut self, invocation: &MenuInvocation) {
        match invocation.opcode_kind() {
            Some(MenuOpcode::Walk) => {
                self.destination = Some(self.scene_to_world(invocation.param0, invocation.param1));
                self.pending_pickup = None;
            }
            Some(MenuOpcode::GroundItemThirdOption) => {
                self.destination = Some(self.scene_to_world(invocation.param0, invocation.param1));
                self.pending_pickup =
                    Some((invocation.identifier, invocation.param0, invocation.param1));
            }
            _ => {}
        }
        self.invocations.push(invocation.clone());
    }

    fn type_text(&mut self, text: &str) {
        self.typed.push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walking_moves_the_player_a_run_step_per_tick() {
        let mut client = HeadlessClient::demo();
        let walk = MenuInvocation::new("Walk here", "", 0, MenuOpcode::Walk, 25, 18);
        client.invoke_menu_action(&walk);
        client.tick();
        assert_eq!(
            client.local_player().unwrap().location,
            WorldPoint::new(3224, 3218, 0)
        );
        client.tick();
        assert_eq!(
            client.local_player().unwrap().location,
            WorldPoint::new(3225, 3218, 0)
        );
    }

    #[test]
    fn take_moves_the_item_into_the_inventory() {
        let mut client = HeadlessClient::demo();
        let take = MenuInvocation::new("Take", "Bones", 526, MenuOpcode::GroundItemThirdOption, 24, 19);
        client.invoke_menu_action(&take);
        client.tick();
        client.tick();
        let inventory = client.inventory().unwrap();
        assert!(inventory.iter().flatten().any(|item| item.id == 526));
        let tile = client.tile(0, 24, 19).unwrap();
        assert!(tile.ground_items.is_empty());
    }

    #[test]
    fn tiles_outside_the_scene_are_ignored() {
        let mut client = HeadlessClient::new();
        client.set_region_origin(3200, 3200);
        client.add_ground_item(WorldPoint::new(3100, 3100, 0), 526, 1);
        assert!(client.tiles.iter().all(Option::is_none));
        client.add_ground_item(WorldPoint::new(i32::MIN, i32::MAX, 0), 526, 1);
        assert!(client.tiles.iter().all(Option::is_none));
    }

    #[test]
    fn walking_toward_the_coordinate_edge_steps_without_overflow() {
        let mut client = HeadlessClient::demo();
        let walk = MenuInvocation::new("Walk here", "", 0, MenuOpcode::Walk, i32::MIN + 10, i32::MAX);
        client.invoke_menu_action(&walk);
        for _ in 0..4 {
            client.tick();
        }
        assert_eq!(client.ticks(), 4);
        assert_eq!(
            client.local_player().unwrap().location,
            WorldPoint::new(3214, 3226, 0)
        );
    }

    #[test]
    fn logging_out_drops_the_player() {
        let mut client = HeadlessClient::demo();
        client.set_player_animation(829);
        assert_eq!(client.local_player().unwrap().animation, 829);
        client.log_out();
        assert_eq!(client.game_state(), GameState::LoginScreen);
        assert!(client.local_player().is_none());
        client.tick();
        assert_eq!(client.ticks(), 1);
    }
}
