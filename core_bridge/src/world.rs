//! The simulation as seen from the bridge.
//!
//! [`GameClient`] is the only way the bridge touches world state: a read-only
//! accessor plus the two effect entry points (the menu-interaction primitive
//! and keyboard text). Implementations are only ever called from the
//! simulation thread.

use std::fmt;

use bridge_runtime::{MenuInvocation, WorldPoint};

/// Width and height of the loaded scene, in tiles.
pub const SCENE_SIZE: i32 = 104;
/// Number of planes in the scene.
pub const MAX_Z: i32 = 4;
/// Number of inventory slots.
pub const INVENTORY_SIZE: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    Starting,
    LoginScreen,
    LoggingIn,
    Loading,
    LoggedIn,
    ConnectionLost,
    Hopping,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameState::Starting => "STARTING",
            GameState::LoginScreen => "LOGIN_SCREEN",
            GameState::LoggingIn => "LOGGING_IN",
            GameState::Loading => "LOADING",
            GameState::LoggedIn => "LOGGED_IN",
            GameState::ConnectionLost => "CONNECTION_LOST",
            GameState::Hopping => "HOPPING",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Skill {
    Hitpoints,
    Prayer,
}

/// The entity the agent controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlayer {
    pub name: String,
    pub animation: i32,
    pub location: WorldPoint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Npc {
    /// Runtime slot in the engine's NPC table; what interactions address.
    pub index: i32,
    /// Definition id; not unique across spawned instances.
    pub id: i32,
    pub name: Option<String>,
    pub animation: i32,
    pub location: WorldPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileObject {
    pub id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileItem {
    pub id: i32,
    pub quantity: i32,
}

/// The four object layers a tile can hold, in search order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectLayer {
    Game,
    Wall,
    Ground,
    Decorative,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tile {
    pub scene_x: i32,
    pub scene_y: i32,
    pub location: WorldPoint,
    pub game_objects: Vec<TileObject>,
    pub wall_object: Option<TileObject>,
    pub ground_object: Option<TileObject>,
    pub decorative_object: Option<TileObject>,
    pub ground_items: Vec<TileItem>,
}

impl Tile {
    pub fn new(scene_x: i32, scene_y: i32, location: WorldPoint) -> Self {
        Self {
            scene_x,
            scene_y,
            location,
            ..Self::default()
        }
    }

    /// Every object on the tile, tagged with its layer, in search order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectLayer, TileObject)> + '_ {
        self.game_objects
            .iter()
            .map(|object| (ObjectLayer::Game, *object))
            .chain(self.wall_object.map(|object| (ObjectLayer::Wall, object)))
            .chain(self.ground_object.map(|object| (ObjectLayer::Ground, object)))
            .chain(
                self.decorative_object
                    .map(|object| (ObjectLayer::Decorative, object)),
            )
    }
}

/// An interface element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    /// Packed `(group << 16) | child` id.
    pub id: i32,
    pub name: String,
    pub actions: Vec<String>,
    pub hidden: bool,
    /// Item shown in the element, or `-1`.
    pub item_id: i32,
    /// Index within a dynamic child list, or `-1`.
    pub index: i32,
}

pub trait GameClient {
    fn game_state(&self) -> GameState;
    fn local_player(&self) -> Option<&LocalPlayer>;

    fn boosted_level(&self, skill: Skill) -> i32;
    fn real_level(&self, skill: Skill) -> i32;
    /// Run energy in hundredths of a percent, `0..=10000`.
    fn run_energy(&self) -> i32;
    /// Special attack energy in tenths of a percent, `0..=1000`.
    fn special_attack_energy(&self) -> i32;

    fn npcs(&self) -> &[Npc];

    fn plane(&self) -> i32;
    /// World coordinate of scene tile `(0, 0)`.
    fn region_origin(&self) -> (i32, i32);
    fn tile(&self, plane: i32, scene_x: i32, scene_y: i32) -> Option<&Tile>;

    /// Inventory slots in slot order, `None` if the container is not loaded.
    fn inventory(&self) -> Option<&[Option<Item>]>;
    fn item_name(&self, item_id: i32) -> Option<&str>;
    fn object_name(&self, object_id: i32) -> Option<&str>;
    /// `child = None` addresses the group's root element.
    fn widget(&self, group: i32, child: Option<i32>) -> Option<&Widget>;

    fn invoke_menu_action(&mut self, invocation: &MenuInvocation);
    fn type_text(&mut self, text: &str);
}

/// Every loaded tile on `plane` in raster order (x-major, then y).
pub fn plane_tiles(client: &dyn GameClient, plane: i32) -> impl Iterator<Item = &Tile> + '_ {
    let valid_plane = (0..MAX_Z).contains(&plane);
    (0..SCENE_SIZE)
        .flat_map(|x| (0..SCENE_SIZE).map(move |y| (x, y)))
        .filter(move |_| valid_plane)
        .filter_map(move |(x, y)| client.tile(plane, x, y))
}

/// The tile under a world point, if it lies in the loaded scene on the
/// current plane.
pub fn tile_at(client: &dyn GameClient, point: WorldPoint) -> Option<&Tile> {
    if point.plane != client.plane() {
        return None;
    }
    let (base_x, base_y) = client.region_origin();
    let scene_x = point.x.checked_sub(base_x)?;
    let scene_y = point.y.checked_sub(base_y)?;
    if !(0..SCENE_SIZE).contains(&scene_x) || !(0..SCENE_SIZE).contains(&scene_y) {
        return None;
    }
    client.tile(point.plane, scene_x, scene_y)
}
