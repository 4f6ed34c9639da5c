//! Building the observation document from live world state.
//!
//! A pure read of the [`GameClient`]. Lists are filled in world order (NPC
//! table order, slot order, scene raster order) and truncated at the caps in
//! [`ObservationConfig`], so an unchanged world always yields the same bytes.

use bridge_runtime::{
    GroundItemObservation, InventoryObservation, NpcObservation, ObservationSnapshot, WorldPoint,
};
use thiserror::Error;

use crate::config::ObservationConfig;
use crate::world::{plane_tiles, GameClient, GameState, Skill};

const UNKNOWN_NAME: &str = "Unknown";
const MAX_RUN_ENERGY: f64 = 10_000.0;
const MAX_SPECIAL_ATTACK_PERCENT: i32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObservationError {
    #[error("Not logged in. Current state: {0}")]
    NotLoggedIn(GameState),
}

pub fn build_observation(
    client: &dyn GameClient,
    limits: &ObservationConfig,
) -> Result<ObservationSnapshot, ObservationError> {
    let state = client.game_state();
    if state != GameState::LoggedIn {
        return Err(ObservationError::NotLoggedIn(state));
    }

    let player = client.local_player();
    let origin = player.map(|player| player.location);
    let run_energy = (f64::from(client.run_energy()) / MAX_RUN_ENERGY).clamp(0.0, 1.0);

    Ok(ObservationSnapshot {
        player_current_health: client.boosted_level(Skill::Hitpoints),
        player_max_health: client.real_level(Skill::Hitpoints),
        player_current_prayer: client.boosted_level(Skill::Prayer),
        player_max_prayer: client.real_level(Skill::Prayer),
        player_current_special_attack: client.special_attack_energy() / 10,
        player_max_special_attack: MAX_SPECIAL_ATTACK_PERCENT,
        player_run_energy_percentage: run_energy,
        player_animation: player.map_or(-1, |player| player.animation),
        player_location: origin,
        nearby_npcs: origin
            .map(|origin| nearby_npcs(client, origin, limits))
            .unwrap_or_default(),
        inventory: inventory(client, limits),
        nearby_ground_items: origin
            .map(|origin| nearby_ground_items(client, origin, limits))
            .unwrap_or_default(),
    })
}

fn nearby_npcs(
    client: &dyn GameClient,
    origin: WorldPoint,
    limits: &ObservationConfig,
) -> Vec<NpcObservation> {
    client
        .npcs()
        .iter()
        .filter(|npc| origin.distance_to(&npc.location) <= limits.npc_radius)
        .take(limits.max_npcs)
        .map(|npc| NpcObservation {
            id: npc.id,
            name: npc.name.clone().unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            animation: npc.animation,
            location: npc.location,
        })
        .collect()
}

fn inventory(client: &dyn GameClient, limits: &ObservationConfig) -> Vec<InventoryObservation> {
    let Some(slots) = client.inventory() else {
        return Vec::new();
    };
    slots
        .iter()
        .flatten()
        .filter(|item| item.id != -1)
        .take(limits.max_inventory_items)
        .map(|item| InventoryObservation {
            id: item.id,
            quantity: item.quantity,
            name: display_name(client.item_name(item.id)),
        })
        .collect()
}

fn nearby_ground_items(
    client: &dyn GameClient,
    origin: WorldPoint,
    limits: &ObservationConfig,
) -> Vec<GroundItemObservation> {
    plane_tiles(client, client.plane())
        .filter(|tile| origin.distance_to(&tile.location) <= limits.ground_item_radius)
        .flat_map(move |tile| {
            tile.ground_items.iter().map(move |item| GroundItemObservation {
                id: item.id,
                quantity: item.quantity,
                name: display_name(client.item_name(item.id)),
                location: tile.location,
            })
        })
        .take(limits.max_ground_items)
        .collect()
}

fn display_name(name: Option<&str>) -> String {
    name.unwrap_or(UNKNOWN_NAME).to_string()
}
