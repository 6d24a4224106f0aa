use arena::{map_area, AgentId, AgentType, ObservedAgent, PlayerId, TileCoords, TileType};

use crate::traversal::is_tile_type_safe;

/// Remembered state of one cell. Type and food persist while the cell is out
/// of sight; foreign agents are only ever this turn's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedTile {
    pub tile_type: TileType,
    pub has_food: bool,
    pub last_seen_turn: Option<u32>,
    pub foreign_agents: Vec<AgentType>,
    pub claimed_by: Option<AgentId>,
}

impl ObservedTile {
    pub fn is_visible_on(&self, turn: u32) -> bool {
        self.last_seen_turn == Some(turn)
    }
}

#[derive(Debug, Clone)]
pub struct ObservedMap {
    map_width: i32,
    tiles: Vec<ObservedTile>,
}

impl ObservedMap {
    pub fn new(map_width: i32) -> Self {
        Self {
            map_width,
            tiles: vec![ObservedTile::default(); map_area(map_width)],
        }
    }

    pub fn map_width(&self) -> i32 {
        self.map_width
    }

    pub fn tile(&self, coords: TileCoords) -> Option<&ObservedTile> {
        coords
            .tile_index(self.map_width)
            .and_then(|index| self.tiles.get(index))
    }

    fn tile_mut(&mut self, coords: TileCoords) -> Option<&mut ObservedTile> {
        coords
            .tile_index(self.map_width)
            .and_then(|index| self.tiles.get_mut(index))
    }

    /// Folds this turn's visible cells into memory. Unseen cells keep what was
    /// last known; a cell that lost its food also loses its claim.
    pub fn merge_visible(&mut self, turn: u32, tile_types: &[TileType], food: &[bool]) {
        for (index, tile) in self.tiles.iter_mut().enumerate() {
            let Some(&observed) = tile_types.get(index) else {
                break;
            };
            if observed == TileType::Unseen {
                continue;
            }
            tile.tile_type = observed;
            tile.last_seen_turn = Some(turn);
            tile.has_food = food.get(index).copied().unwrap_or(false);
            if !tile.has_food {
                tile.claimed_by = None;
            }
        }
    }

    /// Rebuilds every cell's foreign-agent list from this turn's sightings.
    pub fn merge_foreign_agents(&mut self, own_player: PlayerId, observed: &[ObservedAgent]) {
        for tile in &mut self.tiles {
            tile.foreign_agents.clear();
        }
        for agent in observed.iter().filter(|agent| agent.player_id != own_player) {
            if let Some(tile) = self.tile_mut(agent.position) {
                tile.foreign_agents.push(agent.agent_type);
            }
        }
    }

    pub fn set_food(&mut self, coords: TileCoords, has_food: bool) {
        if let Some(tile) = self.tile_mut(coords) {
            tile.has_food = has_food;
            if !has_food {
                tile.claimed_by = None;
            }
        }
    }

    /// Claims an unclaimed cell (or re-claims one already held by `owner`).
    pub fn claim(&mut self, coords: TileCoords, owner: AgentId) -> bool {
        match self.tile_mut(coords) {
            Some(tile) if tile.claimed_by.is_none() || tile.claimed_by == Some(owner) => {
                tile.claimed_by = Some(owner);
                true
            }
            _ => false,
        }
    }

    pub fn release_claim(&mut self, coords: TileCoords, owner: AgentId) {
        if let Some(tile) = self.tile_mut(coords) {
            if tile.claimed_by == Some(owner) {
                tile.claimed_by = None;
            }
        }
    }

    pub fn release_all_claims(&mut self, owner: AgentId) {
        for tile in &mut self.tiles {
            if tile.claimed_by == Some(owner) {
                tile.claimed_by = None;
            }
        }
    }

    /// Remembered tile types, as shipped with a path request.
    pub fn tile_types(&self) -> Vec<TileType> {
        self.tiles.iter().map(|tile| tile.tile_type).collect()
    }

    pub fn is_tile_safe_for(
        &self,
        agent_type: AgentType,
        coords: TileCoords,
        multiplayer: bool,
    ) -> bool {
        self.tile(coords)
            .is_some_and(|tile| is_tile_type_safe(agent_type, tile.tile_type, multiplayer))
    }

    /// Nearest remembered food cell that nobody else has claimed, skipping `excluded`.
    pub fn nearest_unclaimed_food(
        &self,
        from: TileCoords,
        claimant: AgentId,
        excluded: &[TileCoords],
    ) -> Option<TileCoords> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| tile.has_food)
            .filter(|(_, tile)| tile.claimed_by.is_none() || tile.claimed_by == Some(claimant))
            .map(|(index, _)| TileCoords::from_tile_index(index, self.map_width))
            .filter(|coords| !excluded.contains(coords))
            .min_by_key(|coords| (from.taxicab_distance(*coords), coords.y, coords.x))
    }

    /// Nearest cell never observed, skipping `excluded`.
    pub fn nearest_unexplored(&self, from: TileCoords, excluded: &[TileCoords]) -> Option<TileCoords> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| tile.last_seen_turn.is_none())
            .map(|(index, _)| TileCoords::from_tile_index(index, self.map_width))
            .filter(|coords| !excluded.contains(coords))
            .min_by_key(|coords| (from.taxicab_distance(*coords), coords.y, coords.x))
    }
}
