use arena::{AgentType, TileType, TILE_TYPE_COUNT};

/// Per-tile-type step cost for one agent type; `None` is impassable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCosts([Option<u32>; TILE_TYPE_COUNT]);

impl TileCosts {
    pub fn uniform(cost: u32) -> Self {
        Self([Some(cost); TILE_TYPE_COUNT])
    }

    /// Builds a table from the host's numeric encoding, where `-1` is impassable.
    pub fn from_raw(raw: [i32; TILE_TYPE_COUNT]) -> Self {
        Self(raw.map(|cost| u32::try_from(cost).ok()))
    }

    pub fn with_cost(mut self, tile: TileType, cost: Option<u32>) -> Self {
        if let Some(index) = tile.table_index() {
            self.0[index] = cost;
        }
        self
    }

    /// Cost of stepping into a tile of this type; unseen tiles are never priced.
    pub fn cost(&self, tile: TileType) -> Option<u32> {
        tile.table_index().and_then(|index| self.0[index])
    }

    pub fn for_agent(agent_type: AgentType, multiplayer: bool) -> Self {
        let raw = match agent_type {
            AgentType::Worker => [1, 6, -1, -1, 1],
            AgentType::Soldier if multiplayer => [1, -1, -1, -1, 1],
            AgentType::Soldier => [1, -1, -1, 3, 1],
            AgentType::Queen => [1, -1, -1, -1, 1],
            AgentType::Scout => [1, 2, -1, 2, 1],
        };
        Self::from_raw(raw)
    }
}

pub fn is_tile_type_safe(agent_type: AgentType, tile: TileType, multiplayer: bool) -> bool {
    use TileType::{Dirt, Stone, Unseen, Water};

    match agent_type {
        AgentType::Worker => !matches!(tile, Stone | Water | Unseen),
        AgentType::Soldier => match tile {
            Stone | Dirt | Unseen => false,
            Water => !multiplayer,
            _ => true,
        },
        AgentType::Queen => !matches!(tile, Stone | Water | Dirt | Unseen),
        AgentType::Scout => tile != Stone,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_minus_one_marks_impassable() {
        let costs = TileCosts::from_raw([1, -1, 4, -1, 0]);
        assert_eq!(costs.cost(TileType::Air), Some(1));
        assert_eq!(costs.cost(TileType::Dirt), None);
        assert_eq!(costs.cost(TileType::Stone), Some(4));
        assert_eq!(costs.cost(TileType::CorpseBridge), Some(0));
        assert_eq!(costs.cost(TileType::Unseen), None);
    }

    #[test]
    fn safety_table_matches_agent_rules() {
        use AgentType::*;
        use TileType::*;

        assert!(is_tile_type_safe(Worker, Dirt, false));
        assert!(!is_tile_type_safe(Worker, Water, false));
        assert!(!is_tile_type_safe(Worker, Unseen, false));

        assert!(!is_tile_type_safe(Soldier, Dirt, false));
        assert!(is_tile_type_safe(Soldier, Water, false));
        assert!(!is_tile_type_safe(Soldier, Water, true));
        assert!(!is_tile_type_safe(Soldier, Unseen, true));

        assert!(!is_tile_type_safe(Queen, Dirt, false));
        assert!(is_tile_type_safe(Queen, CorpseBridge, false));

        assert!(is_tile_type_safe(Scout, Unseen, true));
        assert!(is_tile_type_safe(Scout, Water, true));
        assert!(!is_tile_type_safe(Scout, Stone, false));
    }

    #[test]
    fn cost_tables_agree_with_safety_on_known_tiles() {
        for multiplayer in [false, true] {
            for agent_type in AgentType::ALL {
                let costs = TileCosts::for_agent(agent_type, multiplayer);
                for tile in TileType::KNOWN {
                    assert_eq!(
                        costs.cost(tile).is_some(),
                        is_tile_type_safe(agent_type, tile, multiplayer),
                        "{agent_type:?} on {tile:?} (multiplayer: {multiplayer})"
                    );
                }
            }
        }
    }
}
