use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coords::{Direction, TileCoords};

pub const INTERFACE_VERSION: u32 = 4;
pub const MAX_REPORTS_PER_PLAYER: usize = 256;
pub const MAX_ORDERS_PER_PLAYER: usize = 256;
pub const MAX_OBSERVED_AGENTS: usize = 1024;
pub const MAX_ARENA_WIDTH: i32 = 256;
pub const TILE_TYPE_COUNT: usize = 5;
pub const AGENT_TYPE_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    pub const INVALID: AgentId = AgentId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    Air,
    Dirt,
    Stone,
    Water,
    CorpseBridge,
    #[default]
    Unseen,
}

impl TileType {
    pub const KNOWN: [TileType; TILE_TYPE_COUNT] = [
        TileType::Air,
        TileType::Dirt,
        TileType::Stone,
        TileType::Water,
        TileType::CorpseBridge,
    ];

    /// Slot in a per-tile-type table; `Unseen` has none.
    pub fn table_index(self) -> Option<usize> {
        match self {
            Self::Air => Some(0),
            Self::Dirt => Some(1),
            Self::Stone => Some(2),
            Self::Water => Some(3),
            Self::CorpseBridge => Some(4),
            Self::Unseen => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentType {
    Worker,
    Soldier,
    Queen,
    Scout,
}

impl AgentType {
    pub const ALL: [AgentType; AGENT_TYPE_COUNT] = [
        AgentType::Worker,
        AgentType::Soldier,
        AgentType::Queen,
        AgentType::Scout,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Worker => 0,
            Self::Soldier => 1,
            Self::Queen => 2,
            Self::Scout => 3,
        }
    }

    pub fn birth_order(self) -> OrderCode {
        match self {
            Self::Worker => OrderCode::BirthWorker,
            Self::Soldier => OrderCode::BirthSoldier,
            Self::Queen => OrderCode::BirthQueen,
            Self::Scout => OrderCode::BirthScout,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    #[default]
    Normal,
    HoldingFood,
    HoldingCorpse,
    Dead,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderCode {
    #[default]
    Hold,
    MoveEast,
    MoveNorth,
    MoveWest,
    MoveSouth,
    PickUpFood,
    PickUpCorpse,
    DropCarriedObject,
    DigHere,
    BirthWorker,
    BirthSoldier,
    BirthQueen,
    BirthScout,
    Suicide,
}

impl OrderCode {
    pub fn move_toward(direction: Direction) -> OrderCode {
        match direction {
            Direction::East => Self::MoveEast,
            Direction::West => Self::MoveWest,
            Direction::North => Self::MoveNorth,
            Direction::South => Self::MoveSouth,
        }
    }

    pub fn move_direction(self) -> Option<Direction> {
        match self {
            Self::MoveEast => Some(Direction::East),
            Self::MoveWest => Some(Direction::West),
            Self::MoveNorth => Some(Direction::North),
            Self::MoveSouth => Some(Direction::South),
            _ => None,
        }
    }

    pub fn birth_type(self) -> Option<AgentType> {
        match self {
            Self::BirthWorker => Some(AgentType::Worker),
            Self::BirthSoldier => Some(AgentType::Soldier),
            Self::BirthQueen => Some(AgentType::Queen),
            Self::BirthScout => Some(AgentType::Scout),
            _ => None,
        }
    }
}

/// Outcome the host attaches to each agent report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentResult {
    #[default]
    Unknown,
    WasCreated,
    KilledByEnemy,
    KilledByWater,
    KilledBySuffocation,
    KilledByStarvation,
    KilledByPenalty,
    Suicided,
    OrderSuccessHeld,
    OrderSuccessMoved,
    OrderSuccessPickUp,
    OrderSuccessDropped,
    OrderSuccessGaveBirth,
    OrderSuccessDug,
    OrderErrorBadAgentId,
    OrderErrorExhausted,
    OrderErrorOutOfBounds,
    OrderErrorMoveBlockedByTile,
    OrderErrorMoveBlockedByQueen,
    OrderErrorCantCarry,
    OrderErrorNoFoodPresent,
    OrderErrorAlreadyCarrying,
    OrderErrorNotCarrying,
    OrderErrorInsufficientFood,
    OrderErrorMaximumPopulationReached,
}

impl AgentResult {
    pub fn is_death(self) -> bool {
        matches!(
            self,
            Self::KilledByEnemy
                | Self::KilledByWater
                | Self::KilledBySuffocation
                | Self::KilledByStarvation
                | Self::KilledByPenalty
                | Self::Suicided
        )
    }

    pub fn is_birth(self) -> bool {
        self == Self::WasCreated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent_id: AgentId,
    pub position: TileCoords,
    pub exhaustion: u16,
    pub received_combat_damage: bool,
    pub received_suffocation_damage: bool,
    pub agent_type: AgentType,
    pub state: AgentState,
    pub result: AgentResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedAgent {
    pub agent_id: AgentId,
    pub player_id: PlayerId,
    pub team_id: u8,
    pub position: TileCoords,
    pub agent_type: AgentType,
    pub state: AgentState,
}

/// Everything the host tells one player about a single turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    pub turn_number: u32,
    pub current_nutrients: i32,
    pub fault_count: u32,
    pub reports: Vec<AgentReport>,
    pub observed_agents: Vec<ObservedAgent>,
    pub observed_tiles: Vec<TileType>,
    pub tiles_with_food: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("tile grid has {actual} cells, expected {expected} for map width {map_width}")]
    TileGridSize {
        map_width: i32,
        expected: usize,
        actual: usize,
    },
    #[error("food grid has {actual} cells, expected {expected}")]
    FoodGridSize { expected: usize, actual: usize },
    #[error("{count} agent reports exceed the cap of {cap}", cap = MAX_REPORTS_PER_PLAYER)]
    TooManyReports { count: usize },
}

impl TurnSnapshot {
    pub fn validate(&self, map_width: i32) -> Result<(), SnapshotError> {
        let expected = map_area(map_width);
        if self.observed_tiles.len() != expected {
            return Err(SnapshotError::TileGridSize {
                map_width,
                expected,
                actual: self.observed_tiles.len(),
            });
        }
        if self.tiles_with_food.len() != expected {
            return Err(SnapshotError::FoodGridSize {
                expected,
                actual: self.tiles_with_food.len(),
            });
        }
        if self.reports.len() > MAX_REPORTS_PER_PLAYER {
            return Err(SnapshotError::TooManyReports {
                count: self.reports.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOrder {
    pub agent_id: AgentId,
    pub order: OrderCode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrders {
    pub orders: Vec<AgentOrder>,
}

impl TurnOrders {
    /// Appends an order unless the per-player cap is already reached or the
    /// id is the invalid sentinel.
    pub fn push(&mut self, agent_id: AgentId, order: OrderCode) -> bool {
        if !agent_id.is_valid() || self.orders.len() >= MAX_ORDERS_PER_PLAYER {
            return false;
        }
        self.orders.push(AgentOrder { agent_id, order });
        true
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn order_for(&self, agent_id: AgentId) -> Option<OrderCode> {
        self.orders
            .iter()
            .find(|entry| entry.agent_id == agent_id)
            .map(|entry| entry.order)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthCosts {
    pub worker: i32,
    pub soldier: i32,
    pub queen: i32,
    pub scout: i32,
}

impl BirthCosts {
    pub fn for_type(&self, agent_type: AgentType) -> i32 {
        match agent_type {
            AgentType::Worker => self.worker,
            AgentType::Soldier => self.soldier,
            AgentType::Queen => self.queen,
            AgentType::Scout => self.scout,
        }
    }
}

impl Default for BirthCosts {
    fn default() -> Self {
        Self {
            worker: 1000,
            soldier: 2000,
            queen: 8000,
            scout: 1500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub num_players: u8,
    pub num_teams: u8,
    pub map_width: i32,
    pub max_population: u32,
    pub starting_nutrients: i32,
    pub food_nutrients: i32,
    pub birth_costs: BirthCosts,
}

impl MatchInfo {
    pub fn is_multiplayer(&self) -> bool {
        self.num_players > 1
    }
}

impl Default for MatchInfo {
    fn default() -> Self {
        Self {
            num_players: 1,
            num_teams: 1,
            map_width: 32,
            max_population: 64,
            starting_nutrients: 10_000,
            food_nutrients: 1000,
            birth_costs: BirthCosts::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: PlayerId,
    pub team_id: u8,
}

pub fn map_area(map_width: i32) -> usize {
    let width = map_width.max(0) as usize;
    width * width
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_snapshot(map_width: i32) -> TurnSnapshot {
        TurnSnapshot {
            observed_tiles: vec![TileType::Unseen; map_area(map_width)],
            tiles_with_food: vec![false; map_area(map_width)],
            ..TurnSnapshot::default()
        }
    }

    #[test]
    fn validate_accepts_matching_grids() {
        assert_eq!(empty_snapshot(8).validate(8), Ok(()));
    }

    #[test]
    fn validate_rejects_mismatched_tile_grid() {
        let snapshot = empty_snapshot(8);
        let err = snapshot.validate(9).expect_err("grid mismatch");
        assert_eq!(
            err,
            SnapshotError::TileGridSize {
                map_width: 9,
                expected: 81,
                actual: 64,
            }
        );
    }

    #[test]
    fn validate_rejects_mismatched_food_grid() {
        let mut snapshot = empty_snapshot(4);
        snapshot.tiles_with_food.pop();
        assert!(matches!(
            snapshot.validate(4),
            Err(SnapshotError::FoodGridSize {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn turn_orders_push_respects_cap() {
        let mut orders = TurnOrders::default();
        for id in 0..MAX_ORDERS_PER_PLAYER as u32 {
            assert!(orders.push(AgentId(id), OrderCode::Hold));
        }
        assert!(!orders.push(AgentId(9999), OrderCode::MoveEast));
        assert_eq!(orders.len(), MAX_ORDERS_PER_PLAYER);
        assert_eq!(orders.order_for(AgentId(9999)), None);
    }

    #[test]
    fn turn_orders_refuse_invalid_agent_id() {
        let mut orders = TurnOrders::default();
        assert!(!orders.push(AgentId::INVALID, OrderCode::Hold));
        assert!(orders.is_empty());
        assert!(orders.push(AgentId(0), OrderCode::Hold));
    }

    #[test]
    fn death_and_birth_results_are_classified() {
        assert!(AgentResult::KilledByWater.is_death());
        assert!(AgentResult::Suicided.is_death());
        assert!(!AgentResult::OrderSuccessMoved.is_death());
        assert!(AgentResult::WasCreated.is_birth());
    }

    #[test]
    fn move_orders_map_to_directions() {
        for direction in Direction::ALL {
            assert_eq!(
                OrderCode::move_toward(direction).move_direction(),
                Some(direction)
            );
        }
        assert_eq!(OrderCode::PickUpFood.move_direction(), None);
    }

    #[test]
    fn snapshot_survives_json_transport() {
        let mut snapshot = empty_snapshot(2);
        snapshot.turn_number = 7;
        snapshot.reports.push(AgentReport {
            agent_id: AgentId(3),
            position: TileCoords::new(1, 0),
            exhaustion: 2,
            received_combat_damage: true,
            received_suffocation_damage: false,
            agent_type: AgentType::Soldier,
            state: AgentState::Normal,
            result: AgentResult::OrderSuccessMoved,
        });
        let text = serde_json::to_string(&snapshot).expect("encode");
        let decoded: TurnSnapshot = serde_json::from_str(&text).expect("decode");
        assert_eq!(decoded, snapshot);
    }
}
