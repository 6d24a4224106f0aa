use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use arena::{
    map_area, AgentId, AgentReport, AgentResult, AgentState, AgentType, ArenaPlayer,
    DebugInterface, MatchInfo, OrderCode, PlayerId, PlayerInfo, TileCoords, TileType, TurnOrders,
    TurnSnapshot, AGENT_TYPE_COUNT, MAX_ARENA_WIDTH,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::traversal::is_tile_type_safe;

const ORDER_POLL_INTERVAL: Duration = Duration::from_micros(100);
const BIRTH_EXHAUSTION: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainPatch {
    pub tile: TileType,
    pub min: TileCoords,
    pub max: TileCoords,
}

/// A single-player match description for the local host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArenaScenario {
    pub map_width: i32,
    pub vision_radius: u32,
    pub queen_start: TileCoords,
    pub starting_workers: u32,
    pub starting_nutrients: i32,
    pub food_nutrients: i32,
    pub max_population: u32,
    pub turn_timeout_ms: u64,
    pub terrain: Vec<TerrainPatch>,
    pub food: Vec<TileCoords>,
}

impl Default for ArenaScenario {
    fn default() -> Self {
        Self {
            map_width: 24,
            vision_radius: 5,
            queen_start: TileCoords::new(12, 12),
            starting_workers: 4,
            starting_nutrients: 4000,
            food_nutrients: 1000,
            max_population: 48,
            turn_timeout_ms: 250,
            terrain: vec![
                TerrainPatch {
                    tile: TileType::Dirt,
                    min: TileCoords::new(0, 17),
                    max: TileCoords::new(23, 23),
                },
                TerrainPatch {
                    tile: TileType::Stone,
                    min: TileCoords::new(6, 4),
                    max: TileCoords::new(6, 15),
                },
                TerrainPatch {
                    tile: TileType::Water,
                    min: TileCoords::new(17, 3),
                    max: TileCoords::new(19, 7),
                },
            ],
            food: vec![
                TileCoords::new(15, 12),
                TileCoords::new(9, 14),
                TileCoords::new(3, 8),
                TileCoords::new(20, 10),
                TileCoords::new(12, 4),
                TileCoords::new(10, 19),
                TileCoords::new(21, 20),
            ],
        }
    }
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("map width {width} outside 1..={max}", max = MAX_ARENA_WIDTH)]
    MapWidth { width: i32 },
    #[error("{what} at {coords} is outside the {width}-wide map")]
    OutOfBounds {
        what: &'static str,
        coords: TileCoords,
        width: i32,
    },
}

impl ArenaScenario {
    pub fn from_json_file(path: &Path) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut deserializer = serde_json::Deserializer::from_str(&text);
        let scenario: ArenaScenario = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|error| ScenarioError::Parse {
                path: path.to_path_buf(),
                field: error.path().to_string(),
                source: error.into_inner(),
            })?;
        scenario.validate()?;
        info!(path = %path.display(), "scenario_loaded");
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        let width = self.map_width;
        if !(1..=MAX_ARENA_WIDTH).contains(&width) {
            return Err(ScenarioError::MapWidth { width });
        }
        let check = |what: &'static str, coords: TileCoords| {
            if coords.is_in_bounds(width) {
                Ok(())
            } else {
                Err(ScenarioError::OutOfBounds {
                    what,
                    coords,
                    width,
                })
            }
        };
        check("queen start", self.queen_start)?;
        for patch in &self.terrain {
            check("terrain corner", patch.min)?;
            check("terrain corner", patch.max)?;
        }
        for food in &self.food {
            check("food", *food)?;
        }
        Ok(())
    }

    pub fn match_info(&self) -> MatchInfo {
        MatchInfo {
            num_players: 1,
            num_teams: 1,
            map_width: self.map_width,
            max_population: self.max_population,
            starting_nutrients: self.starting_nutrients,
            food_nutrients: self.food_nutrients,
            ..MatchInfo::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HostAgent {
    id: AgentId,
    agent_type: AgentType,
    position: TileCoords,
    state: AgentState,
    exhaustion: u16,
    result: AgentResult,
}

impl HostAgent {
    fn report(&self) -> AgentReport {
        AgentReport {
            agent_id: self.id,
            position: self.position,
            exhaustion: self.exhaustion,
            received_combat_damage: false,
            received_suffocation_damage: false,
            agent_type: self.agent_type,
            state: self.state,
            result: self.result,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSummary {
    pub turns_played: u32,
    pub timed_out_turns: u32,
    pub faults: u32,
    pub nutrients: i32,
    pub food_delivered: u32,
    pub population: [u32; AGENT_TYPE_COUNT],
}

/// Headless stand-in for the arena server: owns the true map, builds fogged
/// snapshots and applies orders with simplified rules.
pub struct LocalHost {
    scenario: ArenaScenario,
    match_info: MatchInfo,
    tiles: Vec<TileType>,
    food: Vec<bool>,
    agents: BTreeMap<AgentId, HostAgent>,
    next_agent_id: u32,
    nutrients: i32,
    turn: u32,
    faults: u32,
    food_delivered: u32,
}

impl LocalHost {
    pub fn new(scenario: ArenaScenario) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        let width = scenario.map_width;
        let mut tiles = vec![TileType::Air; map_area(width)];
        for patch in &scenario.terrain {
            for y in patch.min.y.min(patch.max.y)..=patch.min.y.max(patch.max.y) {
                for x in patch.min.x.min(patch.max.x)..=patch.min.x.max(patch.max.x) {
                    if let Some(index) = TileCoords::new(x, y).tile_index(width) {
                        tiles[index] = patch.tile;
                    }
                }
            }
        }
        let mut food = vec![false; map_area(width)];
        for coords in &scenario.food {
            if let Some(index) = coords.tile_index(width) {
                food[index] = true;
            }
        }
        if let Some(index) = scenario.queen_start.tile_index(width) {
            tiles[index] = TileType::Air;
        }

        let mut host = Self {
            match_info: scenario.match_info(),
            nutrients: scenario.starting_nutrients,
            scenario,
            tiles,
            food,
            agents: BTreeMap::new(),
            next_agent_id: 1,
            turn: 0,
            faults: 0,
            food_delivered: 0,
        };
        let start = host.scenario.queen_start;
        host.spawn(AgentType::Queen, start);
        for _ in 0..host.scenario.starting_workers {
            host.spawn(AgentType::Worker, start);
        }
        Ok(host)
    }

    pub fn match_info(&self) -> MatchInfo {
        self.match_info
    }

    fn spawn(&mut self, agent_type: AgentType, position: TileCoords) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        self.agents.insert(
            id,
            HostAgent {
                id,
                agent_type,
                position,
                state: AgentState::Normal,
                exhaustion: 0,
                result: AgentResult::WasCreated,
            },
        );
        id
    }

    fn is_visible(&self, coords: TileCoords) -> bool {
        self.agents.values().any(|agent| {
            agent.state != AgentState::Dead
                && agent.position.taxicab_distance(coords) <= self.scenario.vision_radius
        })
    }

    /// Builds this turn's fogged snapshot. Agents reported dead are dropped
    /// afterwards, so each death is reported exactly once.
    pub fn next_snapshot(&mut self) -> TurnSnapshot {
        self.turn += 1;
        let width = self.scenario.map_width;
        let mut observed_tiles = Vec::with_capacity(self.tiles.len());
        let mut tiles_with_food = Vec::with_capacity(self.food.len());
        for (index, tile) in self.tiles.iter().enumerate() {
            if self.is_visible(TileCoords::from_tile_index(index, width)) {
                observed_tiles.push(*tile);
                tiles_with_food.push(self.food[index]);
            } else {
                observed_tiles.push(TileType::Unseen);
                tiles_with_food.push(false);
            }
        }
        let snapshot = TurnSnapshot {
            turn_number: self.turn,
            current_nutrients: self.nutrients,
            fault_count: self.faults,
            reports: self.agents.values().map(HostAgent::report).collect(),
            observed_agents: Vec::new(),
            observed_tiles,
            tiles_with_food,
        };
        self.agents.retain(|_, agent| agent.state != AgentState::Dead);
        snapshot
    }

    pub fn apply_orders(&mut self, orders: &TurnOrders) {
        for order in &orders.orders {
            if !self.agents.contains_key(&order.agent_id) {
                self.faults += 1;
                warn!(agent_id = order.agent_id.0, "order_for_unknown_agent");
            }
        }

        let ids: Vec<AgentId> = self.agents.keys().copied().collect();
        for id in ids {
            let order = orders.order_for(id).unwrap_or_default();
            let Some(mut agent) = self.agents.get(&id).copied() else {
                continue;
            };
            let was_exhausted = agent.exhaustion > 0;
            agent.exhaustion = agent.exhaustion.saturating_sub(1);
            agent.result = if was_exhausted && order != OrderCode::Hold {
                AgentResult::OrderErrorExhausted
            } else {
                self.apply_order(&mut agent, order)
            };
            self.agents.insert(id, agent);
        }
    }

    fn apply_order(&mut self, agent: &mut HostAgent, order: OrderCode) -> AgentResult {
        let width = self.scenario.map_width;
        if let Some(direction) = order.move_direction() {
            let destination = agent.position.step(direction);
            let Some(index) = destination.tile_index(width) else {
                return AgentResult::OrderErrorOutOfBounds;
            };
            if !is_tile_type_safe(agent.agent_type, self.tiles[index], false) {
                return AgentResult::OrderErrorMoveBlockedByTile;
            }
            agent.position = destination;
            return AgentResult::OrderSuccessMoved;
        }
        if let Some(child_type) = order.birth_type() {
            return self.give_birth(agent, child_type);
        }

        let Some(here) = agent.position.tile_index(width) else {
            return AgentResult::OrderErrorOutOfBounds;
        };
        match order {
            OrderCode::PickUpFood => {
                if agent.state == AgentState::HoldingFood {
                    AgentResult::OrderErrorAlreadyCarrying
                } else if !self.food[here] {
                    AgentResult::OrderErrorNoFoodPresent
                } else {
                    self.food[here] = false;
                    agent.state = AgentState::HoldingFood;
                    AgentResult::OrderSuccessPickUp
                }
            }
            OrderCode::DropCarriedObject => {
                if agent.state != AgentState::HoldingFood {
                    return AgentResult::OrderErrorNotCarrying;
                }
                agent.state = AgentState::Normal;
                let on_queen = self.agents.values().any(|other| {
                    other.agent_type == AgentType::Queen && other.position == agent.position
                });
                if on_queen || agent.agent_type == AgentType::Queen {
                    self.nutrients += self.scenario.food_nutrients;
                    self.food_delivered += 1;
                } else {
                    self.food[here] = true;
                }
                AgentResult::OrderSuccessDropped
            }
            OrderCode::DigHere => {
                if self.tiles[here] == TileType::Dirt {
                    self.tiles[here] = TileType::Air;
                    AgentResult::OrderSuccessDug
                } else {
                    AgentResult::OrderErrorMoveBlockedByTile
                }
            }
            OrderCode::PickUpCorpse => AgentResult::OrderErrorCantCarry,
            OrderCode::Suicide => {
                agent.state = AgentState::Dead;
                AgentResult::Suicided
            }
            _ => AgentResult::OrderSuccessHeld,
        }
    }

    fn give_birth(&mut self, queen: &mut HostAgent, child_type: AgentType) -> AgentResult {
        if queen.agent_type != AgentType::Queen {
            return AgentResult::OrderErrorBadAgentId;
        }
        if self.agents.len() as u32 >= self.scenario.max_population {
            return AgentResult::OrderErrorMaximumPopulationReached;
        }
        let cost = self.match_info.birth_costs.for_type(child_type);
        if self.nutrients < cost {
            return AgentResult::OrderErrorInsufficientFood;
        }
        self.nutrients -= cost;
        let child = self.spawn(child_type, queen.position);
        queen.exhaustion = BIRTH_EXHAUSTION;
        debug!(child = child.0, child_type = ?child_type, "local_host_birth");
        AgentResult::OrderSuccessGaveBirth
    }

    pub fn summary(&self, turns_played: u32, timed_out_turns: u32) -> MatchSummary {
        let mut population = [0; AGENT_TYPE_COUNT];
        for agent in self.agents.values() {
            population[agent.agent_type.index()] += 1;
        }
        MatchSummary {
            turns_played,
            timed_out_turns,
            faults: self.faults,
            nutrients: self.nutrients,
            food_delivered: self.food_delivered,
            population,
        }
    }

    /// Plays `turns` turns against `player`, lending it `threads` threads.
    pub fn run(
        &mut self,
        player: &dyn ArenaPlayer,
        debug: Arc<dyn DebugInterface>,
        turns: u32,
        threads: usize,
    ) -> MatchSummary {
        let timeout = Duration::from_millis(self.scenario.turn_timeout_ms);
        info!(
            player = player.player_name(),
            author = player.author_name(),
            interface_version = player.interface_version(),
            turns,
            threads,
            "local_match_starting"
        );
        player.pre_game_startup(
            self.match_info,
            PlayerInfo {
                player_id: PlayerId(0),
                team_id: 0,
            },
            debug,
        );

        let mut timed_out_turns = 0;
        thread::scope(|scope| {
            for thread_index in 0..threads.max(1) {
                scope.spawn(move || player.thread_entry(thread_index));
            }

            for _ in 0..turns {
                let snapshot = self.next_snapshot();
                player.receive_turn_state(&snapshot);
                match poll_orders(player, timeout) {
                    Some(orders) => self.apply_orders(&orders),
                    None => {
                        timed_out_turns += 1;
                        warn!(turn = snapshot.turn_number, "turn_orders_timed_out");
                        self.apply_orders(&TurnOrders::default());
                    }
                }
            }

            player.post_game_shutdown();
        });

        let summary = self.summary(turns, timed_out_turns);
        info!(
            turns = summary.turns_played,
            timed_out = summary.timed_out_turns,
            faults = summary.faults,
            nutrients = summary.nutrients,
            food_delivered = summary.food_delivered,
            workers = summary.population[AgentType::Worker.index()],
            soldiers = summary.population[AgentType::Soldier.index()],
            queens = summary.population[AgentType::Queen.index()],
            scouts = summary.population[AgentType::Scout.index()],
            "local_match_summary"
        );
        summary
    }
}

fn poll_orders(player: &dyn ArenaPlayer, timeout: Duration) -> Option<TurnOrders> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(orders) = player.turn_order_request() {
            return Some(orders);
        }
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(ORDER_POLL_INTERVAL);
    }
}
